//! Scoring of a [`Listing`] subject against a [`BuyRequest`].
//!
//! Every criterion either hard-fails the pair with a [`Mismatch`] or adds
//! points to the final [`Score`]:
//!
//! | Criterion | Points                                                  |
//! |-----------|---------------------------------------------------------|
//! | breed     | 20                                                      |
//! | weight    | 20 if measured, 15 if declared or initial               |
//! | age       | 20, none if birth date is unknown                       |
//! | quantity  | 15 for a single animal, 10 otherwise                    |
//! | location  | `20 × (1 - distance / radius)`, 10 if not constrained   |
//! | price     | `15 × (1 - price / ceiling)`, 10 if not constrained     |

use common::{DateTime, Distance};
use derive_more::Display;

use crate::domain::{
    subject::{self, Confidence},
    BuyRequest, Listing,
};

use super::Score;

/// Outcome of [`evaluate()`]ing a pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Evaluation {
    /// Pair satisfies every hard criterion.
    Match(Score),

    /// Pair fails a hard criterion.
    Mismatch(Mismatch),
}

/// Hard criterion a pair failed.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Mismatch {
    /// Subject is sold already or is not healthy.
    #[display("subject is not sellable")]
    NotSellable,

    /// Breed differs from the wanted one.
    #[display("breed differs")]
    Breed,

    /// Breed cannot be determined while a specific one is wanted.
    #[display("breed is unknown")]
    UnknownBreed,

    /// Weight is out of the wanted range.
    #[display("weight is out of range")]
    Weight,

    /// Weight cannot be determined.
    #[display("weight is unknown")]
    UnknownWeight,

    /// Age is out of the wanted window.
    #[display("age is out of window")]
    Age,

    /// Pick-up location is too far from the delivery location.
    #[display("location is too far")]
    Distance,

    /// Price per kilogram exceeds the ceiling.
    #[display("price per kg exceeds ceiling")]
    PricePerKg,

    /// Implied total price exceeds the ceiling.
    #[display("total price exceeds ceiling")]
    TotalPrice,
}

/// Evaluates whether the `subject` of the `listing` satisfies the `request`.
///
/// `default_radius` is used when the `request` delivery constraint doesn't
/// specify one.
#[must_use]
pub fn evaluate(
    request: &BuyRequest,
    listing: &Listing,
    subject: &subject::Snapshot,
    now: DateTime,
    default_radius: Distance,
) -> Evaluation {
    match score(request, listing, subject, now, default_radius) {
        Ok(points) => Evaluation::Match(Score::from_points(points)),
        Err(m) => Evaluation::Mismatch(m),
    }
}

/// Sums up the points of every criterion.
fn score(
    request: &BuyRequest,
    listing: &Listing,
    subject: &subject::Snapshot,
    now: DateTime,
    default_radius: Distance,
) -> Result<f64, Mismatch> {
    if !subject.is_sellable() {
        return Err(Mismatch::NotSellable);
    }

    let mut points = 0.0;

    if let Some(wanted) = &request.breed {
        let breed = subject
            .resolve_breed(listing.breed.as_ref())
            .ok_or(Mismatch::UnknownBreed)?;
        if breed != wanted {
            return Err(Mismatch::Breed);
        }
    }
    points += 20.0;

    let weight = subject
        .resolve_weight(listing.current_weight)
        .ok_or(Mismatch::UnknownWeight)?;
    if !request.weight.contains(weight.weight) {
        return Err(Mismatch::Weight);
    }
    points += match weight.confidence {
        Confidence::Measured => 20.0,
        Confidence::Declared | Confidence::Initial => 15.0,
    };

    match (request.age, subject.age_in_months(now)) {
        (None, _) => points += 20.0,
        (Some(window), Some(age)) => {
            if !window.contains(age) {
                return Err(Mismatch::Age);
            }
            points += 20.0;
        }
        (Some(_), None) => {}
    }

    points += if request.quantity.get() > 1 { 10.0 } else { 15.0 };

    match (request.delivery, listing.location) {
        (None, _) => points += 10.0,
        (Some(delivery), Some(location)) => {
            let radius = delivery.radius.unwrap_or(default_radius).km();
            let distance = delivery.location.distance_to(location).km();
            if distance > radius {
                return Err(Mismatch::Distance);
            }
            points += if radius > 0.0 {
                (20.0 * (1.0 - distance / radius)).max(0.0)
            } else {
                20.0
            };
        }
        (Some(_), None) => {}
    }

    if let Some(ceiling) = request.max_price_per_kg {
        if listing.price_per_kg > ceiling {
            return Err(Mismatch::PricePerKg);
        }
        points += price_points(listing.price_per_kg.ratio_to(ceiling));
    } else if let Some(ceiling) = request.max_total_price {
        let total = listing.price_per_kg * weight.weight;
        if total > ceiling {
            return Err(Mismatch::TotalPrice);
        }
        points += price_points(total.ratio_to(ceiling));
    } else {
        points += 10.0;
    }

    Ok(points)
}

/// Scales price points by how far below the ceiling the price sits.
fn price_points(ratio: Option<f64>) -> f64 {
    ratio.map_or(0.0, |r| (15.0 * (1.0 - r)).max(0.0))
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{Coordinates, DateTime, Distance, Money, Weight};

    use crate::domain::{
        buy_request::{self, AgeCategory, AgeWindow, Delivery, WeightRange},
        farm, listing,
        subject::{self, Breed, Health},
        user, BuyRequest, Listing,
    };

    use super::{evaluate, Evaluation, Mismatch};

    /// One degree of latitude along a meridian, in kilometres.
    const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

    fn kg(v: &str) -> Weight {
        Weight::from_str(v).unwrap()
    }

    fn money(v: &str) -> Money {
        Money::from_str(v).unwrap()
    }

    fn origin() -> Coordinates {
        Coordinates::new(0.0, 0.0).unwrap()
    }

    fn km_north(km: f64) -> Coordinates {
        Coordinates::new(km / KM_PER_DEGREE, 0.0).unwrap()
    }

    fn default_radius() -> Distance {
        Distance::new(50.0).unwrap()
    }

    fn request() -> BuyRequest {
        BuyRequest {
            id: buy_request::Id::new(),
            buyer_id: user::Id::new(),
            breed: Breed::new("Landrace"),
            weight: WeightRange::new(kg("40"), kg("60")).unwrap(),
            age: None,
            quantity: buy_request::Quantity::new(1).unwrap(),
            delivery: Some(Delivery {
                location: origin(),
                radius: Distance::new(30.0),
            }),
            max_price_per_kg: Some(money("1500")),
            max_total_price: None,
            status: buy_request::Status::Published,
            created_at: buy_request::CreationDateTime::now(),
            expires_at: buy_request::ExpirationDateTime::now()
                + Duration::from_secs(3600),
        }
    }

    fn subject() -> subject::Snapshot {
        let mut s =
            subject::Snapshot::unknown(subject::Id::new(), farm::Id::new());
        s.breed = Breed::new("Landrace");
        s.current_weight = Some(kg("50"));
        s
    }

    fn listing(subject: &subject::Snapshot) -> Listing {
        Listing {
            id: listing::Id::new(),
            seller_id: user::Id::new(),
            farm_id: subject.farm_id,
            kind: listing::Kind::Individual {
                subject_id: subject.id,
            },
            breed: None,
            price_per_kg: money("1400"),
            current_weight: None,
            weighed_at: None,
            location: Some(km_north(10.0)),
            status: listing::Status::Available,
            inquiries: 0,
            created_at: listing::CreationDateTime::now(),
        }
    }

    fn score_of(e: Evaluation) -> u8 {
        match e {
            Evaluation::Match(s) => s.get(),
            Evaluation::Mismatch(m) => panic!("expected match, got: {m}"),
        }
    }

    #[test]
    fn scores_reference_pair() {
        let s = subject();
        let l = listing(&s);

        // 20 + 20 + 20 + 15 + 20 × (1 - 10/30) + 15 × (1 - 1400/1500)
        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());

        assert_eq!(score_of(e), 89);
    }

    #[test]
    fn rejects_price_above_ceiling() {
        let s = subject();
        let mut l = listing(&s);
        l.price_per_kg = money("1600");

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());

        assert_eq!(e, Evaluation::Mismatch(Mismatch::PricePerKg));
    }

    #[test]
    fn weight_is_a_hard_filter() {
        let mut s = subject();
        let l = listing(&s);

        for w in ["39.9", "60.1", "500"] {
            s.current_weight = Some(kg(w));
            let e = evaluate(
                &request(),
                &l,
                &s,
                DateTime::now(),
                default_radius(),
            );
            assert_eq!(e, Evaluation::Mismatch(Mismatch::Weight), "weight {w}");
        }
    }

    #[test]
    fn falls_back_to_declared_weight_with_lower_confidence() {
        let mut s = subject();
        s.current_weight = None;
        let mut l = listing(&s);
        l.current_weight = Some(kg("50"));

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());

        assert_eq!(score_of(e), 84);
    }

    #[test]
    fn unknown_weight_never_matches() {
        let mut s = subject();
        s.current_weight = None;
        let l = listing(&s);

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());

        assert_eq!(e, Evaluation::Mismatch(Mismatch::UnknownWeight));
    }

    #[test]
    fn breed_mismatch_and_fallback() {
        let mut s = subject();
        s.breed = Breed::new("Duroc");
        let mut l = listing(&s);

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());
        assert_eq!(e, Evaluation::Mismatch(Mismatch::Breed));

        s.breed = None;
        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());
        assert_eq!(e, Evaluation::Mismatch(Mismatch::UnknownBreed));

        l.breed = Breed::new("landrace");
        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 89);

        let mut any = request();
        any.breed = None;
        s.breed = Breed::new("Duroc");
        let e = evaluate(&any, &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 89);
    }

    #[test]
    fn age_window() {
        let now = DateTime::from_rfc3339("2024-07-01T00:00:00Z").unwrap();
        let mut s = subject();
        let l = listing(&s);
        let mut r = request();
        r.age = Some(AgeWindow::Category(AgeCategory::Finishing));

        // Unknown birth date skips the criterion.
        let e = evaluate(&r, &l, &s, now, default_radius());
        assert_eq!(score_of(e), 69);

        s.born_at = Some(
            subject::BirthDateTime::from_rfc3339("2024-02-01T00:00:00Z")
                .unwrap(),
        );
        let e = evaluate(&r, &l, &s, now, default_radius());
        assert_eq!(score_of(e), 89);

        s.born_at = Some(
            subject::BirthDateTime::from_rfc3339("2023-01-01T00:00:00Z")
                .unwrap(),
        );
        let e = evaluate(&r, &l, &s, now, default_radius());
        assert_eq!(e, Evaluation::Mismatch(Mismatch::Age));
    }

    #[test]
    fn location_radius() {
        let s = subject();
        let mut l = listing(&s);
        l.location = Some(km_north(31.0));

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());
        assert_eq!(e, Evaluation::Mismatch(Mismatch::Distance));

        // Default radius applies when the request doesn't specify one.
        let mut r = request();
        r.delivery = Some(Delivery {
            location: origin(),
            radius: None,
        });
        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 84);

        // Missing pick-up location skips the criterion.
        l.location = None;
        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 76);

        // No delivery constraint gives flat points.
        r.delivery = None;
        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 86);
    }

    #[test]
    fn total_price_ceiling() {
        let s = subject();
        let l = listing(&s);
        let mut r = request();
        r.max_price_per_kg = None;
        r.max_total_price = Some(money("80000"));

        // 1400 × 50 = 70000
        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 90);

        r.max_total_price = Some(money("69999"));
        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());
        assert_eq!(e, Evaluation::Mismatch(Mismatch::TotalPrice));

        r.max_total_price = None;
        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());
        assert_eq!(score_of(e), 98);
    }

    #[test]
    fn quantity_points() {
        let s = subject();
        let l = listing(&s);
        let mut r = request();
        r.quantity = buy_request::Quantity::new(5).unwrap();

        let e = evaluate(&r, &l, &s, DateTime::now(), default_radius());

        assert_eq!(score_of(e), 84);
    }

    #[test]
    fn unhealthy_subject_never_matches() {
        let mut s = subject();
        let l = listing(&s);
        s.health = Some(Health::Quarantined);

        let e = evaluate(&request(), &l, &s, DateTime::now(), default_radius());

        assert_eq!(e, Evaluation::Mismatch(Mismatch::NotSellable));
    }
}
