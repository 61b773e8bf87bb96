//! Helpers shared by the [`Service`] tests.

#![allow(dead_code, reason = "not every test uses every helper")]

use std::time::Duration;

use common::{
    operations::Insert, DateTime, Handler as _, Money, Weight,
};
use rust_decimal::Decimal;
use service::{
    command::{CreateBuyRequest, CreateListing, CreateOffer},
    domain::{
        farm, listing, offer, subject, user, BuyRequest, Farm, Listing, Offer,
    },
    infra::{notifier, Memory},
    Config, Service,
};

/// [`Service`] under test.
pub type Svc = Service<Memory, notifier::Memory>;

/// Creates a new [`Svc`] with the default [`Config`], returning it along
/// with its [`notifier::Memory`].
pub fn service() -> (Svc, notifier::Memory) {
    service_with(Config::default())
}

/// Creates a new [`Svc`] with the provided [`Config`], returning it along
/// with its [`notifier::Memory`].
pub fn service_with(config: Config) -> (Svc, notifier::Memory) {
    let notifier = notifier::Memory::new();
    let svc = Service::without_tasks(config, Memory::new(), notifier.clone());
    (svc, notifier)
}

/// Creates a [`Config`] with the provided [`Offer`] time-to-live.
pub fn config_with_offer_ttl(ttl: Duration) -> Config {
    let mut config = Config::default();
    config.marketplace.offer_ttl = ttl;
    config
}

/// Returns the provided amount of kilograms as [`Weight`].
pub fn kg(amount: i64) -> Weight {
    Weight::new(Decimal::from(amount)).expect("non-negative weight")
}

/// Returns the provided amount as [`Money`].
pub fn money(amount: i64) -> Money {
    Money::new(Decimal::from(amount))
}

/// Stores a new [`Farm`] owned by the provided user.
pub async fn farm(svc: &Svc, owner_id: user::Id) -> farm::Id {
    let farm = Farm {
        id: farm::Id::new(),
        owner_id,
    };
    svc.database()
        .execute(Insert(farm))
        .await
        .expect("failed to store `Farm`");
    farm.id
}

/// Stores a new healthy subject of the provided [`Weight`] on the farm.
pub async fn subject(
    svc: &Svc,
    farm_id: farm::Id,
    weight: Weight,
) -> subject::Id {
    let mut snapshot = subject::Snapshot::unknown(subject::Id::new(), farm_id);
    snapshot.current_weight = Some(weight);
    snapshot.weighed_at = Some(DateTime::now().coerce());
    let id = snapshot.id;
    svc.database()
        .execute(Insert(snapshot))
        .await
        .expect("failed to store subject");
    id
}

/// Lists the provided subject as an individual [`Listing`].
pub async fn list(
    svc: &Svc,
    seller_id: user::Id,
    farm_id: farm::Id,
    subject_id: subject::Id,
) -> Listing {
    svc.execute(CreateListing {
        seller_id,
        farm_id,
        kind: listing::Kind::Individual { subject_id },
        breed: None,
        price_per_kg: money(5),
        current_weight: None,
        weighed_at: None,
        location: None,
    })
    .await
    .expect("failed to create `Listing`")
}

/// Lists the provided subjects as a batch [`Listing`].
pub async fn list_batch(
    svc: &Svc,
    seller_id: user::Id,
    farm_id: farm::Id,
    subject_ids: Vec<subject::Id>,
) -> Listing {
    svc.execute(CreateListing {
        seller_id,
        farm_id,
        kind: listing::Kind::Batch {
            batch_id: listing::BatchId::new(),
            subject_ids,
        },
        breed: None,
        price_per_kg: money(5),
        current_weight: None,
        weighed_at: None,
        location: None,
    })
    .await
    .expect("failed to create batch `Listing`")
}

/// Publishes a new [`BuyRequest`] wanting a single animal of the provided
/// weight range.
pub async fn request(
    svc: &Svc,
    buyer_id: user::Id,
    min: Weight,
    max: Weight,
) -> BuyRequest {
    svc.execute(CreateBuyRequest {
        buyer_id,
        breed: None,
        min_weight: min,
        max_weight: max,
        age: None,
        quantity: 1,
        delivery: None,
        max_price_per_kg: None,
        max_total_price: None,
        expires_at: None,
    })
    .await
    .expect("failed to create `BuyRequest`")
}

/// Makes an [`Offer`] of the provided price for the subjects of the
/// [`Listing`].
pub async fn offer_on(
    svc: &Svc,
    listing: &Listing,
    buyer_id: user::Id,
    price: i64,
) -> Offer {
    svc.execute(CreateOffer {
        reference: offer::Reference::Listing(listing.id),
        offerer_id: buyer_id,
        subject_ids: listing.subject_ids().to_vec(),
        price: money(price),
        price_per_kg: None,
        message: None,
    })
    .await
    .expect("failed to create `Offer`")
}

/// Makes an [`Offer`] of the provided price for the subjects on behalf of
/// their seller, answering the [`BuyRequest`].
pub async fn offer_to(
    svc: &Svc,
    request: &BuyRequest,
    seller_id: user::Id,
    subject_ids: Vec<subject::Id>,
    price: i64,
) -> Offer {
    svc.execute(CreateOffer {
        reference: offer::Reference::BuyRequest(request.id),
        offerer_id: seller_id,
        subject_ids,
        price: money(price),
        price_per_kg: None,
        message: None,
    })
    .await
    .expect("failed to create `Offer` on `BuyRequest`")
}
