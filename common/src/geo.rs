//! Geographic primitives.

use std::fmt;

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Mean radius of the Earth, in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Point on the Earth surface.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct Coordinates {
    /// Latitude in degrees, within `[-90; 90]`.
    latitude: f64,

    /// Longitude in degrees, within `[-180; 180]`.
    longitude: f64,
}

impl Coordinates {
    /// Creates new [`Coordinates`] if the provided degrees are in range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude))
        .then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Returns the latitude of these [`Coordinates`].
    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    /// Returns the longitude of these [`Coordinates`].
    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    /// Computes the great-circle [`Distance`] to the `other` point using the
    /// haversine formula.
    #[must_use]
    pub fn distance_to(self, other: Self) -> Distance {
        let (lat1, lat2) =
            (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        Distance(EARTH_RADIUS_KM * c)
    }
}

/// Distance between two [`Coordinates`], in kilometres.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "postgres",
    derive(FromSql, ToSql),
    postgres(transparent)
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct Distance(f64);

impl Distance {
    /// Creates a new [`Distance`] out of the provided kilometres.
    ///
    /// [`None`] is returned if the value is negative or not finite.
    #[must_use]
    pub fn new(km: f64) -> Option<Self> {
        (km.is_finite() && km >= 0.0).then_some(Self(km))
    }

    /// Creates a new [`Distance`] out of the provided whole kilometres.
    #[must_use]
    pub fn from_km(km: u32) -> Self {
        Self(f64::from(km))
    }

    /// Returns this [`Distance`] in kilometres.
    #[must_use]
    pub const fn km(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}km", self.0)
    }
}

#[cfg(test)]
mod spec {
    use super::{Coordinates, Distance};

    fn point(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Coordinates::new(90.1, 0.0).is_none());
        assert!(Coordinates::new(-90.1, 0.0).is_none());
        assert!(Coordinates::new(0.0, 180.5).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
        assert!(Coordinates::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn zero_to_itself() {
        let p = point(48.8566, 2.3522);

        assert!(p.distance_to(p).km().abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = point(0.0, 0.0).distance_to(point(1.0, 0.0));

        assert!((d.km() - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn symmetric() {
        let (a, b) = (point(48.8566, 2.3522), point(51.5074, -0.1278));

        assert!((a.distance_to(b).km() - b.distance_to(a).km()).abs() < 1e-9);
        assert!((a.distance_to(b).km() - 343.5).abs() < 1.0);
    }

    #[test]
    fn distance_validates() {
        assert!(Distance::new(-1.0).is_none());
        assert!(Distance::new(f64::INFINITY).is_none());
        assert_eq!(Distance::new(50.0).map(Distance::km), Some(50.0));
    }
}
