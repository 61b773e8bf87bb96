//! [`Command`] for creating a new [`BuyRequest`].

#[cfg(doc)]
use common::DateTime;
use common::{operations::Insert, Money, Weight};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        buy_request::{self, AgeWindow, Delivery, Quantity, WeightRange},
        subject, user, BuyRequest,
    },
    error::{Classify, Kind},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`BuyRequest`].
#[derive(Clone, Debug)]
pub struct CreateBuyRequest {
    /// ID of the user willing to buy.
    pub buyer_id: user::Id,

    /// Wanted [`subject::Breed`], if any.
    pub breed: Option<subject::Breed>,

    /// Minimal acceptable [`Weight`] per head.
    pub min_weight: Weight,

    /// Maximal acceptable [`Weight`] per head.
    pub max_weight: Weight,

    /// Acceptable [`AgeWindow`], if any.
    pub age: Option<AgeWindow>,

    /// Number of wanted animals.
    pub quantity: u32,

    /// [`Delivery`] constraint, if any.
    pub delivery: Option<Delivery>,

    /// Maximum price per kilogram of live weight, if any.
    pub max_price_per_kg: Option<Money>,

    /// Maximum price of a whole animal, if any.
    pub max_total_price: Option<Money>,

    /// [`DateTime`] when the [`BuyRequest`] should expire, if not the default
    /// one.
    pub expires_at: Option<buy_request::ExpirationDateTime>,
}

impl<Db, Ntf> Command<CreateBuyRequest> for Service<Db, Ntf>
where
    Db: Database<Insert<BuyRequest>, Err = Traced<database::Error>>,
{
    type Ok = BuyRequest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateBuyRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBuyRequest {
            buyer_id,
            breed,
            min_weight,
            max_weight,
            age,
            quantity,
            delivery,
            max_price_per_kg,
            max_total_price,
            expires_at,
        } = cmd;

        let weight = WeightRange::new(min_weight, max_weight)
            .ok_or(E::InvalidWeightRange {
                min: min_weight,
                max: max_weight,
            })
            .map_err(tracerr::wrap!())?;
        let quantity = Quantity::new(quantity)
            .ok_or(E::ZeroQuantity)
            .map_err(tracerr::wrap!())?;
        if let Some(price) = [max_price_per_kg, max_total_price]
            .into_iter()
            .flatten()
            .find(|p| !p.is_positive())
        {
            return Err(tracerr::new!(E::NonPositivePrice(price)));
        }
        if age.is_some_and(|a| !a.is_valid()) {
            return Err(tracerr::new!(E::InvalidAgeWindow));
        }
        if delivery
            .and_then(|d| d.radius)
            .is_some_and(|r| r.km() <= 0.0)
        {
            return Err(tracerr::new!(E::ZeroDeliveryRadius));
        }

        let created_at = buy_request::CreationDateTime::now();
        let expires_at = expires_at.unwrap_or_else(|| {
            (created_at + self.config().marketplace.buy_request_ttl).coerce()
        });
        if expires_at <= created_at.coerce() {
            return Err(tracerr::new!(E::ExpirationInPast));
        }

        let request = BuyRequest {
            id: buy_request::Id::new(),
            buyer_id,
            breed,
            weight,
            age,
            quantity,
            delivery,
            max_price_per_kg,
            max_total_price,
            status: buy_request::Status::Published,
            created_at,
            expires_at,
        };

        self.database()
            .execute(Insert(request.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(request)
    }
}

/// Error of [`CreateBuyRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`BuyRequest`] would expire at once.
    #[display("`BuyRequest` expiration is not in the future")]
    ExpirationInPast,

    /// [`AgeWindow`] bounds are inverted.
    #[display("`AgeWindow` minimal age exceeds the maximal one")]
    InvalidAgeWindow,

    /// Minimal [`Weight`] exceeds the maximal one.
    #[display("Minimal weight {min} exceeds maximal weight {max}")]
    InvalidWeightRange {
        /// Requested minimal [`Weight`].
        min: Weight,

        /// Requested maximal [`Weight`].
        max: Weight,
    },

    /// Price ceiling is not positive.
    #[display("Price ceiling `{_0}` is not positive")]
    NonPositivePrice(#[error(not(source))] Money),

    /// [`Delivery`] radius is zero.
    #[display("`Delivery` radius is zero")]
    ZeroDeliveryRadius,

    /// No animals are requested.
    #[display("Requested quantity is zero")]
    ZeroQuantity,
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::ExpirationInPast
            | Self::InvalidAgeWindow
            | Self::InvalidWeightRange { .. }
            | Self::NonPositivePrice(_)
            | Self::ZeroDeliveryRadius
            | Self::ZeroQuantity => Kind::Validation,
        }
    }
}
