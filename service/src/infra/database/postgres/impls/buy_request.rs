//! [`BuyRequest`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Coordinates,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{buy_request, subject, BuyRequest},
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
    read,
};

use super::malformed;

/// Columns of the `buy_requests` table.
const COLUMNS: &str = "\
    id, buyer_id, breed, min_weight, max_weight, \
    age_category, min_age_months, max_age_months, quantity, \
    delivery_lat, delivery_lon, delivery_radius, \
    max_price_per_kg, max_total_price, status, created_at, expires_at";

/// Reconstructs a [`BuyRequest`] from the provided `buy_requests` [`Row`].
fn from_row(row: &Row) -> Result<BuyRequest, Traced<database::Error>> {
    let months = |column: &'static str| {
        row.get::<_, Option<i32>>(column)
            .map(|m| u16::try_from(m).map_err(|_| malformed(column)))
            .transpose()
    };
    let age = match row.get("age_category") {
        Some(category) => Some(buy_request::AgeWindow::Category(category)),
        None => {
            let min = months("min_age_months")?;
            let max = months("max_age_months")?;
            (min.is_some() || max.is_some())
                .then_some(buy_request::AgeWindow::Months { min, max })
        }
    };

    let delivery = match (
        row.get::<_, Option<f64>>("delivery_lat"),
        row.get::<_, Option<f64>>("delivery_lon"),
    ) {
        (Some(lat), Some(lon)) => Some(buy_request::Delivery {
            location: Coordinates::new(lat, lon)
                .ok_or_else(|| malformed("delivery_lat"))?,
            radius: row.get("delivery_radius"),
        }),
        _ => None,
    };

    Ok(BuyRequest {
        id: row.get("id"),
        buyer_id: row.get("buyer_id"),
        breed: row
            .get::<_, Option<String>>("breed")
            .map(|b| subject::Breed::new(b).ok_or_else(|| malformed("breed")))
            .transpose()?,
        weight: buy_request::WeightRange::new(
            row.get("min_weight"),
            row.get("max_weight"),
        )
        .ok_or_else(|| malformed("min_weight"))?,
        age,
        quantity: u32::try_from(row.get::<_, i32>("quantity"))
            .ok()
            .and_then(buy_request::Quantity::new)
            .ok_or_else(|| malformed("quantity"))?,
        delivery,
        max_price_per_kg: row.get("max_price_per_kg"),
        max_total_price: row.get("max_total_price"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

impl<C> Database<Insert<BuyRequest>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<BuyRequest>, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(request): Insert<BuyRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(request))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<BuyRequest>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(request): Update<BuyRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        let (category, min_age, max_age) = match request.age {
            Some(buy_request::AgeWindow::Category(c)) => (Some(c), None, None),
            Some(buy_request::AgeWindow::Months { min, max }) => {
                (None, min.map(i32::from), max.map(i32::from))
            }
            None => (None, None, None),
        };
        let quantity =
            i32::try_from(request.quantity.get()).unwrap_or(i32::MAX);
        let location = request.delivery.map(|d| d.location);

        const SQL: &str = "\
            INSERT INTO buy_requests (id, buyer_id, breed, \
                                      min_weight, max_weight, \
                                      age_category, \
                                      min_age_months, max_age_months, \
                                      quantity, \
                                      delivery_lat, delivery_lon, \
                                      delivery_radius, \
                                      max_price_per_kg, max_total_price, \
                                      status, created_at, expires_at) \
            VALUES ($1::UUID, $2::UUID, $3::TEXT, \
                    $4::NUMERIC, $5::NUMERIC, \
                    $6::INT2, \
                    $7::INT4, $8::INT4, \
                    $9::INT4, \
                    $10::FLOAT8, $11::FLOAT8, \
                    $12::FLOAT8, \
                    $13::NUMERIC, $14::NUMERIC, \
                    $15::INT2, $16::TIMESTAMPTZ, $17::TIMESTAMPTZ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                expires_at = EXCLUDED.expires_at";
        self.exec(
            SQL,
            &[
                &request.id,
                &request.buyer_id,
                &request.breed,
                &request.weight.min(),
                &request.weight.max(),
                &category,
                &min_age,
                &max_age,
                &quantity,
                &location.map(Coordinates::latitude),
                &location.map(Coordinates::longitude),
                &request.delivery.and_then(|d| d.radius),
                &request.max_price_per_kg,
                &request.max_total_price,
                &request.status,
                &request.created_at,
                &request.expires_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<BuyRequest>, buy_request::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<BuyRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BuyRequest>, buy_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql =
            format!("SELECT {COLUMNS} FROM buy_requests WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<BuyRequest>, read::buy_request::Due>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<BuyRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<BuyRequest>, read::buy_request::Due>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::buy_request::Due(at) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM buy_requests \
             WHERE status = $1::INT2 \
               AND expires_at <= $2::TIMESTAMPTZ \
             ORDER BY expires_at",
        );
        self.query(sql.as_str(), &[&buy_request::Status::Published, &at])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}
