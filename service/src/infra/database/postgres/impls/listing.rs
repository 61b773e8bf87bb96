//! [`Listing`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Coordinates,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{listing, subject, user, Listing},
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

/// Columns of the `listings` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, seller_id, farm_id, batch_id, subject_ids, breed, price_per_kg, \
    current_weight, weighed_at, latitude, longitude, status, inquiries, \
    created_at";

/// Reconstructs a [`Listing`] from the provided `listings` [`Row`].
fn from_row(row: &Row) -> Result<Listing, Traced<database::Error>> {
    let subject_ids: Vec<subject::Id> = row.get("subject_ids");
    let kind = match row.get::<_, Option<listing::BatchId>>("batch_id") {
        Some(batch_id) => listing::Kind::Batch {
            batch_id,
            subject_ids,
        },
        None => listing::Kind::Individual {
            subject_id: *subject_ids
                .first()
                .ok_or_else(|| malformed("subject_ids"))?,
        },
    };
    let location = match (
        row.get::<_, Option<f64>>("latitude"),
        row.get::<_, Option<f64>>("longitude"),
    ) {
        (Some(lat), Some(lon)) => Some(
            Coordinates::new(lat, lon).ok_or_else(|| malformed("latitude"))?,
        ),
        _ => None,
    };

    Ok(Listing {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        farm_id: row.get("farm_id"),
        kind,
        breed: row
            .get::<_, Option<String>>("breed")
            .map(|b| subject::Breed::new(b).ok_or_else(|| malformed("breed")))
            .transpose()?,
        price_per_kg: row.get("price_per_kg"),
        current_weight: row.get("current_weight"),
        weighed_at: row.get("weighed_at"),
        location,
        status: row.get("status"),
        inquiries: u32::try_from(row.get::<_, i32>("inquiries"))
            .map_err(|_| malformed("inquiries"))?,
        created_at: row.get("created_at"),
    })
}

impl<C> Database<Insert<Listing>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Listing>, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(listing))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let inquiries = i32::try_from(listing.inquiries).unwrap_or(i32::MAX);

        const SQL: &str = "\
            INSERT INTO listings (id, seller_id, farm_id, \
                                  batch_id, subject_ids, breed, \
                                  price_per_kg, current_weight, weighed_at, \
                                  latitude, longitude, \
                                  status, inquiries, created_at) \
            VALUES ($1::UUID, $2::UUID, $3::UUID, \
                    $4::UUID, $5::UUID[], $6::TEXT, \
                    $7::NUMERIC, $8::NUMERIC, $9::TIMESTAMPTZ, \
                    $10::FLOAT8, $11::FLOAT8, \
                    $12::INT2, $13::INT4, $14::TIMESTAMPTZ) \
            ON CONFLICT (id) DO UPDATE \
            SET breed = EXCLUDED.breed, \
                price_per_kg = EXCLUDED.price_per_kg, \
                current_weight = EXCLUDED.current_weight, \
                weighed_at = EXCLUDED.weighed_at, \
                latitude = EXCLUDED.latitude, \
                longitude = EXCLUDED.longitude, \
                status = EXCLUDED.status, \
                inquiries = EXCLUDED.inquiries";
        self.exec(
            SQL,
            &[
                &listing.id,
                &listing.seller_id,
                &listing.farm_id,
                &listing.kind.batch_id(),
                &listing.subject_ids(),
                &listing.breed,
                &listing.price_per_kg,
                &listing.current_weight,
                &listing.weighed_at,
                &listing.location.map(Coordinates::latitude),
                &listing.location.map(Coordinates::longitude),
                &listing.status,
                &inquiries,
                &listing.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Listing>, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM listings WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Listing>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let seller_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM listings \
             WHERE seller_id = $1::UUID \
             ORDER BY created_at",
        );
        self.query(sql.as_str(), &[&seller_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Select<By<Vec<Listing>, read::listing::Available>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Listing>, read::listing::Available>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "SELECT {COLUMNS} FROM listings \
             WHERE status = $1::INT2 \
             ORDER BY created_at",
        );
        self.query(sql.as_str(), &[&listing::Status::Available])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Select<By<Vec<Listing>, read::listing::Holding>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, read::listing::Holding>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::Holding(subject_ids) = by.into_inner();
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM listings \
             WHERE status IN ($2::INT2, $3::INT2) \
               AND subject_ids && $1::UUID[] \
             ORDER BY created_at",
        );
        self.query(
            sql.as_str(),
            &[
                &subject_ids,
                &listing::Status::Available,
                &listing::Status::Reserved,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?
        .iter()
        .map(from_row)
        .collect()
    }
}
