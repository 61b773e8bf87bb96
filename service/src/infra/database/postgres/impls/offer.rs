//! [`Offer`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{buy_request, listing, offer, subject, Offer},
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

/// Columns of the `offers` table.
const COLUMNS: &str = "\
    id, listing_id, buy_request_id, buyer_id, seller_id, offered_by, \
    subject_ids, price, price_per_kg, message, status, \
    created_at, responded_at, expires_at, countered_offer_id";

/// Splits the provided [`offer::Reference`] into its `listing_id` and
/// `buy_request_id` columns.
pub(super) const fn reference_columns(
    reference: offer::Reference,
) -> (Option<listing::Id>, Option<buy_request::Id>) {
    match reference {
        offer::Reference::Listing(id) => (Some(id), None),
        offer::Reference::BuyRequest(id) => (None, Some(id)),
    }
}

/// Reads an [`offer::Reference`] from its `listing_id` and `buy_request_id`
/// columns of the provided [`Row`].
pub(super) fn reference_from_row(
    row: &Row,
) -> Result<offer::Reference, Traced<database::Error>> {
    match (row.get("listing_id"), row.get("buy_request_id")) {
        (Some(id), None) => Ok(offer::Reference::Listing(id)),
        (None, Some(id)) => Ok(offer::Reference::BuyRequest(id)),
        _ => Err(malformed("listing_id")),
    }
}

/// Reconstructs an [`Offer`] from the provided `offers` [`Row`].
fn from_row(row: &Row) -> Result<Offer, Traced<database::Error>> {
    Ok(Offer {
        id: row.get("id"),
        reference: reference_from_row(row)?,
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        offered_by: row.get("offered_by"),
        subjects: offer::Subjects::new(
            row.get::<_, Vec<subject::Id>>("subject_ids"),
        )
        .ok_or_else(|| malformed("subject_ids"))?,
        price: row.get("price"),
        price_per_kg: row.get("price_per_kg"),
        message: row.get("message"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        responded_at: row.get("responded_at"),
        expires_at: row.get("expires_at"),
        countered_offer_id: row.get("countered_offer_id"),
    })
}

impl<C> Database<Insert<Offer>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Offer>, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(offer))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Offer>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(offer): Update<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        let (listing_id, buy_request_id) = reference_columns(offer.reference);

        const SQL: &str = "\
            INSERT INTO offers (id, listing_id, buy_request_id, \
                                buyer_id, seller_id, offered_by, \
                                subject_ids, price, price_per_kg, message, \
                                status, created_at, responded_at, \
                                expires_at, countered_offer_id) \
            VALUES ($1::UUID, $2::UUID, $3::UUID, \
                    $4::UUID, $5::UUID, $6::INT2, \
                    $7::UUID[], $8::NUMERIC, $9::NUMERIC, $10::TEXT, \
                    $11::INT2, $12::TIMESTAMPTZ, $13::TIMESTAMPTZ, \
                    $14::TIMESTAMPTZ, $15::UUID) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                responded_at = EXCLUDED.responded_at";
        self.exec(
            SQL,
            &[
                &offer.id,
                &listing_id,
                &buy_request_id,
                &offer.buyer_id,
                &offer.seller_id,
                &offer.offered_by,
                &offer.subjects.to_vec(),
                &offer.price,
                &offer.price_per_kg,
                &offer.message,
                &offer.status,
                &offer.created_at,
                &offer.responded_at,
                &offer.expires_at,
                &offer.countered_offer_id,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Offer>, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM offers WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Offer>, read::offer::Pending>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, read::offer::Pending>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::Pending(reference) = by.into_inner();
        let (listing_id, buy_request_id) = reference_columns(reference);

        let sql = format!(
            "SELECT {COLUMNS} FROM offers \
             WHERE status = $1::INT2 \
               AND listing_id IS NOT DISTINCT FROM $2::UUID \
               AND buy_request_id IS NOT DISTINCT FROM $3::UUID \
             ORDER BY created_at",
        );
        self.query(
            sql.as_str(),
            &[&offer::Status::Pending, &listing_id, &buy_request_id],
        )
        .await
        .map_err(tracerr::wrap!())?
        .iter()
        .map(from_row)
        .collect()
    }
}

impl<C> Database<Select<By<Vec<Offer>, read::offer::Due>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, read::offer::Due>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::Due(at) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM offers \
             WHERE status = $1::INT2 \
               AND expires_at <= $2::TIMESTAMPTZ \
             ORDER BY created_at",
        );
        self.query(sql.as_str(), &[&offer::Status::Pending, &at])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}
