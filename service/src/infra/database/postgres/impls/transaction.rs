//! [`Transaction`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{transaction, Transaction},
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
    read,
};

use super::offer::{reference_columns, reference_from_row};

/// Columns of the `transactions` table.
const COLUMNS: &str = "\
    id, offer_id, listing_id, buy_request_id, \
    subject_ids, buyer_id, seller_id, final_price, status, \
    buyer_confirmed, seller_confirmed, created_at, completed_at";

/// Reconstructs a [`Transaction`] from the provided `transactions` [`Row`].
fn from_row(row: &Row) -> Result<Transaction, Traced<database::Error>> {
    Ok(Transaction {
        id: row.get("id"),
        offer_id: row.get("offer_id"),
        reference: reference_from_row(row)?,
        subject_ids: row.get("subject_ids"),
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        final_price: row.get("final_price"),
        status: row.get("status"),
        confirmation: transaction::Confirmation {
            buyer: row.get("buyer_confirmed"),
            seller: row.get("seller_confirmed"),
        },
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    })
}

impl<C> Database<Insert<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(t): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let (listing_id, buy_request_id) = reference_columns(t.reference);

        const SQL: &str = "\
            INSERT INTO transactions (id, offer_id, \
                                      listing_id, buy_request_id, \
                                      subject_ids, buyer_id, seller_id, \
                                      final_price, status, \
                                      buyer_confirmed, seller_confirmed, \
                                      created_at, completed_at) \
            VALUES ($1::UUID, $2::UUID, \
                    $3::UUID, $4::UUID, \
                    $5::UUID[], $6::UUID, $7::UUID, \
                    $8::NUMERIC, $9::INT2, \
                    $10::BOOLEAN, $11::BOOLEAN, \
                    $12::TIMESTAMPTZ, $13::TIMESTAMPTZ)";
        self.exec(
            SQL,
            &[
                &t.id,
                &t.offer_id,
                &listing_id,
                &buy_request_id,
                &t.subject_ids,
                &t.buyer_id,
                &t.seller_id,
                &t.final_price,
                &t.status,
                &t.confirmation.buyer,
                &t.confirmation.seller,
                &t.created_at,
                &t.completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(t): Update<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE transactions \
            SET status = $2::INT2, \
                buyer_confirmed = $3::BOOLEAN, \
                seller_confirmed = $4::BOOLEAN, \
                completed_at = $5::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &t.id,
                &t.status,
                &t.confirmation.buyer,
                &t.confirmation.seller,
                &t.completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Transaction>, transaction::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql =
            format!("SELECT {COLUMNS} FROM transactions WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Transaction>, read::transaction::Holding>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, read::transaction::Holding>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::Holding(subject_ids) = by.into_inner();
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE status <> $2::INT2 \
               AND subject_ids && $1::UUID[] \
             ORDER BY created_at",
        );
        self.query(
            sql.as_str(),
            &[&subject_ids, &transaction::Status::Cancelled],
        )
        .await
        .map_err(tracerr::wrap!())?
        .iter()
        .map(from_row)
        .collect()
    }
}
