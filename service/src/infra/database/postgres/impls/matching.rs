//! [`Match`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{buy_request, matching, Match},
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

/// Reconstructs a [`Match`] from the provided `matches` [`Row`].
fn from_row(row: &Row) -> Result<Match, Traced<database::Error>> {
    let score = u8::try_from(row.get::<_, i16>("score"))
        .ok()
        .and_then(matching::Score::new)
        .ok_or_else(|| malformed("score"))?;
    Ok(Match {
        id: row.get("id"),
        buy_request_id: row.get("buy_request_id"),
        listing_id: row.get("listing_id"),
        seller_id: row.get("seller_id"),
        score,
        notified: row.get("notified"),
        created_at: row.get("created_at"),
    })
}

impl<C> Database<Insert<Match>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Match>, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(m): Insert<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(m))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Match>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(m): Update<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO matches (id, buy_request_id, listing_id, seller_id, \
                                 score, notified, created_at) \
            VALUES ($1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                    $5::INT2, $6::BOOLEAN, $7::TIMESTAMPTZ) \
            ON CONFLICT (id) DO UPDATE \
            SET score = EXCLUDED.score, \
                notified = EXCLUDED.notified";
        self.exec(
            SQL,
            &[
                &m.id,
                &m.buy_request_id,
                &m.listing_id,
                &m.seller_id,
                &i16::from(u8::from(m.score)),
                &m.notified,
                &m.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Match>, matching::Key>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Match>, matching::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = by.into_inner();

        const SQL: &str = "\
            SELECT id, buy_request_id, listing_id, seller_id, \
                   score, notified, created_at \
            FROM matches \
            WHERE buy_request_id = $1::UUID \
              AND listing_id = $2::UUID";
        self.query_opt(SQL, &[&key.buy_request_id, &key.listing_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Match>, buy_request::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Match>, buy_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, buy_request_id, listing_id, seller_id, \
                   score, notified, created_at \
            FROM matches \
            WHERE buy_request_id = $1::UUID \
            ORDER BY score DESC, created_at";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Delete<By<Match, read::matching::Stale>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Delete<By<Match, read::matching::Stale>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            DELETE FROM matches AS m \
            WHERE NOT EXISTS (SELECT 1 \
                              FROM buy_requests AS r \
                              WHERE r.id = m.buy_request_id \
                                AND r.status = $1::INT2)";
        self.exec(SQL, &[&buy_request::Status::Published])
            .await
            .map_err(tracerr::wrap!())
    }
}
