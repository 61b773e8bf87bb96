//! [`Farm`] and subject related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{farm, subject, Farm},
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

use super::malformed;

impl<C> Database<Insert<Farm>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(farm): Insert<Farm>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO farms (id, owner_id) \
            VALUES ($1::UUID, $2::UUID) \
            ON CONFLICT (id) DO UPDATE \
            SET owner_id = EXCLUDED.owner_id";
        self.exec(SQL, &[&farm.id, &farm.owner_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = HashMap<farm::Id, Farm>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, owner_id \
            FROM farms \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Farm {
                        id,
                        owner_id: row.get("owner_id"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Insert<subject::Snapshot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(s): Insert<subject::Snapshot>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO subjects (id, farm_id, breed, \
                                  current_weight, initial_weight, weighed_at, \
                                  born_at, health, sold_at) \
            VALUES ($1::UUID, $2::UUID, $3::TEXT, \
                    $4::NUMERIC, $5::NUMERIC, $6::TIMESTAMPTZ, \
                    $7::TIMESTAMPTZ, $8::INT2, $9::TIMESTAMPTZ) \
            ON CONFLICT (id) DO UPDATE \
            SET farm_id = EXCLUDED.farm_id, \
                breed = EXCLUDED.breed, \
                current_weight = EXCLUDED.current_weight, \
                initial_weight = EXCLUDED.initial_weight, \
                weighed_at = EXCLUDED.weighed_at, \
                born_at = EXCLUDED.born_at, \
                health = EXCLUDED.health, \
                sold_at = EXCLUDED.sold_at";
        self.exec(
            SQL,
            &[
                &s.id,
                &s.farm_id,
                &s.breed,
                &s.current_weight,
                &s.initial_weight,
                &s.weighed_at,
                &s.born_at,
                &s.health,
                &s.sold_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C>
    Database<
        Select<By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = HashMap<subject::Id, subject::Snapshot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, farm_id, breed, \
                   current_weight, initial_weight, weighed_at, \
                   born_at, health, sold_at \
            FROM subjects \
            WHERE id = ANY($1::UUID[])";
        self.query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                let breed = row
                    .get::<_, Option<String>>("breed")
                    .map(|b| {
                        subject::Breed::new(b)
                            .ok_or_else(|| malformed("breed"))
                    })
                    .transpose()?;
                Ok((
                    id,
                    subject::Snapshot {
                        id,
                        farm_id: row.get("farm_id"),
                        breed,
                        current_weight: row.get("current_weight"),
                        initial_weight: row.get("initial_weight"),
                        weighed_at: row.get("weighed_at"),
                        born_at: row.get("born_at"),
                        health: row.get("health"),
                        sold_at: row.get("sold_at"),
                    },
                ))
            })
            .collect()
    }
}

impl<C> Database<Update<subject::Sold>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sold): Update<subject::Sold>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE subjects \
            SET sold_at = $2::TIMESTAMPTZ, \
                transaction_id = $3::UUID \
            WHERE id = $1::UUID \
              AND sold_at IS NULL";
        self.exec(
            SQL,
            &[&sold.subject_id, &sold.sold_at, &sold.transaction_id],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
