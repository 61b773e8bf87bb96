//! [`Command`] for confirming a delivery of a [`Transaction`].

use common::operations::{
    By, Commit, Emit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        listing, offer, subject,
        transaction::{self, Confirmed},
        user, Listing, Notification, Role, Transaction,
    },
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    Service,
};

use super::Command;

/// [`Command`] for confirming a delivery of a [`Transaction`] by one of its
/// parties.
///
/// Once both parties confirmed, the [`Transaction`] is completed, its
/// [`Listing`] is sold and the subjects leave the seller's herd.
/// Confirming twice by the same party changes nothing.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmDelivery {
    /// ID of the [`Transaction`] to confirm the delivery of.
    pub transaction_id: transaction::Id,

    /// ID of the confirming user.
    pub user_id: user::Id,

    /// [`Role`] the user confirms as.
    pub role: Role,
}

impl<Db, Ntf> Command<ConfirmDelivery> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<Update<subject::Sold>, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Transaction, transaction::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Transaction>, transaction::Id>>,
            Ok = Option<Transaction>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<Update<Transaction>, Err = Traced<database::Error>>
        + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Transaction;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmDelivery,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmDelivery {
            transaction_id,
            user_id,
            role,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Completion must happen exactly once.
        tx.execute(Lock(By::<Transaction, _>::new(transaction_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut transaction = tx
            .execute(Select(By::<Option<Transaction>, _>::new(
                transaction_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TransactionNotExists(transaction_id))
            .map_err(tracerr::wrap!())?;
        if transaction.party_id(role) != user_id {
            return Err(tracerr::new!(E::NotParty {
                user_id,
                transaction_id,
                role,
            }));
        }

        let now = transaction::CompletionDateTime::now();
        let confirmed = transaction
            .confirm(role, now)
            .map_err(E::TransactionNotConfirmable)
            .map_err(tracerr::wrap!())?;

        match confirmed {
            Confirmed::Already => return Ok(transaction),
            Confirmed::AwaitingCounterparty => {
                tx.execute(Update(transaction.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                tx.execute(Commit)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;

                _ = self
                    .notify(Notification::confirmation_pending(
                        &transaction,
                        role.other(),
                    ))
                    .await;

                return Ok(transaction);
            }
            Confirmed::Completed => {}
        }

        tx.execute(Update(transaction.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let offer::Reference::Listing(listing_id) = transaction.reference {
            tx.execute(Lock(By::<Listing, _>::new(listing_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            let listing = tx
                .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            match listing {
                Some(mut listing) => match listing.sell() {
                    Ok(()) => {
                        tx.execute(Update(listing))
                            .await
                            .map_err(tracerr::map_from_and_wrap!(=> E))
                            .map(drop)?;
                    }
                    Err(status) => log::warn!(
                        %transaction_id,
                        %listing_id,
                        %status,
                        "`Listing` of a completed `Transaction` is not \
                         reserved, left as is",
                    ),
                },
                None => log::warn!(
                    %transaction_id,
                    %listing_id,
                    "`Listing` of a completed `Transaction` is missing",
                ),
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(%transaction_id, "`Transaction` completed");

        // Herd records are best-effort: the sale is final regardless.
        for subject_id in &transaction.subject_ids {
            let sold = subject::Sold {
                subject_id: *subject_id,
                transaction_id,
                sold_at: now.coerce(),
            };
            if let Err(e) = self.database().execute(Update(sold)).await {
                log::error!(
                    %transaction_id,
                    %subject_id,
                    "failed to remove subject from the herd: {e}",
                );
            }
        }

        self.dispatch([
            Notification::transaction_completed(&transaction, Role::Buyer),
            Notification::transaction_completed(&transaction, Role::Seller),
        ])
        .await;

        Ok(transaction)
    }
}

/// Error of [`ConfirmDelivery`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Confirming user is not the party of the [`Transaction`] in the
    /// claimed [`Role`].
    #[display(
        "`User(id: {user_id})` is not the {role} of `Transaction(id: \
         {transaction_id})`"
    )]
    NotParty {
        /// ID of the confirming user.
        user_id: user::Id,

        /// ID of the [`Transaction`].
        transaction_id: transaction::Id,

        /// Claimed [`Role`].
        role: Role,
    },

    /// [`Transaction`] cannot be confirmed in its current status.
    #[display("`Transaction` is `{_0}` and cannot be confirmed")]
    TransactionNotConfirmable(#[error(not(source))] transaction::Status),

    /// [`Transaction`] with the provided ID does not exist.
    #[display("`Transaction(id: {_0})` does not exist")]
    TransactionNotExists(#[error(not(source))] transaction::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::NotParty { .. } => Kind::Unauthorized,
            Self::TransactionNotConfirmable(_) => Kind::InvalidState,
            Self::TransactionNotExists(_) => Kind::NotFound,
        }
    }
}
