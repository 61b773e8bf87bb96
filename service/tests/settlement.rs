mod support;

use std::collections::HashMap;

use common::{
    operations::{By, Select},
    Handler as _,
};
use service::{
    command::{AcceptOffer, ConfirmDelivery, CreateListing},
    domain::{
        listing, notification::Event, subject, transaction, user, Listing,
        Role, Transaction,
    },
    query, Classify as _, ErrorKind,
};

use self::support::{farm, kg, list, money, offer_on, service, subject, Svc};

/// Lists a fresh subject and accepts an offer on it, returning the opened
/// [`Transaction`] along with the [`Listing`].
async fn settle(
    svc: &Svc,
    seller: user::Id,
    buyer: user::Id,
) -> (Transaction, Listing) {
    let farm_id = farm(svc, seller).await;
    let cow = subject(svc, farm_id, kg(300)).await;
    let listing = list(svc, seller, farm_id, cow).await;
    let o = offer_on(svc, &listing, buyer, 1500).await;
    let transaction = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to accept");
    (transaction, listing)
}

#[tokio::test]
async fn completes_after_both_confirmations() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let (t, listing) = settle(&svc, seller, buyer).await;
    assert_eq!(t.status, transaction::Status::Confirmed);

    let half = svc
        .execute(ConfirmDelivery {
            transaction_id: t.id,
            user_id: buyer,
            role: Role::Buyer,
        })
        .await
        .expect("buyer failed to confirm");
    assert_eq!(half.status, transaction::Status::Confirmed);
    assert!(half.confirmation.buyer);
    assert!(!half.confirmation.seller);
    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == seller
        && n.event
            == Event::DeliveryConfirmationPending {
                transaction_id: t.id,
            }));

    let done = svc
        .execute(ConfirmDelivery {
            transaction_id: t.id,
            user_id: seller,
            role: Role::Seller,
        })
        .await
        .expect("seller failed to confirm");
    assert_eq!(done.status, transaction::Status::Completed);
    assert!(done.completed_at.is_some());

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.status, listing::Status::Sold);

    let subjects = svc
        .database()
        .execute(Select(By::<HashMap<_, subject::Snapshot>, _>::new(
            t.subject_ids.clone(),
        )))
        .await
        .expect("failed to select subjects");
    assert!(subjects.values().all(|s| s.sold_at.is_some()));

    let completed = notifier
        .sent()
        .await
        .into_iter()
        .filter(|n| {
            n.event == Event::TransactionCompleted { transaction_id: t.id }
        })
        .map(|n| n.recipient_id)
        .collect::<Vec<_>>();
    assert_eq!(completed.len(), 2);
    assert!(completed.contains(&buyer));
    assert!(completed.contains(&seller));
}

#[tokio::test]
async fn completes_even_if_herd_is_not_updated() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let (t, listing) = settle(&svc, seller, buyer).await;
    svc.database().set_failing_sales(true);

    for (user_id, role) in [(buyer, Role::Buyer), (seller, Role::Seller)] {
        _ = svc
            .execute(ConfirmDelivery {
                transaction_id: t.id,
                user_id,
                role,
            })
            .await
            .expect("failed to confirm");
    }

    let done = svc
        .execute(query::transaction::ById::by(t.id))
        .await
        .expect("failed to query `Transaction`")
        .expect("`Transaction` must exist");
    assert_eq!(done.status, transaction::Status::Completed);

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.status, listing::Status::Sold);

    let subjects = svc
        .database()
        .execute(Select(By::<HashMap<_, subject::Snapshot>, _>::new(
            t.subject_ids.clone(),
        )))
        .await
        .expect("failed to select subjects");
    assert!(subjects.values().all(|s| s.sold_at.is_none()));

    let completed = notifier
        .sent()
        .await
        .into_iter()
        .filter(|n| {
            n.event == Event::TransactionCompleted { transaction_id: t.id }
        })
        .map(|n| n.recipient_id)
        .collect::<Vec<_>>();
    assert_eq!(completed.len(), 2);
    assert!(completed.contains(&buyer));
    assert!(completed.contains(&seller));
}

#[tokio::test]
async fn repeated_confirmation_changes_nothing() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let (t, _) = settle(&svc, seller, buyer).await;

    for _ in 0..2 {
        _ = svc
            .execute(ConfirmDelivery {
                transaction_id: t.id,
                user_id: buyer,
                role: Role::Buyer,
            })
            .await
            .expect("buyer failed to confirm");
    }
    let pending = notifier
        .sent()
        .await
        .into_iter()
        .filter(|n| {
            matches!(n.event, Event::DeliveryConfirmationPending { .. })
        })
        .count();
    assert_eq!(pending, 1);

    _ = svc
        .execute(ConfirmDelivery {
            transaction_id: t.id,
            user_id: seller,
            role: Role::Seller,
        })
        .await
        .expect("seller failed to confirm");
    let again = svc
        .execute(ConfirmDelivery {
            transaction_id: t.id,
            user_id: seller,
            role: Role::Seller,
        })
        .await
        .expect("completed transaction must accept repeated confirmation");
    assert_eq!(again.status, transaction::Status::Completed);

    let stored = svc
        .execute(query::transaction::ById::by(t.id))
        .await
        .expect("failed to query `Transaction`")
        .expect("`Transaction` must exist");
    assert_eq!(stored.completed_at, again.completed_at);
}

#[tokio::test]
async fn only_parties_confirm_in_their_roles() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let (t, _) = settle(&svc, seller, buyer).await;

    for (user_id, role) in [
        (user::Id::new(), Role::Buyer),
        (buyer, Role::Seller),
        (seller, Role::Buyer),
    ] {
        let err = svc
            .execute(ConfirmDelivery {
                transaction_id: t.id,
                user_id,
                role,
            })
            .await
            .expect_err("non-party must not confirm");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    let err = svc
        .execute(ConfirmDelivery {
            transaction_id: transaction::Id::new(),
            user_id: buyer,
            role: Role::Buyer,
        })
        .await
        .expect_err("unknown transaction must not be confirmed");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn sold_subject_cannot_be_listed_again() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let (t, listing) = settle(&svc, seller, buyer).await;
    for (user_id, role) in [(buyer, Role::Buyer), (seller, Role::Seller)] {
        _ = svc
            .execute(ConfirmDelivery {
                transaction_id: t.id,
                user_id,
                role,
            })
            .await
            .expect("failed to confirm");
    }

    let err = svc
        .execute(CreateListing {
            seller_id: seller,
            farm_id: listing.farm_id,
            kind: listing.kind.clone(),
            breed: None,
            price_per_kg: money(5),
            current_weight: None,
            weighed_at: None,
            location: None,
        })
        .await
        .expect_err("sold subject must not be listed");

    assert_eq!(err.kind(), ErrorKind::InvalidState);
}
