mod support;

use std::time::Duration;

use common::Handler as _;
use service::{
    command::{
        AcceptOffer, ConfirmDelivery, CounterOffer, CreateOffer, RejectOffer,
        RemoveListing, WithdrawOffer,
    },
    domain::{
        buy_request, listing, notification::Event, offer, user, Role,
    },
    query, Classify as _, ErrorKind,
};

use self::support::{
    config_with_offer_ttl, farm, kg, list, list_batch, money, offer_on,
    offer_to, request, service, service_with, subject,
};

#[tokio::test]
async fn seller_cannot_offer_on_own_listing() {
    let (svc, _) = service();
    let seller = user::Id::new();
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: seller,
            subject_ids: vec![cow],
            price: money(1000),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("self-trade must be refused");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn farm_owner_cannot_offer_on_farm_listing() {
    let (svc, _) = service();
    let (owner, seller) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, owner).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: owner,
            subject_ids: vec![cow],
            price: money(1000),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("self-trade must be refused");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn offer_needs_positive_price_and_listed_subjects() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let other = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: buyer,
            subject_ids: vec![cow],
            price: money(0),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("zero price must be refused");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: buyer,
            subject_ids: vec![other],
            price: money(1000),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("unlisted subject must be refused");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: buyer,
            subject_ids: vec![],
            price: money(1000),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("empty offer must be refused");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn conflicting_offer_is_refused_until_withdrawn() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let first = offer_on(&svc, &listing, buyer, 1000).await;
    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(listing.id),
            offerer_id: buyer,
            subject_ids: vec![cow],
            price: money(1100),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("overlapping offer must be refused");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let withdrawn = svc
        .execute(WithdrawOffer {
            offer_id: first.id,
            offerer_id: buyer,
        })
        .await
        .expect("failed to withdraw");
    assert_eq!(withdrawn.status, offer::Status::Withdrawn);
    assert!(withdrawn.responded_at.is_some());

    let second = offer_on(&svc, &listing, buyer, 1100).await;
    assert_eq!(second.status, offer::Status::Pending);

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.inquiries, 2);

    let sent = notifier.sent().await;
    assert!(sent.iter().any(|n| n.recipient_id == seller
        && n.event == Event::OfferWithdrawn { offer_id: first.id }));
    assert_eq!(
        sent.iter()
            .filter(|n| matches!(n.event, Event::OfferReceived { .. }))
            .count(),
        2,
    );
}

#[tokio::test]
async fn acceptance_invalidates_competing_offers() {
    let (svc, notifier) = service();
    let seller = user::Id::new();
    let (winner, loser) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let won = offer_on(&svc, &listing, winner, 1200).await;
    let lost = offer_on(&svc, &listing, loser, 1000).await;

    let transaction = svc
        .execute(AcceptOffer {
            offer_id: won.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to accept");
    assert_eq!(transaction.offer_id, won.id);
    assert_eq!(transaction.buyer_id, winner);
    assert_eq!(transaction.seller_id, seller);
    assert_eq!(transaction.final_price, money(1200));
    assert_eq!(transaction.subject_ids, vec![cow]);

    let lost = svc
        .execute(query::offer::ById::by(lost.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(lost.status, offer::Status::Expired);

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.status, listing::Status::Reserved);

    let sent = notifier.sent().await;
    assert!(sent.iter().any(|n| n.recipient_id == winner
        && n.event
            == Event::OfferAccepted {
                offer_id: won.id,
                transaction_id: transaction.id,
            }));
    assert!(sent.iter().any(|n| n.recipient_id == loser
        && n.event == Event::OfferInvalidated { offer_id: lost.id }));
}

#[tokio::test]
async fn non_overlapping_offers_survive_acceptance() {
    let (svc, _) = service();
    let seller = user::Id::new();
    let (first, second) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let a = subject(&svc, farm_id, kg(300)).await;
    let b = subject(&svc, farm_id, kg(310)).await;
    let batch = list_batch(&svc, seller, farm_id, vec![a, b]).await;

    let on_a = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(batch.id),
            offerer_id: first,
            subject_ids: vec![a],
            price: money(900),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect("failed to offer on `a`");
    let on_b = svc
        .execute(CreateOffer {
            reference: offer::Reference::Listing(batch.id),
            offerer_id: second,
            subject_ids: vec![b],
            price: money(950),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect("failed to offer on `b`");

    _ = svc
        .execute(AcceptOffer {
            offer_id: on_a.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to accept");

    let on_b = svc
        .execute(query::offer::ById::by(on_b.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(on_b.status, offer::Status::Pending);
}

#[tokio::test]
async fn concurrent_acceptances_open_single_transaction() {
    let (svc, _) = service();
    let seller = user::Id::new();
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    let first = offer_on(&svc, &listing, user::Id::new(), 1000).await;
    let second = offer_on(&svc, &listing, user::Id::new(), 1050).await;

    let (a, b) = tokio::join!(
        svc.execute(AcceptOffer {
            offer_id: first.id,
            acting_user_id: seller,
        }),
        svc.execute(AcceptOffer {
            offer_id: second.id,
            acting_user_id: seller,
        }),
    );

    assert_eq!(
        [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count(),
        1,
        "exactly one acceptance must win",
    );
    let err = a.err().or(b.err()).expect("one acceptance must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let pending = svc
        .execute(query::offer::Pending::by(service::read::offer::Pending(
            offer::Reference::Listing(listing.id),
        )))
        .await
        .expect("failed to query pending offers");
    assert!(pending.is_empty());
}

#[tokio::test]
async fn only_counterparty_accepts() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let o = offer_on(&svc, &listing, buyer, 1000).await;

    let err = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: buyer,
        })
        .await
        .expect_err("offerer must not accept own offer");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn rejected_offer_stays_rejected() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let o = offer_on(&svc, &listing, buyer, 1000).await;

    let rejected = svc
        .execute(RejectOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to reject");
    assert_eq!(rejected.status, offer::Status::Rejected);

    for err in [
        svc.execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .map(drop)
        .expect_err("rejected offer must not be accepted")
        .kind(),
        svc.execute(RejectOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .map(drop)
        .expect_err("rejected offer must not be rejected twice")
        .kind(),
    ] {
        assert_eq!(err, ErrorKind::InvalidState);
    }

    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == buyer
        && n.event == Event::OfferRejected { offer_id: o.id }));
}

#[tokio::test]
async fn due_offer_expires_on_touch() {
    let (svc, notifier) = service_with(config_with_offer_ttl(Duration::ZERO));
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let o = offer_on(&svc, &listing, buyer, 1000).await;

    let err = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .expect_err("due offer must not be accepted");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let o = svc
        .execute(query::offer::ById::by(o.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(o.status, offer::Status::Expired);

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.status, listing::Status::Available);

    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == buyer
        && n.event == Event::OfferExpired { offer_id: o.id }));
}

#[tokio::test]
async fn countered_offer_is_replaced() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let original = offer_on(&svc, &listing, buyer, 1000).await;

    let counter = svc
        .execute(CounterOffer {
            offer_id: original.id,
            acting_user_id: seller,
            price: money(1200),
            price_per_kg: None,
            message: Some(
                offer::Message::new("Feed included").expect("valid message"),
            ),
        })
        .await
        .expect("failed to counter");
    assert_eq!(counter.offered_by, Role::Seller);
    assert_eq!(counter.countered_offer_id, Some(original.id));
    assert_eq!(counter.counterparty_id(), buyer);
    assert_eq!(counter.status, offer::Status::Pending);

    let original = svc
        .execute(query::offer::ById::by(original.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(original.status, offer::Status::Countered);
    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == buyer
        && n.event
            == Event::OfferCountered {
                offer_id: original.id,
                counter_offer_id: counter.id,
            }));

    let transaction = svc
        .execute(AcceptOffer {
            offer_id: counter.id,
            acting_user_id: buyer,
        })
        .await
        .expect("failed to accept counter offer");
    assert_eq!(transaction.final_price, money(1200));
    assert_eq!(transaction.buyer_id, buyer);
    assert_eq!(transaction.seller_id, seller);
}

#[tokio::test]
async fn failing_notifier_does_not_fail_operation() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;

    notifier.set_failing(true);
    let o = offer_on(&svc, &listing, buyer, 1000).await;
    _ = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: seller,
        })
        .await
        .expect("acceptance must not depend on delivery");

    assert!(notifier.sent().await.is_empty());
}

#[tokio::test]
async fn seller_offers_on_buy_request() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let o = svc
        .execute(CreateOffer {
            reference: offer::Reference::BuyRequest(req.id),
            offerer_id: seller,
            subject_ids: vec![cow],
            price: money(1500),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect("failed to offer on `BuyRequest`");
    assert_eq!(o.offered_by, Role::Seller);
    assert_eq!(o.buyer_id, buyer);
    assert_eq!(o.seller_id, seller);
    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == buyer
        && n.event == Event::OfferReceived { offer_id: o.id }));

    _ = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: buyer,
        })
        .await
        .expect("failed to accept");

    let req = svc
        .execute(query::buy_request::ById::by(req.id))
        .await
        .expect("failed to query `BuyRequest`")
        .expect("`BuyRequest` must exist");
    assert_eq!(req.status, buy_request::Status::Fulfilled);
}

#[tokio::test]
async fn only_subject_owner_offers_on_buy_request() {
    let (svc, _) = service();
    let (owner, stranger, buyer) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, owner).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::BuyRequest(req.id),
            offerer_id: stranger,
            subject_ids: vec![cow],
            price: money(1500),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("stranger must not sell others' animals");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn listing_with_pending_offers_is_not_removed() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let o = offer_on(&svc, &listing, buyer, 1000).await;

    let err = svc
        .execute(RemoveListing {
            listing_id: listing.id,
            acting_user_id: seller,
        })
        .await
        .expect_err("listing with pending offer must stay");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    _ = svc
        .execute(WithdrawOffer {
            offer_id: o.id,
            offerer_id: buyer,
        })
        .await
        .expect("failed to withdraw");
    let removed = svc
        .execute(RemoveListing {
            listing_id: listing.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to remove");
    assert_eq!(removed.status, listing::Status::Removed);
}

#[tokio::test]
async fn subject_is_sold_through_single_buy_request() {
    let (svc, _) = service();
    let (seller, first, second) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let first_req = request(&svc, first, kg(250), kg(350)).await;
    let second_req = request(&svc, second, kg(250), kg(350)).await;
    let to_first = offer_to(&svc, &first_req, seller, vec![cow], 1500).await;
    let to_second =
        offer_to(&svc, &second_req, seller, vec![cow], 1600).await;

    _ = svc
        .execute(AcceptOffer {
            offer_id: to_first.id,
            acting_user_id: first,
        })
        .await
        .expect("failed to accept");

    let err = svc
        .execute(AcceptOffer {
            offer_id: to_second.id,
            acting_user_id: second,
        })
        .await
        .expect_err("sold subject must not be sold again");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let second_req = svc
        .execute(query::buy_request::ById::by(second_req.id))
        .await
        .expect("failed to query `BuyRequest`")
        .expect("`BuyRequest` must exist");
    assert_eq!(second_req.status, buy_request::Status::Published);
    let to_second = svc
        .execute(query::offer::ById::by(to_second.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(to_second.status, offer::Status::Pending);
}

#[tokio::test]
async fn buy_request_sale_withdraws_listing_of_subject() {
    let (svc, notifier) = service();
    let (seller, bidder, buyer) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let bid = offer_on(&svc, &listing, bidder, 1000).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;
    let o = offer_to(&svc, &req, seller, vec![cow], 1500).await;

    _ = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: buyer,
        })
        .await
        .expect("failed to accept");

    let listing = svc
        .execute(query::listing::ById::by(listing.id))
        .await
        .expect("failed to query `Listing`")
        .expect("`Listing` must exist");
    assert_eq!(listing.status, listing::Status::Removed);
    let bid = svc
        .execute(query::offer::ById::by(bid.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(bid.status, offer::Status::Expired);
    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == bidder
        && n.event == Event::OfferInvalidated { offer_id: bid.id }));

    let err = svc
        .execute(AcceptOffer {
            offer_id: bid.id,
            acting_user_id: seller,
        })
        .await
        .expect_err("withdrawn listing must not be sold");
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn reserved_listing_subject_is_not_sold_through_buy_request() {
    let (svc, _) = service();
    let (seller, bidder, buyer) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;
    let o = offer_to(&svc, &req, seller, vec![cow], 1500).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let bid = offer_on(&svc, &listing, bidder, 1000).await;

    _ = svc
        .execute(AcceptOffer {
            offer_id: bid.id,
            acting_user_id: seller,
        })
        .await
        .expect("failed to accept");

    let err = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: buyer,
        })
        .await
        .expect_err("reserved subject must not be sold again");
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn sold_subject_is_not_offered_on_buy_request() {
    let (svc, _) = service();
    let (seller, buyer, latecomer) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;
    let o = offer_to(&svc, &req, seller, vec![cow], 1500).await;
    let t = svc
        .execute(AcceptOffer {
            offer_id: o.id,
            acting_user_id: buyer,
        })
        .await
        .expect("failed to accept");
    let late_req = request(&svc, latecomer, kg(250), kg(350)).await;
    let offer_late = CreateOffer {
        reference: offer::Reference::BuyRequest(late_req.id),
        offerer_id: seller,
        subject_ids: vec![cow],
        price: money(1700),
        price_per_kg: None,
        message: None,
    };

    let err = svc
        .execute(offer_late.clone())
        .await
        .expect_err("subject in transaction must not be offered");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

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
        .execute(offer_late)
        .await
        .expect_err("sold subject must not be offered");
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn fulfilled_buy_request_invalidates_other_offers() {
    let (svc, notifier) = service();
    let (first, second, buyer) =
        (user::Id::new(), user::Id::new(), user::Id::new());
    let first_farm = farm(&svc, first).await;
    let second_farm = farm(&svc, second).await;
    let first_cow = subject(&svc, first_farm, kg(300)).await;
    let second_cow = subject(&svc, second_farm, kg(310)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;
    let won = offer_to(&svc, &req, first, vec![first_cow], 1500).await;
    let lost = offer_to(&svc, &req, second, vec![second_cow], 1400).await;

    _ = svc
        .execute(AcceptOffer {
            offer_id: won.id,
            acting_user_id: buyer,
        })
        .await
        .expect("failed to accept");

    let lost = svc
        .execute(query::offer::ById::by(lost.id))
        .await
        .expect("failed to query `Offer`")
        .expect("`Offer` must exist");
    assert_eq!(lost.status, offer::Status::Expired);
    assert!(notifier.sent().await.iter().any(|n| n.recipient_id == second
        && n.event == Event::OfferInvalidated { offer_id: lost.id }));

    let err = svc
        .execute(AcceptOffer {
            offer_id: lost.id,
            acting_user_id: buyer,
        })
        .await
        .expect_err("fulfilled request must not be accepted twice");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::BuyRequest(req.id),
            offerer_id: second,
            subject_ids: vec![second_cow],
            price: money(1300),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("fulfilled request must not receive offers");
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn buyer_cannot_be_offered_own_animal() {
    let (svc, _) = service();
    let (buyer, stranger) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, buyer).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let err = svc
        .execute(CreateOffer {
            reference: offer::Reference::BuyRequest(req.id),
            offerer_id: stranger,
            subject_ids: vec![cow],
            price: money(1500),
            price_per_kg: None,
            message: None,
        })
        .await
        .expect_err("self-trade through farm must be refused");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}
