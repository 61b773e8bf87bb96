mod support;

use common::{
    operations::{By, Delete, Insert},
    DateTime, Handler as _,
};
use service::{
    command::{ArchiveBuyRequest, FindMatchesForRequest, RestoreBuyRequest},
    domain::{notification::Event, subject, user, Match},
    query, read, Classify as _, ErrorKind,
};

use self::support::{farm, kg, list, request, service, subject};

#[tokio::test]
async fn matching_is_idempotent() {
    let (svc, notifier) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    let listing = list(&svc, seller, farm_id, cow).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let first = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("first matching failed");
    let second = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("second matching failed");

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].listing_id, listing.id);
    assert_eq!(first[0].seller_id, seller);

    let found = notifier
        .sent()
        .await
        .into_iter()
        .filter(|n| matches!(n.event, Event::MatchFound { .. }))
        .collect::<Vec<_>>();
    assert_eq!(found.len(), 1, "seller must be notified once");
    assert_eq!(found[0].recipient_id, seller);

    let stored = svc
        .execute(query::matching::ByBuyRequest::by(req.id))
        .await
        .expect("failed to query matches");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn weight_is_a_hard_filter() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let heavy = subject(&svc, farm_id, kg(400)).await;
    _ = list(&svc, seller, farm_id, heavy).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let matches = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("matching failed");

    assert!(matches.is_empty());
}

#[tokio::test]
async fn buyer_never_matches_own_listing() {
    let (svc, _) = service();
    let owner = user::Id::new();
    let farm_id = farm(&svc, owner).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    _ = list(&svc, owner, farm_id, cow).await;
    let req = request(&svc, owner, kg(250), kg(350)).await;

    let matches = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("matching failed");

    assert!(matches.is_empty());
}

#[tokio::test]
async fn best_scored_matches_come_first() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let weighed = subject(&svc, farm_id, kg(300)).await;
    let unweighed = {
        let id = subject(&svc, farm_id, kg(300)).await;
        let mut s = subject::Snapshot::unknown(id, farm_id);
        s.initial_weight = Some(kg(300));
        svc.database()
            .execute(Insert(s))
            .await
            .expect("failed to update subject");
        id
    };
    let low = list(&svc, seller, farm_id, unweighed).await;
    let high = list(&svc, seller, farm_id, weighed).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    let matches = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("matching failed");

    assert_eq!(
        matches.iter().map(|m| m.listing_id).collect::<Vec<_>>(),
        [high.id, low.id],
    );
    assert!(matches[0].score > matches[1].score);
}

#[tokio::test]
async fn archived_request_is_not_matched() {
    let (svc, _) = service();
    let buyer = user::Id::new();
    let req = request(&svc, buyer, kg(250), kg(350)).await;

    _ = svc
        .execute(ArchiveBuyRequest {
            buy_request_id: req.id,
            buyer_id: buyer,
        })
        .await
        .expect("failed to archive");

    let err = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect_err("archived request must not be matched");
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let restored = svc
        .execute(RestoreBuyRequest {
            buy_request_id: req.id,
            buyer_id: buyer,
        })
        .await
        .expect("failed to restore");
    assert!(restored.is_open(DateTime::now()));
}

#[tokio::test]
async fn only_the_buyer_archives_request() {
    let (svc, _) = service();
    let req = request(&svc, user::Id::new(), kg(250), kg(350)).await;

    let err = svc
        .execute(ArchiveBuyRequest {
            buy_request_id: req.id,
            buyer_id: user::Id::new(),
        })
        .await
        .expect_err("stranger must not archive");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn stale_matches_are_cleaned() {
    let (svc, _) = service();
    let (seller, buyer) = (user::Id::new(), user::Id::new());
    let farm_id = farm(&svc, seller).await;
    let cow = subject(&svc, farm_id, kg(300)).await;
    _ = list(&svc, seller, farm_id, cow).await;
    let req = request(&svc, buyer, kg(250), kg(350)).await;
    _ = svc
        .execute(FindMatchesForRequest {
            buy_request_id: req.id,
        })
        .await
        .expect("matching failed");

    let untouched = svc
        .database()
        .execute(Delete(By::<Match, _>::new(read::matching::Stale)))
        .await
        .expect("failed to clean");
    assert_eq!(untouched, 0, "published request keeps its matches");

    _ = svc
        .execute(ArchiveBuyRequest {
            buy_request_id: req.id,
            buyer_id: buyer,
        })
        .await
        .expect("failed to archive");
    let cleaned = svc
        .database()
        .execute(Delete(By::<Match, _>::new(read::matching::Stale)))
        .await
        .expect("failed to clean");
    assert_eq!(cleaned, 1);

    let left = svc
        .execute(query::matching::ByBuyRequest::by(req.id))
        .await
        .expect("failed to query matches");
    assert!(left.is_empty());
}
