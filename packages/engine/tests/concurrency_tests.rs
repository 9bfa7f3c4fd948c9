//! Races the engine must win: duplicate responses, respond-versus-cancel and
//! respond-versus-expiry on the same request. The per-request lock serializes
//! these; the assertions pin down the observable outcome.

mod common;

use chrono::Duration;

use common::{register_volunteer_at, rescue_request, test_engine};
use engine_core::domains::matching::models::{MatchDecision, MatchStatus};
use engine_core::domains::requests::models::RequestStatus;
use engine_core::domains::volunteers::models::VolunteerStatus;
use engine_core::store::Store;
use engine_core::UserId;

#[tokio::test]
async fn concurrent_accepts_of_the_same_offer_succeed_exactly_once() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let request = t
        .engine
        .create_request(rescue_request(UserId::new()))
        .await
        .unwrap();
    let offer = t.engine.match_history(request.id).await.unwrap()[0].clone();

    let (a, b) = tokio::join!(
        t.engine
            .respond_to_match(offer.id, MatchDecision::Accept, volunteer.user_id),
        t.engine
            .respond_to_match(offer.id, MatchDecision::Accept, volunteer.user_id),
    );
    assert_eq!(
        a.is_ok() as u8 + b.is_ok() as u8,
        1,
        "exactly one accept must win"
    );

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, MatchStatus::Accepted);
    assert_eq!(
        t.engine.request(request.id).await.unwrap().status,
        RequestStatus::Matched
    );
}

#[tokio::test]
async fn accept_racing_cancel_always_ends_cancelled_with_no_active_match() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let requester = UserId::new();
    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();
    let offer = t.engine.match_history(request.id).await.unwrap()[0].clone();

    // Either order is possible. Cancel from open or matched is always legal,
    // so the cancel wins the end state either way; the accept either lands
    // first or fails against the already-resolved offer.
    let (accept, cancel) = tokio::join!(
        t.engine
            .respond_to_match(offer.id, MatchDecision::Accept, volunteer.user_id),
        t.engine.cancel_request(request.id, requester, None),
    );
    assert!(cancel.is_ok(), "{cancel:?}");
    if let Err(e) = accept {
        assert!(matches!(e, engine_core::EngineError::InvalidState(_)), "{e}");
    }

    assert_eq!(
        t.engine.request(request.id).await.unwrap().status,
        RequestStatus::Cancelled
    );
    assert!(t
        .store
        .active_match_for_request(request.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        t.engine.volunteer(volunteer.id).await.unwrap().status,
        VolunteerStatus::Available
    );
}

#[tokio::test]
async fn decline_racing_expiry_resolves_the_offer_once_and_reoffers_once() {
    let t = test_engine();
    let v1 = register_volunteer_at(&t.engine, 0.0108, &["rescue"]).await;
    let v2 = register_volunteer_at(&t.engine, 0.0045, &[]).await;
    let request = t
        .engine
        .create_request(rescue_request(UserId::new()))
        .await
        .unwrap();
    let offer = t.engine.match_history(request.id).await.unwrap()[0].clone();
    assert_eq!(offer.volunteer_id, v1.id);

    // Deadline passes, then the volunteer's decline arrives at the same
    // moment the sweeper fires.
    t.clock.advance(Duration::minutes(3));
    let (decline, _swept) = tokio::join!(
        t.engine
            .respond_to_match(offer.id, MatchDecision::Reject, v1.user_id),
        t.engine.expire_due_matches(),
    );

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 2, "the offer must be re-issued exactly once");
    assert!(matches!(
        history[0].status,
        MatchStatus::Rejected | MatchStatus::Expired
    ));
    if decline.is_err() {
        // The sweeper got there first.
        assert_eq!(history[0].status, MatchStatus::Expired);
    }
    assert_eq!(history[1].volunteer_id, v2.id);
    assert_eq!(history[1].status, MatchStatus::Pending);

    let active: Vec<_> = history.iter().filter(|m| m.status.is_active()).collect();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn concurrent_requests_share_the_volunteer_pool_without_double_booking() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let requester = UserId::new();

    // Two requests racing for a single volunteer: only one may hold an
    // outstanding offer at a time.
    let (r1, r2) = tokio::join!(
        t.engine.create_request(rescue_request(requester)),
        t.engine.create_request(rescue_request(requester)),
    );
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    let offers_1 = t.engine.match_history(r1.id).await.unwrap();
    let offers_2 = t.engine.match_history(r2.id).await.unwrap();
    assert_eq!(
        offers_1.len() + offers_2.len(),
        1,
        "the volunteer was offered both requests at once"
    );

    let offered = if offers_1.is_empty() { &offers_2[0] } else { &offers_1[0] };
    assert_eq!(offered.volunteer_id, volunteer.id);
    assert_eq!(offered.status, MatchStatus::Pending);
}
