//! End-to-end matching scenarios: ranked offers, accept/complete, timeout
//! re-matching, rejection cycles and cancellation.

mod common;

use chrono::Duration;

use common::{register_volunteer_at, rescue_request, test_engine};
use engine_core::domains::matching::models::{MatchDecision, MatchStatus};
use engine_core::domains::notifications::models::NotificationKind;
use engine_core::domains::requests::models::RequestStatus;
use engine_core::domains::volunteers::models::VolunteerStatus;
use engine_core::UserId;

#[tokio::test]
async fn skilled_volunteer_is_offered_before_nearer_unskilled_one() {
    let t = test_engine();
    // V1: ~1.2 km away, has the rescue skill. V2: ~0.5 km away, no skill.
    let v1 = register_volunteer_at(&t.engine, 0.0108, &["rescue"]).await;
    let v2 = register_volunteer_at(&t.engine, 0.0045, &[]).await;

    let request = t
        .engine
        .create_request(rescue_request(UserId::new()))
        .await
        .unwrap();

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].volunteer_id, v1.id);
    assert_eq!(history[0].status, MatchStatus::Pending);
    assert_ne!(history[0].volunteer_id, v2.id);
}

#[tokio::test]
async fn accept_then_complete_runs_the_full_lifecycle() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let requester = UserId::new();
    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();

    let offer = t.engine.match_history(request.id).await.unwrap()[0].clone();

    // Accept: match accepted, request matched, volunteer busy.
    let accepted = t
        .engine
        .respond_to_match(offer.id, MatchDecision::Accept, volunteer.user_id)
        .await
        .unwrap();
    assert_eq!(accepted.status, MatchStatus::Accepted);
    assert!(accepted.accepted_at.is_some());
    assert_eq!(
        t.engine.request(request.id).await.unwrap().status,
        RequestStatus::Matched
    );
    assert_eq!(
        t.engine.volunteer(volunteer.id).await.unwrap().status,
        VolunteerStatus::Busy
    );

    // Work starts, then completes.
    t.engine
        .advance_request(request.id, RequestStatus::InProgress, requester, None)
        .await
        .unwrap();
    let done = t
        .engine
        .advance_request(request.id, RequestStatus::Completed, volunteer.user_id, None)
        .await
        .unwrap();
    assert_eq!(done.status, RequestStatus::Completed);

    let final_match = t.engine.match_history(request.id).await.unwrap()[0].clone();
    assert_eq!(final_match.status, MatchStatus::Completed);
    assert!(final_match.completed_at.is_some());

    let final_volunteer = t.engine.volunteer(volunteer.id).await.unwrap();
    assert_eq!(final_volunteer.status, VolunteerStatus::Available);
    assert_eq!(final_volunteer.total_helps, 1);
}

#[tokio::test]
async fn timed_out_offer_expires_and_the_next_candidate_is_offered() {
    let t = test_engine();
    let v1 = register_volunteer_at(&t.engine, 0.0108, &["rescue"]).await;
    let v2 = register_volunteer_at(&t.engine, 0.0045, &[]).await;

    let request = t
        .engine
        .create_request(rescue_request(UserId::new()))
        .await
        .unwrap();

    // Critical urgency means a 2 minute response deadline.
    t.clock.advance(Duration::minutes(3));
    let expired = t.engine.expire_due_matches().await.unwrap();
    assert_eq!(expired, 1);

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].volunteer_id, v1.id);
    assert_eq!(history[0].status, MatchStatus::Expired);
    assert_eq!(history[1].volunteer_id, v2.id);
    assert_eq!(history[1].status, MatchStatus::Pending);

    // The request stays open until someone accepts.
    assert_eq!(
        t.engine.request(request.id).await.unwrap().status,
        RequestStatus::Open
    );
}

#[tokio::test]
async fn rejection_moves_to_the_next_candidate() {
    let t = test_engine();
    let v1 = register_volunteer_at(&t.engine, 0.0108, &["rescue"]).await;
    let v2 = register_volunteer_at(&t.engine, 0.0045, &[]).await;
    let requester = UserId::new();

    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();
    let first = t.engine.match_history(request.id).await.unwrap()[0].clone();

    t.engine
        .respond_to_match(first.id, MatchDecision::Reject, v1.user_id)
        .await
        .unwrap();

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, MatchStatus::Rejected);
    assert_eq!(history[1].volunteer_id, v2.id);
    assert_eq!(history[1].status, MatchStatus::Pending);

    // The requester heard that the first volunteer declined.
    let inbox = t.engine.notifications_for_user(requester).await.unwrap();
    assert!(inbox
        .iter()
        .any(|n| n.kind == NotificationKind::MatchRejected));
}

#[tokio::test]
async fn sole_decliner_is_reoffered_when_nobody_else_is_left() {
    // The cooldown is waived when skipping the decliner would leave no
    // candidates at all.
    let t = test_engine();
    let v1 = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;

    let request = t
        .engine
        .create_request(rescue_request(UserId::new()))
        .await
        .unwrap();
    let first = t.engine.match_history(request.id).await.unwrap()[0].clone();

    t.engine
        .respond_to_match(first.id, MatchDecision::Reject, v1.user_id)
        .await
        .unwrap();

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].volunteer_id, v1.id);
    assert_eq!(history[1].status, MatchStatus::Pending);
}

#[tokio::test]
async fn no_volunteers_leaves_the_request_open_and_notifies_the_requester() {
    let t = test_engine();
    let requester = UserId::new();

    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Open);
    assert!(t.engine.match_history(request.id).await.unwrap().is_empty());

    let inbox = t.engine.notifications_for_user(requester).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::RequestUnmatched);
}

#[tokio::test]
async fn sos_request_reaches_a_volunteer_outside_their_normal_radius() {
    let t = test_engine();
    // ~13.3 km away with a 10 km radius: only reachable via the SOS widening.
    let volunteer = register_volunteer_at(&t.engine, 0.12, &["rescue"]).await;

    let mut input = rescue_request(UserId::new());
    let plain = t.engine.create_request(input.clone()).await.unwrap();
    assert!(t.engine.match_history(plain.id).await.unwrap().is_empty());

    // Free the pool for the SOS attempt (nothing was offered, so it is).
    input.is_sos = true;
    let sos = t.engine.create_request(input).await.unwrap();
    let history = t.engine.match_history(sos.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].volunteer_id, volunteer.id);
}

#[tokio::test]
async fn cancelling_with_a_pending_match_rejects_it_and_audits_once() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let requester = UserId::new();

    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();
    let log_before = t.engine.status_history(request.id).await.unwrap().len();

    let cancelled = t
        .engine
        .cancel_request(request.id, requester, Some("resolved ourselves".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history[0].status, MatchStatus::Rejected);

    // Exactly one additional status-log row.
    let log = t.engine.status_history(request.id).await.unwrap();
    assert_eq!(log.len(), log_before + 1);
    assert_eq!(log.last().unwrap().new_status, RequestStatus::Cancelled);
    assert_eq!(
        log.last().unwrap().notes.as_deref(),
        Some("resolved ourselves")
    );

    // The pending volunteer was never busy and stays available.
    assert_eq!(
        t.engine.volunteer(volunteer.id).await.unwrap().status,
        VolunteerStatus::Available
    );
}

#[tokio::test]
async fn cancelling_an_accepted_request_frees_the_volunteer() {
    let t = test_engine();
    let volunteer = register_volunteer_at(&t.engine, 0.0045, &["rescue"]).await;
    let requester = UserId::new();

    let request = t
        .engine
        .create_request(rescue_request(requester))
        .await
        .unwrap();
    let offer = t.engine.match_history(request.id).await.unwrap()[0].clone();
    t.engine
        .respond_to_match(offer.id, MatchDecision::Accept, volunteer.user_id)
        .await
        .unwrap();
    assert_eq!(
        t.engine.volunteer(volunteer.id).await.unwrap().status,
        VolunteerStatus::Busy
    );

    t.engine
        .cancel_request(request.id, requester, None)
        .await
        .unwrap();

    assert_eq!(
        t.engine.volunteer(volunteer.id).await.unwrap().status,
        VolunteerStatus::Available
    );
    let history = t.engine.match_history(request.id).await.unwrap();
    assert_eq!(history[0].status, MatchStatus::Rejected);
}
