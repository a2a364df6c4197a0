//! End-to-end scheduling scenarios
//!
//! Direct booking, conflict with suggestions, split packages, fit-in with
//! relocation and recurrence proposals, all against the in-memory store.

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;

use helpers::*;
use SecretaryBot::models::{CandidateResponse, EventStatus, PendencyStatus};
use SecretaryBot::scheduling::{
    BookingOutcome, BookingRequest, FitInRequest, FitInStatus, RelocationStatus, RequestContext, SplitBookingOutcome,
};
use SecretaryBot::SecretaryBotError;

fn corte_request(time: chrono::NaiveTime) -> BookingRequest {
    BookingRequest {
        description: "corte".to_string(),
        services: vec!["corte".to_string()],
        date: d(2025, 6, 10),
        start_time: time,
        duration_minutes: Some(30),
        professional: Some("Joana".to_string()),
        client_id: None,
    }
}

#[tokio::test]
#[serial]
async fn test_direct_booking_on_empty_day() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;
    let ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;

    let outcome = test.engine().booking.book(&ctx, corte_request(t(10, 0))).await.unwrap();

    let event = assert_matches!(outcome, BookingOutcome::Booked { event } => event);
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.start_time, t(10, 0));
    assert_eq!(event.end_time, t(10, 30));
    assert_eq!(event.professional.as_deref(), Some("Joana"));
    assert_eq!(event.client_id, Some(OWNER_ID));

    let stored = test.store.all_events().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(test.store.all_reminders().await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_conflict_reports_suggestions_from_requested_time() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;
    test.add_professional(bruna()).await;
    test.seed_event(event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_X)))
        .await;
    let ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;

    let outcome = test.engine().booking.book(&ctx, corte_request(t(10, 0))).await.unwrap();

    assert!(outcome.is_conflict());
    let (conflicts, suggestions, alternative) = assert_matches!(
        outcome,
        BookingOutcome::Conflict { conflicts, suggestions, alternative_professional } => (conflicts, suggestions, alternative_professional)
    );
    assert_eq!(conflicts.len(), 1);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].start, t(10, 30));
    assert!(suggestions.iter().all(|s| s.start >= t(10, 30)));
    assert_eq!(alternative.as_deref(), Some("Bruna"));
    assert_eq!(test.store.all_events().await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_client_books_for_themselves_and_owner_for_others() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;

    let client_ctx = test.ctx(CLIENT_X, utc(2025, 6, 1, 12, 0)).await;
    assert_eq!(client_ctx.business_id, OWNER_ID);
    let outcome = test.engine().booking.book(&client_ctx, corte_request(t(9, 0))).await.unwrap();
    let own = assert_matches!(outcome, BookingOutcome::Booked { event } => event);
    assert_eq!(own.client_id, Some(CLIENT_X));
    assert!(test.messenger.messages_for(CLIENT_X).await.is_empty());

    let owner_ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;
    let mut request = corte_request(t(11, 0));
    request.client_id = Some(CLIENT_Y);
    let outcome = test.engine().booking.book(&owner_ctx, request).await.unwrap();
    assert_matches!(outcome, BookingOutcome::Booked { .. });
    assert_eq!(test.messenger.messages_for(CLIENT_Y).await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_duration_resolved_from_professional() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    let ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;

    let request = BookingRequest {
        description: "escova".to_string(),
        services: vec!["escova".to_string()],
        date: d(2025, 6, 10),
        start_time: t(14, 0),
        duration_minutes: None,
        professional: Some("bruna".to_string()),
        client_id: None,
    };
    let outcome = test.engine().booking.book(&ctx, request).await.unwrap();
    let event = assert_matches!(outcome, BookingOutcome::Booked { event } => event);
    assert_eq!(event.end_time, t(14, 40));
}

#[tokio::test]
#[serial]
async fn test_split_package_waits_for_busy_professional() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    test.add_professional(carla()).await;
    test.seed_event(event("corte", d(2025, 6, 10), t(14, 0), 30, Some("Bruna"), Some(CLIENT_X)))
        .await;
    let ctx = test.ctx(CLIENT_Y, utc(2025, 6, 1, 12, 0)).await;

    let services = vec!["escova".to_string(), "hidratação".to_string()];
    let plan = test
        .engine()
        .split
        .plan_split(OWNER_ID, d(2025, 6, 10), t(14, 0), &services, Some("Bruna"))
        .await
        .unwrap()
        .expect("a plan exists");

    assert_eq!(plan.first.service, "escova");
    assert_eq!(plan.first.professional, "Bruna");
    assert!(plan.first.start >= t(14, 30));
    assert_eq!(plan.first.start, t(14, 40));
    let first_end = plan.first.range().unwrap().end;
    assert!(plan.second.start >= first_end);
    assert!(plan.wait_minutes <= 20);
    assert_eq!(plan.second.start, t(15, 20));

    let outcome = test.engine().booking.book_split_plan(&ctx, &plan, None).await.unwrap();
    let (first, second) = assert_matches!(outcome, SplitBookingOutcome::Booked { first, second } => (first, second));
    assert_eq!(first.client_id, Some(CLIENT_Y));
    assert_eq!(second.client_id, Some(CLIENT_Y));
    assert_eq!(test.store.all_events().await.len(), 3);
}

#[tokio::test]
#[serial]
async fn test_split_rejects_wrong_service_count() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;

    let result = test
        .engine()
        .split
        .plan_split(OWNER_ID, d(2025, 6, 10), t(14, 0), &["escova".to_string()], None)
        .await;
    assert_matches!(result, Err(SecretaryBotError::InvalidInput(_)));
}

#[tokio::test]
#[serial]
async fn test_fit_in_relocates_candidate_and_books_requester() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    let original = test
        .seed_event(event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(CLIENT_X)))
        .await;
    let now = utc(2025, 6, 1, 12, 0);

    let requester_ctx = test.ctx(REQUESTER_ID, now).await;
    let request = FitInRequest {
        description: "manicure".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 30,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: None,
    };
    let outcome = test.engine().fit_in.request_fit_in(&requester_ctx, request).await.unwrap();
    assert_eq!(outcome.status, FitInStatus::AwaitingResponses);

    let pendencies = test.store.all_pendencies().await;
    assert_eq!(pendencies.len(), 1);
    let candidate = &pendencies[0].candidates[0];
    assert_eq!(candidate.affected_client_id, CLIENT_X);
    assert_eq!(candidate.alternatives.len(), 3);
    assert!(candidate
        .alternatives
        .iter()
        .all(|slot| slot.date >= d(2025, 6, 10) && slot.date <= d(2025, 6, 14)));
    let offers = test.messenger.messages_for(CLIENT_X).await;
    assert_eq!(offers.len(), 1);
    assert!(offers[0].contains("1. ") && offers[0].contains("3. "));

    let chosen = candidate.alternatives[1];
    let client_ctx = test.ctx(CLIENT_X, now).await;
    let relocation = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&client_ctx, CLIENT_X, 2)
        .await
        .unwrap();

    let (relocated, fit_in) = assert_matches!(
        relocation.status,
        RelocationStatus::Relocated { relocated, fit_in } => (relocated, fit_in)
    );
    assert_eq!(relocated.client_id, Some(CLIENT_X));
    assert_eq!(relocated.date, chosen.date);
    assert_eq!(relocated.start_time, chosen.range.start);
    assert_eq!(fit_in.client_id, Some(REQUESTER_ID));
    assert_eq!(fit_in.start_time, t(16, 0));
    assert_eq!(fit_in.professional.as_deref(), Some("Carla"));
    assert_eq!(fit_in.status, EventStatus::FitInConfirmed);

    let events = test.store.all_events().await;
    assert_eq!(events.len(), 3);
    let old = events.iter().find(|e| e.id == original.id).unwrap();
    assert_eq!(old.status, EventStatus::Cancelled);

    let pendency = &test.store.all_pendencies().await[0];
    assert_eq!(pendency.status, PendencyStatus::Concluded);
    assert_eq!(pendency.candidates[0].response, CandidateResponse::Relocated);
    assert_eq!(test.messenger.messages_for(REQUESTER_ID).await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_fit_in_on_free_slot_books_directly() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    let ctx = test.ctx(REQUESTER_ID, utc(2025, 6, 1, 12, 0)).await;

    let request = FitInRequest {
        description: "manicure".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 30,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: None,
    };
    let outcome = test.engine().fit_in.request_fit_in(&ctx, request).await.unwrap();

    assert_eq!(outcome.status, FitInStatus::Booked);
    assert_eq!(outcome.event.unwrap().status, EventStatus::FitInConfirmed);
    assert!(test.store.all_pendencies().await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_fit_in_without_clients_in_slot_has_no_candidate() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    test.seed_event(event("pausa", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), None))
        .await;
    let ctx = test.ctx(REQUESTER_ID, utc(2025, 6, 1, 12, 0)).await;

    let request = FitInRequest {
        description: "manicure".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 30,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: None,
    };
    let outcome = test.engine().fit_in.request_fit_in(&ctx, request).await.unwrap();

    assert_eq!(outcome.status, FitInStatus::NoCandidate);
    assert_eq!(test.store.all_pendencies().await[0].status, PendencyStatus::NoCandidate);
}

#[tokio::test]
#[serial]
async fn test_expired_pendency_keeps_original_booking() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    test.seed_event(event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(CLIENT_X)))
        .await;
    let now = utc(2025, 6, 1, 12, 0);
    let ctx = test.ctx(REQUESTER_ID, now).await;
    let request = FitInRequest {
        description: "manicure".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 30,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: None,
    };
    test.engine().fit_in.request_fit_in(&ctx, request).await.unwrap();

    let later = utc(2025, 6, 3, 12, 0);
    let client_ctx = test.ctx(CLIENT_X, later).await;
    let outcome = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&client_ctx, CLIENT_X, 1)
        .await
        .unwrap();

    assert_eq!(outcome.status, RelocationStatus::Expired);
    assert_eq!(test.store.all_pendencies().await[0].status, PendencyStatus::Expired);
    assert_eq!(test.store.all_events().await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_recurrence_proposes_next_booking() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    for date in [d(2025, 4, 1), d(2025, 4, 15), d(2025, 4, 29)] {
        test.seed_event(event("escova", date, t(10, 0), 40, Some("Bruna"), Some(CLIENT_Y)))
            .await;
    }
    let ctx = RequestContext::for_business(OWNER_ID, utc(2025, 5, 6, 12, 0));

    let proposals = test
        .engine()
        .recurrence
        .propose_next_booking(&ctx, d(2025, 5, 6))
        .await
        .unwrap();

    assert_eq!(proposals.len(), 1);
    let proposal = &proposals[0];
    assert_eq!(proposal.client_id, CLIENT_Y);
    assert_eq!(proposal.cadence_days, 14);
    assert_eq!(proposal.last_booking, d(2025, 4, 29));
    assert_eq!(proposal.suggested_date, d(2025, 5, 13));
    assert_eq!(proposal.suggested_times, vec![t(10, 0), t(14, 0), t(16, 0)]);

    let messages = test.messenger.messages_for(CLIENT_Y).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("13/05/2025"));
    assert!(messages[0].contains("7 dias"));
}

#[tokio::test]
#[serial]
async fn test_recurrence_skips_client_with_upcoming_booking() {
    let test = TestApp::new().await;
    for date in [d(2025, 4, 1), d(2025, 4, 15), d(2025, 4, 29), d(2025, 5, 13)] {
        test.seed_event(event("escova", date, t(10, 0), 40, Some("Bruna"), Some(CLIENT_Y)))
            .await;
    }
    let ctx = RequestContext::for_business(OWNER_ID, utc(2025, 5, 6, 12, 0));

    let proposals = test
        .engine()
        .recurrence
        .propose_next_booking(&ctx, d(2025, 5, 6))
        .await
        .unwrap();
    assert!(proposals.is_empty());
    assert!(test.messenger.sent().await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_fit_in_with_two_candidates_relocates_first_to_answer() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    let booking_x = test
        .seed_event(event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(CLIENT_X)))
        .await;
    let booking_y = test
        .seed_event(event("manicure", d(2025, 6, 10), t(16, 30), 30, Some("Carla"), Some(CLIENT_Y)))
        .await;
    let now = utc(2025, 6, 1, 12, 0);

    let requester_ctx = test.ctx(REQUESTER_ID, now).await;
    let request = FitInRequest {
        description: "hidratação".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 60,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: None,
    };
    let outcome = test.engine().fit_in.request_fit_in(&requester_ctx, request).await.unwrap();
    assert_eq!(outcome.status, FitInStatus::AwaitingResponses);
    assert_eq!(test.store.all_pendencies().await[0].candidates.len(), 2);

    let ctx_y = test.ctx(CLIENT_Y, now).await;
    let relocation = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&ctx_y, CLIENT_Y, 1)
        .await
        .unwrap();
    let (relocated, fit_in) = assert_matches!(
        relocation.status,
        RelocationStatus::Relocated { relocated, fit_in } => (relocated, fit_in)
    );
    assert_eq!(relocated.client_id, Some(CLIENT_Y));
    assert_eq!(relocated.start_time, t(8, 0));
    assert_eq!(fit_in.client_id, Some(REQUESTER_ID));
    assert_eq!((fit_in.start_time, fit_in.end_time), (t(16, 0), t(17, 0)));

    let events = test.store.all_events().await;
    assert_eq!(events.len(), 4);
    let status_of = |id| events.iter().find(|e| e.id == id).unwrap().status;
    assert_eq!(status_of(booking_x.id), EventStatus::Confirmed);
    assert_eq!(status_of(booking_y.id), EventStatus::Cancelled);

    let pendency = &test.store.all_pendencies().await[0];
    assert_eq!(pendency.status, PendencyStatus::Concluded);
    let response_of = |client| {
        pendency
            .candidates
            .iter()
            .find(|c| c.affected_client_id == client)
            .unwrap()
            .response
    };
    assert_eq!(response_of(CLIENT_Y), CandidateResponse::Relocated);
    assert_eq!(response_of(CLIENT_X), CandidateResponse::Superseded);

    let to_x = test.messenger.messages_for(CLIENT_X).await;
    assert_eq!(to_x.len(), 2);
    assert!(to_x[1].contains("já foi resolvido"), "{}", to_x[1]);
    assert_eq!(test.messenger.messages_for(REQUESTER_ID).await.len(), 1);

    let ctx_x = test.ctx(CLIENT_X, now).await;
    let late = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&ctx_x, CLIENT_X, 1)
        .await
        .unwrap();
    assert_eq!(late.status, RelocationStatus::NoPendency);
    assert_eq!(test.store.all_events().await.len(), 4);
}

#[tokio::test]
#[serial]
async fn test_owner_requests_fit_in_for_a_client() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    let now = utc(2025, 6, 1, 12, 0);
    let request = FitInRequest {
        description: "manicure".to_string(),
        professional: Some("Carla".to_string()),
        duration_minutes: 30,
        date: d(2025, 6, 10),
        time: t(16, 0),
        client_id: Some(CLIENT_Y),
    };

    let owner_ctx = test.ctx(OWNER_ID, now).await;
    let outcome = test.engine().fit_in.request_fit_in(&owner_ctx, request.clone()).await.unwrap();
    assert_eq!(outcome.status, FitInStatus::Booked);
    assert_eq!(outcome.event.unwrap().client_id, Some(CLIENT_Y));

    let client_ctx = test.ctx(CLIENT_X, now).await;
    let result = test.engine().fit_in.request_fit_in(&client_ctx, request).await;
    assert_matches!(result, Err(SecretaryBotError::PermissionDenied(_)));
    assert_eq!(test.store.all_events().await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_split_from_off_grid_start_moves_onto_grid() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    test.seed_event(event("corte", d(2025, 6, 10), t(13, 30), 35, Some("Bruna"), Some(CLIENT_X)))
        .await;

    let services = vec!["escova".to_string(), "hidratação".to_string()];
    let plan = test
        .engine()
        .split
        .plan_split(OWNER_ID, d(2025, 6, 10), t(14, 3), &services, Some("Bruna"))
        .await
        .unwrap()
        .expect("a plan exists");

    assert_eq!(plan.first.start, t(14, 10));
    assert_eq!(plan.second.start, t(14, 50));
}
