//! Invariants of the scheduling engine

mod helpers;

use assert_matches::assert_matches;
use proptest::prelude::*;
use serial_test::serial;

use helpers::*;
use SecretaryBot::database::{EventStore, PendencyStore, RelocationWrite, SaveOutcome};
use SecretaryBot::models::{EventStatus, PendencyStatus};
use SecretaryBot::scheduling::recurrence::cadence_from_dates;
use SecretaryBot::scheduling::{
    find_conflicts, suggest_slots, BookingOutcome, BookingRequest, FitInRequest, RelocationStatus,
    SplitBookingOutcome,
};
use SecretaryBot::utils::time::TimeRange;

fn range_from(start_minute: u32, minutes: u32) -> TimeRange {
    let start = chrono::NaiveTime::from_num_seconds_from_midnight_opt(start_minute * 60, 0).unwrap();
    TimeRange::from_duration(start, minutes).unwrap()
}

proptest! {
    #[test]
    fn prop_events_without_professional_never_conflict(
        event_start in 480u32..1020,
        event_len in 10u32..120,
        query_start in 480u32..1020,
        query_len in 10u32..120,
    ) {
        let busy = range_from(event_start, event_len);
        let unassigned = event("corte", d(2025, 6, 10), busy.start, event_len, None, Some(CLIENT_X));
        let query = range_from(query_start, query_len);

        prop_assert!(find_conflicts(&[unassigned], d(2025, 6, 10), query, "Joana", &[]).is_empty());
    }

    #[test]
    fn prop_overlap_is_symmetric(
        a_start in 0u32..1300,
        a_len in 1u32..120,
        b_start in 0u32..1300,
        b_len in 1u32..120,
    ) {
        let a = range_from(a_start, a_len);
        let b = range_from(b_start, b_len);
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn prop_excluded_event_never_conflicts_with_itself(start in 480u32..1000, len in 10u32..90) {
        let range = range_from(start, len);
        let own = event("corte", d(2025, 6, 10), range.start, len, Some("Joana"), Some(CLIENT_X));
        let id = own.id;
        prop_assert!(find_conflicts(&[own], d(2025, 6, 10), range, "Joana", &[id]).is_empty());
    }

    #[test]
    fn prop_suggested_slots_are_conflict_free(
        busy in proptest::collection::vec((480u32..1020, 10u32..90), 0..6),
        duration in 10u32..120,
    ) {
        let events: Vec<_> = busy
            .iter()
            .map(|(start, len)| {
                let range = range_from(*start, *len);
                event("corte", d(2025, 6, 10), range.start, *len, Some("Joana"), Some(CLIENT_X))
            })
            .collect();
        let occupied: Vec<TimeRange> = events.iter().map(|e| e.time_range()).collect();
        let window = TimeRange::new(t(8, 0), t(18, 0)).unwrap();

        for slot in suggest_slots(window, &occupied, duration, 5) {
            prop_assert!(slot.start >= window.start && slot.end <= window.end);
            prop_assert!(find_conflicts(&events, d(2025, 6, 10), slot, "Joana", &[]).is_empty());
        }
    }

    #[test]
    fn prop_cadence_stays_in_bounds(offsets in proptest::collection::vec(0i64..400, 0..8)) {
        let base = d(2024, 1, 1);
        let dates: Vec<_> = offsets.iter().map(|o| base + chrono::Duration::days(*o)).collect();
        let distinct: std::collections::BTreeSet<_> = dates.iter().collect();

        if let Some(cadence) = cadence_from_dates(&dates, 3, 10, 35) {
            prop_assert!((10..=35).contains(&cadence));
            prop_assert!(distinct.len() >= 3);
        }
    }
}

#[tokio::test]
#[serial]
async fn test_split_plan_legs_are_free_for_their_professionals() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    test.add_professional(carla()).await;
    test.seed_event(event("corte", d(2025, 6, 10), t(9, 0), 60, Some("Bruna"), Some(CLIENT_X)))
        .await;
    test.seed_event(event("manicure", d(2025, 6, 10), t(9, 30), 90, Some("Carla"), Some(CLIENT_X)))
        .await;

    let services = vec!["escova".to_string(), "hidratacao".to_string()];
    let plan = test
        .engine()
        .split
        .plan_split(OWNER_ID, d(2025, 6, 10), t(8, 30), &services, None)
        .await
        .unwrap()
        .expect("a plan exists");

    let checker = &test.engine().checker;
    for leg in [&plan.first, &plan.second] {
        let conflicts = checker
            .check_conflict(OWNER_ID, plan.date, leg.start, leg.duration_minutes, &leg.professional, &[])
            .await
            .unwrap();
        assert!(conflicts.is_empty(), "{} at {} conflicts", leg.professional, leg.start);
    }
    assert!(plan.second.start >= plan.first.range().unwrap().end);
}

#[tokio::test]
#[serial]
async fn test_cancellation_is_soft_and_frees_the_slot() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;
    let ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;
    let request = BookingRequest {
        description: "corte".to_string(),
        services: vec![],
        date: d(2025, 6, 10),
        start_time: t(10, 0),
        duration_minutes: Some(30),
        professional: Some("Joana".to_string()),
        client_id: Some(CLIENT_X),
    };
    let booked = assert_matches!(
        test.engine().booking.book(&ctx, request.clone()).await.unwrap(),
        BookingOutcome::Booked { event } => event
    );

    let cancelled = test.engine().booking.cancel(&ctx, booked.id).await.unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    let stored = test.engine().accessor.get_event(OWNER_ID, booked.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EventStatus::Cancelled);
    let conflicts = test
        .engine()
        .checker
        .check_conflict(OWNER_ID, d(2025, 6, 10), t(10, 0), 30, "Joana", &[])
        .await
        .unwrap();
    assert!(conflicts.is_empty());
    assert_matches!(
        test.engine().booking.book(&ctx, request).await.unwrap(),
        BookingOutcome::Booked { .. }
    );
}

#[tokio::test]
#[serial]
async fn test_client_cannot_cancel_someone_elses_booking() {
    let test = TestApp::new().await;
    let theirs = test
        .seed_event(event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_X)))
        .await;
    let ctx = test.ctx(CLIENT_Y, utc(2025, 6, 1, 12, 0)).await;

    let result = test.engine().booking.cancel(&ctx, theirs.id).await;
    assert_matches!(result, Err(SecretaryBot::SecretaryBotError::PermissionDenied(_)));
    assert_eq!(test.store.all_events().await[0].status, EventStatus::Confirmed);
}

async fn open_fit_in(test: &TestApp) {
    test.add_professional(carla()).await;
    test.seed_event(event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(CLIENT_X)))
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
    test.engine().fit_in.request_fit_in(&ctx, request).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_invalid_option_changes_nothing() {
    let test = TestApp::new().await;
    open_fit_in(&test).await;
    let before = test.store.all_events().await;

    let ctx = test.ctx(CLIENT_X, utc(2025, 6, 1, 13, 0)).await;
    let outcome = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&ctx, CLIENT_X, 7)
        .await
        .unwrap();

    assert_eq!(outcome.status, RelocationStatus::InvalidOption { available: 3 });
    assert_eq!(test.store.all_events().await, before);
    assert_eq!(test.store.all_pendencies().await[0].status, PendencyStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_taken_alternative_changes_nothing() {
    let test = TestApp::new().await;
    open_fit_in(&test).await;
    let chosen = test.store.all_pendencies().await[0].candidates[0].alternatives[0];
    test.seed_event(event(
        "manicure",
        chosen.date,
        chosen.range.start,
        30,
        Some("Carla"),
        Some(CLIENT_Y),
    ))
    .await;
    let before = test.store.all_events().await;

    let ctx = test.ctx(CLIENT_X, utc(2025, 6, 1, 13, 0)).await;
    let outcome = test
        .engine()
        .fit_in
        .confirm_relocation_choice(&ctx, CLIENT_X, 1)
        .await
        .unwrap();

    assert_eq!(outcome.status, RelocationStatus::SlotTaken);
    assert_eq!(test.store.all_events().await, before);
    assert_eq!(test.store.all_pendencies().await[0].status, PendencyStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_store_failure_is_reported() {
    let test = TestApp::new().await;
    let ctx = test.ctx(OWNER_ID, utc(2025, 6, 1, 12, 0)).await;
    test.store.set_unavailable(true);

    let result = test
        .engine()
        .checker
        .check_conflict(ctx.business_id, d(2025, 6, 10), t(10, 0), 30, "Joana", &[])
        .await;
    assert_matches!(result, Err(SecretaryBot::SecretaryBotError::StoreUnavailable(_)));
}

#[tokio::test]
#[serial]
async fn test_booking_that_loses_the_race_reports_conflict() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;
    let rival = event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_Y));
    test.racing.arm(0, rival.clone());

    let ctx = test.ctx(CLIENT_X, utc(2025, 6, 1, 12, 0)).await;
    let request = BookingRequest {
        description: "corte".to_string(),
        services: vec![],
        date: d(2025, 6, 10),
        start_time: t(10, 0),
        duration_minutes: Some(30),
        professional: Some("Joana".to_string()),
        client_id: None,
    };
    let outcome = test.engine().booking.book(&ctx, request).await.unwrap();

    let (conflicts, suggestions) = assert_matches!(
        outcome,
        BookingOutcome::Conflict { conflicts, suggestions, .. } => (conflicts, suggestions)
    );
    assert_eq!(conflicts[0].event_id, rival.id);
    assert_eq!(suggestions[0].start, t(10, 30));
    let events = test.store.all_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].client_id, Some(CLIENT_Y));
    assert!(test.store.all_reminders().await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_split_booking_rolls_back_first_leg_when_second_is_lost() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    let ctx = test.ctx(CLIENT_X, utc(2025, 6, 1, 12, 0)).await;
    let services = vec!["escova".to_string(), "hidratação".to_string()];
    let plan = test
        .engine()
        .split
        .plan_split(OWNER_ID, d(2025, 6, 10), t(14, 0), &services, Some("Bruna"))
        .await
        .unwrap()
        .expect("a plan exists");

    let rival = event(
        "hidratação",
        plan.date,
        plan.second.start,
        plan.second.duration_minutes,
        Some("Bruna"),
        Some(CLIENT_Y),
    );
    test.racing.arm(1, rival.clone());

    let outcome = test.engine().booking.book_split_plan(&ctx, &plan, None).await.unwrap();
    assert_eq!(outcome, SplitBookingOutcome::SlotTaken);

    let events = test.store.all_events().await;
    assert_eq!(events.len(), 2);
    let first_leg = events.iter().find(|e| e.client_id == Some(CLIENT_X)).unwrap();
    assert_eq!(first_leg.start_time, plan.first.start);
    assert_eq!(first_leg.status, EventStatus::Cancelled);
    let kept = events.iter().find(|e| e.id == rival.id).unwrap();
    assert_eq!(kept.status, EventStatus::Confirmed);
}

#[tokio::test]
#[serial]
async fn test_relocation_against_closed_pendency_writes_nothing() {
    let test = TestApp::new().await;
    open_fit_in(&test).await;
    let now = utc(2025, 6, 1, 13, 0);
    let pendency = test.store.all_pendencies().await[0].clone();
    let candidate = pendency.candidates[0].clone();

    let mut closed = pendency.clone();
    closed.close(PendencyStatus::Expired, now).unwrap();
    test.store.update_pendency(&closed).await.unwrap();
    let before = test.store.all_events().await;

    let mut concluded = pendency.clone();
    concluded.conclude(CLIENT_X, now).unwrap();
    let slot = candidate.alternatives[0];
    let write = RelocationWrite {
        business_id: OWNER_ID,
        original_event_id: candidate.event_id,
        relocated: candidate.original_event.relocated_copy(slot.date, slot.range, now),
        fit_in: event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(REQUESTER_ID)),
        sibling_event_ids: vec![],
        pendency: concluded,
    };

    assert_eq!(test.store.apply_relocation(&write).await.unwrap(), SaveOutcome::Missing);
    assert_eq!(test.store.all_events().await, before);
    assert_eq!(test.store.all_pendencies().await[0].status, PendencyStatus::Expired);
}
