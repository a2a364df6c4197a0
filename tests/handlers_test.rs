//! Conversational layer tests
//!
//! Drives the bot the way Telegram messages would, without a Telegram server.

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;

use helpers::*;
use SecretaryBot::handlers::actions::{dispatch, handle_text, Action};
use SecretaryBot::handlers::commands::agenda::agenda_reply;
use SecretaryBot::handlers::commands::start::start_reply;
use SecretaryBot::models::{EventStatus, UserType};
use SecretaryBot::services::MaintenanceRunner;
use SecretaryBot::state::AwaitingReply;

#[tokio::test]
#[serial]
async fn test_book_action_from_json() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;

    let text = r#"{"action":"book","description":"corte","date":"2025-06-10","time":"10:00","duration_minutes":30,"professional":"Joana"}"#;
    let reply = handle_text(&test.app, CLIENT_X, text, utc(2025, 6, 1, 12, 0)).await;

    assert!(reply.contains("Agendado"), "{}", reply);
    let events = test.store.all_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].client_id, Some(CLIENT_X));
    assert_eq!(events[0].business_id, OWNER_ID);
}

#[tokio::test]
#[serial]
async fn test_conflict_reply_lists_free_times() {
    let test = TestApp::new().await;
    test.add_professional(joana()).await;
    test.seed_event(event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_Y)))
        .await;

    let text = r#"{"action":"book","description":"corte","date":"2025-06-10","time":"10:00","duration_minutes":30,"professional":"Joana"}"#;
    let reply = handle_text(&test.app, CLIENT_X, text, utc(2025, 6, 1, 12, 0)).await;

    assert!(reply.contains("ocupado"), "{}", reply);
    assert!(reply.contains("10:30"), "{}", reply);
}

#[tokio::test]
#[serial]
async fn test_unknown_action_and_bad_date_ask_for_clarification() {
    let test = TestApp::new().await;
    let now = utc(2025, 6, 1, 12, 0);

    let reply = handle_text(&test.app, CLIENT_X, r#"{"action":"drop_tables"}"#, now).await;
    assert!(reply.starts_with("Não consegui entender"), "{}", reply);

    let bad_date = r#"{"action":"check_availability","date":"31/02/2025","time":"10:00","duration_minutes":30}"#;
    let reply = handle_text(&test.app, CLIENT_X, bad_date, now).await;
    assert!(reply.starts_with("Não consegui entender"), "{}", reply);
    assert!(test.store.all_events().await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_free_text_gets_help_hint() {
    let test = TestApp::new().await;
    let reply = handle_text(&test.app, CLIENT_X, "bom dia", utc(2025, 6, 1, 12, 0)).await;
    assert!(reply.contains("/help"));
}

#[tokio::test]
#[serial]
async fn test_cancel_flow_uses_session_choice() {
    let test = TestApp::new().await;
    let first = test
        .seed_event(event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_X)))
        .await;
    let second = test
        .seed_event(event("escova", d(2025, 6, 12), t(15, 0), 40, Some("Bruna"), Some(CLIENT_X)))
        .await;
    test.seed_event(event("corte", d(2025, 6, 11), t(9, 0), 30, Some("Joana"), Some(CLIENT_Y)))
        .await;
    let now = utc(2025, 6, 1, 12, 0);

    let reply = handle_text(&test.app, CLIENT_X, r#"{"action":"cancel"}"#, now).await;
    assert!(reply.contains("1. ") && reply.contains("2. "), "{}", reply);
    assert!(!reply.contains("3. "), "{}", reply);

    let session = test.app.sessions.load_session(CLIENT_X, now).await.unwrap().unwrap();
    assert_eq!(
        session.awaiting,
        AwaitingReply::CancellationChoice {
            event_ids: vec![first.id, second.id]
        }
    );

    let reply = handle_text(&test.app, CLIENT_X, "2", now).await;
    assert!(reply.contains("Cancelado"), "{}", reply);

    let events = test.store.all_events().await;
    let status_of = |id| events.iter().find(|e| e.id == id).unwrap().status;
    assert_eq!(status_of(first.id), EventStatus::Confirmed);
    assert_eq!(status_of(second.id), EventStatus::Cancelled);
    assert!(test.app.sessions.load_session(CLIENT_X, now).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_numeric_reply_without_session_confirms_relocation() {
    let test = TestApp::new().await;
    test.add_professional(carla()).await;
    test.seed_event(event("manicure", d(2025, 6, 10), t(16, 0), 30, Some("Carla"), Some(CLIENT_X)))
        .await;
    let now = utc(2025, 6, 1, 12, 0);

    let fit_in = r#"{"action":"fit_in","description":"manicure","date":"2025-06-10","time":"16:00","duration_minutes":30,"professional":"Carla"}"#;
    let reply = handle_text(&test.app, REQUESTER_ID, fit_in, now).await;
    assert!(reply.contains("1 cliente"), "{}", reply);

    let reply = handle_text(&test.app, CLIENT_X, "opção 2", now).await;
    assert!(reply.contains("remarcado"), "{}", reply);
    assert_eq!(test.store.all_events().await.len(), 3);

    let reply = handle_text(&test.app, CLIENT_X, "1", now).await;
    assert!(reply.contains("Não há nenhuma proposta"), "{}", reply);
}

#[tokio::test]
#[serial]
async fn test_agenda_hides_other_clients() {
    let test = TestApp::new().await;
    test.seed_event(event("corte", d(2025, 6, 10), t(10, 0), 30, Some("Joana"), Some(CLIENT_X)))
        .await;
    test.seed_event(event("escova", d(2025, 6, 10), t(11, 0), 40, Some("Joana"), Some(CLIENT_Y)))
        .await;

    let owner_view = agenda_reply(&test.app, OWNER_ID, "2025-06-10").await;
    assert!(owner_view.contains("corte") && owner_view.contains("escova"), "{}", owner_view);

    let client_view = agenda_reply(&test.app, CLIENT_X, "2025-06-10").await;
    assert!(client_view.contains("corte"), "{}", client_view);
    assert!(!client_view.contains("escova"), "{}", client_view);
}

#[tokio::test]
#[serial]
async fn test_split_action_books_both_legs() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    let ctx = test.ctx(CLIENT_Y, utc(2025, 6, 1, 12, 0)).await;

    let action = Action::SplitBooking {
        services: vec!["escova".to_string(), "hidratação".to_string()],
        date: "2025-06-10".to_string(),
        time: "14:00".to_string(),
        professional: Some("Bruna".to_string()),
        client_id: None,
    };
    let reply = dispatch(&test.app, &ctx, action).await.unwrap();

    assert!(reply.contains("Pacote agendado"), "{}", reply);
    assert_eq!(test.store.all_events().await.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_start_registers_client_with_owner() {
    let test = TestApp::new().await;
    let new_client = 900;

    let reply = start_reply(&test.app, new_client, Some("Marina"), &OWNER_ID.to_string())
        .await
        .unwrap();
    assert!(reply.contains("Marina"));
    let profile = test.app.database.profiles.get_profile(new_client).await.unwrap().unwrap();
    assert_eq!(profile.user_type, UserType::Client);
    assert_eq!(profile.effective_business_id(), OWNER_ID);

    let owner = 901;
    let reply = start_reply(&test.app, owner, None, "").await.unwrap();
    assert!(reply.contains(&format!("/start {}", owner)), "{}", reply);

    let result = start_reply(&test.app, 902, None, &new_client.to_string()).await;
    assert_matches!(result, Err(SecretaryBot::SecretaryBotError::InvalidInput(_)));
}

#[tokio::test]
#[serial]
async fn test_maintenance_runs_recurrence_and_expiry() {
    let test = TestApp::new().await;
    test.add_professional(bruna()).await;
    for date in [d(2025, 4, 1), d(2025, 4, 15), d(2025, 4, 29)] {
        test.seed_event(event("escova", date, t(10, 0), 40, Some("Bruna"), Some(CLIENT_Y)))
            .await;
    }

    let runner = MaintenanceRunner::new(
        test.app.database.clone(),
        test.app.engine.clone(),
        test.app.settings.recurrence.clone(),
    );
    let report = runner.run_once(utc(2025, 5, 6, 12, 0)).await.unwrap();

    assert_eq!(report.businesses, 1);
    assert_eq!(report.proposals, 1);
    assert_eq!(report.expired_pendencies, 0);
    assert_eq!(report.failures, 0);
    assert_eq!(test.messenger.messages_for(CLIENT_Y).await.len(), 1);
}
