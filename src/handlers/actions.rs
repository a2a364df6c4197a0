//! Structured actions
//!
//! The extraction layer turns free text into one of a closed set of actions,
//! sent to the bot as a JSON object tagged by `action`. Unknown tags fail to
//! deserialize here and never reach the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::models::Event;
use crate::scheduling::{
    BookingOutcome, BookingRequest, FitInRequest, RequestContext, SplitBookingOutcome,
};
use crate::state::{AppContext, AwaitingReply, SessionContext};
use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::helpers::{format_date, format_time, parse_date, parse_option_number, parse_time, truncate_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Book {
        description: String,
        #[serde(default)]
        services: Vec<String>,
        date: String,
        time: String,
        duration_minutes: Option<u32>,
        professional: Option<String>,
        client_id: Option<i64>,
    },
    CheckAvailability {
        date: String,
        time: String,
        duration_minutes: u32,
        professional: Option<String>,
    },
    SplitBooking {
        services: Vec<String>,
        date: String,
        time: String,
        professional: Option<String>,
        client_id: Option<i64>,
    },
    FitIn {
        description: String,
        date: String,
        time: String,
        duration_minutes: u32,
        professional: Option<String>,
        client_id: Option<i64>,
    },
    ChooseOption {
        option: usize,
    },
    Cancel {
        event_id: Option<Uuid>,
    },
    ListAgenda {
        date: Option<String>,
    },
}

impl Action {
    /// Parse a JSON action, rejecting unknown action names
    pub fn parse(text: &str) -> Result<Action> {
        serde_json::from_str(text)
            .map_err(|e| SecretaryBotError::InvalidInput(format!("Ação não reconhecida: {}", e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Book { .. } => "book",
            Action::CheckAvailability { .. } => "check_availability",
            Action::SplitBooking { .. } => "split_booking",
            Action::FitIn { .. } => "fit_in",
            Action::ChooseOption { .. } => "choose_option",
            Action::Cancel { .. } => "cancel",
            Action::ListAgenda { .. } => "list_agenda",
        }
    }
}

/// Run one action and render the reply to the caller
pub async fn dispatch(app: &AppContext, ctx: &RequestContext, action: Action) -> Result<String> {
    debug!(caller_id = ctx.caller_id, business_id = ctx.business_id, action = action.name(), "Dispatching action");
    let engine = &app.engine;

    match action {
        Action::Book {
            description,
            services,
            date,
            time,
            duration_minutes,
            professional,
            client_id,
        } => {
            let request = BookingRequest {
                description,
                services,
                date: parse_date(&date)?,
                start_time: parse_time(&time)?,
                duration_minutes,
                professional,
                client_id,
            };
            let outcome = engine.booking.book(ctx, request).await?;
            Ok(render_booking(&outcome))
        }
        Action::CheckAvailability {
            date,
            time,
            duration_minutes,
            professional,
        } => {
            let report = engine
                .booking
                .check_availability(
                    ctx,
                    parse_date(&date)?,
                    parse_time(&time)?,
                    duration_minutes,
                    professional.as_deref().unwrap_or_default(),
                )
                .await?;
            if report.available {
                Ok(format!("✅ {} às {} está livre.", date, time))
            } else {
                Ok(format!(
                    "⚠️ Esse horário está ocupado. Horários livres: {}.",
                    render_times(report.suggestions.iter().map(|s| s.start))
                ))
            }
        }
        Action::SplitBooking {
            services,
            date,
            time,
            professional,
            client_id,
        } => {
            let date = parse_date(&date)?;
            let plan = engine
                .split
                .plan_split(ctx.business_id, date, parse_time(&time)?, &services, professional.as_deref())
                .await?;
            let Some(plan) = plan else {
                return Ok("Não encontrei uma combinação de horários para esses dois serviços nesse dia.".to_string());
            };
            match engine.booking.book_split_plan(ctx, &plan, client_id).await? {
                SplitBookingOutcome::Booked { first, second } => Ok(format!(
                    "✅ Pacote agendado em {}:\n1. {}\n2. {}",
                    format_date(date),
                    render_event_line(&first),
                    render_event_line(&second)
                )),
                SplitBookingOutcome::SlotTaken => {
                    Ok("Um dos horários acabou de ser ocupado. Tente novamente.".to_string())
                }
            }
        }
        Action::FitIn {
            description,
            date,
            time,
            duration_minutes,
            professional,
            client_id,
        } => {
            let request = FitInRequest {
                description,
                professional,
                duration_minutes,
                date: parse_date(&date)?,
                time: parse_time(&time)?,
                client_id,
            };
            Ok(engine.fit_in.request_fit_in(ctx, request).await?.message)
        }
        Action::ChooseOption { option } => handle_option(app, ctx, option).await,
        Action::Cancel { event_id: Some(event_id) } => {
            let event = engine.booking.cancel(ctx, event_id).await?;
            Ok(format!("❌ Cancelado: {}", render_event_line(&event)))
        }
        Action::Cancel { event_id: None } => offer_cancellation(app, ctx).await,
        Action::ListAgenda { date } => {
            let date = match date {
                Some(date) => parse_date(&date)?,
                None => ctx.local_today(engine.timezone()),
            };
            let events = engine.booking.list_day(ctx, date).await?;
            Ok(render_agenda(date, &events))
        }
    }
}

/// A numeric reply: a pending cancellation choice wins over a relocation offer
pub async fn handle_option(app: &AppContext, ctx: &RequestContext, option: usize) -> Result<String> {
    if let Some(session) = app.sessions.load_session(ctx.caller_id, ctx.now).await? {
        return match session.awaiting {
            AwaitingReply::CancellationChoice { .. } => {
                let Some(event_id) = session.cancellation_target(option) else {
                    return Ok("Opção inválida. Responda com um dos números da lista.".to_string());
                };
                app.sessions.delete_session(ctx.caller_id).await?;
                let event = app.engine.booking.cancel(ctx, event_id).await?;
                Ok(format!("❌ Cancelado: {}", render_event_line(&event)))
            }
        };
    }

    let outcome = app
        .engine
        .fit_in
        .confirm_relocation_choice(ctx, ctx.caller_id, option)
        .await?;
    Ok(outcome.message)
}

async fn offer_cancellation(app: &AppContext, ctx: &RequestContext) -> Result<String> {
    let today = ctx.local_today(app.engine.timezone());
    let events = app.engine.booking.list_cancellable(ctx, today).await?;
    if events.is_empty() {
        return Ok("Você não tem agendamentos futuros para cancelar.".to_string());
    }

    let session = SessionContext::new(
        ctx.caller_id,
        AwaitingReply::CancellationChoice {
            event_ids: events.iter().map(|e| e.id).collect(),
        },
        ctx.now,
        app.settings.redis.ttl_seconds,
    );
    app.sessions.save_session(&session).await?;

    let lines = events
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, render_event_line(e)))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("Qual agendamento deseja cancelar?\n{}\nResponda com o número.", lines))
}

/// Route one incoming text: numeric replies, JSON actions, anything else gets a hint.
/// Never fails; errors become a user-facing reply.
pub async fn handle_text(app: &AppContext, user_id: i64, text: &str, now: DateTime<Utc>) -> String {
    let ctx = match app.engine.context_for(user_id, now).await {
        Ok(ctx) => ctx,
        Err(e) => return render_error(&e),
    };

    let result = if text.trim_start().starts_with('{') {
        match Action::parse(text) {
            Ok(action) => dispatch(app, &ctx, action).await,
            Err(e) => Err(e),
        }
    } else if let Some(option) = parse_option_number(text) {
        handle_option(app, &ctx, option).await
    } else {
        Ok("Não entendi. Use /help para ver o que posso fazer.".to_string())
    };

    result.unwrap_or_else(|e| render_error(&e))
}

pub fn render_error(error: &SecretaryBotError) -> String {
    if !error.is_user_facing() {
        error!(error = %error, severity = %error.severity(), recoverable = error.is_recoverable(), "Action failed");
        return if error.is_recoverable() {
            "Estou com instabilidade no momento. Tente novamente em instantes.".to_string()
        } else {
            "Desculpe, ocorreu um erro ao processar seu pedido.".to_string()
        };
    }

    match error {
        SecretaryBotError::InvalidInput(message) => {
            warn!(error = %message, "Invalid input");
            format!("Não consegui entender: {}. Pode reformular?", message)
        }
        SecretaryBotError::PermissionDenied(_) => "Você não tem permissão para essa ação.".to_string(),
        SecretaryBotError::EventNotFound { .. } => "Agendamento não encontrado.".to_string(),
        SecretaryBotError::PendencyNotFound { .. } => {
            "Não há nenhuma proposta aguardando sua resposta.".to_string()
        }
        _ => "Desculpe, ocorreu um erro ao processar seu pedido.".to_string(),
    }
}

fn render_booking(outcome: &BookingOutcome) -> String {
    match outcome {
        BookingOutcome::Booked { event } => format!("✅ Agendado: {}", render_event_line(event)),
        BookingOutcome::Conflict {
            suggestions,
            alternative_professional,
            ..
        } => {
            let mut text = "⚠️ Esse horário já está ocupado.".to_string();
            if !suggestions.is_empty() {
                text.push_str(&format!(
                    " Horários livres: {}.",
                    render_times(suggestions.iter().map(|s| s.start))
                ));
            }
            if let Some(name) = alternative_professional {
                text.push_str(&format!(" {} está disponível no horário pedido.", name));
            }
            text
        }
    }
}

fn render_times(times: impl Iterator<Item = chrono::NaiveTime>) -> String {
    let rendered: Vec<String> = times.map(format_time).collect();
    if rendered.is_empty() {
        "nenhum neste dia".to_string()
    } else {
        rendered.join(", ")
    }
}

fn render_event_line(event: &Event) -> String {
    let mut line = format!(
        "{} {}-{} {}",
        format_date(event.date),
        format_time(event.start_time),
        format_time(event.end_time),
        truncate_text(&event.description, 60)
    );
    if let Some(professional) = &event.professional {
        line.push_str(&format!(" com {}", professional));
    }
    line
}

pub fn render_agenda(date: NaiveDate, events: &[Event]) -> String {
    if events.is_empty() {
        return format!("📅 Nenhum agendamento em {}.", format_date(date));
    }
    let lines = events
        .iter()
        .map(|e| format!("• {}", render_event_line(e)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("📅 Agenda de {}:\n{}", format_date(date), lines)
}
