//! Notification service implementation
//!
//! Outbound messages to clients and owners. Delivery is best-effort: a failed
//! send is logged and never rolls back the booking that triggered it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{prelude::Request, requests::Requester, types::ChatId, Bot};
use tokio::sync::Mutex;
use tracing::debug;

use crate::utils::errors::{Result, SecretaryBotError};
use crate::utils::logging::log_delivery_failure;

/// Transport for direct messages to a user id
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<()>;
}

/// Telegram transport; user ids are private chat ids
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(user_id), text)
            .send()
            .await
            .map_err(SecretaryBotError::Telegram)?;
        Ok(())
    }
}

/// Keeps every message in memory; used by tests and local runs
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    failing: Arc<Mutex<Vec<i64>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `user_id` fail
    pub async fn fail_for(&self, user_id: i64) {
        self.failing.lock().await.push(user_id);
    }

    pub async fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn messages_for(&self, user_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<()> {
        if self.failing.lock().await.contains(&user_id) {
            return Err(SecretaryBotError::InvalidInput(format!("chat {} is unreachable", user_id)));
        }
        self.sent.lock().await.push((user_id, text.to_string()));
        Ok(())
    }
}

/// Message templates, pt-BR
fn default_templates() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("booking_created", "✅ Agendamento registrado: {description} em {date} às {time}{professional}."),
        ("booking_cancelled", "❌ Agendamento cancelado: {description} em {date} às {time}."),
        ("split_created", "✅ Pacote agendado em {date}:\n1. {first}\n2. {second}"),
        ("fit_in_booked", "✅ Encaixe confirmado: {description} em {date} às {time}{professional}."),
        (
            "fit_in_offer",
            "Olá! Recebemos um pedido de encaixe no horário do seu agendamento de {description} ({date} às {time}).\n\
             Você poderia mudar para um destes horários?\n{options}\nResponda com o número da opção desejada.",
        ),
        (
            "fit_in_waiting",
            "⏳ O horário {date} às {time} está ocupado. Consultei {count} cliente(s) sobre uma troca e aviso assim que houver resposta.",
        ),
        ("fit_in_no_candidate", "Não há agendamentos que possam ser remanejados para liberar {date} às {time}."),
        ("fit_in_no_slot", "Não encontrei horários alternativos para remanejar os agendamentos de {date} às {time}."),
        ("relocation_confirmed", "✅ Obrigado! Seu agendamento de {description} foi remarcado para {date} às {time}."),
        ("fit_in_confirmed", "✅ Encaixe confirmado: {description} em {date} às {time}{professional}."),
        ("relocation_superseded", "O encaixe já foi resolvido. Seu agendamento de {description} em {date} às {time} continua confirmado."),
        ("fit_in_expired", "O pedido de encaixe para {date} às {time} expirou sem resposta dos clientes."),
        (
            "recurrence_proposal",
            "Olá! Já faz {days_since} dias desde seu último {service}. Que tal agendar para {date}? Horários disponíveis: {times}.",
        ),
    ])
}

#[derive(Clone)]
pub struct NotificationService {
    messenger: Arc<dyn Messenger>,
    templates: HashMap<&'static str, &'static str>,
}

impl NotificationService {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            templates: default_templates(),
        }
    }

    /// Format message using template and parameters
    pub fn format_message(&self, template_key: &str, parameters: &[(&str, String)]) -> Result<String> {
        let template = self
            .templates
            .get(template_key)
            .ok_or_else(|| SecretaryBotError::InvalidInput(format!("Template not found: {}", template_key)))?;

        let mut formatted = template.to_string();
        for (key, value) in parameters {
            formatted = formatted.replace(&format!("{{{}}}", key), value);
        }
        Ok(formatted)
    }

    /// Render and send; returns whether the message was delivered
    pub async fn notify(&self, user_id: i64, template_key: &str, parameters: &[(&str, String)]) -> bool {
        match self.format_message(template_key, parameters) {
            Ok(text) => self.send_text(user_id, &text).await,
            Err(e) => {
                log_delivery_failure(user_id, &e.to_string());
                false
            }
        }
    }

    /// Send raw text, best-effort
    pub async fn send_text(&self, user_id: i64, text: &str) -> bool {
        match self.messenger.send_direct_message(user_id, text).await {
            Ok(()) => {
                debug!(user_id, "Message delivered");
                true
            }
            Err(e) => {
                log_delivery_failure(user_id, &e.to_string());
                false
            }
        }
    }
}
