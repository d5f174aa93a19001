//! Notification messages and fan-out to subscribers.
//!
//! The transport is abstracted behind [`Notifier`]; the fan-out walks new
//! records in diff order and, for each record, every subscriber in registry
//! order. Each (record, subscriber) pair is attempted exactly once per call.
//! A failed send is logged and counted, then the walk continues.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Record, Subscriber};

/// Caption of the single link button attached to listing messages.
pub const LINK_BUTTON_TEXT: &str = "Перейти на сайт";

/// An inline button that opens a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

/// An outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
    pub button: Option<LinkButton>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            button: None,
        }
    }

    /// Alert for a record the diff engine just accepted.
    pub fn new_record(record: &Record) -> Self {
        Self {
            text: format!(
                "🚗 Нова машина: {} ({})\n💰 Ціна: {}",
                record.title,
                record.year,
                record.price_or_dash()
            ),
            button: Some(link_button(record)),
        }
    }

    /// Summary line for a record already in the store, sent on registration.
    pub fn stored_record(record: &Record) -> Self {
        Self {
            text: format!(
                "🚗 {} ({})\n💰 {}",
                record.title,
                record.year,
                record.price_or_dash()
            ),
            button: Some(link_button(record)),
        }
    }
}

fn link_button(record: &Record) -> LinkButton {
    LinkButton {
        text: LINK_BUTTON_TEXT.to_string(),
        url: record.link.clone(),
    }
}

/// Push-message transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to one chat.
    async fn send(&self, chat_id: i64, message: &Message) -> Result<()>;
}

/// Outcome counters for one fan-out call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub attempted: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Send one alert per (record, subscriber) pair.
pub async fn fan_out<N>(records: &[Record], subscribers: &[Subscriber], notifier: &N) -> FanOutReport
where
    N: Notifier + ?Sized,
{
    let mut report = FanOutReport::default();

    for record in records {
        let message = Message::new_record(record);
        for subscriber in subscribers {
            report.attempted += 1;
            match notifier.send(subscriber.id, &message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        car_id = %record.car_id,
                        subscriber = subscriber.id,
                        error = %e,
                        "failed to deliver notification"
                    );
                }
            }
        }
    }

    report
}
