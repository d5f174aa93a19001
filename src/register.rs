//! Subscriber self-registration.
//!
//! A chat that sends `/start` is added to the registry (once), greeted, and
//! shown every listing currently in the store. The listener runs as its own
//! task, independent of the scheduler, and shares the store with it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use listing_watch_core::models::Subscriber;
use listing_watch_core::notify::{Message, Notifier};
use listing_watch_core::store::{RecordStore, Store, SubscriberStore};

use crate::telegram::{is_registration_command, TelegramBot};

pub const GREETING: &str = "Юху, будем шукати нову машинку ✅";
pub const EMPTY_STORE: &str = "На даний момент авто немає в базі 📭";

/// Pause after a failed `getUpdates` call before polling again.
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// What happened for one registration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// `true` when the chat was not registered before.
    pub newly_registered: bool,
    /// Stored listings sent after the greeting.
    pub listings_sent: u64,
}

/// Register `chat_id` and send the greeting plus the stored listings.
///
/// The registry insert happens before any message, so a chat that blocks
/// the bot mid-way is still registered.
pub async fn handle_registration<S, N>(chat_id: i64, store: &S, notifier: &N) -> Result<RegistrationOutcome>
where
    S: RecordStore + SubscriberStore + ?Sized,
    N: Notifier + ?Sized,
{
    let newly_registered = match store.find_subscriber(chat_id).await? {
        Some(_) => false,
        None => store.insert_subscriber(Subscriber::new(chat_id)).await?,
    };
    if newly_registered {
        info!(chat_id, "registered new subscriber");
    }

    notifier.send(chat_id, &Message::text(GREETING)).await?;

    let records = store.find_all().await?;
    if records.is_empty() {
        notifier.send(chat_id, &Message::text(EMPTY_STORE)).await?;
        return Ok(RegistrationOutcome {
            newly_registered,
            listings_sent: 0,
        });
    }

    notifier
        .send(
            chat_id,
            &Message::text(format!("Наразі в базі {} авто:", records.len())),
        )
        .await?;

    let mut listings_sent = 0;
    for record in &records {
        notifier.send(chat_id, &Message::stored_record(record)).await?;
        listings_sent += 1;
    }

    Ok(RegistrationOutcome {
        newly_registered,
        listings_sent,
    })
}

/// Long-poll the bot for `/start` commands until the task is aborted.
pub async fn run_listener(bot: Arc<TelegramBot>, store: Arc<dyn Store>) {
    let mut offset = 0i64;
    info!("registration listener started");

    loop {
        let updates = match bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed");
                tokio::time::sleep(POLL_ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let is_start = message.text.as_deref().is_some_and(is_registration_command);
            if !is_start {
                debug!(chat_id = message.chat.id, "ignoring non-command message");
                continue;
            }

            let chat_id = message.chat.id;
            match handle_registration(chat_id, store.as_ref(), bot.as_ref()).await {
                Ok(outcome) => debug!(chat_id, ?outcome, "handled /start"),
                Err(e) => warn!(chat_id, error = %e, "failed to handle /start"),
            }
        }
    }
}
