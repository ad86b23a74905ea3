//! Channel listener
//!
//! Long-polls the Bot API for channel posts, turns each into an [`Event`],
//! and hands it to the [`Dispatcher`]. One event is handled at a time; a
//! slow download holds up the next poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lcdl_telegram::{BotClient, TelegramError, Update};
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchOutcome, Dispatcher, DocumentPosted, Event, TextPosted};
use crate::ingest::RemoteFiles;

/// Source of raw updates.
pub trait UpdateSource {
    fn poll(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError>;
}

impl UpdateSource for BotClient {
    fn poll(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        self.get_updates(offset, timeout)
    }
}

impl<T: UpdateSource + ?Sized> UpdateSource for &T {
    fn poll(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        (**self).poll(offset, timeout)
    }
}

/// Convert a channel post into an event. Other update kinds yield `None`.
pub fn event_from_update(update: &Update) -> Option<Event> {
    let post = update.channel_post.as_ref()?;
    let posted_at = DateTime::<Utc>::from_timestamp(post.date, 0).unwrap_or_default();

    if let Some(doc) = &post.document {
        return Some(Event::DocumentPosted(DocumentPosted {
            chat_id: post.chat.id,
            posted_at,
            file_name: doc.file_name.clone().unwrap_or_default(),
            mime_type: doc.mime_type.clone(),
            size_bytes: doc.file_size.unwrap_or(0),
            remote_file_id: doc.file_id.clone(),
        }));
    }

    post.text.as_ref().map(|text| {
        Event::TextPosted(TextPosted {
            chat_id: post.chat.id,
            posted_at,
            text: text.clone(),
        })
    })
}

/// Polling loop settings.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Long-poll timeout per `getUpdates` call.
    pub timeout: Duration,
    /// Back-off after a failed poll.
    pub retry_interval: Duration,
}

pub struct Listener<S, R> {
    source: S,
    dispatcher: Dispatcher<R>,
    settings: PollSettings,
    offset: Option<i64>,
}

impl<S: UpdateSource, R: RemoteFiles> Listener<S, R> {
    pub fn new(source: S, dispatcher: Dispatcher<R>, settings: PollSettings) -> Self {
        Self {
            source,
            dispatcher,
            settings,
            offset: None,
        }
    }

    /// Next update id that will be requested.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Fetch one batch of updates and dispatch them in order.
    pub fn poll_once(&mut self) -> Result<Vec<DispatchOutcome>, TelegramError> {
        let updates = self.source.poll(self.offset, self.settings.timeout)?;
        let mut outcomes = Vec::with_capacity(updates.len());

        for update in &updates {
            self.offset = Some(update.update_id + 1);
            match event_from_update(update) {
                Some(event) => outcomes.push(self.dispatcher.dispatch(&event)),
                None => debug!(update_id = update.update_id, "skipping update without a channel post"),
            }
        }

        Ok(outcomes)
    }

    /// Poll until `shutdown` is set. Polling errors are logged and retried.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!("started polling");
        while !shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.poll_once() {
                warn!(error = %e, retry_in = ?self.settings.retry_interval, "polling failed");
                thread::sleep(self.settings.retry_interval);
            }
        }
        info!("stopped polling");
    }
}
