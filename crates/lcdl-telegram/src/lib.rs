//! Telegram Bot API types and client
//!
//! Covers the slice of the Bot API the downloader needs: long-polling
//! channel posts, resolving a document's file path, and downloading it.

pub mod client;
pub mod error;
pub mod types;

pub use client::BotClient;
pub use error::TelegramError;
pub use types::{ApiResponse, Chat, Document, File, Message, Update};

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
