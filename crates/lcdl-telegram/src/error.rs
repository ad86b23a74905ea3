//! Error types for Bot API calls.

use thiserror::Error;

/// Errors from talking to the Bot API.
///
/// Messages never include the bot token: request URLs are stripped from
/// transport errors before they are wrapped.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: i32, description: String },

    #[error("Bot API response carried no result")]
    EmptyResult,

    #[error("file {0} has no download path")]
    MissingFilePath(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        TelegramError::Http(err.without_url())
    }
}
