//! Blocking Bot API client.
//!
//! One event is handled at a time, so a blocking client keeps the listener
//! loop simple: a long-poll request, then a download, then the next poll.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::TelegramError;
use crate::types::{ApiResponse, File, Update};
use crate::DEFAULT_API_URL;

/// Extra slack on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Timeout for short API calls such as `getFile`.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot API client bound to one bot token.
pub struct BotClient {
    api: Client,
    downloads: Client,
    api_url: String,
    token: String,
}

impl fmt::Debug for BotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BotClient {
    /// Create a client against the public Bot API.
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        Self::with_api_url(token, DEFAULT_API_URL, None)
    }

    /// Create a client against a custom API endpoint (e.g. a local Bot API server).
    ///
    /// `download_timeout` bounds a whole file download; `None` waits forever.
    pub fn with_api_url(
        token: impl Into<String>,
        api_url: impl Into<String>,
        download_timeout: Option<Duration>,
    ) -> Result<Self, TelegramError> {
        let api = Client::builder().timeout(API_TIMEOUT).build()?;
        let downloads = Client::builder().timeout(download_timeout).build()?;

        Ok(Self {
            api,
            downloads,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Download URL for a path returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    /// Long-poll for channel posts newer than `offset`.
    pub fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut query: Vec<(&str, String)> = vec![
            ("timeout", timeout.as_secs().to_string()),
            ("allowed_updates", r#"["channel_post"]"#.to_string()),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .api
            .get(self.method_url("getUpdates"))
            .query(&query)
            .timeout(timeout + POLL_GRACE)
            .send()?;

        let body: ApiResponse<Vec<Update>> = response.json()?;
        body.into_result()
    }

    /// Look up the download path of a file.
    pub fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        let response = self
            .api
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()?;

        let body: ApiResponse<File> = response.json()?;
        body.into_result()
    }

    /// Resolve a file id straight to its download path.
    pub fn file_path(&self, file_id: &str) -> Result<String, TelegramError> {
        self.get_file(file_id)?
            .file_path
            .ok_or_else(|| TelegramError::MissingFilePath(file_id.to_string()))
    }

    /// Start downloading a file. The response body implements `Read`.
    pub fn download(&self, file_path: &str) -> Result<Response, TelegramError> {
        let response = self
            .downloads
            .get(self.file_url(file_path))
            .send()?
            .error_for_status()?;
        Ok(response)
    }
}
