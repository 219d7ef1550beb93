//! Client configuration.
//!
//! # Design
//! `Config` is plain data assembled before the client exists and frozen once
//! `Client::new` accepts it. Validation happens at construction: an empty
//! API key is rejected there rather than on the first request.

use std::time::Duration;

use url::Url;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.honeycomb.io";
pub const DEFAULT_USER_AGENT: &str = "go-honeycombio";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const API_KEY_ENV: &str = "HONEYCOMB_API_KEY";
/// Accepted when `HONEYCOMB_API_KEY` is unset.
pub const LEGACY_API_KEY_ENV: &str = "HONEYCOMBIO_APIKEY";
pub const API_URL_ENV: &str = "HONEYCOMB_API_ENDPOINT";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub user_agent: String,
    /// Log request and response bodies at debug level.
    pub debug: bool,
    /// Per-attempt transport timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug: false,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.is_empty())
            .or_else(|| lookup(LEGACY_API_KEY_ENV).filter(|key| !key.is_empty()))
            .ok_or_else(|| {
                ApiError::InvalidConfig(format!("{API_KEY_ENV} is not set"))
            })?;
        let mut config = Self::new(api_key);
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.is_empty()) {
            config.api_url = url;
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the key and parse the base URL.
    ///
    /// The parsed URL always ends in `/` so relative paths resolve beneath
    /// any path prefix instead of replacing its last segment.
    pub fn validate(&self) -> Result<Url, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::InvalidConfig("API key must be set".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ApiError::InvalidConfig(
                "retry policy must allow at least one attempt".to_string(),
            ));
        }
        let mut url = Url::parse(&self.api_url)?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(format!(
                "API URL {} cannot be used as a base",
                self.api_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
