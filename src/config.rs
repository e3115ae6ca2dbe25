use crate::error::ScrapeError;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://11x11.ru";
const DEFAULT_CONCURRENCY: usize = 10;
const MAX_CONCURRENCY: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_PAGES: u32 = 200;

/// Exponential backoff for page fetches that fail transiently.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Everything a scraping run needs to know about the site and the account.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub base_url: String,
    pub login: String,
    pub password: String,
    /// Overrides the own-profile id discovered at login.
    pub own_user_id: Option<u64>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub max_pages: u32,
    pub retry: RetryPolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login: String::new(),
            password: String::new(),
            own_user_id: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
            retry: RetryPolicy::default(),
        }
    }
}

impl SiteConfig {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Load from the process environment (call `dotenv::dotenv()` first).
    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("ELEVEN_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.login = lookup("ELEVEN_LOGIN").unwrap_or_default();
        config.password = lookup("ELEVEN_PASSWORD").unwrap_or_default();
        config.own_user_id = parse_var(&lookup, "ELEVEN_OWN_USER_ID")?;

        if let Some(concurrency) = parse_var(&lookup, "ELEVEN_CONCURRENCY")? {
            config = config.with_concurrency(concurrency)?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ELEVEN_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(max_pages) = parse_var(&lookup, "ELEVEN_MAX_PAGES")? {
            config.max_pages = max_pages;
        }
        if let Some(attempts) = parse_var(&lookup, "ELEVEN_RETRY_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }

        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ScrapeError> {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(ScrapeError::Config(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, concurrency
            )));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn has_credentials(&self) -> bool {
        !self.login.trim().is_empty() && !self.password.is_empty()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ScrapeError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ScrapeError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}
