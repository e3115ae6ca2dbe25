use crate::api::urls::{user_id_from_url, SiteUrls};
use crate::config::{RetryPolicy, SiteConfig};
use crate::error::ScrapeError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Text of the logout link, only rendered for an authenticated session
const LOGGED_IN_MARKER: &str = "Выход";

/// Anything that can hand back the HTML behind a site URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError>;

    fn urls(&self) -> &SiteUrls;
}

/// Authenticated HTTP session against the game site
pub struct SiteClient {
    client: Client,
    urls: SiteUrls,
    retry: RetryPolicy,
    own_user_id: Option<u64>,
}

impl SiteClient {
    /// Log in and return a client whose cookie store carries the session.
    pub async fn login(config: &SiteConfig) -> Result<Self, ScrapeError> {
        if !config.has_credentials() {
            return Err(ScrapeError::MissingCredentials);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        let urls = SiteUrls::new(&config.base_url);

        // Landing page hands out the session cookie the login form expects
        client.get(urls.login()).send().await?;

        let response = client
            .post(urls.login())
            .form(&[
                ("auth_name", config.login.as_str()),
                ("auth_pass1", config.password.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: urls.login(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;

        if !is_logged_in(&body) {
            return Err(ScrapeError::Authentication(format!(
                "no '{}' link after login; check the login and password",
                LOGGED_IN_MARKER
            )));
        }

        let own_user_id = config
            .own_user_id
            .or_else(|| find_own_user_id(&body, &config.login));
        info!(login = %config.login, ?own_user_id, "logged in");

        Ok(Self {
            client,
            urls,
            retry: config.retry.clone(),
            own_user_id,
        })
    }

    /// Id of the authenticated account, when it could be determined.
    pub fn own_user_id(&self) -> Option<u64> {
        self.own_user_id
    }

    async fn get_once(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSource for SiteClient {
    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        let body = retry_fetch(&self.retry, url, || self.get_once(url)).await?;
        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }

    fn urls(&self) -> &SiteUrls {
        &self.urls
    }
}

/// Run `fetch` until it succeeds, fails permanently, or `policy.max_attempts`
/// is used up. The first attempt always runs.
pub async fn retry_fetch<F, Fut, T>(
    policy: &RetryPolicy,
    url: &str,
    mut fetch: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(url, attempt, ?delay, error = %e, "fetch failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Whether a page was rendered for a logged-in session
pub fn is_logged_in(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a") else {
        return false;
    };
    document
        .select(&link_selector)
        .any(|a| a.text().collect::<String>().contains(LOGGED_IN_MARKER))
}

/// Find the profile link whose text is the account's login
pub fn find_own_user_id(html: &str, login: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").ok()?;
    let login = login.trim().to_lowercase();

    document
        .select(&link_selector)
        .filter(|a| a.text().collect::<String>().trim().to_lowercase() == login)
        .find_map(|a| a.value().attr("href").and_then(user_id_from_url))
}
