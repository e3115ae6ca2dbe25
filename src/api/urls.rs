use regex::Regex;
use std::sync::LazyLock;

static USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/users/(\d+)").expect("valid user id pattern"));
static GUILD_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/guilds/(\d+)").expect("valid guild id pattern"));

/// Numeric user id embedded in a profile URL (`.../users/3941656?x=y` -> 3941656)
pub fn user_id_from_url(url: &str) -> Option<u64> {
    USER_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn guild_id_from_url(url: &str) -> Option<u64> {
    GUILD_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Endpoint layout of the game site.
#[derive(Debug, Clone)]
pub struct SiteUrls {
    base_url: String,
}

impl SiteUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base_url
    }

    pub fn login(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn profile(&self, user_id: u64) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }

    pub fn match_history(&self, user_id: u64, page: u32) -> String {
        format!("{}/users/{}/matches?page={}", self.base_url, user_id, page)
    }

    pub fn guild_members(&self, guild_url: &str, page: u32) -> String {
        let guild_url = self.absolute(guild_url);
        let separator = if guild_url.contains('?') { '&' } else { '?' };
        format!("{}{}page={}", guild_url, separator, page)
    }

    /// Resolve a site-relative href against the base URL.
    pub fn absolute(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            let scheme = self.base_url.split("://").next().unwrap_or("https");
            format!("{}://{}", scheme, rest)
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    /// Canonical profile URL for any link that carries a user id.
    pub fn canonical_profile(&self, href: &str) -> Option<String> {
        user_id_from_url(href).map(|id| self.profile(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_ignores_trailing_parameters() {
        assert_eq!(user_id_from_url("https://11x11.ru/users/3941656"), Some(3941656));
        assert_eq!(user_id_from_url("/users/3941656?tab=info#top"), Some(3941656));
        assert_eq!(user_id_from_url("https://11x11.ru/guilds/139"), None);
        assert_eq!(user_id_from_url("https://11x11.ru/users/abc"), None);
    }

    #[test]
    fn test_guild_id() {
        assert_eq!(guild_id_from_url("https://11x11.ru/guilds/139"), Some(139));
        assert_eq!(guild_id_from_url("https://11x11.ru/users/1"), None);
    }

    #[test]
    fn test_page_urls() {
        let urls = SiteUrls::new("https://11x11.ru/");
        assert_eq!(urls.login(), "https://11x11.ru/");
        assert_eq!(urls.match_history(7, 2), "https://11x11.ru/users/7/matches?page=2");
        assert_eq!(urls.guild_members("/guilds/139", 3), "https://11x11.ru/guilds/139?page=3");
        assert_eq!(
            urls.guild_members("https://11x11.ru/guilds/139?tab=members", 1),
            "https://11x11.ru/guilds/139?tab=members&page=1"
        );
    }

    #[test]
    fn test_absolute_links() {
        let urls = SiteUrls::new("https://11x11.ru");
        assert_eq!(urls.absolute("/users/5"), "https://11x11.ru/users/5");
        assert_eq!(urls.absolute("//11x11.ru/users/5"), "https://11x11.ru/users/5");
        assert_eq!(urls.absolute("http://other.example/x"), "http://other.example/x");
        assert_eq!(
            urls.canonical_profile("/users/5?from=guild"),
            Some("https://11x11.ru/users/5".to_string())
        );
    }
}
