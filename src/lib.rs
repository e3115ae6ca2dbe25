pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::*;
pub use config::{RetryPolicy, SiteConfig};
pub use error::ScrapeError;
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::urls::guild_id_from_url;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use utils::aggregate::{guild_roster, guild_stats, single_profile_stats, AggregateOptions};

/// Whether statistics are built for one player or a whole guild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsMode {
    #[default]
    Profile,
    Guild,
}

impl FromStr for StatsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(StatsMode::Profile),
            "guild" => Ok(StatsMode::Guild),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// What the user asked the statistics page for
#[derive(Debug, Clone)]
pub struct StatsRequest {
    pub mode: StatsMode,
    pub url: String,
    pub window: FilterWindow,
}

fn aggregate_options(config: &SiteConfig, own_user_id: Option<u64>) -> AggregateOptions {
    AggregateOptions {
        concurrency: config.concurrency,
        max_pages: config.max_pages,
        exclude_user_id: own_user_id,
    }
}

fn require_guild_url(url: &str) -> Result<()> {
    if guild_id_from_url(url).is_none() {
        return Err(ScrapeError::InvalidUrl(url.to_string())).context("Expected a guild URL");
    }
    Ok(())
}

/// Log in and compute win/draw/loss statistics for a profile or a guild
pub async fn fetch_match_stats(config: &SiteConfig, request: &StatsRequest) -> Result<StatsTable> {
    if request.mode == StatsMode::Guild {
        require_guild_url(&request.url)?;
    }

    let client = SiteClient::login(config)
        .await
        .context("Failed to log in")?;

    match request.mode {
        StatsMode::Profile => Ok(single_profile_stats(
            &client,
            &request.url,
            &request.window,
            config.max_pages,
        )
        .await),
        StatsMode::Guild => {
            let options = aggregate_options(config, client.own_user_id());
            guild_stats(Arc::new(client), &request.url, request.window, options)
                .await
                .context("Failed to read guild members")
        }
    }
}

/// Log in and collect power metrics for every guild member
pub async fn fetch_guild_roster(config: &SiteConfig, guild_url: &str) -> Result<RosterTable> {
    require_guild_url(guild_url)?;

    let client = SiteClient::login(config)
        .await
        .context("Failed to log in")?;
    let options = aggregate_options(config, client.own_user_id());

    let (guild_name, entries) = guild_roster(Arc::new(client), guild_url, options)
        .await
        .context("Failed to read guild members")?;

    Ok(RosterTable {
        guild_name,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stats_mode_parsing() {
        assert_eq!("Guild".parse::<StatsMode>(), Ok(StatsMode::Guild));
        assert_eq!("profile".parse::<StatsMode>(), Ok(StatsMode::Profile));
        assert!("team".parse::<StatsMode>().is_err());
    }

    #[tokio::test]
    async fn test_guild_mode_rejects_profile_url_before_login() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let request = StatsRequest {
            mode: StatsMode::Guild,
            url: "https://11x11.ru/users/1".to_string(),
            window: FilterWindow::for_day(day),
        };
        let err = fetch_match_stats(&SiteConfig::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_as_error() {
        let err = fetch_guild_roster(&SiteConfig::default(), "https://11x11.ru/guilds/139")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::MissingCredentials)
        ));
    }
}
