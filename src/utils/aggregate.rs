use crate::api::urls::user_id_from_url;
use crate::api::PageSource;
use crate::error::ScrapeError;
use crate::models::{
    FilterWindow, GuildSummary, MatchTally, ProfileReport, RosterEntry, StatsTable, UNKNOWN,
};
use crate::scrapers::guild_members::enumerate_members;
use crate::scrapers::match_history::collect_match_tally;
use crate::scrapers::profile_page::fetch_profile_details;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Results already computed during this run, keyed by user id
pub type StatsMemo = Arc<RwLock<HashMap<u64, ProfileReport>>>;

pub fn new_memo() -> StatsMemo {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Knobs shared by the guild-wide runs
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub concurrency: usize,
    pub max_pages: u32,
    /// Profile left out of guild tables (the logged-in account)
    pub exclude_user_id: Option<u64>,
}

/// Win/draw/loss for one profile plus its nickname.
///
/// A URL without a user id gives a zero tally; a history that cannot be
/// loaded gives an unknown tally. Neither is an error.
pub async fn profile_report<S>(
    source: &S,
    profile_url: &str,
    window: &FilterWindow,
    max_pages: u32,
    memo: &StatsMemo,
) -> ProfileReport
where
    S: PageSource + ?Sized,
{
    let Some(user_id) = user_id_from_url(profile_url) else {
        warn!(url = profile_url, "no user id in profile URL");
        return ProfileReport {
            url: profile_url.to_string(),
            user_id: None,
            nickname: UNKNOWN.to_string(),
            tally: Some(MatchTally::default()),
        };
    };

    if let Some(cached) = memo.read().await.get(&user_id) {
        return cached.clone();
    }

    let url = source.urls().profile(user_id);
    let details = fetch_profile_details(source, &url).await;
    let tally = match collect_match_tally(source, user_id, window, max_pages).await {
        Ok(tally) => Some(tally),
        Err(e) => {
            warn!(user_id, error = %e, "match history unavailable");
            None
        }
    };

    let report = ProfileReport {
        url,
        user_id: Some(user_id),
        nickname: details.nickname,
        tally,
    };
    memo.write().await.insert(user_id, report.clone());
    report
}

/// Distinct `(user id, url)` pairs in first-seen order, minus `exclude`.
/// URLs without a user id are dropped.
pub fn unique_profiles<I, T>(urls: I, exclude: Option<u64>) -> Vec<(u64, String)>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|url| {
            let url = url.as_ref();
            user_id_from_url(url).map(|id| (id, url.to_string()))
        })
        .filter(|(id, _)| Some(*id) != exclude)
        .filter(|(id, _)| seen.insert(*id))
        .collect()
}

/// Statistics for a single profile
pub async fn single_profile_stats<S>(
    source: &S,
    profile_url: &str,
    window: &FilterWindow,
    max_pages: u32,
) -> StatsTable
where
    S: PageSource + ?Sized,
{
    let memo = new_memo();
    let report = profile_report(source, profile_url, window, max_pages, &memo).await;
    StatsTable {
        guild_name: None,
        rows: vec![report],
        summary: None,
    }
}

/// Statistics for every member of a guild, with a member summary
pub async fn guild_stats<S>(
    source: Arc<S>,
    guild_url: &str,
    window: FilterWindow,
    options: AggregateOptions,
) -> Result<StatsTable, ScrapeError>
where
    S: PageSource + 'static,
{
    let guild = enumerate_members(source.as_ref(), guild_url, options.max_pages).await?;
    let urls = guild.members.iter().map(|m| m.url.as_str());
    let rows = stats_for_profiles(source, urls, window, options).await;
    let summary = GuildSummary::from_reports(&rows);
    info!(
        guild = %guild.name,
        total = summary.total,
        active = summary.active,
        "guild statistics ready"
    );

    Ok(StatsTable {
        guild_name: Some(guild.name),
        rows,
        summary: Some(summary),
    })
}

/// Fan the stat collector out over a raw list of profile URLs
pub async fn stats_for_profiles<S, I, T>(
    source: Arc<S>,
    urls: I,
    window: FilterWindow,
    options: AggregateOptions,
) -> Vec<ProfileReport>
where
    S: PageSource + 'static,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let jobs = unique_profiles(urls, options.exclude_user_id);
    let memo = new_memo();
    let max_pages = options.max_pages;

    fan_out(jobs, options.concurrency, |_, url| {
        let source = Arc::clone(&source);
        let memo = Arc::clone(&memo);
        async move { profile_report(source.as_ref(), &url, &window, max_pages, &memo).await }
    })
    .await
}

/// Guild members with their power metrics, in member-list order
pub async fn guild_roster<S>(
    source: Arc<S>,
    guild_url: &str,
    options: AggregateOptions,
) -> Result<(String, Vec<RosterEntry>), ScrapeError>
where
    S: PageSource + 'static,
{
    let guild = enumerate_members(source.as_ref(), guild_url, options.max_pages).await?;
    let jobs = unique_profiles(
        guild.members.iter().map(|m| m.url.as_str()),
        options.exclude_user_id,
    );

    let entries = fan_out(jobs, options.concurrency, |user_id, url| {
        let source = Arc::clone(&source);
        async move {
            let details = fetch_profile_details(source.as_ref(), &url).await;
            RosterEntry {
                url,
                user_id: Some(user_id),
                nickname: details.nickname,
                power: details.power,
                avg_power: details.avg_power,
            }
        }
    })
    .await;

    info!(guild = %guild.name, members = entries.len(), "roster ready");
    Ok((guild.name, entries))
}

/// Run one task per job with at most `concurrency` in flight; results keep job order.
async fn fan_out<T, F, Fut>(jobs: Vec<(u64, String)>, concurrency: usize, task: F) -> Vec<T>
where
    F: Fn(u64, String) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (index, (user_id, url)) in jobs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = task(user_id, url);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, job.await)
        });
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "profile task aborted"),
        }
    }
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SiteUrls;
    use crate::models::MatchOutcome;
    use crate::testing::{history_page, history_row, member_page, profile_page, FakeSite};
    use chrono::NaiveDate;

    const GUILD: &str = "https://11x11.ru/guilds/139";
    const OPPONENT: u64 = 999;

    fn march() -> FilterWindow {
        FilterWindow::between(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
    }

    fn options() -> AggregateOptions {
        AggregateOptions {
            concurrency: 4,
            max_pages: 20,
            exclude_user_id: None,
        }
    }

    fn player(site: FakeSite, id: u64, nickname: &str, results: &[Option<MatchOutcome>]) -> FakeSite {
        let urls = SiteUrls::new("https://11x11.ru");
        let rows: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(i, outcome)| {
                let winner = match outcome {
                    Some(MatchOutcome::Win) => Some(id),
                    Some(MatchOutcome::Loss) => Some(OPPONENT),
                    _ => None,
                };
                history_row(&format!("{:02}.03.2025 12:00", 20 - i), id, OPPONENT, winner)
            })
            .collect();
        site.with_page(urls.profile(id), profile_page(nickname, "1000", "90"))
            .with_page(urls.match_history(id, 1), history_page(&rows))
            .with_page(urls.match_history(id, 2), history_page(&[]))
    }

    #[test]
    fn test_unique_profiles_ignores_order() {
        let urls = [
            "https://11x11.ru/users/3?x=1",
            "https://11x11.ru/users/1",
            "https://11x11.ru/users/3",
            "https://11x11.ru/users/2",
            "https://11x11.ru/guilds/139",
        ];
        let ids = |list: Vec<(u64, String)>| {
            let mut ids: Vec<u64> = list.into_iter().map(|(id, _)| id).collect();
            ids.sort();
            ids
        };
        let forward = ids(unique_profiles(urls.iter(), None));
        let backward = ids(unique_profiles(urls.iter().rev(), None));
        assert_eq!(forward, vec![1, 2, 3]);
        assert_eq!(forward, backward);
        assert_eq!(ids(unique_profiles(urls.iter(), Some(2))), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_profile_without_id_is_zero_stat() {
        let site = FakeSite::new();
        let report = profile_report(&site, "https://11x11.ru/profile", &march(), 5, &new_memo()).await;
        assert_eq!(report.user_id, None);
        assert_eq!(report.tally, Some(MatchTally::default()));
        assert!(site.requested().is_empty());
    }

    #[tokio::test]
    async fn test_memo_skips_recomputation() {
        let site = player(FakeSite::new(), 1, "Один", &[Some(MatchOutcome::Win)]);
        let memo = new_memo();
        let first = profile_report(&site, "https://11x11.ru/users/1", &march(), 5, &memo).await;
        let requests = site.requested().len();
        let second = profile_report(&site, "/users/1?again", &march(), 5, &memo).await;
        assert_eq!(first, second);
        assert_eq!(site.requested().len(), requests);
    }

    #[tokio::test]
    async fn test_unreachable_history_is_unknown() {
        let urls = SiteUrls::new("https://11x11.ru");
        let site = FakeSite::new().with_page(urls.profile(5), profile_page("Пять", "1", "1"));
        let report = profile_report(&site, "https://11x11.ru/users/5", &march(), 5, &new_memo()).await;
        assert_eq!(report.nickname, "Пять");
        assert_eq!(report.tally, None);
    }

    #[tokio::test]
    async fn test_guild_with_duplicate_and_inactive_member() {
        let urls = SiteUrls::new("https://11x11.ru");
        let members = r#"<html><head><title>Союз Торпедо – Онлайн игра</title></head><body>
                 <a href="/users/1">Один</a>
                 <a href="/users/2">Два</a>
                 <a href="/users/1?tab=stats">Один снова</a>
               </body></html>"#;
        let site = FakeSite::new()
            .with_page(urls.guild_members(GUILD, 1), members)
            .with_page(urls.guild_members(GUILD, 2), members);
        let site = player(
            site,
            1,
            "Один",
            &[Some(MatchOutcome::Win), None, Some(MatchOutcome::Win)],
        );
        let site = player(site, 2, "Два", &[]);

        let table = guild_stats(Arc::new(site), GUILD, march(), options())
            .await
            .unwrap();

        assert_eq!(table.guild_name.as_deref(), Some("Торпедо"));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].nickname, "Один");
        assert_eq!(table.rows[0].tally, Some(MatchTally { wins: 2, draws: 1, losses: 0 }));
        assert_eq!(table.rows[1].tally, Some(MatchTally::default()));
        assert_eq!(
            table.summary,
            Some(GuildSummary { total: 2, active: 1, inactive: 1 })
        );
    }

    #[tokio::test]
    async fn test_own_profile_is_excluded() {
        let urls = SiteUrls::new("https://11x11.ru");
        let site = FakeSite::new()
            .with_page(urls.guild_members(GUILD, 1), member_page("Торпедо", &[1, 2]))
            .with_page(urls.guild_members(GUILD, 2), member_page("Торпедо", &[]));
        let site = player(site, 1, "Я", &[Some(MatchOutcome::Loss)]);
        let site = player(site, 2, "Другой", &[Some(MatchOutcome::Loss)]);

        let opts = AggregateOptions {
            exclude_user_id: Some(1),
            ..options()
        };
        let table = guild_stats(Arc::new(site), GUILD, march(), opts).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].user_id, Some(2));
        assert_eq!(table.rows[0].tally, Some(MatchTally { wins: 0, draws: 0, losses: 1 }));
    }

    #[tokio::test]
    async fn test_roster_keeps_member_order() {
        let urls = SiteUrls::new("https://11x11.ru");
        let site = FakeSite::new()
            .with_page(urls.guild_members(GUILD, 1), member_page("Торпедо", &[7, 3, 5]))
            .with_page(urls.guild_members(GUILD, 2), member_page("Торпедо", &[7, 3, 5]))
            .with_page(urls.profile(7), profile_page("Семь", "700", "70"))
            .with_page(urls.profile(3), profile_page("Три", "300", "30"));

        let (name, entries) = guild_roster(Arc::new(site), GUILD, options()).await.unwrap();
        assert_eq!(name, "Торпедо");
        let nicknames: Vec<&str> = entries.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(nicknames, vec!["Семь", "Три", UNKNOWN]);
        assert_eq!(entries[0].power.as_deref(), Some("700"));
        assert_eq!(entries[2].power, None);
    }
}
