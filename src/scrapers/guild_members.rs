use crate::api::{PageSource, SiteUrls};
use crate::error::ScrapeError;
use crate::models::{MemberLink, UNKNOWN};
use crate::scrapers::profile_page::{clean_title, page_heading};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const GUILD_TITLE_PREFIX: &str = "Союз";

/// A guild's name and its deduplicated member list, in page order
#[derive(Debug, Clone)]
pub struct GuildMembers {
    pub name: String,
    pub members: Vec<MemberLink>,
}

/// Walk the member list pages of a guild until a page adds nothing new.
pub async fn enumerate_members<S>(
    source: &S,
    guild_url: &str,
    max_pages: u32,
) -> Result<GuildMembers, ScrapeError>
where
    S: PageSource + ?Sized,
{
    let urls = source.urls();
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    let mut name = UNKNOWN.to_string();

    for page in 1..=max_pages.max(1) {
        let url = urls.guild_members(guild_url, page);
        let html = match source.fetch_html(&url).await {
            Ok(html) => html,
            // Nothing to aggregate without the first page
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(url, error = %e, "member page failed, keeping what was collected");
                break;
            }
        };

        if page == 1 {
            name = parse_guild_name(&html);
        }

        let mut added = 0;
        for link in parse_member_links(&html, urls) {
            if seen.insert(link.url.clone()) {
                members.push(link);
                added += 1;
            }
        }
        debug!(page, added, "parsed member page");

        if added == 0 {
            break;
        }
    }

    info!(guild = %name, members = members.len(), "enumerated guild members");
    Ok(GuildMembers { name, members })
}

/// Every distinct profile link on a member list page
pub fn parse_member_links(html: &str, urls: &SiteUrls) -> Vec<MemberLink> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&link_selector)
        .filter_map(|a| {
            let url = urls.canonical_profile(a.value().attr("href")?)?;
            let display_text = a.text().collect::<String>().trim().to_string();
            Some(MemberLink { url, display_text })
        })
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

pub fn parse_guild_name(html: &str) -> String {
    let document = Html::parse_document(html);
    page_heading(&document)
        .map(|heading| clean_title(&heading, GUILD_TITLE_PREFIX))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
