use crate::api::PageSource;
use crate::models::UNKNOWN;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

const PROFILE_TITLE_PREFIX: &str = "Профиль участника";
const DASHES: [char; 4] = ['-', '\u{2012}', '\u{2013}', '\u{2014}'];

pub const POWER_LABEL: &str = "Сила 11 лучших";
pub const AVG_POWER_LABEL: &str = "Ср. сила 11 лучших";

/// What the profile page says about a player
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDetails {
    pub nickname: String,
    pub power: Option<String>,
    pub avg_power: Option<String>,
}

impl ProfileDetails {
    pub fn unknown() -> Self {
        Self {
            nickname: UNKNOWN.to_string(),
            power: None,
            avg_power: None,
        }
    }
}

/// Load a profile page. Never fails: anything missing comes back as unknown.
pub async fn fetch_profile_details<S>(source: &S, profile_url: &str) -> ProfileDetails
where
    S: PageSource + ?Sized,
{
    match source.fetch_html(profile_url).await {
        Ok(html) => parse_profile_page(&html),
        Err(e) => {
            warn!(url = profile_url, error = %e, "profile page unavailable");
            ProfileDetails::unknown()
        }
    }
}

pub fn parse_profile_page(html: &str) -> ProfileDetails {
    let document = Html::parse_document(html);

    let nickname = page_heading(&document)
        .map(|heading| clean_nickname(&heading))
        .filter(|nickname| !nickname.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    ProfileDetails {
        nickname,
        power: find_labeled_value(&document, POWER_LABEL),
        avg_power: find_labeled_value(&document, AVG_POWER_LABEL),
    }
}

/// "Профиль участника Имя – Онлайн игра" -> "Имя"
pub fn clean_nickname(text: &str) -> String {
    clean_title(text, PROFILE_TITLE_PREFIX)
}

/// Drop a boilerplate prefix and everything from the first dash on.
pub fn clean_title(text: &str, prefix: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix(prefix).unwrap_or(text);
    let text = match text.find(&DASHES[..]) {
        Some(end) => &text[..end],
        None => text,
    };
    text.trim().to_string()
}

/// Page `<title>`, or the first `<h1>` when the title is empty
pub fn page_heading(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    })
}

/// Text of the cell next to the innermost cell whose text contains `label`
pub fn find_labeled_value(document: &Html, label: &str) -> Option<String> {
    let cell_selector = Selector::parse("td, th").ok()?;

    document
        .select(&cell_selector)
        .filter(|cell| cell.text().collect::<String>().contains(label))
        .filter(|cell| cell.select(&cell_selector).next().is_none())
        .find_map(|cell| {
            let value = cell.next_siblings().find_map(ElementRef::wrap)?;
            let text = value.text().collect::<String>().trim().to_string();
            (!text.is_empty()).then_some(text)
        })
}
