//! In-memory stand-in for the game site used by unit tests.

use crate::api::{PageSource, SiteUrls};
use crate::error::ScrapeError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct FakeSite {
    urls: SiteUrls,
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            urls: SiteUrls::new("https://11x11.ru"),
            pages: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FakeSite {
    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    fn urls(&self) -> &SiteUrls {
        &self.urls
    }
}

/// A profile page as the site renders it
pub fn profile_page(nickname: &str, power: &str, avg_power: &str) -> String {
    format!(
        "<html><head><title>Профиль участника {nickname} – Онлайн игра</title></head>\
         <body><table>\
         <tr><td>Сила 11 лучших:</td><td>{power}</td></tr>\
         <tr><td>Ср. сила 11 лучших:</td><td>{avg_power}</td></tr>\
         </table></body></html>"
    )
}

/// A member list page linking the given user ids
pub fn member_page(guild_name: &str, ids: &[u64]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| format!(r#"<tr><td><a href="/users/{id}?ref=guild">Игрок {id}</a></td></tr>"#))
        .collect();
    format!(
        "<html><head><title>Союз {guild_name} – Онлайн игра</title></head>\
         <body><table>{rows}</table></body></html>"
    )
}

/// One match history row: `winner` is the user id rendered in bold, if any
pub fn history_row(date: &str, home: u64, away: u64, winner: Option<u64>) -> String {
    let link = |id: u64| {
        if winner == Some(id) {
            format!(r#"<b><a href="/users/{id}">Команда {id}</a></b>"#)
        } else {
            format!(r#"<a href="/users/{id}">Команда {id}</a>"#)
        }
    };
    format!(
        "<tr><td>{date}</td><td>{} - {}</td><td>2:1</td></tr>",
        link(home),
        link(away)
    )
}

pub fn history_page(rows: &[String]) -> String {
    format!(
        "<html><body><table class=\"matches\">\
         <tr><th>Дата</th><th>Матч</th><th>Счёт</th></tr>{}</table></body></html>",
        rows.concat()
    )
}
