use crate::api::urls::user_id_from_url;
use crate::api::PageSource;
use crate::error::ScrapeError;
use crate::models::{FilterWindow, MatchOutcome, MatchTally, WindowPosition};
use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}\.\d{1,2}\.\d{4}\s+\d{1,2}:\d{2}").expect("valid date pattern")
});

/// One parsed line of a match history table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRow {
    pub played_at: NaiveDateTime,
    pub outcome: MatchOutcome,
}

/// Whether to keep paginating after folding a page into the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVerdict {
    Continue,
    Stop,
}

/// Page through a player's match history, counting matches inside `window`.
///
/// History is listed newest first, so the first match older than the window
/// ends the walk. Matches newer than the window are skipped.
pub async fn collect_match_tally<S>(
    source: &S,
    user_id: u64,
    window: &FilterWindow,
    max_pages: u32,
) -> Result<MatchTally, ScrapeError>
where
    S: PageSource + ?Sized,
{
    let urls = source.urls();
    let mut tally = MatchTally::default();
    let mut previous: Vec<HistoryRow> = Vec::new();

    for page in 1..=max_pages.max(1) {
        let html = source.fetch_html(&urls.match_history(user_id, page)).await?;
        let rows = parse_history_rows(&html, user_id);

        if rows.is_empty() {
            debug!(user_id, page, "no history rows, done");
            break;
        }
        if rows == previous {
            debug!(user_id, page, "history page repeated, done");
            break;
        }

        if tally_page(&rows, window, &mut tally) == PageVerdict::Stop {
            debug!(user_id, page, "reached matches before the window");
            break;
        }
        previous = rows;
    }

    Ok(tally)
}

/// Fold one page of rows into `tally`, reporting whether older pages matter.
pub fn tally_page(rows: &[HistoryRow], window: &FilterWindow, tally: &mut MatchTally) -> PageVerdict {
    for row in rows {
        match window.position(&row.played_at) {
            WindowPosition::After => continue,
            WindowPosition::Inside => tally.record(row.outcome),
            WindowPosition::Before => return PageVerdict::Stop,
        }
    }
    PageVerdict::Continue
}

/// All rows on a history page that carry a date and a result cell.
pub fn parse_history_rows(html: &str, subject_id: u64) -> Vec<HistoryRow> {
    let document = Html::parse_document(html);
    let (Ok(row_selector), Ok(link_selector)) =
        (Selector::parse("tr"), Selector::parse("a[href]"))
    else {
        return Vec::new();
    };

    document
        .select(&row_selector)
        .filter_map(|row| {
            // Own cells only: a layout row wrapping the whole table must not match
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| cell.value().name() == "td")
                .collect();
            let played_at = cells.iter().copied().find_map(parse_date_cell)?;
            let result_cell = cells.iter().find(|cell| {
                cell.select(&link_selector)
                    .any(|a| a.value().attr("href").and_then(user_id_from_url).is_some())
            })?;
            let outcome = classify_result(result_cell, &link_selector, subject_id);
            Some(HistoryRow { played_at, outcome })
        })
        .collect()
}

fn parse_date_cell(cell: ElementRef) -> Option<NaiveDateTime> {
    let text = cell.text().collect::<String>();
    let found = DATE_RE.find(&text)?;
    let normalized = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, DATE_FORMAT).ok()
}

/// The bold team link is the winner; no bold link means a draw.
fn classify_result(cell: &ElementRef, link_selector: &Selector, subject_id: u64) -> MatchOutcome {
    let winner = cell
        .select(link_selector)
        .filter(|a| is_bold(a, cell))
        .find_map(|a| a.value().attr("href").and_then(user_id_from_url));

    match winner {
        None => MatchOutcome::Draw,
        Some(id) if id == subject_id => MatchOutcome::Win,
        Some(_) => MatchOutcome::Loss,
    }
}

fn is_bold(link: &ElementRef, cell: &ElementRef) -> bool {
    let bold = |name: &str| name == "b" || name == "strong";

    let wrapped = link
        .ancestors()
        .take_while(|node| node.id() != cell.id())
        .filter_map(ElementRef::wrap)
        .any(|el| bold(el.value().name()));
    let wraps = link
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| bold(el.value().name()));

    wrapped || wraps
}
