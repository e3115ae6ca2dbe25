use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Placeholder shown for any field that could not be scraped.
pub const UNKNOWN: &str = "unknown";
/// Placeholder for a missing power metric.
pub const NOT_AVAILABLE: &str = "N/A";

/// Result of a single match from the subject player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

/// Running win/draw/loss counters for one profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTally {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl MatchTally {
    pub fn record(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Loss => self.losses += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn is_active(&self) -> bool {
        self.total() > 0
    }
}

/// Where a timestamp falls relative to a [`FilterWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    Before,
    Inside,
    After,
}

/// Inclusive `[from, to]` range of match timestamps that count toward a tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl FilterWindow {
    /// Window covering a whole calendar day
    pub fn for_day(day: NaiveDate) -> Self {
        Self::between(day, day)
    }

    /// Window from the start of `from` to the end of `to`. Swapped bounds are reordered.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self {
            from: from.and_time(NaiveTime::MIN),
            to: to.and_time(end_of_day),
        }
    }

    pub fn position(&self, at: &NaiveDateTime) -> WindowPosition {
        if *at < self.from {
            WindowPosition::Before
        } else if *at > self.to {
            WindowPosition::After
        } else {
            WindowPosition::Inside
        }
    }
}

/// A link to a profile as found on a guild member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLink {
    pub url: String,
    pub display_text: String,
}

/// Match statistics for a single profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub url: String,
    pub user_id: Option<u64>,
    pub nickname: String,
    /// `None` when the history could not be fetched.
    pub tally: Option<MatchTally>,
}

impl ProfileReport {
    pub fn is_active(&self) -> bool {
        self.tally.map(|t| t.is_active()).unwrap_or(false)
    }
}

/// Member counts appended below a guild statistics table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl GuildSummary {
    pub fn from_reports(reports: &[ProfileReport]) -> Self {
        let total = reports.len();
        let active = reports.iter().filter(|r| r.is_active()).count();
        Self {
            total,
            active,
            inactive: total - active,
        }
    }

    pub fn format(&self) -> String {
        format!(
            "Всего игроков: {}, играли: {}, не играли: {}",
            self.total, self.active, self.inactive
        )
    }
}

/// Everything the statistics page and CLI display for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsTable {
    pub guild_name: Option<String>,
    pub rows: Vec<ProfileReport>,
    pub summary: Option<GuildSummary>,
}

/// One guild member with the power metrics shown on their profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub url: String,
    pub user_id: Option<u64>,
    pub nickname: String,
    pub power: Option<String>,
    pub avg_power: Option<String>,
}

impl RosterEntry {
    /// Numeric view of "Сила 11 лучших", if the site showed a number
    pub fn power_value(&self) -> Option<f64> {
        self.power.as_deref().and_then(parse_power)
    }

    pub fn power_display(&self) -> &str {
        self.power.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn avg_power_display(&self) -> &str {
        self.avg_power.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterTable {
    pub guild_name: String,
    pub entries: Vec<RosterEntry>,
}

/// Parse a power figure as rendered by the site ("1 234", "1234,5", "987.0")
pub fn parse_power(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
