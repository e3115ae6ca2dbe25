use crate::models::{RosterEntry, StatsTable, NOT_AVAILABLE, UNKNOWN};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct StatsCsvRow<'a> {
    #[serde(rename = "Профиль")]
    nickname: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Побед")]
    wins: String,
    #[serde(rename = "Ничьих")]
    draws: String,
    #[serde(rename = "Поражений")]
    losses: String,
}

#[derive(Debug, Serialize)]
struct RosterCsvRow<'a> {
    #[serde(rename = "Профиль")]
    nickname: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Сила 11 лучших")]
    power: &'a str,
    #[serde(rename = "Ср. сила 11 лучших")]
    avg_power: &'a str,
}

/// Write a statistics table as CSV, summary line last
pub fn write_stats_csv<W: Write>(table: &StatsTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    for row in &table.rows {
        let count = |f: fn(&crate::models::MatchTally) -> u32| {
            row.tally
                .as_ref()
                .map(|t| f(t).to_string())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        csv.serialize(StatsCsvRow {
            nickname: &row.nickname,
            url: &row.url,
            wins: count(|t| t.wins),
            draws: count(|t| t.draws),
            losses: count(|t| t.losses),
        })
        .context("Failed to write statistics row")?;
    }

    if let Some(summary) = &table.summary {
        csv.serialize(StatsCsvRow {
            nickname: &summary.format(),
            url: "",
            wins: String::new(),
            draws: String::new(),
            losses: String::new(),
        })
        .context("Failed to write summary row")?;
    }

    csv.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn write_roster_csv<W: Write>(entries: &[RosterEntry], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for entry in entries {
        csv.serialize(RosterCsvRow {
            nickname: &entry.nickname,
            url: &entry.url,
            power: entry.power.as_deref().unwrap_or(NOT_AVAILABLE),
            avg_power: entry.avg_power.as_deref().unwrap_or(NOT_AVAILABLE),
        })
        .context("Failed to write roster row")?;
    }
    csv.flush().context("Failed to flush CSV")?;
    Ok(())
}

/// Save statistics to a CSV file
pub fn save_stats_to_csv(table: &StatsTable, filename: &str) -> Result<()> {
    let file = std::fs::File::create(filename).context("Failed to create CSV file")?;
    write_stats_csv(table, file)
}

/// Save a roster to a CSV file
pub fn save_roster_to_csv(entries: &[RosterEntry], filename: &str) -> Result<()> {
    let file = std::fs::File::create(filename).context("Failed to create CSV file")?;
    write_roster_csv(entries, file)
}
