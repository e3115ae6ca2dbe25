use crate::models::RosterEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Ordering of a roster by "Сила 11 лучших"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterSort {
    #[default]
    None,
    Asc,
    Desc,
}

impl FromStr for RosterSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(RosterSort::None),
            "asc" | "ascending" => Ok(RosterSort::Asc),
            "desc" | "descending" => Ok(RosterSort::Desc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Apply the power threshold and sort order to a roster.
///
/// With a threshold, members whose power is not a number are dropped.
/// Members without a numeric power always sort last.
pub fn apply_roster_view(
    entries: &[RosterEntry],
    min_power: Option<f64>,
    sort: RosterSort,
) -> Vec<RosterEntry> {
    let mut view: Vec<RosterEntry> = entries
        .iter()
        .filter(|entry| match min_power {
            Some(min) => entry.power_value().is_some_and(|power| power >= min),
            None => true,
        })
        .cloned()
        .collect();

    if sort != RosterSort::None {
        view.sort_by(|a, b| match (a.power_value(), b.power_value()) {
            (Some(x), Some(y)) => {
                let order = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                if sort == RosterSort::Desc {
                    order.reverse()
                } else {
                    order
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    view
}

/// Smallest and largest numeric power in a roster, for the threshold input
pub fn power_range(entries: &[RosterEntry]) -> Option<(f64, f64)> {
    entries
        .iter()
        .filter_map(RosterEntry::power_value)
        .fold(None, |range, power| match range {
            None => Some((power, power)),
            Some((lo, hi)) => Some((lo.min(power), hi.max(power))),
        })
}
