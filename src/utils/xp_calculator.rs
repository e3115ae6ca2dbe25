use serde::{Deserialize, Serialize};

/// Player attributes in the order the game lists them
pub const ATTRIBUTES: [&str; 8] = ["От", "Оп", "Др", "Пм", "Вн", "Пс", "Сл", "Тч"];

pub const MIN_LEVEL: u8 = 2;
pub const MAX_LEVEL: u8 = 60;

/// Cumulative experience needed to reach each level from level 2
const XP_TABLE: [(u8, u64); 58] = [
    (3, 30),
    (4, 90),
    (5, 190),
    (6, 340),
    (7, 540),
    (8, 840),
    (9, 1_240),
    (10, 1_790),
    (11, 2_540),
    (12, 3_540),
    (13, 5_040),
    (14, 7_040),
    (15, 10_040),
    (16, 14_040),
    (17, 19_540),
    (18, 27_040),
    (19, 37_040),
    (20, 52_040),
    (21, 72_040),
    (22, 107_040),
    (23, 157_040),
    (24, 232_040),
    (25, 332_040),
    (26, 482_040),
    (27, 682_040),
    (28, 1_032_040),
    (29, 1_532_040),
    (30, 2_282_040),
    (31, 3_282_040),
    (32, 4_532_040),
    (33, 6_032_040),
    (34, 7_832_040),
    (35, 9_932_040),
    (36, 12_332_040),
    (37, 15_032_040),
    (38, 18_032_040),
    (39, 21_532_040),
    (40, 25_532_040),
    (41, 30_332_040),
    (42, 35_932_040),
    (43, 42_332_040),
    (44, 49_532_040),
    (45, 57_532_040),
    (46, 66_332_040),
    (47, 75_932_040),
    (48, 86_332_040),
    (49, 97_532_040),
    (50, 109_532_040),
    (51, 123_032_040),
    (52, 138_032_040),
    (53, 154_532_040),
    (54, 172_532_040),
    (55, 192_532_040),
    (56, 214_532_040),
    (57, 239_532_040),
    (58, 267_532_040),
    (59, 299_532_040),
    (60, 336_532_040),
];

pub fn cumulative_xp(level: u8) -> u64 {
    XP_TABLE
        .iter()
        .find(|(lvl, _)| *lvl == level)
        .map(|(_, xp)| *xp)
        .unwrap_or(0)
}

pub fn xp_between(start: u8, end: u8) -> u64 {
    cumulative_xp(end).saturating_sub(cumulative_xp(start))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerXp {
    pub name: String,
    /// Indexed like [`ATTRIBUTES`]
    pub levels: [u8; 8],
    pub unspent_xp: u64,
}

/// One line of the team experience table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpSummary {
    pub name: String,
    pub distributed: u64,
    pub unspent: u64,
    pub accumulated: u64,
    pub remaining: u64,
}

impl PlayerXp {
    /// Player with every attribute at level 2 except those given.
    pub fn new(name: &str, levels: &[(&str, u8)], unspent_xp: u64) -> Result<Self, String> {
        let mut all = [MIN_LEVEL; 8];
        for (attribute, level) in levels {
            let index = ATTRIBUTES
                .iter()
                .position(|a| a == attribute)
                .ok_or_else(|| format!("unknown attribute: {}", attribute))?;
            if !(MIN_LEVEL..=MAX_LEVEL).contains(level) {
                return Err(format!(
                    "{} level must be between {} and {}, got {}",
                    attribute, MIN_LEVEL, MAX_LEVEL, level
                ));
            }
            all[index] = *level;
        }
        Ok(Self {
            name: name.trim().to_string(),
            levels: all,
            unspent_xp,
        })
    }

    pub fn distributed_xp(&self) -> u64 {
        self.levels.iter().map(|lvl| xp_between(MIN_LEVEL, *lvl)).sum()
    }

    pub fn total_xp_accumulated(&self) -> u64 {
        self.distributed_xp().saturating_add(self.unspent_xp)
    }

    pub fn total_xp_remaining(&self) -> u64 {
        let raw: u64 = self.levels.iter().map(|lvl| xp_between(*lvl, MAX_LEVEL)).sum();
        raw.saturating_sub(self.unspent_xp)
    }

    pub fn summary(&self) -> XpSummary {
        XpSummary {
            name: self.name.clone(),
            distributed: self.distributed_xp(),
            unspent: self.unspent_xp,
            accumulated: self.total_xp_accumulated(),
            remaining: self.total_xp_remaining(),
        }
    }
}

/// Parse "От=10,Пс=12" into attribute levels
pub fn parse_levels(input: &str) -> Result<Vec<(String, u8)>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (attribute, level) = part
                .split_once('=')
                .ok_or_else(|| format!("expected ATTRIBUTE=LEVEL, got {:?}", part))?;
            let level = level
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid level in {:?}", part))?;
            Ok((attribute.trim().to_string(), level))
        })
        .collect()
}

/// Parse "Имя | От=10,Пс=12 | 500": name, optional levels, optional unspent XP
pub fn parse_player_line(line: &str) -> Result<PlayerXp, String> {
    let mut parts = line.split('|').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).ok_or("player name is missing")?;
    let levels = parse_levels(parts.next().unwrap_or(""))?;
    let unspent_xp = match parts.next() {
        Some(raw) if !raw.is_empty() => raw
            .parse::<u64>()
            .map_err(|_| format!("invalid unspent experience: {:?}", raw))?,
        _ => 0,
    };
    let levels: Vec<(&str, u8)> = levels.iter().map(|(a, l)| (a.as_str(), *l)).collect();
    PlayerXp::new(name, &levels, unspent_xp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_monotonic() {
        assert!(XP_TABLE.windows(2).all(|w| w[0].1 < w[1].1));
        assert_eq!(cumulative_xp(2), 0);
        assert_eq!(xp_between(2, 60), 336_532_040);
    }

    #[test]
    fn test_fresh_player() {
        let player = PlayerXp::new("Новичок", &[], 0).unwrap();
        assert_eq!(player.distributed_xp(), 0);
        assert_eq!(player.total_xp_remaining(), 8 * 336_532_040);
    }

    #[test]
    fn test_trained_player() {
        let player = PlayerXp::new("Иванов", &[("От", 10), ("Пс", 5)], 1_000).unwrap();
        let summary = player.summary();
        assert_eq!(summary.distributed, 1_790 + 190);
        assert_eq!(summary.accumulated, 1_790 + 190 + 1_000);
        let remaining = 6 * 336_532_040 + (336_532_040 - 1_790) + (336_532_040 - 190) - 1_000;
        assert_eq!(summary.remaining, remaining);
    }

    #[test]
    fn test_remaining_never_negative() {
        let maxed: Vec<(&str, u8)> = ATTRIBUTES.iter().map(|a| (*a, MAX_LEVEL)).collect();
        let player = PlayerXp::new("Мастер", &maxed, 500).unwrap();
        assert_eq!(player.total_xp_remaining(), 0);
    }

    #[test]
    fn test_largest_unspent_xp_saturates() {
        let summary = parse_player_line("Рекордсмен | От=10 | 18446744073709551615")
            .unwrap()
            .summary();
        assert_eq!(summary.unspent, u64::MAX);
        assert_eq!(summary.accumulated, u64::MAX);
        assert_eq!(summary.remaining, 0);
    }

    #[test]
    fn test_invalid_input() {
        assert!(PlayerXp::new("x", &[("Ск", 5)], 0).is_err());
        assert!(PlayerXp::new("x", &[("От", 61)], 0).is_err());
        assert_eq!(
            parse_levels("От=10, Пс=12").unwrap(),
            vec![("От".to_string(), 10), ("Пс".to_string(), 12)]
        );
        assert!(parse_levels("От:10").is_err());
    }

    #[test]
    fn test_parse_player_line() {
        let player = parse_player_line("Петров | От=3, Тч=4 | 10").unwrap();
        assert_eq!(player.name, "Петров");
        assert_eq!(player.levels, [3, 2, 2, 2, 2, 2, 2, 4]);
        assert_eq!(player.unspent_xp, 10);
        assert_eq!(parse_player_line("Сидоров").unwrap().distributed_xp(), 0);
        assert!(parse_player_line(" | От=3").is_err());
        assert!(parse_player_line("Петров | | много").is_err());
    }
}
