use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use guild_stats::data::{save_roster_to_csv, save_stats_to_csv};
use guild_stats::roster::{apply_roster_view, RosterSort};
use guild_stats::xp_calculator::{parse_levels, PlayerXp};
use guild_stats::{
    fetch_guild_roster, fetch_match_stats, FilterWindow, SiteConfig, StatsMode, StatsRequest,
    UNKNOWN,
};

#[derive(Parser)]
#[command(name = "guild-stats", about = "Match statistics and rosters for 11x11 guilds")]
struct Cli {
    /// Account login (overrides ELEVEN_LOGIN)
    #[arg(long, global = true)]
    login: Option<String>,

    /// Account password (overrides ELEVEN_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Parallel profile requests (overrides ELEVEN_CONCURRENCY)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Win/draw/loss counts for a profile or every member of a guild
    Stats {
        /// Profile URL (https://11x11.ru/users/<id>) or guild URL with --guild
        url: String,
        /// Treat URL as a guild and aggregate all members
        #[arg(long)]
        guild: bool,
        /// First day counted, YYYY-MM-DD (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day counted, YYYY-MM-DD (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        csv: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Power metrics of every guild member
    Roster {
        guild_url: String,
        /// Only members with at least this "Сила 11 лучших"
        #[arg(long)]
        min_power: Option<f64>,
        /// none, asc or desc
        #[arg(long, default_value = "none")]
        sort: RosterSort,
        #[arg(long)]
        csv: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Experience totals for one player
    Xp {
        name: String,
        /// Attribute levels, e.g. "От=10,Пс=12" (others stay at 2)
        #[arg(long, default_value = "")]
        levels: String,
        #[arg(long, default_value_t = 0)]
        unspent: u64,
    },
}

fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let mut config = SiteConfig::from_env().context("Failed to read configuration")?;
    if let Some(login) = &cli.login {
        config.login = login.clone();
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config = config.with_concurrency(concurrency)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guild_stats=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Stats {
            url,
            guild,
            from,
            to,
            csv,
            json,
        } => {
            let config = load_config(&cli)?;
            let from = from.unwrap_or_else(|| Local::now().date_naive());
            let to = to.unwrap_or(from);
            let request = StatsRequest {
                mode: if *guild { StatsMode::Guild } else { StatsMode::Profile },
                url: url.clone(),
                window: FilterWindow::between(from, to),
            };

            println!("Collecting match statistics ({} .. {})...\n", from, to);
            let table = fetch_match_stats(&config, &request).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                if let Some(name) = &table.guild_name {
                    println!("Союз: {}\n", name);
                }
                println!("{:<30} {:>6} {:>6} {:>6}", "Профиль", "Побед", "Ничьих", "Пораж.");
                for row in &table.rows {
                    let (w, d, l) = match row.tally {
                        Some(t) => (t.wins.to_string(), t.draws.to_string(), t.losses.to_string()),
                        None => (UNKNOWN.into(), UNKNOWN.into(), UNKNOWN.into()),
                    };
                    println!("{:<30} {:>6} {:>6} {:>6}  {}", row.nickname, w, d, l, row.url);
                }
                if let Some(summary) = &table.summary {
                    println!("\n{}", summary.format());
                }
            }

            if let Some(path) = csv {
                save_stats_to_csv(&table, path)?;
                println!("\nSaved statistics to {}", path);
            }
        }
        Command::Roster {
            guild_url,
            min_power,
            sort,
            csv,
            json,
        } => {
            let config = load_config(&cli)?;
            println!("Loading roster...\n");
            let roster = fetch_guild_roster(&config, guild_url).await?;
            let entries = apply_roster_view(&roster.entries, *min_power, *sort);

            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Союз: {}\n", roster.guild_name);
                println!("{:<30} {:>15} {:>18}", "Профиль", "Сила 11 лучших", "Ср. сила 11 лучших");
                for entry in &entries {
                    println!(
                        "{:<30} {:>15} {:>18}  {}",
                        entry.nickname,
                        entry.power_display(),
                        entry.avg_power_display(),
                        entry.url
                    );
                }
                println!("\n{} of {} members shown", entries.len(), roster.entries.len());
            }

            if let Some(path) = csv {
                save_roster_to_csv(&entries, path)?;
                println!("\nSaved roster to {}", path);
            }
        }
        Command::Xp {
            name,
            levels,
            unspent,
        } => {
            let levels = parse_levels(levels).map_err(anyhow::Error::msg)?;
            let levels: Vec<(&str, u8)> = levels.iter().map(|(a, l)| (a.as_str(), *l)).collect();
            let player = PlayerXp::new(name, &levels, *unspent).map_err(anyhow::Error::msg)?;
            let summary = player.summary();

            println!("Игрок: {}", summary.name);
            println!("{}", "-".repeat(40));
            println!("Распределённый опыт: {}", summary.distributed);
            println!("Нераспределённый опыт: {}", summary.unspent);
            println!("Общий накопленный опыт: {}", summary.accumulated);
            println!("Осталось до максимума: {}", summary.remaining);
        }
    }

    Ok(())
}
