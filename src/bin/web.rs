use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use chrono::{Local, NaiveDate};
use guild_stats::roster::{apply_roster_view, power_range, RosterSort};
use guild_stats::xp_calculator::{parse_player_line, XpSummary, ATTRIBUTES};
use guild_stats::{
    fetch_guild_roster, fetch_match_stats, FilterWindow, RosterEntry, SiteConfig, StatsMode,
    StatsRequest, UNKNOWN,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const DEFAULT_PROFILE_URL: &str = "https://11x11.ru/users/3941656";
const DEFAULT_GUILD_URL: &str = "https://11x11.ru/guilds/139";

// Custom filters for formatting
mod filters {
    pub fn thousands(value: &u64) -> ::askama::Result<String> {
        let digits = value.to_string();
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(' ');
            }
            out.push(c);
        }
        Ok(out)
    }
}

struct StatsRow {
    url: String,
    nickname: String,
    wins: String,
    draws: String,
    losses: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    active_page: String,
}

#[derive(Template)]
#[template(path = "stats.html")]
struct StatsTemplate {
    active_page: String,
    mode: String,
    url: String,
    from: String,
    to: String,
    error: Option<String>,
    submitted: bool,
    guild_name: Option<String>,
    rows: Vec<StatsRow>,
    summary: Option<String>,
}

#[derive(Template)]
#[template(path = "roster.html")]
struct RosterTemplate {
    active_page: String,
    url: String,
    min_power: String,
    sort: String,
    error: Option<String>,
    submitted: bool,
    guild_name: String,
    entries: Vec<RosterEntry>,
    total: usize,
    power_hint: Option<String>,
}

#[derive(Template)]
#[template(path = "xp.html")]
struct XpTemplate {
    active_page: String,
    attributes: Vec<&'static str>,
    players: String,
    rows: Vec<XpSummary>,
    errors: Vec<String>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<SiteConfig>,
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    mode: Option<String>,
    url: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RosterQuery {
    url: Option<String>,
    min_power: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XpForm {
    players: String,
}

fn parse_day(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

async fn home() -> impl IntoResponse {
    HtmlTemplate(HomeTemplate {
        active_page: "home".to_string(),
    })
}

async fn stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> impl IntoResponse {
    let mode = query
        .mode
        .as_deref()
        .and_then(|m| m.parse::<StatsMode>().ok())
        .unwrap_or_default();
    let today = Local::now().date_naive();
    let from = parse_day(query.from.as_deref()).unwrap_or(today);
    let to = parse_day(query.to.as_deref()).unwrap_or(from);
    let submitted = query.url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let url = match (&query.url, mode) {
        (Some(url), _) if submitted => url.trim().to_string(),
        (_, StatsMode::Guild) => DEFAULT_GUILD_URL.to_string(),
        (_, StatsMode::Profile) => DEFAULT_PROFILE_URL.to_string(),
    };

    let mut template = StatsTemplate {
        active_page: "stats".to_string(),
        mode: if mode == StatsMode::Guild { "guild" } else { "profile" }.to_string(),
        url: url.clone(),
        from: from.format("%Y-%m-%d").to_string(),
        to: to.format("%Y-%m-%d").to_string(),
        error: None,
        submitted,
        guild_name: None,
        rows: Vec::new(),
        summary: None,
    };

    if submitted {
        let request = StatsRequest {
            mode,
            url,
            window: FilterWindow::between(from, to),
        };
        match fetch_match_stats(&state.config, &request).await {
            Ok(table) => {
                template.guild_name = table.guild_name;
                template.summary = table.summary.map(|s| s.format());
                template.rows = table
                    .rows
                    .into_iter()
                    .map(|row| {
                        let count = |n: Option<u32>| {
                            n.map(|n| n.to_string()).unwrap_or_else(|| UNKNOWN.to_string())
                        };
                        StatsRow {
                            wins: count(row.tally.map(|t| t.wins)),
                            draws: count(row.tally.map(|t| t.draws)),
                            losses: count(row.tally.map(|t| t.losses)),
                            url: row.url,
                            nickname: row.nickname,
                        }
                    })
                    .collect();
            }
            Err(e) => {
                error!("Statistics run failed: {:#}", e);
                template.error = Some(format!("{:#}", e));
            }
        }
    }

    HtmlTemplate(template)
}

async fn roster(State(state): State<AppState>, Query(query): Query<RosterQuery>) -> impl IntoResponse {
    let submitted = query.url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let url = query
        .url
        .as_deref()
        .filter(|_| submitted)
        .map(|u| u.trim().to_string())
        .unwrap_or_else(|| DEFAULT_GUILD_URL.to_string());
    let min_power_raw = query.min_power.clone().unwrap_or_default();
    let min_power = guild_stats::parse_power(&min_power_raw);
    let sort = query
        .sort
        .as_deref()
        .and_then(|s| s.parse::<RosterSort>().ok())
        .unwrap_or_default();

    let mut template = RosterTemplate {
        active_page: "roster".to_string(),
        url: url.clone(),
        min_power: min_power_raw,
        sort: match sort {
            RosterSort::None => "none",
            RosterSort::Asc => "asc",
            RosterSort::Desc => "desc",
        }
        .to_string(),
        error: None,
        submitted,
        guild_name: String::new(),
        entries: Vec::new(),
        total: 0,
        power_hint: None,
    };

    if submitted {
        match fetch_guild_roster(&state.config, &url).await {
            Ok(roster) => {
                template.power_hint = power_range(&roster.entries)
                    .map(|(lo, hi)| format!("от {} до {}", lo, hi));
                template.total = roster.entries.len();
                template.entries = apply_roster_view(&roster.entries, min_power, sort);
                template.guild_name = roster.guild_name;
            }
            Err(e) => {
                error!("Roster run failed: {:#}", e);
                template.error = Some(format!("{:#}", e));
            }
        }
    }

    HtmlTemplate(template)
}

fn xp_page(players: String) -> XpTemplate {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (n, line) in players.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_player_line(line) {
            Ok(player) => rows.push(player.summary()),
            Err(e) => errors.push(format!("строка {}: {}", n + 1, e)),
        }
    }

    XpTemplate {
        active_page: "xp".to_string(),
        attributes: ATTRIBUTES.to_vec(),
        players,
        rows,
        errors,
    }
}

async fn xp_form() -> impl IntoResponse {
    HtmlTemplate(xp_page(String::new()))
}

async fn xp_submit(Form(form): Form<XpForm>) -> impl IntoResponse {
    HtmlTemplate(xp_page(form.players))
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guild_stats=info,web=info,tower_http=info".into()),
        )
        .init();

    let config = SiteConfig::from_env()?;
    if !config.has_credentials() {
        info!("ELEVEN_LOGIN / ELEVEN_PASSWORD not set; scraping pages will report a login error");
    }
    let bind = std::env::var("WEB_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let state = AppState {
        config: Arc::new(config),
    };

    // Build router with routes
    let app = Router::new()
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(home))
        .route("/stats", get(stats))
        .route("/roster", get(roster))
        .route("/xp", get(xp_form).post(xp_submit))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Web UI listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
