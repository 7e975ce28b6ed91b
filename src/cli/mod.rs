use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::db::{self, create_pool};
use crate::models::{GameLocation, GameTeamFact, Label, TeamEntity};
use crate::services::{
    elo_trends, load_aliases_csv, load_games_csv, point_diff_by_season, quality_report, recompute_all,
    win_rates_by_season, AliasResolver, PipelineInput, RunContext,
};
use crate::utils::{format_date, parse_date, years_before};

const SUGGESTION_LIMIT: usize = 5;
const RECENT_GAMES: i64 = 5;
const TREND_WINDOW_YEARS: u32 = 2;

async fn open(config: &AppConfig) -> Result<SqlitePool> {
    let pool = create_pool(config).await?;
    db::init_database_with_pool(&pool).await?;
    Ok(pool)
}

pub async fn init_db(config: &AppConfig) -> Result<()> {
    println!("🗄️  Initializing database at {}", config.database_url);
    db::init_database(config).await?;
    println!("✅ Database ready");
    Ok(())
}

pub async fn load_data(config: &AppConfig, games_path: &Path, aliases_path: Option<&Path>) -> Result<()> {
    let pool = open(config).await?;

    println!("📥 Loading games from {}...", games_path.display());
    let games = load_games_csv(games_path)?;
    db::replace_raw_games(&pool, &games).await?;
    println!("✅ Loaded {} raw games", games.len());

    match aliases_path {
        Some(path) => {
            println!("📥 Loading team aliases from {}...", path.display());
            let aliases = load_aliases_csv(path)?;
            db::replace_aliases(&pool, &aliases).await?;
            println!("✅ Loaded {} alias entries", aliases.len());
        }
        None => db::seed_aliases(&pool).await?,
    }

    println!("\n💡 Run 'courtforge check' to review the data, then 'courtforge run' to publish");
    Ok(())
}

pub async fn run_pipeline(config: &AppConfig, as_of: Option<&str>) -> Result<()> {
    let pool = open(config).await?;
    let run_date = match as_of {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    let input = PipelineInput {
        games: db::get_raw_games(&pool).await?,
        aliases: db::get_aliases(&pool).await?,
    };
    if input.games.is_empty() {
        println!("📭 No raw games loaded. Try: courtforge load --games <elo.csv>");
        return Ok(());
    }

    let mut ctx = RunContext::new(run_date);
    ctx.active_window_years = config.active_window_years;
    ctx.duplicate_policy = config.duplicate_policy;

    println!("⚙️  Recomputing from {} raw games (as of {})...", input.games.len(), format_date(run_date));

    let snapshot = match recompute_all(&input, &ctx) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            println!("❌ Run aborted, previous snapshot left in place: {}", e);
            return Err(e.into());
        }
    };

    db::publish_snapshot(&pool, &snapshot).await?;

    let report = &snapshot.report;
    println!("✅ Published run {}", snapshot.run_id);
    println!("   Games derived: {}", report.games_derived);
    println!("   Teams: {}", report.teams);
    println!("   Team-game facts: {}", report.facts);

    if !report.rejected.is_empty() {
        println!("\n⚠️  {} rows rejected:", report.rejected.len());
        for rejection in report.rejected.iter().take(SUGGESTION_LIMIT) {
            println!("   • row {}: missing {}", rejection.row, rejection.field);
        }
    }
    if !report.duplicates_dropped.is_empty() {
        println!("\n⚠️  {} duplicate rows dropped:", report.duplicates_dropped.len());
        for dup in report.duplicates_dropped.iter().take(SUGGESTION_LIMIT) {
            println!("   • {} (kept row {}, dropped row {})", dup.game_id, dup.kept_row, dup.dropped_row);
        }
    }

    Ok(())
}

pub async fn check_data(config: &AppConfig) -> Result<()> {
    let pool = open(config).await?;
    let games = db::get_raw_games(&pool).await?;

    println!("🔍 Running data quality checks...\n");
    let report = quality_report(&games);

    println!("   Rows: {}", report.total_rows);
    match (report.earliest_date, report.latest_date) {
        (Some(first), Some(last)) => println!(
            "   Date range: {} to {} ({} unique dates)",
            format_date(first),
            format_date(last),
            report.unique_dates
        ),
        _ => println!("   Date range: none"),
    }
    println!("   Unique team codes: {}", report.unique_team_codes);

    if report.rows_missing_fields > 0 {
        println!("⚠️  {} rows missing a required field", report.rows_missing_fields);
    } else {
        println!("✅ No rows with missing fields");
    }

    if report.duplicate_triples > 0 {
        println!("⚠️  Found {} duplicate game entries", report.duplicate_triples);
        for dup in &report.duplicate_sample {
            println!(
                "   • {} {} vs {} ({} rows)",
                format_date(dup.game_date),
                dup.home_team_code,
                dup.away_team_code,
                dup.count
            );
        }
    } else {
        println!("✅ No duplicate games found");
    }

    let aliases = db::get_aliases(&pool).await?;
    match AliasResolver::new(&aliases) {
        Ok(resolver) if resolver.is_empty() => println!("⚠️  Alias table is empty, raw codes will be used as team ids"),
        Ok(resolver) => println!("✅ Alias table resolves cleanly ({} codes)", resolver.len()),
        Err(e) => println!("❌ Alias table will abort the next run: {}", e),
    }
    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `<name>_<stamp>.csv` and refresh `latest_<name>.csv` alongside it.
fn export_table<T: Serialize>(dir: &Path, name: &str, stamp: &str, rows: &[T]) -> Result<PathBuf> {
    let path = dir.join(format!("{}_{}.csv", name, stamp));
    write_csv(&path, rows)?;
    std::fs::copy(&path, dir.join(format!("latest_{}.csv", name)))?;
    tracing::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[derive(Serialize)]
struct ExportSummary {
    table: &'static str,
    row_count: usize,
    export_timestamp: String,
}

pub async fn export_metrics(config: &AppConfig) -> Result<()> {
    let pool = open(config).await?;
    let teams = db::get_all_teams(&pool).await?;
    let facts = db::get_all_facts(&pool).await?;

    if facts.is_empty() {
        println!("📭 Nothing published yet. Try: courtforge run");
        return Ok(());
    }

    let dir = PathBuf::from(&config.export_dir);
    std::fs::create_dir_all(&dir).with_context(|| format!("Cannot create {}", dir.display()))?;

    let now = Utc::now();
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let run_date = match db::get_latest_run(&pool).await? {
        Some(run) => parse_date(&run.run_date)?,
        None => Local::now().date_naive(),
    };

    println!("📤 Exporting metrics to {}...", dir.display());

    let win_rates = win_rates_by_season(&facts, &teams);
    export_table(&dir, "team_win_rates", &stamp, &win_rates)?;

    let trends = elo_trends(&facts, &teams, years_before(run_date, TREND_WINDOW_YEARS));
    export_table(&dir, "elo_trends", &stamp, &trends)?;

    let point_diffs = point_diff_by_season(&facts, &teams);
    export_table(&dir, "point_diff_by_season", &stamp, &point_diffs)?;

    write_csv(&dir.join("dim_teams.csv"), &teams)?;
    write_csv(&dir.join("fct_games.csv"), &facts)?;

    let timestamp = now.to_rfc3339();
    let summary = vec![
        ExportSummary { table: "team_win_rates", row_count: win_rates.len(), export_timestamp: timestamp.clone() },
        ExportSummary { table: "elo_trends", row_count: trends.len(), export_timestamp: timestamp.clone() },
        ExportSummary { table: "point_diff_by_season", row_count: point_diffs.len(), export_timestamp: timestamp.clone() },
        ExportSummary { table: "dim_teams", row_count: teams.len(), export_timestamp: timestamp.clone() },
        ExportSummary { table: "fct_games", row_count: facts.len(), export_timestamp: timestamp },
    ];
    std::fs::write(dir.join("export_summary.json"), serde_json::to_string_pretty(&summary)?)?;

    for entry in &summary {
        println!("   • {}: {} rows", entry.table, entry.row_count);
    }
    println!("✅ Export complete");
    Ok(())
}

/// Closest team names to `query`, best first.
fn suggest<'a>(query: &str, teams: &'a [TeamEntity]) -> Vec<&'a TeamEntity> {
    let query = query.to_lowercase();
    let mut scored: Vec<(f64, &TeamEntity)> = teams
        .iter()
        .map(|team| (strsim::jaro_winkler(&query, &team.team_name.to_lowercase()), team))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.team_name.cmp(&b.1.team_name)));
    scored.into_iter().take(SUGGESTION_LIMIT).map(|(_, team)| team).collect()
}

fn result_letter(fact: &GameTeamFact) -> &'static str {
    match (fact.win_flag, fact.score_diff) {
        (1, _) => "W",
        (_, 0) => "T",
        _ => "L",
    }
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}", v))
}

pub async fn query_team(config: &AppConfig, team_name: &str) -> Result<()> {
    let pool = open(config).await?;

    println!("🔍 Searching for team: {}", team_name);

    let teams = db::find_teams_by_name(&pool, team_name).await?;
    if teams.is_empty() {
        println!("❌ No teams found matching '{}'", team_name);

        let all_teams = db::get_all_teams(&pool).await?;
        if !all_teams.is_empty() {
            println!("\n💡 Did you mean:");
            for team in suggest(team_name, &all_teams) {
                println!("   • {} ({})", team.team_name, team.team_id);
            }
        }
        return Ok(());
    }

    if teams.len() > 1 {
        println!("📋 Found {} teams matching '{}':\n", teams.len(), team_name);
        for (i, team) in teams.iter().enumerate() {
            println!("{}. {} ({})", i + 1, team.team_name, team.team_id);
        }
        println!("\n🔍 Showing details for first match:");
    }

    let team = &teams[0];
    let active = if team.is_active { "active" } else { "inactive" };

    println!("📊 Team Details:");
    println!("   Name: {} ({}, {})", team.team_name, team.team_id, active);
    println!("   Conference: {}", team.conference);
    println!(
        "   History: {} to {} over {} seasons",
        team.first_game_date.map_or_else(|| "?".to_string(), format_date),
        team.last_game_date.map_or_else(|| "?".to_string(), format_date),
        team.seasons_played
    );
    println!("   Record: {} wins in {} games ({}%)", team.total_wins, team.total_games, rate(team.historical_win_rate));
    println!("   ELO: avg {} | peak {}", rate(team.avg_elo_rating), rate(team.peak_elo_rating));

    println!("\n📅 Recent Games:");
    let recent = db::get_team_facts(&pool, &team.team_id, RECENT_GAMES).await?;
    if recent.is_empty() {
        println!("   No games found");
    }
    for fact in recent {
        println!(
            "   {} {} {} ({}-{}) {} · {}",
            fact.game_date.format("%Y-%m-%d"),
            if fact.game_location == GameLocation::Home { "vs" } else { "at" },
            fact.opponent_id,
            fact.score_for,
            fact.score_against,
            result_letter(&fact),
            fact.game_outcome_type.as_str()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::game_deriver::tests::raw_game;
    use crate::services::{build_facts, derive_game};

    fn facts_for(home_score: i32, away_score: i32) -> Vec<GameTeamFact> {
        let game = derive_game(
            &raw_game("2024-01-10", "BOS", "LAL", home_score, away_score),
            &AliasResolver::default(),
        )
        .unwrap();
        build_facts(&[game])
    }

    #[test]
    fn test_result_letter() {
        let decided = facts_for(110, 100);
        assert_eq!(result_letter(&decided[0]), "W");
        assert_eq!(result_letter(&decided[1]), "L");

        let tied = facts_for(100, 100);
        assert_eq!(result_letter(&tied[0]), "T");
        assert_eq!(result_letter(&tied[1]), "T");
    }

    #[test]
    fn test_suggestions_rank_closest_name_first() {
        let team = |id: &str, name: &str| TeamEntity {
            team_id: id.to_string(),
            team_name: name.to_string(),
            current_team_code: id.to_string(),
            conference: crate::models::Conference::Historical,
            first_game_date: None,
            last_game_date: None,
            seasons_played: 0,
            total_games: 0,
            total_wins: 0,
            historical_win_rate: None,
            avg_elo_rating: None,
            peak_elo_rating: None,
            is_active: false,
        };
        let teams = vec![team("BOS", "Boston Celtics"), team("LAL", "Los Angeles Lakers")];
        let suggestions = suggest("boston celtcs", &teams);
        assert_eq!(suggestions[0].team_id, "BOS");
    }
}
