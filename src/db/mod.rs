pub mod seed;
pub use seed::seed_aliases;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;

use crate::config::AppConfig;
use crate::models::*;
use crate::services::Snapshot;
use crate::utils::format_date;

pub async fn create_pool(config: &AppConfig) -> Result<SqlitePool> {
    create_pool_with_url(&config.database_url).await
}

pub async fn create_pool_with_url(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(config: &AppConfig) -> Result<()> {
    let pool = create_pool(config).await?;
    init_database_with_pool(&pool).await?;
    seed_aliases(&pool).await
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_games (
            row_index INTEGER PRIMARY KEY,
            game_date TEXT,
            season INTEGER NOT NULL,
            neutral INTEGER NOT NULL DEFAULT 0,
            playoff INTEGER NOT NULL DEFAULT 0,
            home_team_code TEXT,
            away_team_code TEXT,
            home_elo_pre REAL,
            away_elo_pre REAL,
            home_elo_post REAL,
            away_elo_post REAL,
            home_score INTEGER,
            away_score INTEGER,
            home_win_prob REAL,
            away_win_prob REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No key on team_code: conflicting rows must reach the resolver so the run can flag them
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_aliases (
            team_code TEXT NOT NULL,
            team_name TEXT NOT NULL,
            current_team_code TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dim_teams (
            team_id TEXT PRIMARY KEY,
            team_name TEXT NOT NULL,
            current_team_code TEXT NOT NULL,
            conference TEXT NOT NULL,
            first_game_date TEXT,
            last_game_date TEXT,
            seasons_played INTEGER NOT NULL,
            total_games INTEGER NOT NULL,
            total_wins INTEGER NOT NULL,
            historical_win_rate REAL,
            avg_elo_rating REAL,
            peak_elo_rating REAL,
            is_active INTEGER NOT NULL,
            sort_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fct_games (
            game_team_id TEXT PRIMARY KEY,
            game_id TEXT NOT NULL,
            team_id TEXT NOT NULL,
            opponent_id TEXT NOT NULL,
            game_date TEXT NOT NULL,
            season INTEGER NOT NULL,
            game_location TEXT NOT NULL,
            adjusted_game_location TEXT NOT NULL,
            playoff INTEGER NOT NULL,
            score_for INTEGER NOT NULL,
            score_against INTEGER NOT NULL,
            score_diff INTEGER NOT NULL,
            win_flag INTEGER NOT NULL,
            elo_pre REAL,
            elo_post REAL,
            elo_change REAL,
            win_probability REAL,
            game_outcome_type TEXT NOT NULL,
            performance_vs_expectation TEXT NOT NULL,
            game_impact TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY (team_id) REFERENCES dim_teams (team_id),
            FOREIGN KEY (opponent_id) REFERENCES dim_teams (team_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            run_id TEXT PRIMARY KEY,
            run_date TEXT NOT NULL,
            raw_rows INTEGER NOT NULL,
            games_derived INTEGER NOT NULL,
            rows_rejected INTEGER NOT NULL,
            teams_published INTEGER NOT NULL,
            facts_published INTEGER NOT NULL,
            published_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fct_games_team ON fct_games(team_id, game_date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fct_games_season ON fct_games(season)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

// Raw table operations

/// Replace the raw game table wholesale.
pub async fn replace_raw_games(pool: &SqlitePool, games: &[RawGame]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM raw_games").execute(&mut *tx).await?;

    for (index, game) in games.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO raw_games
            (row_index, game_date, season, neutral, playoff, home_team_code, away_team_code,
             home_elo_pre, away_elo_pre, home_elo_post, away_elo_post, home_score, away_score,
             home_win_prob, away_win_prob)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(index as i64)
        .bind(game.game_date.map(format_date))
        .bind(game.season)
        .bind(game.neutral)
        .bind(game.playoff)
        .bind(&game.home_team_code)
        .bind(&game.away_team_code)
        .bind(game.home_elo_pre)
        .bind(game.away_elo_pre)
        .bind(game.home_elo_post)
        .bind(game.away_elo_post)
        .bind(game.home_score)
        .bind(game.away_score)
        .bind(game.home_win_prob)
        .bind(game.away_win_prob)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!("Loaded {} rows into raw_games", games.len());
    Ok(())
}

pub async fn replace_aliases(pool: &SqlitePool, aliases: &[AliasEntry]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM team_aliases").execute(&mut *tx).await?;

    for alias in aliases {
        sqlx::query("INSERT INTO team_aliases (team_code, team_name, current_team_code) VALUES (?, ?, ?)")
            .bind(&alias.team_code)
            .bind(&alias.team_name)
            .bind(&alias.current_team_code)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!("Loaded {} rows into team_aliases", aliases.len());
    Ok(())
}

fn parse_optional_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    raw.map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| anyhow!("Bad stored date: {}", e))
}

pub async fn get_raw_games(pool: &SqlitePool) -> Result<Vec<RawGame>> {
    let rows = sqlx::query("SELECT * FROM raw_games ORDER BY row_index")
        .fetch_all(pool)
        .await?;

    let mut games = Vec::with_capacity(rows.len());
    for row in rows {
        games.push(RawGame {
            game_date: parse_optional_date(row.get("game_date"))?,
            season: row.get("season"),
            neutral: row.get("neutral"),
            playoff: row.get("playoff"),
            home_team_code: row.get("home_team_code"),
            away_team_code: row.get("away_team_code"),
            home_elo_pre: row.get("home_elo_pre"),
            away_elo_pre: row.get("away_elo_pre"),
            home_elo_post: row.get("home_elo_post"),
            away_elo_post: row.get("away_elo_post"),
            home_score: row.get("home_score"),
            away_score: row.get("away_score"),
            home_win_prob: row.get("home_win_prob"),
            away_win_prob: row.get("away_win_prob"),
        });
    }
    Ok(games)
}

pub async fn get_aliases(pool: &SqlitePool) -> Result<Vec<AliasEntry>> {
    let aliases = sqlx::query_as::<_, AliasEntry>(
        "SELECT team_code, team_name, current_team_code FROM team_aliases ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;
    Ok(aliases)
}

// Publication

/// Replace the published teams and facts with `snapshot`, all or nothing.
///
/// Everything happens inside one transaction; on any error it is rolled back on drop and
/// readers keep seeing the previous snapshot.
pub async fn publish_snapshot(pool: &SqlitePool, snapshot: &Snapshot) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM fct_games").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM dim_teams").execute(&mut *tx).await?;

    for (order, team) in snapshot.teams.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO dim_teams
            (team_id, team_name, current_team_code, conference, first_game_date, last_game_date,
             seasons_played, total_games, total_wins, historical_win_rate, avg_elo_rating,
             peak_elo_rating, is_active, sort_order)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&team.team_id)
        .bind(&team.team_name)
        .bind(&team.current_team_code)
        .bind(team.conference.as_str())
        .bind(team.first_game_date.map(format_date))
        .bind(team.last_game_date.map(format_date))
        .bind(team.seasons_played)
        .bind(team.total_games)
        .bind(team.total_wins)
        .bind(team.historical_win_rate)
        .bind(team.avg_elo_rating)
        .bind(team.peak_elo_rating)
        .bind(team.is_active)
        .bind(order as i64)
        .execute(&mut *tx)
        .await?;
    }

    for (order, fact) in snapshot.facts.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO fct_games
            (game_team_id, game_id, team_id, opponent_id, game_date, season, game_location,
             adjusted_game_location, playoff, score_for, score_against, score_diff, win_flag,
             elo_pre, elo_post, elo_change, win_probability, game_outcome_type,
             performance_vs_expectation, game_impact, sort_order)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fact.game_team_id)
        .bind(&fact.game_id)
        .bind(&fact.team_id)
        .bind(&fact.opponent_id)
        .bind(format_date(fact.game_date))
        .bind(fact.season)
        .bind(fact.game_location.as_str())
        .bind(fact.adjusted_game_location.as_str())
        .bind(fact.playoff)
        .bind(fact.score_for)
        .bind(fact.score_against)
        .bind(fact.score_diff)
        .bind(fact.win_flag)
        .bind(fact.elo_pre)
        .bind(fact.elo_post)
        .bind(fact.elo_change)
        .bind(fact.win_probability)
        .bind(fact.game_outcome_type.as_str())
        .bind(fact.performance_vs_expectation.as_str())
        .bind(fact.game_impact.as_str())
        .bind(order as i64)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO pipeline_runs
        (run_id, run_date, raw_rows, games_derived, rows_rejected, teams_published, facts_published, published_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(snapshot.run_id.to_string())
    .bind(format_date(snapshot.run_date))
    .bind(snapshot.report.raw_rows as i64)
    .bind(snapshot.report.games_derived as i64)
    .bind(snapshot.report.rejected.len() as i64)
    .bind(snapshot.teams.len() as i64)
    .bind(snapshot.facts.len() as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        run_id = %snapshot.run_id,
        "Published {} teams and {} facts",
        snapshot.teams.len(),
        snapshot.facts.len()
    );
    Ok(())
}

// Published table queries

fn label<T: Label>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.get(column);
    T::from_label(&raw).ok_or_else(|| anyhow!("Unknown {} value '{}'", column, raw))
}

fn team_from_row(row: &SqliteRow) -> Result<TeamEntity> {
    Ok(TeamEntity {
        team_id: row.get("team_id"),
        team_name: row.get("team_name"),
        current_team_code: row.get("current_team_code"),
        conference: label(row, "conference")?,
        first_game_date: parse_optional_date(row.get("first_game_date"))?,
        last_game_date: parse_optional_date(row.get("last_game_date"))?,
        seasons_played: row.get("seasons_played"),
        total_games: row.get("total_games"),
        total_wins: row.get("total_wins"),
        historical_win_rate: row.get("historical_win_rate"),
        avg_elo_rating: row.get("avg_elo_rating"),
        peak_elo_rating: row.get("peak_elo_rating"),
        is_active: row.get("is_active"),
    })
}

fn fact_from_row(row: &SqliteRow) -> Result<GameTeamFact> {
    Ok(GameTeamFact {
        game_team_id: row.get("game_team_id"),
        game_id: row.get("game_id"),
        team_id: row.get("team_id"),
        opponent_id: row.get("opponent_id"),
        game_date: NaiveDate::parse_from_str(&row.get::<String, _>("game_date"), "%Y-%m-%d")?,
        season: row.get("season"),
        game_location: label(row, "game_location")?,
        adjusted_game_location: label(row, "adjusted_game_location")?,
        playoff: row.get("playoff"),
        score_for: row.get("score_for"),
        score_against: row.get("score_against"),
        score_diff: row.get("score_diff"),
        win_flag: row.get("win_flag"),
        elo_pre: row.get("elo_pre"),
        elo_post: row.get("elo_post"),
        elo_change: row.get("elo_change"),
        win_probability: row.get("win_probability"),
        game_outcome_type: label(row, "game_outcome_type")?,
        performance_vs_expectation: label(row, "performance_vs_expectation")?,
        game_impact: label(row, "game_impact")?,
    })
}

pub async fn get_all_teams(pool: &SqlitePool) -> Result<Vec<TeamEntity>> {
    let rows = sqlx::query("SELECT * FROM dim_teams ORDER BY sort_order")
        .fetch_all(pool)
        .await?;
    rows.iter().map(team_from_row).collect()
}

pub async fn get_team_by_id(pool: &SqlitePool, team_id: &str) -> Result<Option<TeamEntity>> {
    let row = sqlx::query("SELECT * FROM dim_teams WHERE team_id = ?")
        .bind(team_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(team_from_row).transpose()
}

pub async fn find_teams_by_name(pool: &SqlitePool, query: &str) -> Result<Vec<TeamEntity>> {
    let rows = sqlx::query(
        "SELECT * FROM dim_teams WHERE LOWER(team_name) LIKE LOWER(?) OR LOWER(team_id) = LOWER(?) ORDER BY sort_order",
    )
    .bind(format!("%{}%", query))
    .bind(query)
    .fetch_all(pool)
    .await?;
    rows.iter().map(team_from_row).collect()
}

pub async fn get_all_facts(pool: &SqlitePool) -> Result<Vec<GameTeamFact>> {
    let rows = sqlx::query("SELECT * FROM fct_games ORDER BY sort_order")
        .fetch_all(pool)
        .await?;
    rows.iter().map(fact_from_row).collect()
}

/// Most recent facts for a team, newest first.
pub async fn get_team_facts(pool: &SqlitePool, team_id: &str, limit: i64) -> Result<Vec<GameTeamFact>> {
    let rows = sqlx::query(
        "SELECT * FROM fct_games WHERE team_id = ? ORDER BY game_date DESC, sort_order DESC LIMIT ?",
    )
    .bind(team_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(fact_from_row).collect()
}

pub async fn get_latest_run(pool: &SqlitePool) -> Result<Option<PipelineRun>> {
    let run = sqlx::query_as::<_, PipelineRun>(
        "SELECT * FROM pipeline_runs ORDER BY published_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(run)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    if !matches!(table, "raw_games" | "team_aliases" | "dim_teams" | "fct_games" | "pipeline_runs") {
        return Err(anyhow!("Unknown table: {}", table));
    }
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
