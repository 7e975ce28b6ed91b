use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

use crate::models::{AliasEntry, RawGame};
use crate::utils::non_blank;

// ── FiveThirtyEight elo.csv layout (team1 is the home side) ─────────────────

#[derive(Debug, Deserialize)]
struct EloCsvRow {
    #[serde(default, deserialize_with = "blank_as_none")]
    date: Option<String>,
    season: i32,
    #[serde(default, deserialize_with = "flag")]
    neutral: bool,
    #[serde(default, deserialize_with = "flag")]
    playoff: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    team1: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    team2: Option<String>,
    elo1_pre: Option<f64>,
    elo2_pre: Option<f64>,
    elo_prob1: Option<f64>,
    elo_prob2: Option<f64>,
    elo1_post: Option<f64>,
    elo2_post: Option<f64>,
    score1: Option<i32>,
    score2: Option<i32>,
}

/// Empty cells and whitespace become `None`.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(raw.as_deref()).map(str::to_string))
}

/// 0/1, true/false, t/f, or a playoff round letter; anything non-empty and not false-like is set.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match non_blank(raw.as_deref()).map(str::to_lowercase).as_deref() {
        None | Some("0") | Some("f") | Some("false") | Some("n") | Some("no") => false,
        Some(_) => true,
    })
}

impl EloCsvRow {
    fn into_raw_game(self, line: usize) -> RawGame {
        let game_date = self.date.as_deref().and_then(|d| match NaiveDate::parse_from_str(d, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!("Bad date '{}' on line {}: {}", d, line, e);
                None
            }
        });

        RawGame {
            game_date,
            season: self.season,
            neutral: self.neutral,
            playoff: self.playoff,
            home_team_code: self.team1,
            away_team_code: self.team2,
            home_elo_pre: self.elo1_pre,
            away_elo_pre: self.elo2_pre,
            home_elo_post: self.elo1_post,
            away_elo_post: self.elo2_post,
            home_score: self.score1,
            away_score: self.score2,
            home_win_prob: self.elo_prob1,
            away_win_prob: self.elo_prob2,
        }
    }
}

/// Parse raw games from any CSV reader. Extra columns are ignored.
pub fn read_games<R: Read>(reader: R) -> Result<Vec<RawGame>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut games = Vec::new();
    for (index, record) in csv_reader.deserialize::<EloCsvRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = record.with_context(|| format!("Malformed game row on line {}", line))?;
        games.push(row.into_raw_game(line));
    }
    Ok(games)
}

pub fn read_aliases<R: Read>(reader: R) -> Result<Vec<AliasEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut aliases = Vec::new();
    for (index, record) in csv_reader.deserialize::<AliasEntry>().enumerate() {
        let entry = record.with_context(|| format!("Malformed alias row on line {}", index + 2))?;
        aliases.push(entry);
    }
    Ok(aliases)
}

pub fn load_games_csv(path: &Path) -> Result<Vec<RawGame>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open games file {}", path.display()))?;
    let games = read_games(file)?;
    tracing::info!("Read {} raw games from {}", games.len(), path.display());
    Ok(games)
}

pub fn load_aliases_csv(path: &Path) -> Result<Vec<AliasEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open alias file {}", path.display()))?;
    let aliases = read_aliases(file)?;
    tracing::info!("Read {} alias entries from {}", aliases.len(), path.display());
    Ok(aliases)
}
