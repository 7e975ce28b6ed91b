use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::error::PipelineError;
use crate::models::{CanonicalGame, DuplicatePolicy, RawGame};
use crate::services::AliasResolver;
use crate::utils::{compact_date, non_blank};

/// A required raw field that was absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissingField {
    GameDate,
    HomeTeamCode,
    AwayTeamCode,
    HomeScore,
    AwayScore,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingField::GameDate => "game_date",
            MissingField::HomeTeamCode => "home_team_code",
            MissingField::AwayTeamCode => "away_team_code",
            MissingField::HomeScore => "home_score",
            MissingField::AwayScore => "away_score",
        };
        f.write_str(name)
    }
}

/// A raw row excluded from every downstream entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub row: usize,
    pub field: MissingField,
}

/// A raw row dropped under `DuplicatePolicy::KeepFirst`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedDuplicate {
    pub game_id: String,
    pub kept_row: usize,
    pub dropped_row: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DerivedGames {
    pub games: Vec<CanonicalGame>,
    pub rejected: Vec<RowRejection>,
    pub duplicates: Vec<DroppedDuplicate>,
}

/// `<YYYYMMDD>_<home_code>_<away_code>`
pub fn game_id(date: chrono::NaiveDate, home_code: &str, away_code: &str) -> String {
    format!("{}_{}_{}", compact_date(date), home_code, away_code)
}

fn win_flag(own: i32, other: i32) -> i32 {
    if own > other {
        1
    } else {
        0
    }
}

fn elo_change(pre: Option<f64>, post: Option<f64>) -> Option<f64> {
    match (pre, post) {
        (Some(pre), Some(post)) => Some(post - pre),
        _ => None,
    }
}

/// Derive one canonical game from one raw row.
pub fn derive_game(raw: &RawGame, resolver: &AliasResolver) -> Result<CanonicalGame, MissingField> {
    let game_date = raw.game_date.ok_or(MissingField::GameDate)?;
    let home_code = non_blank(raw.home_team_code.as_deref()).ok_or(MissingField::HomeTeamCode)?;
    let away_code = non_blank(raw.away_team_code.as_deref()).ok_or(MissingField::AwayTeamCode)?;
    let home_score = raw.home_score.ok_or(MissingField::HomeScore)?;
    let away_score = raw.away_score.ok_or(MissingField::AwayScore)?;

    Ok(CanonicalGame {
        game_id: game_id(game_date, home_code, away_code),
        game_date,
        season: raw.season,
        neutral: raw.neutral,
        playoff: raw.playoff,
        home_team_code: home_code.to_string(),
        away_team_code: away_code.to_string(),
        home_team_id: resolver.resolve(home_code).to_string(),
        away_team_id: resolver.resolve(away_code).to_string(),
        home_score,
        away_score,
        home_score_diff: home_score - away_score,
        away_score_diff: away_score - home_score,
        home_win_flag: win_flag(home_score, away_score),
        away_win_flag: win_flag(away_score, home_score),
        home_elo_pre: raw.home_elo_pre,
        away_elo_pre: raw.away_elo_pre,
        home_elo_post: raw.home_elo_post,
        away_elo_post: raw.away_elo_post,
        home_elo_change: elo_change(raw.home_elo_pre, raw.home_elo_post),
        away_elo_change: elo_change(raw.away_elo_pre, raw.away_elo_post),
        home_win_prob: raw.home_win_prob,
        away_win_prob: raw.away_win_prob,
    })
}

/// Derive every raw row, in input order.
///
/// Rows missing identity or score fields are dropped and reported. Two rows sharing a game_id
/// either abort the run or, under `KeepFirst`, keep the first-seen row.
pub fn derive_games(
    raws: &[RawGame],
    resolver: &AliasResolver,
    policy: DuplicatePolicy,
) -> Result<DerivedGames, PipelineError> {
    let mut derived = DerivedGames::default();
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(raws.len());

    for (row, raw) in raws.iter().enumerate() {
        let game = match derive_game(raw, resolver) {
            Ok(game) => game,
            Err(field) => {
                tracing::warn!("Rejecting raw game row {}: missing {}", row, field);
                derived.rejected.push(RowRejection { row, field });
                continue;
            }
        };

        if let Some(&first_row) = seen.get(&game.game_id) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(PipelineError::DuplicateGameId {
                        game_id: game.game_id,
                        first_row,
                        second_row: row,
                    });
                }
                DuplicatePolicy::KeepFirst => {
                    tracing::warn!(
                        "Duplicate game_id {} at row {} (first seen at row {}), keeping first",
                        game.game_id,
                        row,
                        first_row
                    );
                    derived.duplicates.push(DroppedDuplicate {
                        game_id: game.game_id,
                        kept_row: first_row,
                        dropped_row: row,
                    });
                    continue;
                }
            }
        }

        seen.insert(game.game_id.clone(), row);
        derived.games.push(game);
    }

    Ok(derived)
}
