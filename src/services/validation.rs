use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::PipelineError;
use crate::models::{CanonicalGame, GameTeamFact, TeamEntity};

/// Check a derived snapshot before it is allowed anywhere near the output store.
pub fn validate_snapshot(
    games: &[CanonicalGame],
    teams: &[TeamEntity],
    facts: &[GameTeamFact],
) -> Result<(), PipelineError> {
    check_games(games)?;
    check_teams(teams)?;
    check_facts(games, teams, facts)?;
    Ok(())
}

fn fail(message: String) -> Result<(), PipelineError> {
    tracing::error!("Snapshot validation failed: {}", message);
    Err(PipelineError::Integrity(message))
}

fn check_games(games: &[CanonicalGame]) -> Result<(), PipelineError> {
    let mut ids = HashSet::with_capacity(games.len());
    for game in games {
        if !ids.insert(game.game_id.as_str()) {
            return fail(format!("game_id {} appears more than once", game.game_id));
        }
        if game.home_score_diff != -game.away_score_diff {
            return fail(format!("game {} has asymmetric score differentials", game.game_id));
        }
        let winners = game.home_win_flag + game.away_win_flag;
        let expected = if game.home_score == game.away_score { 0 } else { 1 };
        if winners != expected {
            return fail(format!("game {} has {} winners, expected {}", game.game_id, winners, expected));
        }
    }
    Ok(())
}

fn check_teams(teams: &[TeamEntity]) -> Result<(), PipelineError> {
    let mut ids = HashSet::with_capacity(teams.len());
    for team in teams {
        if !ids.insert(team.team_id.as_str()) {
            return fail(format!("team {} appears more than once", team.team_id));
        }
        // games_analyzed and total_games count the same appearances
        if team.historical_win_rate.is_some() != (team.total_games > 0) {
            return fail(format!("team {} win rate does not match its game count", team.team_id));
        }
        if team.total_wins > team.total_games {
            return fail(format!("team {} has more wins than games", team.team_id));
        }
    }
    Ok(())
}

fn check_facts(
    games: &[CanonicalGame],
    teams: &[TeamEntity],
    facts: &[GameTeamFact],
) -> Result<(), PipelineError> {
    let team_ids: BTreeSet<&str> = teams.iter().map(|t| t.team_id.as_str()).collect();
    let mut keys = HashSet::with_capacity(facts.len());
    let mut by_game: BTreeMap<&str, Vec<&GameTeamFact>> = BTreeMap::new();

    for fact in facts {
        if !keys.insert(fact.game_team_id.as_str()) {
            return fail(format!("game_team_id {} is not unique", fact.game_team_id));
        }
        for id in [&fact.team_id, &fact.opponent_id] {
            if !team_ids.contains(id.as_str()) {
                return fail(format!("fact {} references unknown team {}", fact.game_team_id, id));
            }
        }
        by_game.entry(fact.game_id.as_str()).or_default().push(fact);
    }

    if by_game.len() != games.len() {
        return fail(format!("{} games but facts cover {}", games.len(), by_game.len()));
    }

    for game in games {
        let Some(pair) = by_game.get(game.game_id.as_str()) else {
            return fail(format!("game {} has no facts", game.game_id));
        };
        let [a, b] = pair.as_slice() else {
            return fail(format!("game {} has {} facts, expected 2", game.game_id, pair.len()));
        };
        if a.game_location == b.game_location {
            return fail(format!("game {} facts do not cover both sides", game.game_id));
        }
        if a.score_for != b.score_against || a.score_against != b.score_for || a.score_diff != -b.score_diff {
            return fail(format!("game {} facts are not mirror images", game.game_id));
        }
        if a.team_id != b.opponent_id || b.team_id != a.opponent_id {
            return fail(format!("game {} facts disagree on opponents", game.game_id));
        }
    }

    Ok(())
}
