use crate::models::{
    AdjustedLocation, CanonicalGame, GameImpact, GameLocation, GameOutcomeType, GameTeamFact,
    PerformanceVsExpectation,
};

/// Band a score differential, top-down, first match wins.
pub fn classify_outcome(score_diff: i32) -> GameOutcomeType {
    match score_diff {
        d if d > 20 => GameOutcomeType::BlowoutWin,
        d if d > 10 => GameOutcomeType::ComfortableWin,
        d if d > 0 => GameOutcomeType::CloseWin,
        0 => GameOutcomeType::Tie,
        d if d >= -10 => GameOutcomeType::CloseLoss,
        d if d >= -20 => GameOutcomeType::ComfortableLoss,
        _ => GameOutcomeType::BlowoutLoss,
    }
}

/// Compare the result with the side's own pre-game win probability.
///
/// The win flag is checked first; without a probability nothing counts as an upset.
pub fn classify_expectation(win_flag: i32, win_probability: Option<f64>) -> PerformanceVsExpectation {
    let Some(prob) = win_probability else {
        return PerformanceVsExpectation::ExpectedResult;
    };

    if win_flag == 1 {
        if prob < 0.30 {
            PerformanceVsExpectation::MajorUpset
        } else if prob < 0.45 {
            PerformanceVsExpectation::MinorUpset
        } else {
            PerformanceVsExpectation::ExpectedResult
        }
    } else if prob > 0.70 {
        PerformanceVsExpectation::MajorUpsetLoss
    } else if prob > 0.55 {
        PerformanceVsExpectation::MinorUpsetLoss
    } else {
        PerformanceVsExpectation::ExpectedResult
    }
}

pub fn classify_impact(elo_change: Option<f64>) -> GameImpact {
    match elo_change.map(f64::abs) {
        Some(swing) if swing > 30.0 => GameImpact::High,
        Some(swing) if swing > 20.0 => GameImpact::Medium,
        _ => GameImpact::Low,
    }
}

fn perspective(game: &CanonicalGame, location: GameLocation) -> GameTeamFact {
    let (team_id, opponent_id, score_for, score_against, score_diff, win_flag, elo_pre, elo_post, elo_change, win_probability) =
        match location {
            GameLocation::Home => (
                &game.home_team_id,
                &game.away_team_id,
                game.home_score,
                game.away_score,
                game.home_score_diff,
                game.home_win_flag,
                game.home_elo_pre,
                game.home_elo_post,
                game.home_elo_change,
                game.home_win_prob,
            ),
            GameLocation::Away => (
                &game.away_team_id,
                &game.home_team_id,
                game.away_score,
                game.home_score,
                game.away_score_diff,
                game.away_win_flag,
                game.away_elo_pre,
                game.away_elo_post,
                game.away_elo_change,
                game.away_win_prob,
            ),
        };

    let adjusted_game_location = match (game.neutral, location) {
        (true, _) => AdjustedLocation::Neutral,
        (false, GameLocation::Home) => AdjustedLocation::Home,
        (false, GameLocation::Away) => AdjustedLocation::Away,
    };

    GameTeamFact {
        game_team_id: format!("{}_{}", game.game_id, team_id),
        game_id: game.game_id.clone(),
        team_id: team_id.clone(),
        opponent_id: opponent_id.clone(),
        game_date: game.game_date,
        season: game.season,
        game_location: location,
        adjusted_game_location,
        playoff: game.playoff,
        score_for,
        score_against,
        score_diff,
        win_flag,
        elo_pre,
        elo_post,
        elo_change,
        win_probability,
        game_outcome_type: classify_outcome(score_diff),
        performance_vs_expectation: classify_expectation(win_flag, win_probability),
        game_impact: classify_impact(elo_change),
    }
}

/// Two facts per game, home perspective first, ordered by date then game id.
pub fn build_facts(games: &[CanonicalGame]) -> Vec<GameTeamFact> {
    let mut ordered: Vec<&CanonicalGame> = games.iter().collect();
    ordered.sort_by(|a, b| {
        a.game_date
            .cmp(&b.game_date)
            .then_with(|| a.game_id.cmp(&b.game_id))
    });

    ordered
        .into_iter()
        .flat_map(|game| {
            [
                perspective(game, GameLocation::Home),
                perspective(game, GameLocation::Away),
            ]
        })
        .collect()
}
