use std::collections::{BTreeMap, BTreeSet};

use crate::models::CanonicalGame;

/// Win and rating totals for one canonical team. Ratings are unrounded here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamPerformance {
    pub team_id: String,
    pub games_analyzed: i64,
    pub total_wins: i64,
    pub avg_elo_rating: Option<f64>,
    pub peak_elo_rating: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    games: i64,
    wins: i64,
    elo_sum: f64,
    elo_count: u32,
    elo_peak: Option<f64>,
}

impl Accumulator {
    fn record(&mut self, win_flag: i32, elo_post: Option<f64>) {
        self.games += 1;
        self.wins += i64::from(win_flag);
        if let Some(elo) = elo_post {
            self.elo_sum += elo;
            self.elo_count += 1;
            self.elo_peak = Some(self.elo_peak.map_or(elo, |peak| peak.max(elo)));
        }
    }
}

/// Performance for every team in `team_ids`, including teams with no games.
///
/// Each side contributes only its own win flag and its own post-game rating.
pub fn aggregate_performance(
    games: &[CanonicalGame],
    team_ids: &BTreeSet<String>,
) -> BTreeMap<String, TeamPerformance> {
    let mut by_team: BTreeMap<&str, Accumulator> = team_ids
        .iter()
        .map(|id| (id.as_str(), Accumulator::default()))
        .collect();

    for game in games {
        let sides = [
            (game.home_team_id.as_str(), game.home_win_flag, game.home_elo_post),
            (game.away_team_id.as_str(), game.away_win_flag, game.away_elo_post),
        ];
        for (team_id, win_flag, elo_post) in sides {
            match by_team.get_mut(team_id) {
                Some(acc) => acc.record(win_flag, elo_post),
                None => tracing::warn!("Game {} references unknown team {}", game.game_id, team_id),
            }
        }
    }

    by_team
        .into_iter()
        .map(|(team_id, acc)| {
            let avg_elo_rating = if acc.elo_count == 0 {
                None
            } else {
                Some(acc.elo_sum / f64::from(acc.elo_count))
            };
            (
                team_id.to_string(),
                TeamPerformance {
                    team_id: team_id.to_string(),
                    games_analyzed: acc.games,
                    total_wins: acc.wins,
                    avg_elo_rating,
                    peak_elo_rating: acc.elo_peak,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::game_deriver::tests::raw_game;
    use crate::services::{derive_game, AliasResolver};

    fn ids(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_wins_and_own_side_ratings() {
        let resolver = AliasResolver::default();
        let mut second = raw_game("2024-01-12", "LAL", "BOS", 120, 100);
        second.home_elo_post = Some(1620.0);
        second.away_elo_post = Some(1490.0);
        let games = vec![
            derive_game(&raw_game("2024-01-10", "BOS", "LAL", 110, 100), &resolver).unwrap(),
            derive_game(&second, &resolver).unwrap(),
        ];

        let perf = aggregate_performance(&games, &ids(&["BOS", "LAL"]));

        let bos = &perf["BOS"];
        assert_eq!(bos.games_analyzed, 2);
        assert_eq!(bos.total_wins, 1);
        // 1510 as home, 1490 as away; never LAL's numbers
        assert_eq!(bos.avg_elo_rating, Some(1500.0));
        assert_eq!(bos.peak_elo_rating, Some(1510.0));

        let lal = &perf["LAL"];
        assert_eq!(lal.total_wins, 1);
        assert_eq!(lal.avg_elo_rating, Some(1605.0));
        assert_eq!(lal.peak_elo_rating, Some(1620.0));
    }

    #[test]
    fn test_team_without_games_has_zero_and_no_ratings() {
        let perf = aggregate_performance(&[], &ids(&["CHH"]));
        let chh = &perf["CHH"];
        assert_eq!(chh.games_analyzed, 0);
        assert_eq!(chh.total_wins, 0);
        assert_eq!(chh.avg_elo_rating, None);
        assert_eq!(chh.peak_elo_rating, None);
    }

    #[test]
    fn test_ties_add_no_wins_and_missing_ratings_are_skipped() {
        let resolver = AliasResolver::default();
        let mut tie = raw_game("2024-01-10", "BOS", "LAL", 100, 100);
        tie.home_elo_post = None;
        let games = vec![derive_game(&tie, &resolver).unwrap()];

        let perf = aggregate_performance(&games, &ids(&["BOS", "LAL"]));
        assert_eq!(perf["BOS"].total_wins + perf["LAL"].total_wins, 0);
        assert_eq!(perf["BOS"].games_analyzed, 1);
        assert_eq!(perf["BOS"].avg_elo_rating, None);
        assert_eq!(perf["LAL"].avg_elo_rating, Some(1590.0));
    }
}
