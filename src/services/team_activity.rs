use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::CanonicalGame;

/// When and how often a canonical team has played.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamActivity {
    pub team_id: String,
    pub first_game_date: NaiveDate,
    pub last_game_date: NaiveDate,
    pub seasons_played: i64,
    pub total_games: i64,
}

#[derive(Default)]
struct Accumulator {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    seasons: BTreeSet<i32>,
    games: i64,
}

impl Accumulator {
    fn record(&mut self, date: NaiveDate, season: i32) {
        self.first = Some(self.first.map_or(date, |d| d.min(date)));
        self.last = Some(self.last.map_or(date, |d| d.max(date)));
        self.seasons.insert(season);
        self.games += 1;
    }
}

/// Activity per canonical team id, counting each game once for each side.
///
/// Keys are the resolved ids carried by the games, so relocated franchises accumulate
/// under a single identity.
pub fn aggregate_activity(games: &[CanonicalGame]) -> BTreeMap<String, TeamActivity> {
    let mut by_team: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for game in games {
        for team_id in [game.home_team_id.as_str(), game.away_team_id.as_str()] {
            by_team
                .entry(team_id)
                .or_default()
                .record(game.game_date, game.season);
        }
    }

    by_team
        .into_iter()
        .filter_map(|(team_id, acc)| {
            Some((
                team_id.to_string(),
                TeamActivity {
                    team_id: team_id.to_string(),
                    first_game_date: acc.first?,
                    last_game_date: acc.last?,
                    seasons_played: acc.seasons.len() as i64,
                    total_games: acc.games,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AliasEntry;
    use crate::services::game_deriver::tests::raw_game;
    use crate::services::{derive_game, AliasResolver};

    fn games(resolver: &AliasResolver, rows: &[(&str, &str, &str, i32)]) -> Vec<CanonicalGame> {
        rows.iter()
            .map(|(date, home, away, season)| {
                let mut raw = raw_game(date, home, away, 100, 90);
                raw.season = *season;
                derive_game(&raw, resolver).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_first_last_seasons_and_count() {
        let resolver = AliasResolver::default();
        let games = games(
            &resolver,
            &[
                ("2023-03-01", "BOS", "LAL", 2023),
                ("2022-11-05", "LAL", "BOS", 2023),
                ("2024-01-10", "BOS", "NYK", 2024),
            ],
        );
        let activity = aggregate_activity(&games);

        let bos = &activity["BOS"];
        assert_eq!(bos.first_game_date, NaiveDate::from_ymd_opt(2022, 11, 5).unwrap());
        assert_eq!(bos.last_game_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(bos.seasons_played, 2);
        assert_eq!(bos.total_games, 3);

        assert_eq!(activity["LAL"].total_games, 2);
        assert_eq!(activity["NYK"].seasons_played, 1);
    }

    #[test]
    fn test_relocated_franchise_accumulates_under_canonical_id() {
        let resolver = AliasResolver::new(&[AliasEntry::new("SEA", "Seattle SuperSonics", "OKC")]).unwrap();
        let games = games(
            &resolver,
            &[
                ("2007-04-18", "SEA", "DEN", 2007),
                ("2024-01-10", "OKC", "DEN", 2024),
            ],
        );
        let activity = aggregate_activity(&games);

        assert!(!activity.contains_key("SEA"));
        let okc = &activity["OKC"];
        assert_eq!(okc.total_games, 2);
        assert_eq!(okc.seasons_played, 2);
        assert_eq!(okc.first_game_date, NaiveDate::from_ymd_opt(2007, 4, 18).unwrap());
    }
}
