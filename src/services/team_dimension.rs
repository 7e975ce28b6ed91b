use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{CanonicalGame, Conference, TeamEntity};
use crate::services::{AliasResolver, TeamActivity, TeamPerformance};
use crate::utils::{percentage, round_to, years_before};

// Known to be incomplete: franchises missing here fall back to Historical.
const EASTERN: &[&str] = &[
    "ATL", "BOS", "BRK", "CHI", "CLE", "DET", "IND", "MIA", "MIL", "NYK", "ORL", "PHI", "TOR", "WAS",
];
const WESTERN: &[&str] = &[
    "DAL", "DEN", "GSW", "HOU", "LAC", "LAL", "MEM", "MIN", "OKC", "PHO", "POR", "SAC", "SAS", "UTA",
];

/// Team id to conference lookup, Historical for anything unlisted.
#[derive(Debug, Clone)]
pub struct ConferenceMap {
    map: HashMap<String, Conference>,
}

impl Default for ConferenceMap {
    fn default() -> Self {
        let entries = EASTERN
            .iter()
            .map(|id| (*id, Conference::Eastern))
            .chain(WESTERN.iter().map(|id| (*id, Conference::Western)));
        Self::from_entries(entries)
    }
}

impl ConferenceMap {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Conference)>,
    {
        Self {
            map: entries
                .into_iter()
                .map(|(id, conference)| (id.to_string(), conference))
                .collect(),
        }
    }

    pub fn conference(&self, team_id: &str) -> Conference {
        self.map.get(team_id).copied().unwrap_or(Conference::Historical)
    }
}

/// Every canonical id observed across the games and the alias table.
pub fn team_universe(games: &[CanonicalGame], resolver: &AliasResolver) -> BTreeSet<String> {
    let mut ids = resolver.canonical_ids();
    for game in games {
        ids.insert(game.home_team_id.clone());
        ids.insert(game.away_team_id.clone());
    }
    ids
}

/// Merge activity and performance into one `TeamEntity` per id, ordered by team name.
pub fn build_team_dimension(
    team_ids: &BTreeSet<String>,
    resolver: &AliasResolver,
    activity: &BTreeMap<String, TeamActivity>,
    performance: &BTreeMap<String, TeamPerformance>,
    conferences: &ConferenceMap,
    run_date: NaiveDate,
    active_window_years: u32,
) -> Vec<TeamEntity> {
    let active_since = years_before(run_date, active_window_years);

    let mut teams: Vec<TeamEntity> = team_ids
        .iter()
        .map(|team_id| {
            let act = activity.get(team_id);
            let perf = performance.get(team_id);
            let games_analyzed = perf.map_or(0, |p| p.games_analyzed);
            let total_wins = perf.map_or(0, |p| p.total_wins);
            let last_game_date = act.map(|a| a.last_game_date);

            TeamEntity {
                team_id: team_id.clone(),
                team_name: resolver.team_name(team_id),
                current_team_code: team_id.clone(),
                conference: conferences.conference(team_id),
                first_game_date: act.map(|a| a.first_game_date),
                last_game_date,
                seasons_played: act.map_or(0, |a| a.seasons_played),
                total_games: act.map_or(0, |a| a.total_games),
                total_wins,
                historical_win_rate: percentage(total_wins, games_analyzed, 2),
                avg_elo_rating: perf.and_then(|p| p.avg_elo_rating).map(|v| round_to(v, 1)),
                peak_elo_rating: perf.and_then(|p| p.peak_elo_rating).map(|v| round_to(v, 1)),
                is_active: last_game_date.is_some_and(|d| d >= active_since),
            }
        })
        .collect();

    teams.sort_by(|a, b| {
        a.team_name
            .cmp(&b.team_name)
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    teams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AliasEntry;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn activity_for(team_id: &str, first: &str, last: &str, games: i64) -> (String, TeamActivity) {
        (
            team_id.to_string(),
            TeamActivity {
                team_id: team_id.to_string(),
                first_game_date: date(first),
                last_game_date: date(last),
                seasons_played: 1,
                total_games: games,
            },
        )
    }

    fn performance_for(team_id: &str, games: i64, wins: i64, avg: f64, peak: f64) -> (String, TeamPerformance) {
        (
            team_id.to_string(),
            TeamPerformance {
                team_id: team_id.to_string(),
                games_analyzed: games,
                total_wins: wins,
                avg_elo_rating: Some(avg),
                peak_elo_rating: Some(peak),
            },
        )
    }

    #[test]
    fn test_conference_lookup_defaults_to_historical() {
        let conferences = ConferenceMap::default();
        assert_eq!(conferences.conference("BOS"), Conference::Eastern);
        assert_eq!(conferences.conference("OKC"), Conference::Western);
        assert_eq!(conferences.conference("SEA"), Conference::Historical);
        // Not in the lookup; stays Historical
        assert_eq!(conferences.conference("NOP"), Conference::Historical);
    }

    #[test]
    fn test_builds_rounded_entities_sorted_by_name() {
        let resolver = AliasResolver::new(&[
            AliasEntry::new("BOS", "Boston Celtics", "BOS"),
            AliasEntry::new("LAL", "Los Angeles Lakers", "LAL"),
            AliasEntry::new("AND", "Anderson Packers", "AND"),
        ])
        .unwrap();
        let ids: BTreeSet<String> = ["BOS", "LAL", "AND"].iter().map(|s| s.to_string()).collect();
        let activity: BTreeMap<_, _> = [
            activity_for("BOS", "2023-10-25", "2026-04-12", 3),
            activity_for("LAL", "1990-11-02", "2020-10-11", 3),
        ]
        .into_iter()
        .collect();
        let performance: BTreeMap<_, _> = [
            performance_for("BOS", 3, 2, 1612.3456, 1650.04),
            performance_for("LAL", 3, 1, 1500.05, 1555.55),
        ]
        .into_iter()
        .collect();

        let teams = build_team_dimension(
            &ids,
            &resolver,
            &activity,
            &performance,
            &ConferenceMap::default(),
            date("2026-10-19"),
            2,
        );

        let names: Vec<&str> = teams.iter().map(|t| t.team_name.as_str()).collect();
        assert_eq!(names, vec!["Anderson Packers", "Boston Celtics", "Los Angeles Lakers"]);

        let packers = &teams[0];
        assert_eq!(packers.total_games, 0);
        assert_eq!(packers.historical_win_rate, None);
        assert_eq!(packers.avg_elo_rating, None);
        assert_eq!(packers.first_game_date, None);
        assert!(!packers.is_active);
        assert_eq!(packers.conference, Conference::Historical);

        let celtics = &teams[1];
        assert_eq!(celtics.historical_win_rate, Some(66.67));
        assert_eq!(celtics.avg_elo_rating, Some(1612.3));
        assert_eq!(celtics.peak_elo_rating, Some(1650.0));
        assert!(celtics.is_active);
        assert_eq!(celtics.current_team_code, "BOS");

        let lakers = &teams[2];
        assert_eq!(lakers.historical_win_rate, Some(33.33));
        assert!(!lakers.is_active);
    }

    #[test]
    fn test_activity_threshold_is_inclusive() {
        let resolver = AliasResolver::default();
        let ids: BTreeSet<String> = ["BOS".to_string()].into_iter().collect();
        let activity: BTreeMap<_, _> = [activity_for("BOS", "2020-01-01", "2024-10-19", 1)].into_iter().collect();

        let teams = build_team_dimension(
            &ids,
            &resolver,
            &activity,
            &BTreeMap::new(),
            &ConferenceMap::default(),
            date("2026-10-19"),
            2,
        );
        assert!(teams[0].is_active);

        let teams = build_team_dimension(
            &ids,
            &resolver,
            &activity,
            &BTreeMap::new(),
            &ConferenceMap::default(),
            date("2026-10-20"),
            2,
        );
        assert!(!teams[0].is_active);
    }
}
