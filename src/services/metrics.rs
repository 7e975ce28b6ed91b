//! Season-level and trend metrics computed from published facts.

use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::{BTreeMap, HashMap};

use crate::models::{GameTeamFact, TeamEntity};
use crate::utils::{percentage, round_to};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonWinRate {
    pub team_name: String,
    pub season: i32,
    pub games_played: i64,
    pub wins: i64,
    pub win_rate: Option<f64>,
    pub avg_point_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EloTrendPoint {
    pub team_name: String,
    pub game_date: NaiveDate,
    pub season: i32,
    pub elo_pre: Option<f64>,
    pub elo_post: Option<f64>,
    pub elo_change: Option<f64>,
    pub cumulative_elo_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointDiffSummary {
    pub team_name: String,
    pub season: i32,
    pub games: usize,
    pub avg_point_diff: f64,
    pub stddev_point_diff: Option<f64>,
    pub worst_loss: i32,
    pub best_win: i32,
    pub q1_point_diff: f64,
    pub median_point_diff: f64,
    pub q3_point_diff: f64,
}

fn names(teams: &[TeamEntity]) -> HashMap<&str, &str> {
    teams
        .iter()
        .map(|t| (t.team_id.as_str(), t.team_name.as_str()))
        .collect()
}

fn group_by_team_season<'a>(
    facts: &'a [GameTeamFact],
    teams: &'a [TeamEntity],
) -> BTreeMap<(&'a str, i32), Vec<&'a GameTeamFact>> {
    let names = names(teams);
    let mut groups: BTreeMap<(&str, i32), Vec<&GameTeamFact>> = BTreeMap::new();
    for fact in facts {
        // facts without a team row are excluded, like an inner join
        if let Some(name) = names.get(fact.team_id.as_str()) {
            groups.entry((*name, fact.season)).or_default().push(fact);
        }
    }
    groups
}

/// Linear interpolation between the closest ranks, `h = (n - 1) * p` (same as SQL PERCENTILE_CONT).
fn percentile_cont(data: &mut Data<Vec<f64>>, n: usize, p: f64) -> f64 {
    let h = (n - 1) as f64 * p;
    let lower_rank = h.floor() as usize + 1;
    let lower = data.order_statistic(lower_rank);
    let upper = data.order_statistic((lower_rank + 1).min(n));
    lower + (h - h.floor()) * (upper - lower)
}

fn mean_diff(facts: &[&GameTeamFact]) -> f64 {
    let diffs: Vec<f64> = facts.iter().map(|f| f64::from(f.score_diff)).collect();
    diffs.mean()
}

/// Wins and win rate per team and season, latest season first, best rate first
pub fn win_rates_by_season(facts: &[GameTeamFact], teams: &[TeamEntity]) -> Vec<SeasonWinRate> {
    let mut rows: Vec<SeasonWinRate> = group_by_team_season(facts, teams)
        .into_iter()
        .map(|((team_name, season), group)| {
            let games_played = group.len() as i64;
            let wins: i64 = group.iter().map(|f| i64::from(f.win_flag)).sum();
            SeasonWinRate {
                team_name: team_name.to_string(),
                season,
                games_played,
                wins,
                win_rate: percentage(wins, games_played, 2),
                avg_point_diff: round_to(mean_diff(&group), 2),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.season
            .cmp(&a.season)
            .then_with(|| b.win_rate.unwrap_or(0.0).total_cmp(&a.win_rate.unwrap_or(0.0)))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
    rows
}

/// Per-team rating path since `since`, with a running sum of rating changes
pub fn elo_trends(facts: &[GameTeamFact], teams: &[TeamEntity], since: NaiveDate) -> Vec<EloTrendPoint> {
    let names = names(teams);
    let mut by_team: BTreeMap<&str, Vec<&GameTeamFact>> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.game_date >= since) {
        if let Some(name) = names.get(fact.team_id.as_str()) {
            by_team.entry(*name).or_default().push(fact);
        }
    }

    let mut points = Vec::new();
    for (team_name, mut group) in by_team {
        group.sort_by(|a, b| a.game_date.cmp(&b.game_date).then_with(|| a.game_id.cmp(&b.game_id)));
        let mut cumulative = 0.0;
        for fact in group {
            cumulative += fact.elo_change.unwrap_or(0.0);
            points.push(EloTrendPoint {
                team_name: team_name.to_string(),
                game_date: fact.game_date,
                season: fact.season,
                elo_pre: fact.elo_pre,
                elo_post: fact.elo_post,
                elo_change: fact.elo_change,
                cumulative_elo_change: cumulative,
            });
        }
    }
    points
}

/// Spread of the point differential per team and season
pub fn point_diff_by_season(facts: &[GameTeamFact], teams: &[TeamEntity]) -> Vec<PointDiffSummary> {
    let mut rows: Vec<PointDiffSummary> = group_by_team_season(facts, teams)
        .into_iter()
        .map(|((team_name, season), group)| {
            let diffs: Vec<i32> = group.iter().map(|f| f.score_diff).collect();
            let values: Vec<f64> = diffs.iter().map(|d| f64::from(*d)).collect();
            let std_dev = (&values).std_dev();
            let mut data = Data::new(values.clone());

            PointDiffSummary {
                team_name: team_name.to_string(),
                season,
                games: diffs.len(),
                avg_point_diff: round_to((&values).mean(), 2),
                stddev_point_diff: if std_dev.is_nan() { None } else { Some(round_to(std_dev, 2)) },
                worst_loss: diffs.iter().copied().fold(i32::MAX, i32::min),
                best_win: diffs.iter().copied().fold(i32::MIN, i32::max),
                q1_point_diff: round_to(percentile_cont(&mut data, diffs.len(), 0.25), 2),
                median_point_diff: round_to(percentile_cont(&mut data, diffs.len(), 0.5), 2),
                q3_point_diff: round_to(percentile_cont(&mut data, diffs.len(), 0.75), 2),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.season
            .cmp(&a.season)
            .then_with(|| b.avg_point_diff.total_cmp(&a.avg_point_diff))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conference;
    use crate::services::game_deriver::tests::raw_game;
    use crate::services::{build_facts, derive_game, AliasResolver};

    fn team(id: &str, name: &str) -> TeamEntity {
        TeamEntity {
            team_id: id.to_string(),
            team_name: name.to_string(),
            current_team_code: id.to_string(),
            conference: Conference::Eastern,
            first_game_date: None,
            last_game_date: None,
            seasons_played: 1,
            total_games: 0,
            total_wins: 0,
            historical_win_rate: None,
            avg_elo_rating: None,
            peak_elo_rating: None,
            is_active: true,
        }
    }

    fn fixture() -> (Vec<GameTeamFact>, Vec<TeamEntity>) {
        let resolver = AliasResolver::default();
        let games: Vec<_> = [
            raw_game("2024-01-10", "BOS", "NYK", 110, 100),
            raw_game("2024-01-12", "NYK", "BOS", 120, 100),
            raw_game("2024-01-14", "BOS", "NYK", 130, 100),
        ]
        .iter()
        .map(|raw| derive_game(raw, &resolver).unwrap())
        .collect();
        (build_facts(&games), vec![team("BOS", "Boston Celtics"), team("NYK", "New York Knicks")])
    }

    #[test]
    fn test_win_rates_by_season() {
        let (facts, teams) = fixture();
        let rows = win_rates_by_season(&facts, &teams);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_name, "Boston Celtics");
        assert_eq!(rows[0].games_played, 3);
        assert_eq!(rows[0].wins, 2);
        assert_eq!(rows[0].win_rate, Some(66.67));
        assert_eq!(rows[0].avg_point_diff, 6.67);
        assert_eq!(rows[1].win_rate, Some(33.33));
    }

    #[test]
    fn test_point_diff_spread() {
        let (facts, teams) = fixture();
        let rows = point_diff_by_season(&facts, &teams);
        let celtics = rows.iter().find(|r| r.team_name == "Boston Celtics").unwrap();
        assert_eq!(celtics.games, 3);
        assert_eq!(celtics.worst_loss, -20);
        assert_eq!(celtics.best_win, 30);
        assert_eq!(celtics.median_point_diff, 10.0);
        // interpolated between sorted neighbours of [-20, 10, 30]
        assert_eq!(celtics.q1_point_diff, -5.0);
        assert_eq!(celtics.q3_point_diff, 20.0);
        // sample standard deviation of [10, -20, 30]
        assert_eq!(celtics.stddev_point_diff, Some(25.17));
    }

    #[test]
    fn test_quartiles_interpolate_and_round() {
        let (facts, teams) = fixture();
        let rows = point_diff_by_season(&facts[..4], &teams);
        // Celtics [10, -20], Knicks [-10, 20]
        let celtics = rows.iter().find(|r| r.team_name == "Boston Celtics").unwrap();
        assert_eq!(celtics.q1_point_diff, -12.5);
        assert_eq!(celtics.median_point_diff, -5.0);
        assert_eq!(celtics.q3_point_diff, 2.5);

        let knicks = rows.iter().find(|r| r.team_name == "New York Knicks").unwrap();
        assert_eq!(knicks.q1_point_diff, -2.5);
        assert_eq!(knicks.q3_point_diff, 12.5);
    }

    #[test]
    fn test_single_game_has_no_stddev() {
        let (facts, teams) = fixture();
        let rows = point_diff_by_season(&facts[..2], &teams);
        assert!(rows.iter().all(|r| r.stddev_point_diff.is_none()));
    }

    #[test]
    fn test_elo_trends_accumulate_from_cutoff() {
        let (facts, teams) = fixture();
        let since = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let points = elo_trends(&facts, &teams, since);
        let celtics: Vec<_> = points.iter().filter(|p| p.team_name == "Boston Celtics").collect();
        assert_eq!(celtics.len(), 2);
        // away at NYK: 1590 - 1600, then home: 1510 - 1500
        assert_eq!(celtics[0].cumulative_elo_change, -10.0);
        assert_eq!(celtics[1].cumulative_elo_change, 0.0);
    }
}
