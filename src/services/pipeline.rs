use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DEFAULT_ACTIVE_WINDOW_YEARS;
use crate::error::PipelineError;
use crate::models::{AliasEntry, CanonicalGame, DuplicatePolicy, GameTeamFact, RawGame, TeamEntity};
use crate::services::{
    aggregate_activity, aggregate_performance, build_facts, build_team_dimension, derive_games,
    team_universe, validate_snapshot, AliasResolver, ConferenceMap, DroppedDuplicate, RowRejection,
};

/// Everything a run reads: the full raw history plus the alias table.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub games: Vec<RawGame>,
    pub aliases: Vec<AliasEntry>,
}

/// Parameters supplied by whoever triggers the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub active_window_years: u32,
    pub duplicate_policy: DuplicatePolicy,
    pub conferences: ConferenceMap,
}

impl RunContext {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date,
            active_window_years: DEFAULT_ACTIVE_WINDOW_YEARS,
            duplicate_policy: DuplicatePolicy::default(),
            conferences: ConferenceMap::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub raw_rows: usize,
    pub games_derived: usize,
    pub rejected: Vec<RowRejection>,
    pub duplicates_dropped: Vec<DroppedDuplicate>,
    pub teams: usize,
    pub facts: usize,
}

/// A complete, validated set of derived entities ready to publish.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub games: Vec<CanonicalGame>,
    pub teams: Vec<TeamEntity>,
    pub facts: Vec<GameTeamFact>,
    pub report: RunReport,
}

/// Recompute every derived entity from the full raw history.
///
/// Pure: the same input and context always give the same teams and facts. Returns an error
/// instead of a partial snapshot when any structural check fails.
pub fn recompute_all(input: &PipelineInput, ctx: &RunContext) -> Result<Snapshot, PipelineError> {
    let resolver = AliasResolver::new(&input.aliases)?;
    let derived = derive_games(&input.games, &resolver, ctx.duplicate_policy)?;

    let team_ids = team_universe(&derived.games, &resolver);
    let activity = aggregate_activity(&derived.games);
    let performance = aggregate_performance(&derived.games, &team_ids);
    let teams = build_team_dimension(
        &team_ids,
        &resolver,
        &activity,
        &performance,
        &ctx.conferences,
        ctx.run_date,
        ctx.active_window_years,
    );
    let facts = build_facts(&derived.games);

    validate_snapshot(&derived.games, &teams, &facts)?;

    let report = RunReport {
        raw_rows: input.games.len(),
        games_derived: derived.games.len(),
        rejected: derived.rejected,
        duplicates_dropped: derived.duplicates,
        teams: teams.len(),
        facts: facts.len(),
    };

    tracing::info!(
        run_id = %ctx.run_id,
        "Derived {} games ({} rejected, {} duplicates dropped) into {} teams and {} facts",
        report.games_derived,
        report.rejected.len(),
        report.duplicates_dropped.len(),
        report.teams,
        report.facts
    );

    Ok(Snapshot {
        run_id: ctx.run_id,
        run_date: ctx.run_date,
        games: derived.games,
        teams,
        facts,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::game_deriver::tests::raw_game;
    use std::collections::HashSet;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn input() -> PipelineInput {
        let mut neutral = raw_game("2024-03-01", "OKC", "BOS", 95, 95);
        neutral.neutral = true;
        let mut missing = raw_game("2024-03-02", "BOS", "LAL", 0, 0);
        missing.game_date = None;

        PipelineInput {
            games: vec![
                raw_game("2024-01-10", "BOS", "LAL", 110, 100),
                raw_game("2007-04-18", "SEA", "LAL", 120, 95),
                neutral,
                missing,
            ],
            aliases: vec![
                AliasEntry::new("SEA", "Seattle SuperSonics", "OKC"),
                AliasEntry::new("OKC", "Oklahoma City Thunder", "OKC"),
                AliasEntry::new("BOS", "Boston Celtics", "BOS"),
                AliasEntry::new("CHH", "Charlotte Hornets (1988)", "CHH"),
            ],
        }
    }

    #[test]
    fn test_end_to_end_snapshot() {
        let snapshot = recompute_all(&input(), &RunContext::new(date("2026-10-19"))).unwrap();

        assert_eq!(snapshot.report.raw_rows, 4);
        assert_eq!(snapshot.report.games_derived, 3);
        assert_eq!(snapshot.report.rejected.len(), 1);
        assert_eq!(snapshot.facts.len(), 6);

        let ids: Vec<&str> = snapshot.teams.iter().map(|t| t.team_id.as_str()).collect();
        assert!(!ids.contains(&"SEA"));
        assert_eq!(ids.len(), 4); // BOS, CHH, LAL, OKC

        let okc = snapshot.teams.iter().find(|t| t.team_id == "OKC").unwrap();
        assert_eq!(okc.total_games, 2);
        assert_eq!(okc.total_wins, 1);
        assert_eq!(okc.historical_win_rate, Some(50.0));
        assert_eq!(okc.team_name, "Oklahoma City Thunder");

        let chh = snapshot.teams.iter().find(|t| t.team_id == "CHH").unwrap();
        assert_eq!(chh.total_games, 0);
        assert_eq!(chh.historical_win_rate, None);

        let sea_fact = snapshot
            .facts
            .iter()
            .find(|f| f.game_id == "20070418_SEA_LAL" && f.win_flag == 1)
            .unwrap();
        assert_eq!(sea_fact.team_id, "OKC");
    }

    #[test]
    fn test_two_mirrored_facts_per_game_with_unique_keys() {
        let snapshot = recompute_all(&input(), &RunContext::new(date("2026-10-19"))).unwrap();
        let keys: HashSet<&str> = snapshot.facts.iter().map(|f| f.game_team_id.as_str()).collect();
        assert_eq!(keys.len(), snapshot.facts.len());

        for game in &snapshot.games {
            let pair: Vec<_> = snapshot.facts.iter().filter(|f| f.game_id == game.game_id).collect();
            assert_eq!(pair.len(), 2);
            assert_eq!(pair[0].score_for, pair[1].score_against);
            assert_eq!(pair[0].score_against, pair[1].score_for);
        }
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let mut ctx = RunContext::new(date("2026-10-19"));
        let first = recompute_all(&input(), &ctx).unwrap();
        ctx.run_id = Uuid::new_v4();
        let second = recompute_all(&input(), &ctx).unwrap();

        assert_eq!(
            serde_json::to_string(&first.teams).unwrap(),
            serde_json::to_string(&second.teams).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first.facts).unwrap(),
            serde_json::to_string(&second.facts).unwrap()
        );
    }

    #[test]
    fn test_structural_errors_abort() {
        let mut chained = input();
        chained.aliases.push(AliasEntry::new("OKC", "Oklahoma City Thunder", "SEA"));
        assert!(recompute_all(&chained, &RunContext::new(date("2026-10-19"))).is_err());

        let mut duplicated = input();
        duplicated.games.push(raw_game("2024-01-10", "BOS", "LAL", 90, 80));
        let err = recompute_all(&duplicated, &RunContext::new(date("2026-10-19"))).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateGameId { .. }));

        let mut ctx = RunContext::new(date("2026-10-19"));
        ctx.duplicate_policy = DuplicatePolicy::KeepFirst;
        let snapshot = recompute_all(&duplicated, &ctx).unwrap();
        assert_eq!(snapshot.report.duplicates_dropped.len(), 1);
    }
}
