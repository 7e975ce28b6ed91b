use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::RawGame;
use crate::utils::non_blank;

const DUPLICATE_SAMPLE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateTriple {
    pub game_date: NaiveDate,
    pub home_team_code: String,
    pub away_team_code: String,
    pub count: usize,
}

/// Informational summary of the raw game table
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub rows_missing_fields: usize,
    pub duplicate_triples: usize,
    pub duplicate_sample: Vec<DuplicateTriple>,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub unique_dates: usize,
    pub unique_team_codes: usize,
}

pub fn quality_report(raws: &[RawGame]) -> QualityReport {
    let mut triples: BTreeMap<(NaiveDate, &str, &str), usize> = BTreeMap::new();
    let mut dates = BTreeSet::new();
    let mut codes = BTreeSet::new();
    let mut missing = 0;

    for raw in raws {
        let home = non_blank(raw.home_team_code.as_deref());
        let away = non_blank(raw.away_team_code.as_deref());
        codes.extend(home);
        codes.extend(away);
        if let Some(date) = raw.game_date {
            dates.insert(date);
        }

        match (raw.game_date, home, away) {
            (Some(date), Some(home), Some(away)) if raw.home_score.is_some() && raw.away_score.is_some() => {
                *triples.entry((date, home, away)).or_default() += 1;
            }
            _ => missing += 1,
        }
    }

    let duplicates: Vec<DuplicateTriple> = triples
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((game_date, home, away), count)| DuplicateTriple {
            game_date,
            home_team_code: home.to_string(),
            away_team_code: away.to_string(),
            count,
        })
        .collect();

    QualityReport {
        total_rows: raws.len(),
        rows_missing_fields: missing,
        duplicate_triples: duplicates.len(),
        duplicate_sample: duplicates.into_iter().take(DUPLICATE_SAMPLE).collect(),
        earliest_date: dates.first().copied(),
        latest_date: dates.last().copied(),
        unique_dates: dates.len(),
        unique_team_codes: codes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::game_deriver::tests::raw_game;

    #[test]
    fn test_report_counts() {
        let mut missing = raw_game("2024-01-12", "BOS", "LAL", 1, 0);
        missing.home_team_code = None;
        let rows = vec![
            raw_game("2024-01-10", "BOS", "LAL", 110, 100),
            raw_game("2024-01-10", "BOS", "LAL", 110, 100),
            raw_game("2023-12-25", "NYK", "MIL", 99, 100),
            missing,
        ];

        let report = quality_report(&rows);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.rows_missing_fields, 1);
        assert_eq!(report.duplicate_triples, 1);
        assert_eq!(report.duplicate_sample[0].count, 2);
        assert_eq!(report.earliest_date, NaiveDate::from_ymd_opt(2023, 12, 25));
        assert_eq!(report.latest_date, NaiveDate::from_ymd_opt(2024, 1, 12));
        assert_eq!(report.unique_dates, 3);
        assert_eq!(report.unique_team_codes, 4);
    }

    #[test]
    fn test_empty_input() {
        let report = quality_report(&[]);
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.earliest_date, None);
        assert!(report.duplicate_sample.is_empty());
    }
}
