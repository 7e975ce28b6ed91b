use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Categorical values stored and exported as fixed display strings.
pub trait Label: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_label(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|value| value.as_str() == raw)
    }
}

/// One historical game as it arrives from the raw store. Team 1 is home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGame {
    pub game_date: Option<NaiveDate>,
    pub season: i32,
    pub neutral: bool,
    pub playoff: bool,
    pub home_team_code: Option<String>,
    pub away_team_code: Option<String>,
    pub home_elo_pre: Option<f64>,
    pub away_elo_pre: Option<f64>,
    pub home_elo_post: Option<f64>,
    pub away_elo_post: Option<f64>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_win_prob: Option<f64>,
    pub away_win_prob: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AliasEntry {
    pub team_code: String,
    pub team_name: String,
    pub current_team_code: String,
}

impl AliasEntry {
    pub fn new(team_code: &str, team_name: &str, current_team_code: &str) -> Self {
        Self {
            team_code: team_code.to_string(),
            team_name: team_name.to_string(),
            current_team_code: current_team_code.to_string(),
        }
    }
}

/// A validated game with its identity and outcome fields derived.
///
/// `home_team_code`/`away_team_code` are the raw codes from the row; `home_team_id`/`away_team_id`
/// are the canonical identities after alias resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGame {
    pub game_id: String,
    pub game_date: NaiveDate,
    pub season: i32,
    pub neutral: bool,
    pub playoff: bool,
    pub home_team_code: String,
    pub away_team_code: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_score: i32,
    pub away_score: i32,
    pub home_score_diff: i32,
    pub away_score_diff: i32,
    pub home_win_flag: i32,
    pub away_win_flag: i32,
    pub home_elo_pre: Option<f64>,
    pub away_elo_pre: Option<f64>,
    pub home_elo_post: Option<f64>,
    pub away_elo_post: Option<f64>,
    pub home_elo_change: Option<f64>,
    pub away_elo_change: Option<f64>,
    pub home_win_prob: Option<f64>,
    pub away_win_prob: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conference {
    Eastern,
    Western,
    Historical,
}

impl Label for Conference {
    const ALL: &'static [Self] = &[Conference::Eastern, Conference::Western, Conference::Historical];

    fn as_str(&self) -> &'static str {
        match self {
            Conference::Eastern => "Eastern",
            Conference::Western => "Western",
            Conference::Historical => "Historical",
        }
    }
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameLocation {
    #[serde(rename = "HOME")]
    Home,
    #[serde(rename = "AWAY")]
    Away,
}

impl Label for GameLocation {
    const ALL: &'static [Self] = &[GameLocation::Home, GameLocation::Away];

    fn as_str(&self) -> &'static str {
        match self {
            GameLocation::Home => "HOME",
            GameLocation::Away => "AWAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustedLocation {
    #[serde(rename = "HOME")]
    Home,
    #[serde(rename = "AWAY")]
    Away,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl Label for AdjustedLocation {
    const ALL: &'static [Self] = &[
        AdjustedLocation::Home,
        AdjustedLocation::Away,
        AdjustedLocation::Neutral,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            AdjustedLocation::Home => "HOME",
            AdjustedLocation::Away => "AWAY",
            AdjustedLocation::Neutral => "NEUTRAL",
        }
    }
}

/// Score-differential band, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcomeType {
    #[serde(rename = "Blowout Win")]
    BlowoutWin,
    #[serde(rename = "Comfortable Win")]
    ComfortableWin,
    #[serde(rename = "Close Win")]
    CloseWin,
    #[serde(rename = "Tie")]
    Tie,
    #[serde(rename = "Close Loss")]
    CloseLoss,
    #[serde(rename = "Comfortable Loss")]
    ComfortableLoss,
    #[serde(rename = "Blowout Loss")]
    BlowoutLoss,
}

impl Label for GameOutcomeType {
    const ALL: &'static [Self] = &[
        GameOutcomeType::BlowoutWin,
        GameOutcomeType::ComfortableWin,
        GameOutcomeType::CloseWin,
        GameOutcomeType::Tie,
        GameOutcomeType::CloseLoss,
        GameOutcomeType::ComfortableLoss,
        GameOutcomeType::BlowoutLoss,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            GameOutcomeType::BlowoutWin => "Blowout Win",
            GameOutcomeType::ComfortableWin => "Comfortable Win",
            GameOutcomeType::CloseWin => "Close Win",
            GameOutcomeType::Tie => "Tie",
            GameOutcomeType::CloseLoss => "Close Loss",
            GameOutcomeType::ComfortableLoss => "Comfortable Loss",
            GameOutcomeType::BlowoutLoss => "Blowout Loss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceVsExpectation {
    #[serde(rename = "Major Upset")]
    MajorUpset,
    #[serde(rename = "Minor Upset")]
    MinorUpset,
    #[serde(rename = "Major Upset Loss")]
    MajorUpsetLoss,
    #[serde(rename = "Minor Upset Loss")]
    MinorUpsetLoss,
    #[serde(rename = "Expected Result")]
    ExpectedResult,
}

impl Label for PerformanceVsExpectation {
    const ALL: &'static [Self] = &[
        PerformanceVsExpectation::MajorUpset,
        PerformanceVsExpectation::MinorUpset,
        PerformanceVsExpectation::MajorUpsetLoss,
        PerformanceVsExpectation::MinorUpsetLoss,
        PerformanceVsExpectation::ExpectedResult,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            PerformanceVsExpectation::MajorUpset => "Major Upset",
            PerformanceVsExpectation::MinorUpset => "Minor Upset",
            PerformanceVsExpectation::MajorUpsetLoss => "Major Upset Loss",
            PerformanceVsExpectation::MinorUpsetLoss => "Minor Upset Loss",
            PerformanceVsExpectation::ExpectedResult => "Expected Result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameImpact {
    #[serde(rename = "High Impact")]
    High,
    #[serde(rename = "Medium Impact")]
    Medium,
    #[serde(rename = "Low Impact")]
    Low,
}

impl Label for GameImpact {
    const ALL: &'static [Self] = &[GameImpact::High, GameImpact::Medium, GameImpact::Low];

    fn as_str(&self) -> &'static str {
        match self {
            GameImpact::High => "High Impact",
            GameImpact::Medium => "Medium Impact",
            GameImpact::Low => "Low Impact",
        }
    }
}

/// Published team dimension row, one per canonical team id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntity {
    pub team_id: String,
    pub team_name: String,
    pub current_team_code: String,
    pub conference: Conference,
    pub first_game_date: Option<NaiveDate>,
    pub last_game_date: Option<NaiveDate>,
    pub seasons_played: i64,
    pub total_games: i64,
    pub total_wins: i64,
    pub historical_win_rate: Option<f64>, // None when no games analyzed
    pub avg_elo_rating: Option<f64>,
    pub peak_elo_rating: Option<f64>,
    pub is_active: bool,
}

/// One team's perspective on one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameTeamFact {
    pub game_team_id: String,
    pub game_id: String,
    pub team_id: String,
    pub opponent_id: String,
    pub game_date: NaiveDate,
    pub season: i32,
    pub game_location: GameLocation,
    pub adjusted_game_location: AdjustedLocation,
    pub playoff: bool,
    pub score_for: i32,
    pub score_against: i32,
    pub score_diff: i32,
    pub win_flag: i32,
    pub elo_pre: Option<f64>,
    pub elo_post: Option<f64>,
    pub elo_change: Option<f64>,
    pub win_probability: Option<f64>,
    pub game_outcome_type: GameOutcomeType,
    pub performance_vs_expectation: PerformanceVsExpectation,
    pub game_impact: GameImpact,
}

/// What to do when two raw rows derive the same game_id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Abort the run; nothing is published.
    #[default]
    Reject,
    /// Keep the first-seen row, drop the rest and record them in the run report.
    KeepFirst,
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "keep_first" | "keep-first" => Ok(DuplicatePolicy::KeepFirst),
            other => Err(anyhow::anyhow!(
                "Unsupported duplicate game policy: {}. Use 'reject' or 'keep_first'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineRun {
    pub run_id: String,
    pub run_date: String,
    pub raw_rows: i64,
    pub games_derived: i64,
    pub rows_rejected: i64,
    pub teams_published: i64,
    pub facts_published: i64,
    pub published_at: String,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_policy_parsing() {
        assert_eq!("reject".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert_eq!("KEEP_FIRST".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::KeepFirst);
        assert!("overwrite".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_labels_serialize_as_display_strings() {
        let json = serde_json::to_string(&GameOutcomeType::ComfortableLoss).unwrap();
        assert_eq!(json, "\"Comfortable Loss\"");
        let json = serde_json::to_string(&AdjustedLocation::Neutral).unwrap();
        assert_eq!(json, "\"NEUTRAL\"");
        assert_eq!(PerformanceVsExpectation::MajorUpsetLoss.as_str(), "Major Upset Loss");
    }

    #[test]
    fn test_from_label() {
        assert_eq!(GameImpact::from_label("Medium Impact"), Some(GameImpact::Medium));
        assert_eq!(AdjustedLocation::from_label("NEUTRAL"), Some(AdjustedLocation::Neutral));
        assert_eq!(GameOutcomeType::from_label("Draw"), None);
    }

    #[test]
    fn test_conference_round_trips_through_label() {
        for conference in Conference::ALL {
            assert_eq!(Conference::from_label(conference.as_str()), Some(*conference));
            assert_eq!(conference.to_string(), conference.as_str());
        }
        assert_eq!(Conference::from_label("Central"), None);
    }
}
