use anyhow::Result;
use sqlx::SqlitePool;

use crate::db::{count_rows, replace_aliases};
use crate::models::AliasEntry;

/// Historical franchise codes as they appear in the elo history, each pointing straight at the
/// franchise's current code. Targets never point on to another code.
const DEFAULT_ALIASES: &[(&str, &str, &str)] = &[
    ("ATL", "Atlanta Hawks", "ATL"),
    ("STL", "St. Louis Hawks", "ATL"),
    ("MLH", "Milwaukee Hawks", "ATL"),
    ("TRI", "Tri-Cities Blackhawks", "ATL"),
    ("BOS", "Boston Celtics", "BOS"),
    ("BRK", "Brooklyn Nets", "BRK"),
    ("NJN", "New Jersey Nets", "BRK"),
    ("NYN", "New York Nets", "BRK"),
    ("NJA", "New Jersey Americans", "BRK"),
    ("CHO", "Charlotte Hornets", "CHO"),
    ("CHA", "Charlotte Bobcats", "CHO"),
    ("CHI", "Chicago Bulls", "CHI"),
    ("CLE", "Cleveland Cavaliers", "CLE"),
    ("DAL", "Dallas Mavericks", "DAL"),
    ("DEN", "Denver Nuggets", "DEN"),
    ("DNR", "Denver Rockets", "DEN"),
    ("DET", "Detroit Pistons", "DET"),
    ("FTW", "Fort Wayne Pistons", "DET"),
    ("GSW", "Golden State Warriors", "GSW"),
    ("SFW", "San Francisco Warriors", "GSW"),
    ("PHW", "Philadelphia Warriors", "GSW"),
    ("HOU", "Houston Rockets", "HOU"),
    ("SDR", "San Diego Rockets", "HOU"),
    ("IND", "Indiana Pacers", "IND"),
    ("INA", "Indiana Pacers (ABA)", "IND"),
    ("LAC", "Los Angeles Clippers", "LAC"),
    ("SDC", "San Diego Clippers", "LAC"),
    ("BUF", "Buffalo Braves", "LAC"),
    ("LAL", "Los Angeles Lakers", "LAL"),
    ("MNL", "Minneapolis Lakers", "LAL"),
    ("MEM", "Memphis Grizzlies", "MEM"),
    ("VAN", "Vancouver Grizzlies", "MEM"),
    ("MIA", "Miami Heat", "MIA"),
    ("MIL", "Milwaukee Bucks", "MIL"),
    ("MIN", "Minnesota Timberwolves", "MIN"),
    ("NOP", "New Orleans Pelicans", "NOP"),
    ("NOH", "New Orleans Hornets", "NOP"),
    ("NOK", "New Orleans/Oklahoma City Hornets", "NOP"),
    ("CHH", "Charlotte Hornets (1988)", "NOP"),
    ("NYK", "New York Knicks", "NYK"),
    ("OKC", "Oklahoma City Thunder", "OKC"),
    ("SEA", "Seattle SuperSonics", "OKC"),
    ("ORL", "Orlando Magic", "ORL"),
    ("PHI", "Philadelphia 76ers", "PHI"),
    ("SYR", "Syracuse Nationals", "PHI"),
    ("PHO", "Phoenix Suns", "PHO"),
    ("POR", "Portland Trail Blazers", "POR"),
    ("SAC", "Sacramento Kings", "SAC"),
    ("KCK", "Kansas City Kings", "SAC"),
    ("KCO", "Kansas City-Omaha Kings", "SAC"),
    ("CIN", "Cincinnati Royals", "SAC"),
    ("ROC", "Rochester Royals", "SAC"),
    ("SAS", "San Antonio Spurs", "SAS"),
    ("SAA", "San Antonio Spurs (ABA)", "SAS"),
    ("DLC", "Dallas Chaparrals", "SAS"),
    ("TOR", "Toronto Raptors", "TOR"),
    ("UTA", "Utah Jazz", "UTA"),
    ("NOJ", "New Orleans Jazz", "UTA"),
    ("WAS", "Washington Wizards", "WAS"),
    ("WSB", "Washington Bullets", "WAS"),
    ("CAP", "Capital Bullets", "WAS"),
    ("BAL", "Baltimore Bullets", "WAS"),
    ("CHZ", "Chicago Zephyrs", "WAS"),
    ("CHP", "Chicago Packers", "WAS"),
];

pub fn default_aliases() -> Vec<AliasEntry> {
    DEFAULT_ALIASES
        .iter()
        .map(|(code, name, current)| AliasEntry::new(code, name, current))
        .collect()
}

/// Seed the alias table with the default franchise history, unless aliases are already loaded.
pub async fn seed_aliases(pool: &SqlitePool) -> Result<()> {
    let count = count_rows(pool, "team_aliases").await?;
    if count > 0 {
        tracing::info!("Alias table already has {} entries, skipping seed", count);
        return Ok(());
    }

    replace_aliases(pool, &default_aliases()).await?;
    tracing::info!("Seeded {} default team aliases", DEFAULT_ALIASES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AliasResolver;
    use std::collections::HashSet;

    #[test]
    fn test_default_aliases_resolve_cleanly() {
        let resolver = AliasResolver::new(&default_aliases()).unwrap();
        assert_eq!(resolver.resolve("SEA"), "OKC");
        assert_eq!(resolver.resolve("NJN"), "BRK");
        assert_eq!(resolver.resolve("CHH"), "NOP");
        assert_eq!(resolver.team_name("OKC"), "Oklahoma City Thunder");
    }

    #[test]
    fn test_default_alias_codes_are_unique() {
        let codes: HashSet<&str> = DEFAULT_ALIASES.iter().map(|(code, _, _)| *code).collect();
        assert_eq!(codes.len(), DEFAULT_ALIASES.len());
    }
}
