//! Application constants for the roster importer
//!
//! This module contains the fixed tables the importer relies on: engine
//! table and field names, CSV attribute names, jersey number pools, and the
//! team abbreviation directory.

// =============================================================================
// Engine Tables
// =============================================================================

/// Player table in the roster file
pub const PLAYER_TABLE: &str = "PLAY";

/// Longest table or field name the engine accepts
pub const MAX_IDENTIFIER_LEN: usize = 8;

/// Handle value the engine returns when a file cannot be opened
pub const INVALID_HANDLE: i32 = -1;

// =============================================================================
// Draft Defaults
// =============================================================================

/// Round written for players without draft information (undrafted free agents)
pub const UNDRAFTED_ROUND: u32 = 15;

/// Pick written for players without draft information
pub const UNDRAFTED_PICK: u32 = 63;

/// Highest draft round the engine stores
pub const MAX_DRAFT_ROUND: u32 = 15;

/// Highest draft pick the engine stores
pub const MAX_DRAFT_PICK: u32 = 63;

// =============================================================================
// Teams
// =============================================================================

/// Team id used for players without a club
pub const FREE_AGENT_TEAM_ID: u32 = 1009;

/// Team key used for jersey bookkeeping of free agents
pub const FREE_AGENT_TEAM: &str = "FA";

/// Club abbreviations; a club's team id is its index in this list
pub const TEAM_ABBREVIATIONS: &[&str] = &[
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC", "LAC", "LAR", "LV", "MIA", "MIN", "NE", "NO", "NYG", "NYJ", "PHI",
    "PIT", "SEA", "SF", "TB", "TEN", "WAS",
];

/// Weight offset the engine subtracts from pounds before storing
pub const DEFAULT_WEIGHT_OFFSET: i32 = 160;

// =============================================================================
// Jersey Number Pools
// =============================================================================

/// Legal jersey numbers per position, as inclusive ranges in scan order
pub const JERSEY_POOLS: &[(&str, &[(u8, u8)])] = &[
    ("QB", &[(1, 19)]),
    ("HB", &[(20, 49)]),
    ("FB", &[(20, 49)]),
    ("WR", &[(10, 19), (80, 89)]),
    ("TE", &[(40, 49), (80, 89)]),
    ("LT", &[(50, 79)]),
    ("LG", &[(50, 79)]),
    ("C", &[(50, 79)]),
    ("RG", &[(50, 79)]),
    ("RT", &[(50, 79)]),
    ("LE", &[(50, 79), (90, 99)]),
    ("RE", &[(50, 79), (90, 99)]),
    ("DT", &[(50, 79), (90, 99)]),
    ("LOLB", &[(40, 59), (90, 99)]),
    ("MLB", &[(40, 59), (90, 99)]),
    ("ROLB", &[(40, 59), (90, 99)]),
    ("CB", &[(20, 49)]),
    ("FS", &[(20, 49)]),
    ("SS", &[(20, 49)]),
    ("K", &[(1, 19)]),
    ("P", &[(1, 19)]),
];

// =============================================================================
// CSV Attribute Names
// =============================================================================

/// Attribute names produced by the scrape/merge pipeline
pub mod attributes {
    pub const FIRST_NAME: &str = "first_name";
    pub const LAST_NAME: &str = "last_name";
    pub const POSITION: &str = "position";
    pub const TEAM: &str = "team";
    pub const JERSEY_NUMBER: &str = "jersey_number";
    pub const HEIGHT: &str = "height";
    pub const WEIGHT: &str = "weight";
    pub const AGE: &str = "age";
    pub const YEARS_PRO: &str = "years_pro";
    pub const DRAFT_ROUND: &str = "draft_round";
    pub const DRAFT_PICK: &str = "draft_pick";
    pub const OVERALL: &str = "overall";
    pub const SPEED: &str = "speed";
    pub const STRENGTH: &str = "strength";
    pub const AWARENESS: &str = "awareness";
    pub const AGILITY: &str = "agility";
    pub const ACCELERATION: &str = "acceleration";
    pub const STAMINA: &str = "stamina";
    pub const INJURY: &str = "injury";
    pub const TOUGHNESS: &str = "toughness";
    pub const THROW_POWER: &str = "throw_power";
    pub const THROW_ACCURACY: &str = "throw_accuracy";
    pub const CARRYING: &str = "carrying";
    pub const BREAK_TACKLE: &str = "break_tackle";
    pub const CATCHING: &str = "catching";
    pub const JUMPING: &str = "jumping";
    pub const KICK_RETURN: &str = "kick_return";
    pub const RUN_BLOCKING: &str = "run_blocking";
    pub const PASS_BLOCKING: &str = "pass_blocking";
    pub const TACKLE: &str = "tackle";
    pub const KICK_POWER: &str = "kick_power";
    pub const KICK_ACCURACY: &str = "kick_accuracy";
}

// =============================================================================
// Player Table Fields
// =============================================================================

/// Field names in the player table
pub mod fields {
    pub const FIRST_NAME: &str = "PFNA";
    pub const LAST_NAME: &str = "PLNA";
    pub const POSITION: &str = "PPOS";
    pub const TEAM_ID: &str = "TGID";
    pub const JERSEY_NUMBER: &str = "PJEN";
    pub const HEIGHT: &str = "PHGT";
    pub const WEIGHT: &str = "PWGT";
    pub const AGE: &str = "PAGE";
    pub const YEARS_PRO: &str = "PYRP";
    pub const DRAFT_ROUND: &str = "PDRO";
    pub const DRAFT_PICK: &str = "PDPI";
    pub const OVERALL: &str = "POVR";
    pub const SPEED: &str = "PSPD";
    pub const STRENGTH: &str = "PSTR";
    pub const AWARENESS: &str = "PAWR";
    pub const AGILITY: &str = "PAGI";
    pub const ACCELERATION: &str = "PACC";
    pub const STAMINA: &str = "PSTA";
    pub const INJURY: &str = "PINJ";
    pub const TOUGHNESS: &str = "PTGH";
    pub const THROW_POWER: &str = "PTHP";
    pub const THROW_ACCURACY: &str = "PTHA";
    pub const CARRYING: &str = "PCAR";
    pub const BREAK_TACKLE: &str = "PBTK";
    pub const CATCHING: &str = "PCTH";
    pub const JUMPING: &str = "PJMP";
    pub const KICK_RETURN: &str = "PKRT";
    pub const RUN_BLOCKING: &str = "PRBK";
    pub const PASS_BLOCKING: &str = "PPBK";
    pub const TACKLE: &str = "PTAK";
    pub const KICK_POWER: &str = "PKPR";
    pub const KICK_ACCURACY: &str = "PKAC";
}

/// Look up the engine team id for a club abbreviation
pub fn team_id(abbreviation: &str) -> Option<u32> {
    TEAM_ABBREVIATIONS
        .iter()
        .position(|team| team.eq_ignore_ascii_case(abbreviation))
        .map(|index| index as u32)
}

/// Look up the jersey pool for a position code
pub fn jersey_pool(position: &str) -> Option<&'static [(u8, u8)]> {
    JERSEY_POOLS
        .iter()
        .find(|(code, _)| *code == position)
        .map(|(_, ranges)| *ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_directory() {
        assert_eq!(TEAM_ABBREVIATIONS.len(), 32);
        assert_eq!(team_id("ARI"), Some(0));
        assert_eq!(team_id("buf"), Some(3));
        assert_eq!(team_id("WAS"), Some(31));
        assert_eq!(team_id("XXX"), None);
    }

    #[test]
    fn test_every_pool_is_ordered_and_in_range() {
        for (code, ranges) in JERSEY_POOLS {
            assert!(!ranges.is_empty(), "{} has no pool", code);
            for (low, high) in ranges.iter() {
                assert!(low <= high, "{} has an inverted range", code);
                assert!(*high <= 99, "{} exceeds 99", code);
            }
        }
    }

    #[test]
    fn test_jersey_pool_lookup() {
        assert_eq!(jersey_pool("DT"), Some(&[(50, 79), (90, 99)][..]));
        assert_eq!(jersey_pool("C"), Some(&[(50, 79)][..]));
        assert_eq!(jersey_pool("QB"), Some(&[(1, 19)][..]));
        assert_eq!(jersey_pool("KR"), None);
    }

    #[test]
    fn test_field_names_fit_engine_identifiers() {
        for name in [fields::FIRST_NAME, fields::KICK_ACCURACY, PLAYER_TABLE] {
            assert!(name.len() <= MAX_IDENTIFIER_LEN);
        }
    }
}
