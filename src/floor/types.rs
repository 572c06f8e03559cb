//! Subject and statistic types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a subject is an individual player or a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Player,
    Team,
}

/// A player or team that lines are posted for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    /// Display name as posted by the line source
    pub name: String,
    /// Player or team
    pub kind: SubjectKind,
}

impl Subject {
    /// Create a player subject
    pub fn player(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SubjectKind::Player,
        }
    }

    /// Create a team subject
    pub fn team(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SubjectKind::Team,
        }
    }

    /// Filesystem-safe identifier, e.g. "Jalen Brunson" -> "jalen-brunson"
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut pending_dash = false;
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// How a statistic's values are distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Non-negative integers (points, rebounds, ...)
    Count,
    /// Real-valued totals
    Continuous,
}

/// A tracked statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    #[serde(rename = "PTS")]
    Points,
    #[serde(rename = "REB")]
    Rebounds,
    #[serde(rename = "AST")]
    Assists,
    #[serde(rename = "FG3M")]
    Threes,
    #[serde(rename = "STL")]
    Steals,
    #[serde(rename = "BLK")]
    Blocks,
    #[serde(rename = "TEAM_PTS")]
    TeamPoints,
}

impl Stat {
    /// All statistics in display order
    pub const ALL: [Stat; 7] = [
        Stat::Points,
        Stat::Rebounds,
        Stat::Assists,
        Stat::Threes,
        Stat::Steals,
        Stat::Blocks,
        Stat::TeamPoints,
    ];

    /// Short code used in reports and stored records
    pub fn code(&self) -> &'static str {
        match self {
            Stat::Points => "PTS",
            Stat::Rebounds => "REB",
            Stat::Assists => "AST",
            Stat::Threes => "FG3M",
            Stat::Steals => "STL",
            Stat::Blocks => "BLK",
            Stat::TeamPoints => "TEAM_PTS",
        }
    }

    /// Parse a short code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Column name in a game log; team totals are logged as plain points
    pub fn log_key(&self) -> &'static str {
        match self {
            Stat::TeamPoints => "PTS",
            other => other.code(),
        }
    }

    /// Value domain of the statistic
    pub fn kind(&self) -> StatKind {
        match self {
            Stat::TeamPoints => StatKind::Continuous,
            _ => StatKind::Count,
        }
    }

    /// Kind of subject this statistic is posted for
    pub fn subject_kind(&self) -> SubjectKind {
        match self {
            Stat::TeamPoints => SubjectKind::Team,
            _ => SubjectKind::Player,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
