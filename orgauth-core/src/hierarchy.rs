//! Fixed five-level hierarchy rank table and eligibility rules.
//!
//! The organizational tree has exactly five levels, ranked from highest
//! authority to leaf: union=0, conference=1, church=2, team=3,
//! service=4. The rank table is the single authority for levels; a
//! node's level is never inferred from its path (path depth is only
//! ever checked against the level, not the other way around).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five entity kinds of the organizational tree, in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Top-level organization (level 0, highest authority).
    Union,
    /// Regional grouping under a union (level 1).
    Conference,
    /// Local organization under a conference (level 2).
    Church,
    /// Working group inside a church (level 3).
    Team,
    /// Scheduled activity of a team (level 4, leaf).
    Service,
}

impl EntityKind {
    /// All kinds in top-down rank order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Union,
        EntityKind::Conference,
        EntityKind::Church,
        EntityKind::Team,
        EntityKind::Service,
    ];

    /// Fixed hierarchy level of this kind (union=0 ... service=4).
    pub fn level(&self) -> u8 {
        match self {
            EntityKind::Union => 0,
            EntityKind::Conference => 1,
            EntityKind::Church => 2,
            EntityKind::Team => 3,
            EntityKind::Service => 4,
        }
    }

    /// Kind whose level is `level`, if any.
    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    /// The kind one level below this one, if this is not a leaf.
    pub fn child_kind(&self) -> Option<Self> {
        Self::from_level(self.level() + 1)
    }

    /// Resource-family name used in permission tokens for this kind.
    pub fn resource_family(&self) -> &'static str {
        match self {
            EntityKind::Union => "unions",
            EntityKind::Conference => "conferences",
            EntityKind::Church => "churches",
            EntityKind::Team => "teams",
            EntityKind::Service => "services",
        }
    }

    /// Path-segment tag prefix for this kind, if it carries one.
    ///
    /// Only team and service segments are tagged; the upper three levels
    /// use the raw entity id as segment.
    pub fn segment_tag(&self) -> Option<&'static str> {
        match self {
            EntityKind::Team => Some("team_"),
            EntityKind::Service => Some("service_"),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Union => "union",
            EntityKind::Conference => "conference",
            EntityKind::Church => "church",
            EntityKind::Team => "team",
            EntityKind::Service => "service",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "union" => Ok(EntityKind::Union),
            "conference" => Ok(EntityKind::Conference),
            "church" => Ok(EntityKind::Church),
            "team" => Ok(EntityKind::Team),
            "service" => Ok(EntityKind::Service),
            other => Err(Error::validation(format!("unknown entity kind: {}", other))),
        }
    }
}

/// Authority rank of an acting principal.
///
/// Super admins rank strictly before every hierarchy level; they are the
/// only actors allowed to create unions (level 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRank {
    /// Ranks before level 0; may create and manage anything.
    SuperAdmin,
    /// Ranked at the given hierarchy level.
    Level(u8),
}

impl ActorRank {
    /// Numeric rank: -1 for super admin, the level otherwise.
    pub fn rank(&self) -> i8 {
        match self {
            ActorRank::SuperAdmin => -1,
            ActorRank::Level(l) => *l as i8,
        }
    }

    /// True if an actor of this rank may manage entities at `target_level`.
    ///
    /// Management requires the manager's rank to strictly precede the
    /// target's level; peers never manage each other.
    pub fn can_manage(&self, target_level: u8) -> bool {
        self.rank() < target_level as i8
    }

    /// True if an actor of this rank may create entities of `kind`.
    ///
    /// Creation follows the same strict precedence rule, which means
    /// only super admins may create unions. Whether the intended parent
    /// lies inside the actor's own scope is checked separately against
    /// the actor's path.
    pub fn can_create(&self, kind: EntityKind) -> bool {
        self.rank() < kind.level() as i8
    }
}
