//! Core data types for the Prefrontal coordination system
//!
//! Identifiers and small value types shared by the actors, the message
//! protocol and the configuration layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an actor in the roster (e.g. `Worker_0`)
///
/// Wraps the roster string so actor ids cannot be mixed with subtask or
/// request identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique mission identifier, fresh for every accepted assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub Uuid);

impl MissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leader's difficulty classification of a mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    /// Parse the closed label set used by the oracle schema
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "low" => Some(Difficulty::Low),
            "medium" => Some(Difficulty::Medium),
            "high" => Some(Difficulty::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }

    /// Allocation level recorded by the pipeline gate: 1 for low, 2 otherwise
    pub fn allocation_level(&self) -> u8 {
        match self {
            Difficulty::Low => 1,
            Difficulty::Medium | Difficulty::High => 2,
        }
    }

    /// Only high-difficulty missions are decomposed across workers
    pub fn requires_workers(&self) -> bool {
        matches!(self, Difficulty::High)
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability descriptor of a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
    /// Short role title
    pub title: String,

    /// Primitive operations the worker offers
    #[serde(default)]
    pub detail: String,
}

impl Expertise {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Expertise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            f.write_str(&self.title)
        } else {
            write!(f, "{} [{}]", self.title, self.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(Difficulty::from_label("high"), Some(Difficulty::High));
        assert_eq!(Difficulty::from_label("HIGH"), None);
        assert_eq!(Difficulty::Low.allocation_level(), 1);
        assert_eq!(Difficulty::Medium.allocation_level(), 2);
        assert_eq!(Difficulty::High.allocation_level(), 2);
        assert!(Difficulty::High.requires_workers());
        assert!(!Difficulty::Medium.requires_workers());
    }

    #[test]
    fn test_difficulty_serde_lowercase() {
        let json = serde_json::to_string(&Difficulty::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_agent_id_transparent() {
        let id = AgentId::from("Worker_3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Worker_3\"");
        assert_eq!(id.to_string(), "Worker_3");
    }

    #[test]
    fn test_expertise_display() {
        let e = Expertise::new("Perception Agent", "detect_objects");
        assert_eq!(e.to_string(), "Perception Agent [detect_objects]");
        assert_eq!(Expertise::new("Solo", "").to_string(), "Solo");
    }
}
