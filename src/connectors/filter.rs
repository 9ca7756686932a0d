//! Path filters and risk tiers for artifacts.
//!
//! Patterns are shell globs; `*` also matches `/`, so `docs/*` covers
//! nested paths.

use std::fmt;
use std::str::FromStr;

use glob::{Pattern, PatternError};
use serde::{Deserialize, Serialize};

/// Risk classification of an artifact, L0 (lowest) to L4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    L0,
    L1,
    L2,
    L3,
    L4,
}

impl Default for RiskTier {
    fn default() -> Self {
        Self::L0
    }
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::L0 => "L0",
            RiskTier::L1 => "L1",
            RiskTier::L2 => "L2",
            RiskTier::L3 => "L3",
            RiskTier::L4 => "L4",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L0" => Ok(RiskTier::L0),
            "L1" => Ok(RiskTier::L1),
            "L2" => Ok(RiskTier::L2),
            "L3" => Ok(RiskTier::L3),
            "L4" => Ok(RiskTier::L4),
            other => Err(format!("unknown risk tier '{}'", other)),
        }
    }
}

/// Include/exclude filters plus ordered risk mapping
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    /// Empty means every path is included
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    risk_mapping: Vec<(Pattern, RiskTier)>,
    default_tier: RiskTier,
}

impl ArtifactFilter {
    /// Build from include/exclude patterns; empty include means everything
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            risk_mapping: Vec::new(),
            default_tier: RiskTier::L0,
        })
    }

    /// Add a risk rule; earlier rules win
    pub fn with_risk_rule(mut self, pattern: &str, tier: RiskTier) -> Result<Self, PatternError> {
        self.risk_mapping.push((Pattern::new(pattern)?, tier));
        Ok(self)
    }

    /// Tier used when no rule matches
    pub fn with_default_tier(mut self, tier: RiskTier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Exclusions take precedence over inclusions
    pub fn should_process(&self, artifact_path: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(artifact_path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(artifact_path))
    }

    /// Tier of the first matching rule, else the default
    pub fn risk_tier(&self, artifact_path: &str) -> RiskTier {
        self.risk_mapping
            .iter()
            .find(|(pattern, _)| pattern.matches(artifact_path))
            .map(|(_, tier)| *tier)
            .unwrap_or(self.default_tier)
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p.as_ref())).collect()
}
