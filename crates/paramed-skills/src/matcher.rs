use std::collections::BTreeMap;
use std::fmt;

use paramed_store::types::{SkillRecord, SkillSummary};
use serde::{Deserialize, Serialize};

use crate::alias::AliasTable;
use crate::error::SkillError;
use crate::normalize::{DEFAULT_MIN_TOKEN_LEN, normalize, tokens, tokens_similar};

/// Anything that carries a catalogue skill name.
pub trait SkillName {
    fn skill_name(&self) -> &str;
}

impl SkillName for SkillRecord {
    fn skill_name(&self) -> &str {
        &self.name
    }
}

impl SkillName for SkillSummary {
    fn skill_name(&self) -> &str {
        &self.name
    }
}

impl SkillName for String {
    fn skill_name(&self) -> &str {
        self
    }
}

impl SkillName for &str {
    fn skill_name(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Curated alias table, then exact lookup of the canonical name.
    Alias,
    /// Case-insensitive equality.
    Exact,
    /// Normalized containment in either direction.
    Substring,
    /// Fuzzy overlap of words with at least `min_token_len` characters.
    TokenOverlap,
}

impl MatchTier {
    pub const ALL: [Self; 4] = [Self::Alias, Self::Exact, Self::Substring, Self::TokenOverlap];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::TokenOverlap => "token_overlap",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acceptance rule for the token-overlap tier. `matched` counts candidate
/// tokens with a similar token in the stored name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapRule {
    /// `matched / candidate_tokens >= ratio`.
    Ratio(f64),
    /// `matched >= count`.
    Count(usize),
    /// Either of the two conditions.
    Either { ratio: f64, count: usize },
}

impl Default for OverlapRule {
    fn default() -> Self {
        Self::Ratio(0.6)
    }
}

impl OverlapRule {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accepts(self, matched: usize, candidate_tokens: usize) -> bool {
        if matched == 0 || candidate_tokens == 0 {
            return false;
        }
        let ratio_ok = |r: f64| matched as f64 / candidate_tokens as f64 >= r;
        match self {
            Self::Ratio(r) => ratio_ok(r),
            Self::Count(c) => matched >= c,
            Self::Either { ratio, count } => ratio_ok(ratio) || matched >= count,
        }
    }

    /// Replace the ratio component, keeping any count component.
    #[must_use]
    pub fn with_ratio(self, ratio: f64) -> Self {
        match self {
            Self::Ratio(_) | Self::Count(_) => Self::Ratio(ratio),
            Self::Either { count, .. } => Self::Either { ratio, count },
        }
    }

    fn validate(self) -> Result<(), SkillError> {
        let check_ratio = |r: f64| {
            if r > 0.0 && r <= 1.0 {
                Ok(())
            } else {
                Err(SkillError::InvalidConfig(format!(
                    "overlap ratio must be in (0, 1], got {r}"
                )))
            }
        };
        let check_count = |c: usize| {
            if c == 0 {
                Err(SkillError::InvalidConfig(
                    "overlap count must be at least 1".into(),
                ))
            } else {
                Ok(())
            }
        };
        match self {
            Self::Ratio(r) => check_ratio(r),
            Self::Count(c) => check_count(c),
            Self::Either { ratio, count } => check_ratio(ratio).and(check_count(count)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub tiers: Vec<MatchTier>,
    pub overlap: OverlapRule,
    pub min_token_len: usize,
    /// Alias -> canonical skill name.
    pub aliases: BTreeMap<String, String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tiers: MatchTier::ALL.to_vec(),
            overlap: OverlapRule::default(),
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            aliases: BTreeMap::new(),
        }
    }
}

impl MatchConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty or repeating tier list, a zero
    /// token length, or an out-of-range overlap rule.
    pub fn validate(&self) -> Result<(), SkillError> {
        if self.tiers.is_empty() {
            return Err(SkillError::InvalidConfig("no match tiers enabled".into()));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if self.tiers[..i].contains(tier) {
                return Err(SkillError::InvalidConfig(format!(
                    "tier {tier} listed more than once"
                )));
            }
        }
        if self.min_token_len == 0 {
            return Err(SkillError::InvalidConfig(
                "min_token_len must be at least 1".into(),
            ));
        }
        self.overlap.validate()
    }
}

/// A resolved skill together with the tier that found it.
#[derive(Debug, PartialEq)]
pub struct SkillMatch<'a, S> {
    pub skill: &'a S,
    pub tier: MatchTier,
}

// Derived Clone/Copy would require S: Clone.
impl<S> Clone for SkillMatch<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SkillMatch<'_, S> {}

#[derive(Debug, Clone)]
pub struct SkillMatcher {
    tiers: Vec<MatchTier>,
    overlap: OverlapRule,
    min_token_len: usize,
    aliases: AliasTable,
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self {
            tiers: MatchTier::ALL.to_vec(),
            overlap: OverlapRule::default(),
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            aliases: AliasTable::new(),
        }
    }
}

impl SkillMatcher {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation or holds a blank alias target.
    pub fn new(config: &MatchConfig) -> Result<Self, SkillError> {
        config.validate()?;
        Ok(Self {
            tiers: config.tiers.clone(),
            overlap: config.overlap,
            min_token_len: config.min_token_len,
            aliases: AliasTable::from_pairs(&config.aliases)?,
        })
    }

    /// Resolve `candidate` against `skills`, trying each configured tier in order.
    ///
    /// Alias, exact and substring tiers return the first hit in slice order.
    /// The token tier returns the skill with the most similar tokens, the
    /// earliest one on ties.
    pub fn find<'a, S: SkillName>(
        &self,
        candidate: &str,
        skills: &'a [S],
    ) -> Option<SkillMatch<'a, S>> {
        let found = self.tiers.iter().find_map(|&tier| {
            self.find_in_tier(tier, candidate, skills)
                .map(|skill| SkillMatch { skill, tier })
        });
        match &found {
            Some(m) => {
                tracing::debug!(candidate, skill = m.skill.skill_name(), tier = %m.tier, "skill matched");
            }
            None => tracing::debug!(candidate, "no skill matched"),
        }
        found
    }

    fn find_in_tier<'a, S: SkillName>(
        &self,
        tier: MatchTier,
        candidate: &str,
        skills: &'a [S],
    ) -> Option<&'a S> {
        match tier {
            MatchTier::Alias => {
                let canonical = self.aliases.resolve(candidate)?;
                let wanted = normalize(canonical);
                skills
                    .iter()
                    .find(|s| normalize(s.skill_name()) == wanted)
            }
            MatchTier::Exact => {
                let wanted = candidate.trim().to_lowercase();
                skills
                    .iter()
                    .find(|s| s.skill_name().trim().to_lowercase() == wanted)
            }
            MatchTier::Substring => find_substring(candidate, skills),
            MatchTier::TokenOverlap => self.find_token_overlap(candidate, skills),
        }
    }

    fn find_token_overlap<'a, S: SkillName>(
        &self,
        candidate: &str,
        skills: &'a [S],
    ) -> Option<&'a S> {
        let wanted = tokens(candidate, self.min_token_len);
        if wanted.is_empty() {
            return None;
        }

        let mut best: Option<(usize, &'a S)> = None;
        for skill in skills {
            let stored = tokens(skill.skill_name(), self.min_token_len);
            let matched = wanted
                .iter()
                .filter(|w| stored.iter().any(|s| tokens_similar(w, s)))
                .count();
            if !self.overlap.accepts(matched, wanted.len()) {
                continue;
            }
            if best.is_none_or(|(score, _)| matched > score) {
                best = Some((matched, skill));
            }
        }
        best.map(|(_, skill)| skill)
    }
}

/// Stored names containing the candidate win over stored names contained in it.
fn find_substring<'a, S: SkillName>(candidate: &str, skills: &'a [S]) -> Option<&'a S> {
    let wanted = normalize(candidate);
    if wanted.is_empty() {
        return None;
    }
    let normalized: Vec<String> = skills.iter().map(|s| normalize(s.skill_name())).collect();

    normalized
        .iter()
        .position(|name| name.contains(&wanted))
        .or_else(|| {
            normalized
                .iter()
                .position(|name| !name.is_empty() && wanted.contains(name.as_str()))
        })
        .map(|idx| &skills[idx])
}
