//! Resolve free-form skill names (from model output or file names) to
//! catalogue records.

pub mod alias;
pub mod error;
pub mod matcher;
pub mod normalize;

pub use alias::AliasTable;
pub use error::SkillError;
pub use matcher::{MatchConfig, MatchTier, OverlapRule, SkillMatch, SkillMatcher, SkillName};
pub use normalize::{normalize, tokens};
