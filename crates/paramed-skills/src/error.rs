#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("invalid match configuration: {0}")]
    InvalidConfig(String),

    #[error("alias {alias:?} maps to an empty skill name")]
    EmptyAlias { alias: String },
}
