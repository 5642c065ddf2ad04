use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("unknown code flag '{name}'")]
    UnknownFlag { name: String },
}
