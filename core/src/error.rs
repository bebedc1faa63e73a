use thiserror::Error;

/// Errors that abort the simulation outright. Everything else (orphan INVs,
/// stale mining tasks) is recovered locally and never surfaces as an error.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown strategy id `{kind}`: `{id}`")]
    UnknownStrategy { kind: &'static str, id: String },

    #[error("arithmetic precondition violated in {where_}: {reason}")]
    Arithmetic { where_: &'static str, reason: String },

    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = std::result::Result<T, SimError>;
