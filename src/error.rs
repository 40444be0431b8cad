//! Error taxonomy for the engine.
//!
//! Every fallible operation in the crate returns [`EngineError`] through the
//! [`Result`] alias. Estimation and abstraction failures are surfaced to the
//! caller; they are never converted into placeholder values.

use std::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// All error conditions the engine can report.
#[derive(Debug)]
pub enum EngineError {
    /// A hand or board contains malformed, duplicate, or impossible cards.
    InvalidHand(String),
    /// A configuration value is out of range or inconsistent.
    Configuration(String),
    /// A live state is missing or violates a feature required for bucketing.
    UnabstractableState(String),
    /// The game state admits no legal action; the state itself is inconsistent.
    NoLegalAction(String),
    /// Filesystem failure while loading or persisting state.
    Io(io::Error),
    /// Serialization failure or unreadable persisted format.
    Encoding(String),
}

impl EngineError {
    /// Build an [`EngineError::InvalidHand`] from anything displayable.
    pub fn invalid_hand(msg: impl fmt::Display) -> Self {
        EngineError::InvalidHand(msg.to_string())
    }

    /// Build an [`EngineError::Configuration`] from anything displayable.
    pub fn configuration(msg: impl fmt::Display) -> Self {
        EngineError::Configuration(msg.to_string())
    }

    /// Build an [`EngineError::UnabstractableState`] from anything displayable.
    pub fn unabstractable(msg: impl fmt::Display) -> Self {
        EngineError::UnabstractableState(msg.to_string())
    }

    /// Build an [`EngineError::NoLegalAction`] from anything displayable.
    pub fn no_legal_action(msg: impl fmt::Display) -> Self {
        EngineError::NoLegalAction(msg.to_string())
    }

    /// Build an [`EngineError::Encoding`] from anything displayable.
    pub fn encoding(msg: impl fmt::Display) -> Self {
        EngineError::Encoding(msg.to_string())
    }

    /// True for input-contract violations that the caller must fix upstream.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidHand(_)
                | EngineError::UnabstractableState(_)
                | EngineError::NoLegalAction(_)
        )
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidHand(msg) => write!(f, "invalid hand: {}", msg),
            EngineError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            EngineError::UnabstractableState(msg) => {
                write!(f, "state cannot be abstracted: {}", msg)
            }
            EngineError::NoLegalAction(msg) => write!(f, "no legal action: {}", msg),
            EngineError::Io(err) => write!(f, "io error: {}", err),
            EngineError::Encoding(err) => write!(f, "encoding error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = EngineError::invalid_hand("duplicate card As");
        assert_eq!(err.to_string(), "invalid hand: duplicate card As");

        let err = EngineError::configuration("num_samples must be > 0");
        assert!(err.to_string().contains("num_samples"));
    }

    #[test]
    fn test_contract_violations() {
        assert!(EngineError::invalid_hand("x").is_contract_violation());
        assert!(EngineError::unabstractable("x").is_contract_violation());
        assert!(EngineError::NoLegalAction("x".into()).is_contract_violation());
        assert!(!EngineError::configuration("x").is_contract_violation());
    }

    #[test]
    fn test_io_conversion() {
        fn load() -> Result<String> {
            let contents = std::fs::read_to_string("/nonexistent/strategy.json")?;
            Ok(contents)
        }
        assert!(matches!(load(), Err(EngineError::Io(_))));
    }
}
