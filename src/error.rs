use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TenetError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum TenetError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid belief '{belief_id}': {reason}")]
    InvalidBelief { belief_id: String, reason: String },
    #[error("Empty vocabulary: no text contains a countable term after stop-word removal")]
    EmptyVocabulary,
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl TenetError {
    pub fn invalid_belief(belief_id: impl Into<String>, reason: impl Into<String>) -> Self {
        TenetError::InvalidBelief {
            belief_id: belief_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for TenetError {
    fn from(src: toml::de::Error) -> TenetError {
        TenetError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for TenetError {
    fn from(src: toml::ser::Error) -> TenetError {
        TenetError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for TenetError {
    fn from(src: JsonError) -> TenetError {
        TenetError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for TenetError {
    fn from(src: YamlError) -> TenetError {
        TenetError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for TenetError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => TenetError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => TenetError::PermissionDenied,
            _ => TenetError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
