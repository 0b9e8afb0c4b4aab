//! Error types: operator infeasibility and domain loading failures.

use std::path::PathBuf;
use thiserror::Error;

/// Why a recipe's operator cannot run in the current state.
///
/// This is an ordinary "not applicable" signal; the search backtracks on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Infeasible {
    #[error("needs {needed} time, {remaining} left")]
    NotEnoughTime { needed: i64, remaining: i64 },

    #[error("requires {needed} {item}, holds {held}")]
    MissingTool { item: String, needed: u32, held: u32 },

    #[error("consumes {needed} {item}, holds {held}")]
    MissingIngredient { item: String, needed: u32, held: u32 },
}

/// Failure to load a domain document.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_messages() {
        let e = Infeasible::NotEnoughTime {
            needed: 4,
            remaining: 1,
        };
        assert_eq!(e.to_string(), "needs 4 time, 1 left");
        let e = Infeasible::MissingTool {
            item: "bench".into(),
            needed: 1,
            held: 0,
        };
        assert_eq!(e.to_string(), "requires 1 bench, holds 0");
    }

    #[test]
    fn test_domain_error_read_message() {
        let e = DomainError::Read {
            path: PathBuf::from("/nope/crafting.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.to_string().starts_with("cannot read /nope/crafting.json"));
    }
}
