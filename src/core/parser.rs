//! Domain file parsing and validation.
//!
//! Reads JSON or YAML domain documents and checks structural constraints:
//! - Every recipe produces something
//! - Times are non-negative
//! - Every name used by recipes and the problem is declared as an item or tool
//! - No name is declared as both
//! - The repetition policy allows at least one repeat
//! - The depth ceiling stays within what the recursive search can hold

use super::error::DomainError;
use super::types::*;
use indexmap::IndexSet;
use std::path::Path;

/// Largest accepted `MaxDepth`. The search recurses once per level.
pub const MAX_DEPTH_LIMIT: usize = 2_000;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Serialization format of a domain document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainFormat {
    Json,
    Yaml,
}

impl DomainFormat {
    /// `.yaml` / `.yml` are YAML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Parse a domain file from disk.
pub fn parse_domain_file(path: &Path) -> Result<Domain, DomainError> {
    let content = std::fs::read_to_string(path).map_err(|source| DomainError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_domain(&content, DomainFormat::from_path(path))
}

/// Parse a domain document from a string.
pub fn parse_domain(text: &str, format: DomainFormat) -> Result<Domain, DomainError> {
    let domain: Domain = match format {
        DomainFormat::Json => serde_json::from_str(text)?,
        DomainFormat::Yaml => serde_yaml_ng::from_str(text)?,
    };
    Ok(domain)
}

/// Validate a parsed domain. Returns a list of errors (empty = valid).
pub fn validate_domain(domain: &Domain) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let items: IndexSet<&str> = domain.items.iter().map(String::as_str).collect();
    let tools: IndexSet<&str> = domain.tools.iter().map(String::as_str).collect();

    for name in items.intersection(&tools) {
        errors.push(ValidationError {
            message: format!("'{}' is declared as both item and tool", name),
        });
    }

    let declared = |name: &str| items.contains(name) || tools.contains(name);

    for (name, recipe) in &domain.recipes {
        if recipe.produces.is_empty() {
            errors.push(ValidationError {
                message: format!("recipe '{}' produces nothing", name),
            });
        }
        if recipe.time < 0 {
            errors.push(ValidationError {
                message: format!("recipe '{}' has negative time {}", name, recipe.time),
            });
        }

        let sections = [
            ("produces", &recipe.produces),
            ("requires", &recipe.requires),
            ("consumes", &recipe.consumes),
        ];
        for (section, entries) in sections {
            for item in entries.keys() {
                if !declared(item.as_str()) {
                    errors.push(ValidationError {
                        message: format!(
                            "recipe '{}' {} undeclared item '{}'",
                            name, section, item
                        ),
                    });
                }
            }
        }
    }

    if domain.problem.time < 0 {
        errors.push(ValidationError {
            message: format!("problem time must not be negative, got {}", domain.problem.time),
        });
    }
    for (section, entries) in [
        ("initial", &domain.problem.initial),
        ("goal", &domain.problem.goal),
    ] {
        for item in entries.keys() {
            if !declared(item.as_str()) {
                errors.push(ValidationError {
                    message: format!("problem {} references undeclared item '{}'", section, item),
                });
            }
        }
    }

    if domain.policy.repeat_factor == 0 && domain.policy.repeat_floor == 0 {
        errors.push(ValidationError {
            message: "policy RepeatFactor and RepeatFloor are both zero".to_string(),
        });
    }
    if domain.policy.max_depth > MAX_DEPTH_LIMIT {
        errors.push(ValidationError {
            message: format!(
                "policy MaxDepth {} exceeds the limit of {}",
                domain.policy.max_depth, MAX_DEPTH_LIMIT
            ),
        });
    }

    errors
}
