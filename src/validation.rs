//! Input validation for entity creation and edits.
//!
//! Validation never mutates the store; it reports structured errors and
//! warnings the host can surface next to the form fields that caused them.

use crate::model::ParentRef;
use crate::store::EntityStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub parent: Option<ParentRef>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Serialize)]
pub struct ValidationError {
    pub error_type: String,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationWarning {
    pub warning_type: String,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub max_title_length: usize,
    pub max_description_length: usize,
    pub max_tag_length: usize,
    pub warn_on_duplicate_titles: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_title_length: 200,
            max_description_length: 2000,
            max_tag_length: 40,
            warn_on_duplicate_titles: true,
        }
    }
}

pub struct ValidationEngine {
    store_context: RwLock<Option<EntityStore>>,
    reserved_names: HashSet<String>,
    tag_pattern: Regex,
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(config: Option<ValidationConfig>) -> Result<Self> {
        let reserved_names = ["inbox", "archive", "trash"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tag_pattern = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_\- ]*$")?;
        Ok(Self {
            store_context: RwLock::new(None),
            reserved_names,
            tag_pattern,
            config: config.unwrap_or_default(),
        })
    }

    /// Snapshot the store used for duplicate and reference checks.
    pub fn update_context(&self, store: EntityStore) -> Result<()> {
        let mut context = self
            .store_context
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on validation context"))?;
        *context = Some(store);
        Ok(())
    }

    pub fn validate_task_input(&self, input: &TaskInput) -> Result<ValidationResult> {
        let context = self
            .store_context
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on validation context"))?;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        self.check_title(&input.title, &mut errors);
        if let Some(description) = &input.description {
            if description.len() > self.config.max_description_length {
                errors.push(ValidationError {
                    error_type: "too_long".to_string(),
                    field: "description".to_string(),
                    message: format!(
                        "Description exceeds {} characters",
                        self.config.max_description_length
                    ),
                });
            }
        }
        if let Some(tags) = &input.tags {
            for tag in tags {
                if tag.len() > self.config.max_tag_length || !self.tag_pattern.is_match(tag) {
                    errors.push(ValidationError {
                        error_type: "invalid_tag".to_string(),
                        field: "tags".to_string(),
                        message: format!(
                            "Tag '{}' is empty, too long or has invalid characters",
                            tag
                        ),
                    });
                }
            }
        }
        if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
            if end < start {
                errors.push(ValidationError {
                    error_type: "date_order".to_string(),
                    field: "end_date".to_string(),
                    message: "End date precedes start date".to_string(),
                });
            }
        }
        if let Some(store) = context.as_ref() {
            if let Some(parent) = &input.parent {
                let resolves = match parent {
                    ParentRef::Group(id) => store.get_group(id).is_some(),
                    ParentRef::Task(id) => store.get_task(id).is_some(),
                };
                if !resolves {
                    errors.push(ValidationError {
                        error_type: "missing_parent".to_string(),
                        field: "parent".to_string(),
                        message: format!("Parent {} does not exist", parent.id()),
                    });
                }
            }
            if self.config.warn_on_duplicate_titles {
                let title_lower = input.title.to_lowercase();
                if store
                    .tasks
                    .values()
                    .any(|t| t.title.to_lowercase() == title_lower)
                {
                    warnings.push(ValidationWarning {
                        warning_type: "duplicate_title".to_string(),
                        field: "title".to_string(),
                        message: format!("A task titled '{}' already exists", input.title),
                    });
                }
            }
        }

        Ok(ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        })
    }

    /// Shared by project and group forms.
    pub fn validate_name(&self, name: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            errors.push(ValidationError {
                error_type: "empty".to_string(),
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
            });
        } else if self.reserved_names.contains(&trimmed.to_lowercase()) {
            errors.push(ValidationError {
                error_type: "reserved_name".to_string(),
                field: "name".to_string(),
                message: format!("'{}' is a reserved name", trimmed),
            });
        }
        if trimmed.len() > self.config.max_title_length {
            errors.push(ValidationError {
                error_type: "too_long".to_string(),
                field: "name".to_string(),
                message: format!("Name exceeds {} characters", self.config.max_title_length),
            });
        }
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
        }
    }

    fn check_title(&self, title: &str, errors: &mut Vec<ValidationError>) {
        if title.trim().is_empty() {
            errors.push(ValidationError {
                error_type: "empty".to_string(),
                field: "title".to_string(),
                message: "Title cannot be empty".to_string(),
            });
        }
        if title.len() > self.config.max_title_length {
            errors.push(ValidationError {
                error_type: "too_long".to_string(),
                field: "title".to_string(),
                message: format!("Title exceeds {} characters", self.config.max_title_length),
            });
        }
    }
}
