//! Board templates: built-in registry, external loading, validation.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SyncError;

/// Template the webhook handlers provision event boards from.
pub const KANBAN_BASIC: &str = "kanban_basic";

/// A list described by a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateList {
    /// List title
    pub title: String,
}

/// A seed card described by a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCard {
    /// Card title
    pub title: String,
    /// Card description
    #[serde(default)]
    pub description: Option<String>,
}

/// A declarative description of a board's initial lists and seed cards.
///
/// Immutable once registered. Every list title referenced by `cards` must
/// exist in `lists`; [`validate_template`] enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardTemplate {
    /// Default board title
    pub title: String,
    /// Lists to create, in order
    pub lists: Vec<TemplateList>,
    /// Seed cards per list title
    #[serde(default)]
    pub cards: HashMap<String, Vec<TemplateCard>>,
}

/// Validate a template's structure.
///
/// # Errors
/// Returns [`SyncError::TemplateValidation`] naming the first violated rule.
pub fn validate_template(template: &BoardTemplate) -> Result<(), SyncError> {
    if template.title.trim().is_empty() {
        return Err(SyncError::TemplateValidation(
            "template title must not be empty".to_string(),
        ));
    }

    if template.lists.is_empty() {
        return Err(SyncError::TemplateValidation(
            "template must declare at least one list".to_string(),
        ));
    }

    for (i, list) in template.lists.iter().enumerate() {
        if list.title.trim().is_empty() {
            return Err(SyncError::TemplateValidation(format!(
                "list at index {i} has an empty title"
            )));
        }
    }

    for (list_title, cards) in &template.cards {
        if !template.lists.iter().any(|l| l.title == *list_title) {
            return Err(SyncError::TemplateValidation(format!(
                "cards reference non-existent list '{list_title}'"
            )));
        }
        for (i, card) in cards.iter().enumerate() {
            if card.title.trim().is_empty() {
                return Err(SyncError::TemplateValidation(format!(
                    "card at index {i} in list '{list_title}' has an empty title"
                )));
            }
        }
    }

    Ok(())
}

/// Named board templates: built-ins plus validated external templates.
#[derive(Debug, Clone)]
pub struct TemplateManager {
    templates: HashMap<String, BoardTemplate>,
}

impl Default for TemplateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateManager {
    /// Registry containing only the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    /// Registry with built-ins overlaid by templates loaded from `dir`.
    ///
    /// Each `*.json` file becomes a template named after its file stem.
    /// Files that fail to parse or validate are logged and skipped; loading
    /// never partially registers a template.
    #[must_use]
    pub fn with_templates_dir(dir: &Path) -> Self {
        let mut manager = Self::new();
        manager.load_templates_dir(dir);
        manager
    }

    fn load_templates_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Templates directory not readable, using built-ins only"
                );
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from)
            else {
                continue;
            };

            match load_template_file(&path) {
                Ok(template) => {
                    info!(template = %name, "Loaded board template");
                    self.templates.insert(name, template);
                }
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping invalid board template"
                    );
                }
            }
        }
    }

    /// Look up a template by name.
    ///
    /// # Errors
    /// Returns [`SyncError::TemplateNotFound`] listing the available names.
    pub fn get(&self, name: &str) -> Result<&BoardTemplate, SyncError> {
        self.templates
            .get(name)
            .ok_or_else(|| SyncError::TemplateNotFound {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Names of all registered templates, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }
}

fn load_template_file(path: &Path) -> Result<BoardTemplate, SyncError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SyncError::TemplateValidation(e.to_string()))?;
    let template: BoardTemplate =
        serde_json::from_str(&raw).map_err(|e| SyncError::TemplateValidation(e.to_string()))?;
    validate_template(&template)?;
    Ok(template)
}

fn builtin_templates() -> HashMap<String, BoardTemplate> {
    let mut templates = HashMap::new();

    templates.insert(
        KANBAN_BASIC.to_string(),
        BoardTemplate {
            title: "Basic Kanban Board".to_string(),
            lists: lists(&["Backlog", "To Do", "In Progress", "Done"]),
            cards: HashMap::from([(
                "Backlog".to_string(),
                vec![TemplateCard {
                    title: "Example Card 1".to_string(),
                    description: Some("This is an example card".to_string()),
                }],
            )]),
        },
    );

    templates.insert(
        "scrum".to_string(),
        BoardTemplate {
            title: "Scrum Board".to_string(),
            lists: lists(&[
                "Product Backlog",
                "Sprint Backlog",
                "In Progress",
                "Review",
                "Done",
            ]),
            cards: HashMap::new(),
        },
    );

    templates.insert(
        "devops".to_string(),
        BoardTemplate {
            title: "DevOps Pipeline".to_string(),
            lists: lists(&[
                "Backlog",
                "Planning",
                "Development",
                "Testing",
                "Deployment",
                "Monitoring",
            ]),
            cards: HashMap::new(),
        },
    );

    templates
}

fn lists(titles: &[&str]) -> Vec<TemplateList> {
    titles
        .iter()
        .map(|t| TemplateList {
            title: (*t).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_templates_present() {
        let manager = TemplateManager::new();
        assert_eq!(manager.names(), ["devops", "kanban_basic", "scrum"]);
    }

    #[test]
    fn test_kanban_basic_shape() {
        let manager = TemplateManager::new();
        let template = manager.get(KANBAN_BASIC).unwrap();

        assert_eq!(template.title, "Basic Kanban Board");
        let titles: Vec<&str> = template.lists.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["Backlog", "To Do", "In Progress", "Done"]);
        assert_eq!(template.cards["Backlog"].len(), 1);
    }

    #[test]
    fn test_unknown_template_lists_available() {
        let manager = TemplateManager::new();
        let err = manager.get("waterfall").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'waterfall' not found"));
        assert!(message.contains("kanban_basic"));
    }

    #[test]
    fn test_validate_accepts_builtin() {
        let manager = TemplateManager::new();
        for name in manager.names() {
            validate_template(manager.get(&name).unwrap()).unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_cards_for_missing_list() {
        let template = BoardTemplate {
            title: "Broken".to_string(),
            lists: lists(&["To Do"]),
            cards: HashMap::from([(
                "Done".to_string(),
                vec![TemplateCard {
                    title: "Orphan".to_string(),
                    description: None,
                }],
            )]),
        };

        let err = validate_template(&template).unwrap_err();
        assert!(err.to_string().contains("non-existent list 'Done'"));
    }

    #[test]
    fn test_validate_rejects_empty_lists() {
        let template = BoardTemplate {
            title: "Empty".to_string(),
            lists: vec![],
            cards: HashMap::new(),
        };
        assert!(validate_template(&template).is_err());
    }

    #[test]
    fn test_validate_rejects_untitled_entries() {
        let untitled_list = BoardTemplate {
            title: "Board".to_string(),
            lists: vec![TemplateList {
                title: "  ".to_string(),
            }],
            cards: HashMap::new(),
        };
        assert!(validate_template(&untitled_list).is_err());

        let untitled_card = BoardTemplate {
            title: "Board".to_string(),
            lists: lists(&["To Do"]),
            cards: HashMap::from([(
                "To Do".to_string(),
                vec![TemplateCard {
                    title: String::new(),
                    description: None,
                }],
            )]),
        };
        assert!(validate_template(&untitled_card).is_err());
    }

    #[test]
    fn test_load_templates_dir_registers_valid_and_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();

        let mut valid = std::fs::File::create(dir.path().join("triage.json")).unwrap();
        valid
            .write_all(
                br#"{
                    "title": "Triage Board",
                    "lists": [{"title": "Inbox"}, {"title": "Done"}],
                    "cards": {"Inbox": [{"title": "First pass"}]}
                }"#,
            )
            .unwrap();

        // Cards referencing a list that does not exist
        let mut invalid = std::fs::File::create(dir.path().join("broken.json")).unwrap();
        invalid
            .write_all(br#"{"title": "Broken", "lists": [{"title": "A"}], "cards": {"B": []}}"#)
            .unwrap();

        let mut not_json = std::fs::File::create(dir.path().join("notes.txt")).unwrap();
        not_json.write_all(b"not a template").unwrap();

        let manager = TemplateManager::with_templates_dir(dir.path());
        assert!(manager.get("triage").is_ok());
        assert!(manager.get("broken").is_err());
        assert!(manager.get("notes").is_err());
        // Built-ins survive alongside loaded templates
        assert!(manager.get(KANBAN_BASIC).is_ok());
    }

    #[test]
    fn test_missing_templates_dir_keeps_builtins() {
        let manager =
            TemplateManager::with_templates_dir(Path::new("/nonexistent/templates/dir"));
        assert_eq!(manager.names(), ["devops", "kanban_basic", "scrum"]);
    }
}
