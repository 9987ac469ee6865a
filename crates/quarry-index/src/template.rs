//! Template rendering for templated fields.
//!
//! A templated field renders a named template with the record as context.
//! [`TemplateRenderer`] is the seam; [`TemplateStore`] is the built-in
//! renderer, backed by in-memory sources and an optional template directory.
//!
//! The template language is deliberately small: `{{ object }}`,
//! `{{ object.some.path }}` and `{{ locale }}` are substituted, everything
//! else is copied verbatim. Unresolvable variables render as empty text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quarry_core::{Locale, RecordType, Settings, Value};
use thiserror::Error;

/// Errors rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    /// No template with this name is known.
    #[error("template '{name}' not found")]
    NotFound {
        /// Requested template name.
        name: String,
    },

    /// The template source is malformed.
    #[error("template '{name}': {message}")]
    Syntax {
        /// Template name.
        name: String,
        /// What is wrong.
        message: String,
    },

    /// The template file could not be read.
    #[error("template '{name}' at {path}: {message}")]
    Io {
        /// Template name.
        name: String,
        /// File that failed to read.
        path: PathBuf,
        /// I/O diagnostic.
        message: String,
    },
}

/// Values available to a template while rendering one field.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// The record, as returned by [`quarry_core::Record::to_value`].
    pub object: &'a Value,
    /// Locale the record was fetched in, if any.
    pub locale: Option<&'a Locale>,
}

/// Renders a named template against a record context.
pub trait TemplateRenderer: Send + Sync {
    /// Render `name` with `context`.
    fn render(&self, name: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError>;
}

/// Default template name for a field: `search/indexes/<app>/<model>_<field>.txt`.
pub fn default_template_name(record_type: &RecordType, field: &str) -> String {
    format!(
        "search/indexes/{}/{}_{}.txt",
        record_type.app(),
        record_type.model(),
        field
    )
}

/// In-memory and directory-backed template renderer.
///
/// In-memory templates shadow files of the same name.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
    dir: Option<PathBuf>,
}

impl TemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that also loads templates from `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            templates: HashMap::new(),
            dir: Some(dir.into()),
        }
    }

    /// Create a store from the `template_dir` setting.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            templates: HashMap::new(),
            dir: settings.template_dir.clone(),
        }
    }

    /// Register an in-memory template.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    /// Builder form of [`add`](Self::add).
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.add(name, source);
        self
    }

    /// Template directory, if configured.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn source(&self, name: &str) -> Result<String, TemplateError> {
        if let Some(source) = self.templates.get(name) {
            return Ok(source.clone());
        }
        let not_found = || TemplateError::NotFound {
            name: name.to_string(),
        };
        let dir = self.dir.as_ref().ok_or_else(not_found)?;
        let path = dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(TemplateError::Io {
                name: name.to_string(),
                path,
                message: e.to_string(),
            }),
        }
    }
}

impl TemplateRenderer for TemplateStore {
    fn render(&self, name: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let source = self.source(name)?;
        render_source(name, &source, context)
    }
}

/// Substitute `{{ ... }}` expressions in `source`.
pub fn render_source(
    name: &str,
    source: &str,
    context: &TemplateContext<'_>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| TemplateError::Syntax {
            name: name.to_string(),
            message: format!("unclosed '{{{{' at byte {}", source.len() - rest.len() + start),
        })?;
        let expr = after[..end].trim();
        if expr.is_empty() {
            return Err(TemplateError::Syntax {
                name: name.to_string(),
                message: "empty expression".to_string(),
            });
        }
        out.push_str(&resolve(expr, context));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve(expr: &str, context: &TemplateContext<'_>) -> String {
    let (root, path) = expr.split_once('.').unwrap_or((expr, ""));
    match root {
        "object" => context
            .object
            .lookup(path)
            .map(Value::to_text)
            .unwrap_or_default(),
        "locale" if path.is_empty() => context
            .locale
            .map(|l| l.code().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quarry_core::Record;
    use tempfile::TempDir;

    fn note() -> Value {
        Record::new(RecordType::new("core", "MockModel"), "1")
            .with("author", "daniel1")
            .with("title", "Hello")
            .with(
                "user",
                Value::from(serde_json::json!({ "profile": { "name": "Daniel" } })),
            )
            .to_value()
    }

    #[test]
    fn test_default_template_name() {
        let name = default_template_name(&RecordType::new("core", "MockModel"), "text");
        assert_eq!(name, "search/indexes/core/mockmodel_text.txt");
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    #[test]
    fn test_render_substitutes_paths() {
        let object = note();
        let ctx = TemplateContext {
            object: &object,
            locale: None,
        };
        let out = render_source(
            "t",
            "{{ object.title }} by {{object.user.profile.name}} (#{{ object.pk }})",
            &ctx,
        )
        .unwrap();
        assert_eq!(out, "Hello by Daniel (#1)");
    }

    #[test]
    fn test_render_locale_and_missing() {
        let object = note();
        let fr = Locale::from("fr");
        let ctx = TemplateContext {
            object: &object,
            locale: Some(&fr),
        };
        let out = render_source("t", "[{{ locale }}]{{ object.nope }}{{ other }}", &ctx).unwrap();
        assert_eq!(out, "[fr]");
    }

    #[test]
    fn test_render_syntax_errors() {
        let object = note();
        let ctx = TemplateContext {
            object: &object,
            locale: None,
        };
        assert!(matches!(
            render_source("t", "{{ object.title", &ctx),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            render_source("t", "{{ }}", &ctx),
            Err(TemplateError::Syntax { .. })
        ));
    }

    // ------------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------------

    #[test]
    fn test_store_not_found() {
        let store = TemplateStore::new();
        let object = note();
        let ctx = TemplateContext {
            object: &object,
            locale: None,
        };
        assert_eq!(
            store.render("missing.txt", &ctx).unwrap_err(),
            TemplateError::NotFound {
                name: "missing.txt".to_string()
            }
        );
    }

    #[test]
    fn test_store_reads_directory_and_memory_shadows() {
        let dir = TempDir::new().unwrap();
        let name = "search/indexes/core/mockmodel_text.txt";
        std::fs::create_dir_all(dir.path().join("search/indexes/core")).unwrap();
        std::fs::write(dir.path().join(name), "file: {{ object.title }}").unwrap();

        let object = note();
        let ctx = TemplateContext {
            object: &object,
            locale: None,
        };

        let store = TemplateStore::with_dir(dir.path());
        assert_eq!(store.render(name, &ctx).unwrap(), "file: Hello");

        let store = store.with_template(name, "memory: {{ object.author }}");
        assert_eq!(store.render(name, &ctx).unwrap(), "memory: daniel1");
    }

    #[test]
    fn test_store_from_settings() {
        let settings = Settings {
            template_dir: Some(PathBuf::from("/srv/templates")),
            ..Settings::default()
        };
        let store = TemplateStore::from_settings(&settings);
        assert_eq!(store.dir(), Some(Path::new("/srv/templates")));
    }
}
