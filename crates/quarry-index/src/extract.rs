//! Field value extraction.
//!
//! Every field value is produced by an [`Extractor`]. A field without a
//! registered override uses [`DefaultExtractor`], which follows the field's
//! [`FieldSource`]. Overrides are registered per base field name on the
//! index definition and take precedence over the source.

use std::fmt;
use std::sync::Arc;

use quarry_core::{ExtractionError, Locale, Record, Value};

use crate::field::{FieldDescriptor, FieldSource};
use crate::template::{TemplateContext, TemplateRenderer, default_template_name};

/// Everything an extractor may look at while producing one field value.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    /// The record, already fetched in `locale` when one is set.
    pub record: &'a Record,
    /// Field being prepared.
    pub field: &'a FieldDescriptor,
    /// Active locale; `None` is neutral.
    pub locale: Option<&'a Locale>,
    /// Renderer for templated fields.
    pub templates: &'a dyn TemplateRenderer,
}

impl fmt::Debug for ExtractContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractContext")
            .field("record", &self.record.identity())
            .field("field", &self.field.name())
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl ExtractContext<'_> {
    /// Base name of the field being prepared (locale suffix removed for
    /// derived per-locale fields).
    pub fn base_name(&self) -> &str {
        self.field.base_name()
    }
}

/// Produces the value of one field for one record.
pub trait Extractor: Send + Sync {
    /// Extract the value.
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<Value, ExtractionError>;
}

/// Follows the field's configured [`FieldSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<Value, ExtractionError> {
        match ctx.field.source() {
            FieldSource::Attribute { path } => AttributeExtractor::new(path.clone()).extract(ctx),
            FieldSource::Template { name } => TemplateExtractor {
                name: name.clone(),
            }
            .extract(ctx),
            FieldSource::None => {
                let value = ctx.field.default().cloned().unwrap_or_default();
                ctx.field.kind().convert(ctx.field.name(), value)
            }
        }
    }
}

/// Reads a (possibly dotted) attribute path.
///
/// A missing path yields the field default or fails; a present `Null`
/// yields the field default or `Null`. The result is converted to the
/// field kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeExtractor {
    path: String,
}

impl AttributeExtractor {
    /// Extract from `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Attribute path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Extractor for AttributeExtractor {
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<Value, ExtractionError> {
        let field = ctx.field;
        let value = match ctx.record.attribute(&self.path) {
            Some(Value::Null) => field.default().cloned().unwrap_or_default(),
            Some(value) => value,
            None => match field.default() {
                Some(default) => default.clone(),
                None => {
                    return Err(ExtractionError::missing(
                        field.name(),
                        ctx.record.identity(),
                        &self.path,
                    ));
                }
            },
        };
        field.kind().convert(field.name(), value)
    }
}

/// Renders a template with the record as `object`.
///
/// Without an explicit name the default template name for the record type
/// and base field name is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateExtractor {
    name: Option<String>,
}

impl TemplateExtractor {
    /// Render the default template for the field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a named template.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Template name used for `ctx`.
    pub fn template_name(&self, ctx: &ExtractContext<'_>) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => default_template_name(ctx.record.record_type(), ctx.base_name()),
        }
    }
}

impl Extractor for TemplateExtractor {
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<Value, ExtractionError> {
        let template = self.template_name(ctx);
        let object = ctx.record.to_value();
        let context = TemplateContext {
            object: &object,
            locale: ctx.locale,
        };
        let rendered = ctx
            .templates
            .render(&template, &context)
            .map_err(|e| ExtractionError::Template {
                field: ctx.field.name().to_string(),
                template: template.clone(),
                message: e.to_string(),
            })?;
        ctx.field.kind().convert(ctx.field.name(), Value::Text(rendered))
    }
}

type ExtractFn = dyn Fn(&ExtractContext<'_>) -> Result<Value, ExtractionError> + Send + Sync;

/// Arbitrary extraction logic. The returned value is used as-is, without
/// kind conversion.
#[derive(Clone)]
pub struct CustomExtractor {
    f: Arc<ExtractFn>,
}

impl CustomExtractor {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ExtractContext<'_>) -> Result<Value, ExtractionError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl fmt::Debug for CustomExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomExtractor").finish_non_exhaustive()
    }
}

impl Extractor for CustomExtractor {
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<Value, ExtractionError> {
        (self.f)(ctx)
    }
}

// ============================================================================
// Tests
// ============================================================================
