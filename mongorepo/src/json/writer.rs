use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::json::LiteralConverter;
use chrono::SecondsFormat;
use std::sync::Arc;

/// Renders [Value]s as JSON text, letting registered converters emit raw
/// literals for the values they claim.
///
/// Objects are written as `{"key": value, "other": value}`. Converters are
/// consulted in registration order before the standard rendering.
#[derive(Clone, Default)]
pub struct JsonWriter {
    converters: Vec<Arc<dyn LiteralConverter>>,
}

impl JsonWriter {
    pub fn new() -> Self {
        JsonWriter {
            converters: Vec::new(),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn LiteralConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }

    pub fn write(&self, value: &Value) -> RepoResult<String> {
        let mut out = String::new();
        self.write_value(value, &mut out)?;
        Ok(out)
    }

    pub fn write_document(&self, document: &Document) -> RepoResult<String> {
        let mut out = String::new();
        self.write_object(document, &mut out)?;
        Ok(out)
    }

    fn write_value(&self, value: &Value, out: &mut String) -> RepoResult<()> {
        if let Some(converter) = self.converters.iter().find(|c| c.can_convert(value)) {
            out.push_str(&converter.write_literal(value)?);
            return Ok(());
        }

        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::I32(i) => out.push_str(&i.to_string()),
            Value::I64(i) => out.push_str(&i.to_string()),
            Value::F64(f) => {
                if !f.is_finite() {
                    log::error!("Cannot write non-finite number {} as JSON", f);
                    return Err(RepoError::new(
                        &format!("Cannot write non-finite number {} as JSON", f),
                        ErrorKind::EncodingError,
                    ));
                }
                out.push_str(&serde_json::to_string(f)?);
            }
            Value::String(s) => out.push_str(&serde_json::to_string(s)?),
            Value::DateTime(d) => {
                let text = d.to_rfc3339_opts(SecondsFormat::Millis, true);
                out.push_str(&serde_json::to_string(&text)?);
            }
            Value::Document(doc) => self.write_object(doc, out)?,
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(item, out)?;
                }
                out.push(']');
            }
        }
        Ok(())
    }

    fn write_object(&self, document: &Document, out: &mut String) -> RepoResult<()> {
        out.push('{');
        for (i, (key, value)) in document.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&serde_json::to_string(key)?);
            out.push_str(": ");
            self.write_value(value, out)?;
        }
        out.push('}');
        Ok(())
    }
}
