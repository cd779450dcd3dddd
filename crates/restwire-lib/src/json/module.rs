//! Type-adapter registry.
//!
//! A type adapter claims a newtype by the name it passes to
//! `serialize_newtype_struct` / `deserialize_newtype_struct` and rewrites its
//! inner JSON representation on the way out and on the way in. Values
//! serialized outside a mapper never see the adapter.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::options::MapperOptions;
use crate::timepoint;

pub trait TypeAdapter: fmt::Debug + Send + Sync {
    /// Newtype name this adapter claims.
    fn type_name(&self) -> &'static str;

    /// Rewrite the serialized inner value for output.
    fn write(&self, value: Value, options: &MapperOptions) -> Result<Value, String>;

    /// Turn an input value into the inner representation the newtype reads.
    fn read(&self, value: &Value, options: &MapperOptions) -> Result<Value, String>;
}

/// Ordered set of type adapters, at most one per type name.
#[derive(Debug, Clone, Default)]
pub struct Module {
    adapters: Vec<Arc<dyn TypeAdapter>>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any adapter already registered for
    /// the same type name.
    pub fn register<A: TypeAdapter + 'static>(&mut self, adapter: A) -> &mut Self {
        let adapter: Arc<dyn TypeAdapter> = Arc::new(adapter);
        match self
            .adapters
            .iter_mut()
            .find(|a| a.type_name() == adapter.type_name())
        {
            Some(slot) => *slot = adapter,
            None => self.adapters.push(adapter),
        }
        self
    }

    pub fn with_adapter<A: TypeAdapter + 'static>(mut self, adapter: A) -> Self {
        self.register(adapter);
        self
    }

    pub fn adapter(&self, type_name: &str) -> Option<&dyn TypeAdapter> {
        self.adapters
            .iter()
            .find(|a| a.type_name() == type_name)
            .map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Time points
// ---------------------------------------------------------------------------

/// Renders time points as text in the mapper's date format. Reads text in
/// that format or any ISO-8601 shape [`timepoint::parse`] accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimepointAdapter;

impl TypeAdapter for TimepointAdapter {
    fn type_name(&self) -> &'static str {
        timepoint::TYPE_NAME
    }

    fn write(&self, value: Value, options: &MapperOptions) -> Result<Value, String> {
        let text = value
            .as_str()
            .ok_or_else(|| format!("expected time point text, found {value}"))?;
        let instant = timepoint::parse(text).map_err(|e| e.to_string())?;
        timepoint::format_with(&instant, &options.date_format)
            .map(Value::String)
            .map_err(|e| e.to_string())
    }

    fn read(&self, value: &Value, options: &MapperOptions) -> Result<Value, String> {
        match value {
            Value::String(text) => timepoint::parse_with(text, &options.date_format)
                .map(|instant| Value::String(timepoint::format(&instant)))
                .map_err(|e| e.to_string()),
            other => Err(format!("invalid type: {}, expected an ISO-8601 time point", kind(other))),
        }
    }
}

/// Writes time points as milliseconds since the Unix epoch. Reads either
/// epoch milliseconds or ISO-8601 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochMillisAdapter;

impl TypeAdapter for EpochMillisAdapter {
    fn type_name(&self) -> &'static str {
        timepoint::TYPE_NAME
    }

    fn write(&self, value: Value, _options: &MapperOptions) -> Result<Value, String> {
        let text = value
            .as_str()
            .ok_or_else(|| format!("expected time point text, found {value}"))?;
        let instant = timepoint::parse(text).map_err(|e| e.to_string())?;
        Ok(Value::from(instant.timestamp_millis()))
    }

    fn read(&self, value: &Value, options: &MapperOptions) -> Result<Value, String> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|instant| Value::String(timepoint::format(&instant)))
                .ok_or_else(|| format!("epoch milliseconds out of range: {n}")),
            Value::String(_) => TimepointAdapter.read(value, options),
            other => Err(format!("invalid type: {}, expected epoch milliseconds", kind(other))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}
