//! Resource Module
//!
//! The capability contract the interceptor needs from a fetchable resource,
//! plus single-record and record-set implementations.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ResourceError;

// == Identity ==
/// Produces the URL used as a resource's cache key.
///
/// Always a function; static URLs go through [`Identity::fixed`]. An empty
/// string counts as no identity.
#[derive(Clone)]
pub struct Identity(Arc<dyn Fn() -> Option<String> + Send + Sync>);

impl Identity {
    /// Identity that always resolves to `url`.
    pub fn fixed(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(Arc::new(move || Some(url.clone())))
    }

    /// Identity computed on every resolution.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Identity that never resolves; such resources are never cached.
    pub fn none() -> Self {
        Self(Arc::new(|| None))
    }

    /// Resolves to a usable cache key, if any.
    pub fn resolve(&self) -> Option<String> {
        (self.0)().filter(|url| !url.is_empty())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&self.resolve()).finish()
    }
}

impl From<&str> for Identity {
    fn from(url: &str) -> Self {
        Identity::fixed(url)
    }
}

impl From<String> for Identity {
    fn from(url: String) -> Self {
        Identity::fixed(url)
    }
}

// == Apply Mode ==
/// How parsed records are merged into a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Reset the set to exactly the parsed records
    #[default]
    Replace,
    /// Append parsed records not already present
    Add,
}

// == Resource Trait ==
/// A named, URL-addressed resource whose state can be set from a raw payload.
pub trait Resource: Send {
    /// Where the resource lives; doubles as its cache key.
    fn identity(&self) -> Identity;

    /// Turns a raw server payload into the shape `apply` expects.
    fn parse(&self, raw: &Value) -> Result<Value, ResourceError> {
        Ok(raw.clone())
    }

    /// Sets the resource's state from a parsed payload.
    fn apply(&mut self, parsed: Value, mode: ApplyMode) -> Result<(), ResourceError>;
}

/// Runs a raw payload through the resource's own parse and apply steps.
pub fn restore<R>(resource: &mut R, raw: &Value, mode: ApplyMode) -> Result<(), ResourceError>
where
    R: Resource + ?Sized,
{
    let parsed = resource.parse(raw)?;
    resource.apply(parsed, mode)
}

// == Record ==
/// A single record holding an attribute map.
///
/// Its identity is either explicit or derived from a URL root and the `id`
/// attribute (`<root>/<id>`); a rooted record without an id has no identity.
#[derive(Debug, Clone, Default)]
pub struct Record {
    url: Option<Identity>,
    url_root: Option<String>,
    attributes: Map<String, Value>,
}

impl Record {
    pub fn new(url: impl Into<Identity>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// A record addressed as `<root>/<id>` once it has an `id` attribute.
    pub fn with_url_root(root: impl Into<String>) -> Self {
        Self {
            url_root: Some(root.into().trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }
}

impl Resource for Record {
    fn identity(&self) -> Identity {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let id = match self.attributes.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Identity::none(),
        };
        match &self.url_root {
            Some(root) => Identity::fixed(format!("{}/{}", root, id)),
            None => Identity::none(),
        }
    }

    fn apply(&mut self, parsed: Value, _mode: ApplyMode) -> Result<(), ResourceError> {
        match parsed {
            Value::Object(attrs) => {
                self.attributes.extend(attrs);
                Ok(())
            }
            other => Err(ResourceError::InvalidPayload(format!(
                "record attributes must be an object, got {}",
                kind_of(&other)
            ))),
        }
    }
}

// == Record Set ==
/// An ordered collection of records.
///
/// If an envelope field is configured, `parse` reads the record array from
/// that field of the payload (e.g. `{"items": [...]}`).
#[derive(Debug, Clone)]
pub struct RecordSet {
    url: Identity,
    envelope: Option<String>,
    records: Vec<Value>,
}

impl RecordSet {
    pub fn new(url: impl Into<Identity>) -> Self {
        Self {
            url: url.into(),
            envelope: None,
            records: Vec::new(),
        }
    }

    pub fn with_envelope(mut self, field: impl Into<String>) -> Self {
        self.envelope = Some(field.into());
        self
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.records.iter().any(|r| r.get("id") == Some(id))
    }
}

impl Resource for RecordSet {
    fn identity(&self) -> Identity {
        self.url.clone()
    }

    fn parse(&self, raw: &Value) -> Result<Value, ResourceError> {
        let list = match &self.envelope {
            Some(field) => raw.get(field).ok_or_else(|| {
                ResourceError::InvalidPayload(format!("missing `{}` field", field))
            })?,
            None => raw,
        };

        if list.is_array() {
            Ok(list.clone())
        } else {
            Err(ResourceError::InvalidPayload(format!(
                "record set payload must be an array, got {}",
                kind_of(list)
            )))
        }
    }

    fn apply(&mut self, parsed: Value, mode: ApplyMode) -> Result<(), ResourceError> {
        let Value::Array(records) = parsed else {
            return Err(ResourceError::InvalidPayload(
                "parsed record set is not an array".to_string(),
            ));
        };

        match mode {
            ApplyMode::Replace => self.records = records,
            ApplyMode::Add => {
                for record in records {
                    let duplicate = record.get("id").is_some_and(|id| self.contains_id(id));
                    if !duplicate {
                        self.records.push(record);
                    }
                }
            }
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
