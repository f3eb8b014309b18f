//! Path Watchers
//!
//! A watcher observes a dotted path such as `"user.address.city"` on a JSON
//! record and hands the resolved value to a callback whenever it may have
//! changed.
//!
//! Only the first segment is a tracked field of the reactive object. The rest
//! of the path walks the plain nested JSON value (object keys, or array
//! indices for numeric segments), so the watcher fires when the top-level
//! field is replaced, matching the object's shallow tracking.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::effect::Effect;
use super::object::ReactiveObject;
use super::runtime::Runtime;
use crate::error::ReactiveError;

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse `"a.b.c"`. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, ReactiveError> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if path.is_empty() || segments.iter().any(String::is_empty) {
            return Err(ReactiveError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// The tracked top-level field.
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Segments below the root.
    pub fn rest(&self) -> &[String] {
        &self.segments[1..]
    }

    /// Resolve the path against `object`, tracking the root field.
    pub fn resolve(&self, object: &ReactiveObject<Map<String, Value>>) -> Option<Value> {
        let root = object.get(self.root())?;
        descend(&root, self.rest()).cloned()
    }
}

impl FromStr for FieldPath {
    type Err = ReactiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

fn descend<'a>(mut value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

impl Runtime {
    /// Watch `path` on `object`, calling `callback` with the resolved value
    /// after every change to the path's root field.
    ///
    /// The callback is not called for the initial resolution, which only
    /// registers the dependency. A path that no longer resolves yields `None`.
    pub fn watch<F>(
        &self,
        object: &ReactiveObject<Map<String, Value>>,
        path: &str,
        callback: F,
    ) -> Result<Effect, ReactiveError>
    where
        F: Fn(Option<Value>) + 'static,
    {
        let path = FieldPath::parse(path)?;
        let object = object.clone();
        let primed = Cell::new(false);

        self.run(move || {
            let value = path.resolve(&object);
            if primed.replace(true) {
                callback(value);
            }
        })
    }
}
