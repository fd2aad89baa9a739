//! Read-time migration of stored document shapes.
//!
//! A resolver holds an ordered list of arms. Each arm is keyed on the schema
//! version a document was written with plus a structural predicate over its
//! fields, and rewrites the document into the shape the current `from_plain`
//! expects. The first matching arm wins; when none matches the document is
//! passed through unchanged. Nothing is ever written back to the store.

pub mod arms;

use log::debug;
use serde_json::{Map, Value};

use crate::store::StoredDocument;

/// Plain (JSON object) representation of an entity.
pub type Plain = Map<String, Value>;

#[derive(Debug, Clone, Copy)]
pub struct MigrationArm {
    pub name: &'static str,
    /// Schema version tag this arm applies to.
    pub schema_version: &'static str,
    /// Structural predicate; a single tag can cover several shapes.
    pub matches: fn(&Plain) -> bool,
    pub rewrite: fn(Plain) -> Plain,
}

impl MigrationArm {
    pub fn applies(&self, schema_version: &str, plain: &Plain) -> bool {
        self.schema_version == schema_version && (self.matches)(plain)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MigrationResolver {
    arms: &'static [MigrationArm],
}

impl MigrationResolver {
    pub const fn new(arms: &'static [MigrationArm]) -> Self {
        Self { arms }
    }

    /// Resolver with only the pass-through arm.
    pub const fn identity() -> Self {
        Self { arms: &[] }
    }

    /// Arm that would handle a document, if any.
    pub fn matching_arm(&self, schema_version: &str, plain: &Plain) -> Option<&'static MigrationArm> {
        self.arms
            .iter()
            .find(|arm| arm.applies(schema_version, plain))
    }

    /// Produce the plain shape the domain constructor expects. The stored id is
    /// always copied onto the `id` field.
    pub fn resolve(&self, document: &StoredDocument) -> Plain {
        let mut plain = document.body.clone();
        plain.insert("id".to_string(), Value::String(document.id.clone()));

        match self.matching_arm(&document.schema_version, &plain) {
            Some(arm) => {
                debug!(
                    "Migrating document {} from schema {} via '{}'",
                    document.id, document.schema_version, arm.name
                );
                (arm.rewrite)(plain)
            }
            None => plain,
        }
    }
}

/// Insert an empty array under `key` unless an array is already there.
pub fn ensure_array(plain: &mut Plain, key: &str) {
    if !plain.get(key).map(Value::is_array).unwrap_or(false) {
        plain.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

/// Move `from` to `to` unless `to` is already populated.
pub fn rename_field(plain: &mut Plain, from: &str, to: &str) {
    if let Some(value) = plain.remove(from) {
        plain.entry(to.to_string()).or_insert(value);
    }
}

pub fn has_field(plain: &Plain, key: &str) -> bool {
    plain.get(key).map(|v| !v.is_null()).unwrap_or(false)
}
