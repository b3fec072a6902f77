//! Keyspace schema metadata.
//!
//! The live UDT definitions, as reported by the database, in JSON form:
//!
//! ```json
//! {
//!   "keyspace": "shop",
//!   "types": [
//!     { "name": "address", "fields": [
//!         { "name": "street", "type": "text" },
//!         { "name": "zip", "type": "int" } ] },
//!     { "name": "customer", "fields": [
//!         { "name": "home", "type": "frozen<address>" } ] }
//!   ]
//! }
//! ```
//!
//! A type may only reference types listed before it.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CqlError, CqlResult};
use crate::types::{FieldDescriptor, UdtType, WireType};

#[derive(Debug, Deserialize)]
struct RawSchema {
    keyspace: String,
    #[serde(default)]
    types: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    name: String,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type", alias = "typ")]
    typ: String,
}

/// UDT definitions of one keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceSchema {
    keyspace: String,
    types: Vec<UdtType>,
}

impl KeyspaceSchema {
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            types: Vec::new(),
        }
    }

    pub fn from_json(content: &str) -> CqlResult<Self> {
        let raw: RawSchema = serde_json::from_str(content)
            .map_err(|e| CqlError::Config(format!("invalid schema JSON: {}", e)))?;

        let mut schema = Self::new(raw.keyspace);
        for ty in raw.types {
            let mut fields = Vec::with_capacity(ty.fields.len());
            for field in ty.fields {
                let wire_type = schema.parse_type(&field.typ)?;
                fields.push(FieldDescriptor::new(field.name, wire_type));
            }
            schema.add_type(UdtType::new(ty.name, fields));
        }
        Ok(schema)
    }

    pub fn load(path: impl AsRef<Path>) -> CqlResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Add or replace a type definition.
    pub fn add_type(&mut self, udt: UdtType) {
        let udt = udt.in_keyspace(self.keyspace.clone());
        match self.types.iter_mut().find(|t| t.name == udt.name) {
            Some(existing) => *existing = udt,
            None => self.types.push(udt),
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn types(&self) -> &[UdtType] {
        &self.types
    }

    /// Look up a type by bare or keyspace-qualified name.
    pub fn udt(&self, name: &str) -> Option<&UdtType> {
        let name = match name.split_once('.') {
            Some((keyspace, bare)) if keyspace == self.keyspace => bare,
            Some(_) => return None,
            None => name,
        };
        self.types.iter().find(|t| t.name == name)
    }

    /// Parse a CQL type string, resolving UDT names against this keyspace.
    pub fn parse_type(&self, text: &str) -> CqlResult<WireType> {
        WireType::parse(text, &|name| self.udt(name).cloned())
    }
}
