//! CQL column type descriptors.
//!
//! A [`WireType`] names the database type a codec serves. Its `Display` form is the
//! CQL DDL spelling (`frozen<map<text, list<int>>>`), which [`WireType::parse`]
//! reads back.

use std::fmt;

use crate::error::CqlResult;

/// A database column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    Ascii,
    Bigint,
    Blob,
    Boolean,
    Counter,
    Date,
    Decimal,
    Double,
    Float,
    Inet,
    Int,
    Smallint,
    Text,
    Time,
    Timestamp,
    Timeuuid,
    Tinyint,
    Uuid,
    Varint,
    List { element: Box<WireType>, frozen: bool },
    Set { element: Box<WireType>, frozen: bool },
    Map {
        key: Box<WireType>,
        value: Box<WireType>,
        frozen: bool,
    },
    Udt(UdtType),
}

impl WireType {
    pub fn list(element: WireType) -> Self {
        WireType::List {
            element: Box::new(element),
            frozen: false,
        }
    }

    pub fn set(element: WireType) -> Self {
        WireType::Set {
            element: Box::new(element),
            frozen: false,
        }
    }

    pub fn map(key: WireType, value: WireType) -> Self {
        WireType::Map {
            key: Box::new(key),
            value: Box::new(value),
            frozen: false,
        }
    }

    /// Same type with the `frozen` annotation applied.
    pub fn frozen(self) -> Self {
        self.with_frozen(true)
    }

    pub fn with_frozen(self, frozen: bool) -> Self {
        match self {
            WireType::List { element, .. } => WireType::List { element, frozen },
            WireType::Set { element, .. } => WireType::Set { element, frozen },
            WireType::Map { key, value, .. } => WireType::Map { key, value, frozen },
            WireType::Udt(udt) => WireType::Udt(UdtType { frozen, ..udt }),
            other => other,
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            WireType::List { frozen, .. }
            | WireType::Set { frozen, .. }
            | WireType::Map { frozen, .. } => *frozen,
            WireType::Udt(udt) => udt.frozen,
            _ => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            WireType::List { .. } | WireType::Set { .. } | WireType::Map { .. }
        )
    }

    /// Structural equality ignoring `frozen` and UDT keyspaces.
    pub fn is_compatible(&self, other: &WireType) -> bool {
        match (self, other) {
            (WireType::List { element: a, .. }, WireType::List { element: b, .. })
            | (WireType::Set { element: a, .. }, WireType::Set { element: b, .. }) => {
                a.is_compatible(b)
            }
            (
                WireType::Map { key: ka, value: va, .. },
                WireType::Map { key: kb, value: vb, .. },
            ) => ka.is_compatible(kb) && va.is_compatible(vb),
            (WireType::Udt(a), WireType::Udt(b)) => a.is_compatible(b),
            (a, b) => a == b,
        }
    }

    /// Parse a CQL type string. UDT names are looked up through `resolve_udt`.
    pub fn parse(
        input: &str,
        resolve_udt: &dyn Fn(&str) -> Option<UdtType>,
    ) -> CqlResult<WireType> {
        crate::parser::parse_wire_type(input, resolve_udt)
    }

    /// Parse a CQL type string that contains no UDT references.
    pub fn parse_builtin(input: &str) -> CqlResult<WireType> {
        Self::parse(input, &|_| None)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Ascii => "ascii",
            WireType::Bigint => "bigint",
            WireType::Blob => "blob",
            WireType::Boolean => "boolean",
            WireType::Counter => "counter",
            WireType::Date => "date",
            WireType::Decimal => "decimal",
            WireType::Double => "double",
            WireType::Float => "float",
            WireType::Inet => "inet",
            WireType::Int => "int",
            WireType::Smallint => "smallint",
            WireType::Text => "text",
            WireType::Time => "time",
            WireType::Timestamp => "timestamp",
            WireType::Timeuuid => "timeuuid",
            WireType::Tinyint => "tinyint",
            WireType::Uuid => "uuid",
            WireType::Varint => "varint",
            WireType::List { element, frozen } => {
                return write_frozen(f, *frozen, format_args!("list<{}>", element));
            }
            WireType::Set { element, frozen } => {
                return write_frozen(f, *frozen, format_args!("set<{}>", element));
            }
            WireType::Map { key, value, frozen } => {
                return write_frozen(f, *frozen, format_args!("map<{}, {}>", key, value));
            }
            WireType::Udt(udt) => {
                return write_frozen(f, udt.frozen, format_args!("{}", udt.qualified_name()));
            }
        };
        f.write_str(name)
    }
}

fn write_frozen(f: &mut fmt::Formatter<'_>, frozen: bool, inner: fmt::Arguments<'_>) -> fmt::Result {
    if frozen {
        write!(f, "frozen<{}>", inner)
    } else {
        write!(f, "{}", inner)
    }
}

/// One member of a user-defined type as reported by the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub wire_type: WireType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
        }
    }
}

/// A user-defined type with its authoritative, ordered field list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UdtType {
    pub keyspace: Option<String>,
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub frozen: bool,
}

impl UdtType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            keyspace: None,
            name: name.into(),
            fields,
            frozen: false,
        }
    }

    pub fn in_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        match &self.keyspace {
            Some(ks) => format!("{}.{}", ks, self.name),
            None => self.name.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<(usize, &FieldDescriptor)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn is_compatible(&self, other: &UdtType) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.wire_type.is_compatible(&b.wire_type))
    }

    /// Identity of this exact field layout, used to memoize codecs per schema version.
    pub fn version(&self) -> SchemaVersion {
        SchemaVersion {
            keyspace: self.keyspace.clone(),
            name: self.name.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// A UDT's keyspace, name and ordered fields. `frozen` is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    keyspace: Option<String>,
    name: String,
    fields: Vec<FieldDescriptor>,
}
