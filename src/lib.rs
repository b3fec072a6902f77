//! # QAIL CQL: typed codecs and resumable paging for CQL
//!
//! Maps Rust values to the CQL binary wire format and literal syntax, and turns
//! a driver's paging state into a signed, portable token.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qail_cql::prelude::*;
//!
//! #[derive(Debug, PartialEq, CqlUdt)]
//! struct Address {
//!     street: String,
//!     zip: i32,
//! }
//!
//! // Build against the live schema; field order may differ from the struct.
//! let schema = KeyspaceSchema::load("shop.schema.json")?;
//! let codec = UdtCodec::<Address>::new(schema.udt("address").unwrap().clone())?;
//! let bytes = codec.encode(&Address { street: "Main".into(), zip: 42 })?;
//!
//! // Page through a query and hand the caller a resume token.
//! let fingerprint = QueryFingerprint::new("SELECT * FROM orders WHERE customer = ?")
//!     .bind(&IntCodec, &7)?;
//! let mut pager = Pager::new(fingerprint);
//! pager.record_page(next_state)?;
//! let token = pager.export(&SafeSerializer::new())?;
//! ```
//!
//! ## Codecs
//!
//! | Kind        | Codec                                  | Wire form                      |
//! |-------------|----------------------------------------|--------------------------------|
//! | Scalar      | `IntCodec`, `TextCodec`, ...           | CQL native encoding            |
//! | Nullable    | `OptionCodec<C>`                       | length `-1` for NULL           |
//! | Mapped      | `MappingCodec<C, O>`                   | inner codec's                  |
//! | Collection  | `ListCodec`, `SetCodec`, `MapCodec`    | count + length-prefixed items  |
//! | Enum        | `NominalCodec<E>`, `OrdinalCodec<E>`   | `text` name / `int` index      |
//! | UDT         | `UdtCodec<T>`                          | length-prefixed schema fields  |

extern crate self as qail_cql;

pub mod codec;
pub mod config;
pub mod error;
pub mod paging;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod types;

pub use qail_cql_macros::{CqlEnum, CqlUdt};

pub mod prelude {
    pub use crate::codec::*;
    pub use crate::config::{CqlConfig, SerializerKind};
    pub use crate::error::*;
    pub use crate::paging::{
        Pager, PageState, PagingState, PagingStateSerializer, QueryFingerprint, SafeSerializer,
        SimpleSerializer,
    };
    pub use crate::registry::{CodecRegistry, ErasedCodec};
    pub use crate::schema::KeyspaceSchema;
    pub use crate::types::{FieldDescriptor, UdtType, WireType};
    pub use crate::{CqlEnum, CqlUdt};
}
