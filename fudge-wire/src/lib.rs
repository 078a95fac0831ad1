//! A self-describing, tagged binary message format: a message is a tree of named/ordinal-keyed
//! fields whose leaves are typed scalars or recursive sub-messages, framed by a small envelope
//! header.
//!
//! ```text
//! Envelope (big-endian):
//!   +0  u8   processing-directives (0)
//!   +1  u8   schema version
//!   +2  i16  taxonomy-id (0 = none)
//!   +4  i32  total envelope size in bytes (includes this header)
//!   +8  ...  fields until byte `size`
//!
//! Field:
//!   u8   prefix
//!   u8   type-id
//!   i16  ordinal        if prefix.has-ordinal
//!   u8   name-length    if prefix.has-name
//!   ...  name           modified-UTF-8, name-length bytes
//!   ...  size           if !prefix.fixed-width: 0/1/2/4 bytes, big-endian unsigned
//!   ...  value          fixed-width per type descriptor, or `size` bytes
//!
//! Prefix byte:
//!   bit 7    fixed-width (1) vs variable-width (0)
//!   bits 6-5 variable-size-width code: 0,1,2,3 -> 0,1,2,4 bytes (zero for fixed-width fields)
//!   bit 4    has-ordinal
//!   bit 3    has-name
//!   bits 2-0 reserved, zero
//! ```

pub mod context;
pub mod envelope;
pub mod error;
pub mod field;
pub mod mutf8;
pub mod prefix;
pub mod taxonomy;
pub mod types;

pub use context::Context;
pub use envelope::Envelope;
pub use error::{DecodeError, EncodeError};
pub use field::{Field, Message};
pub use taxonomy::{MapResolver, NoResolver, Taxonomy, TaxonomyResolver};
pub use types::{TypeDictionary, Value};
