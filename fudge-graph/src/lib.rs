//! An object-graph serializer built on top of `fudge_wire`: register a [`Surrogate`] per runtime
//! type, then call [`serialize_graph`]/[`deserialize_graph`] to encode/decode an object graph as
//! a single envelope. Repeated objects become compact relative back-references; repeated types
//! compress to a one-field delta instead of a repeated name.

mod de;
mod error;
mod facade;
mod identity;
mod ser;
mod type_map;

pub use de::{deserialize_graph, DeserializationContext};
pub use error::GraphError;
pub use facade::StreamingMessageFacade;
pub use ser::{serialize_graph, SerializationContext};
pub use type_map::{SerializationTypeMap, Surrogate, TypeMappingStrategy};

/// Reserved ordinal carrying either a type name (first occurrence) or a type-delta (repeat
/// occurrence) for an object message. Surrogates must not write fields at this ordinal.
pub const TYPE_ID_FIELD: i16 = -1;
