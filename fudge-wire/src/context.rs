//! [`Context`] bundles a type dictionary and a taxonomy resolver; it is the entry point an
//! application holds onto and calls `serialize`/`deserialize` against.

use std::io::{Read, Write};

use crate::envelope::{self, Envelope};
use crate::error::{DecodeError, EncodeError};
use crate::field::Message;
use crate::taxonomy::{NoResolver, TaxonomyResolver};
use crate::types::TypeDictionary;

pub struct Context {
    pub type_dictionary: TypeDictionary,
    pub resolver: Box<dyn TaxonomyResolver>,
}

impl Context {
    /// The default context: the standard type dictionary, no taxonomy resolver bound.
    pub fn new() -> Self {
        Context { type_dictionary: TypeDictionary::standard(), resolver: Box::new(NoResolver) }
    }

    pub fn with_resolver(resolver: impl TaxonomyResolver + 'static) -> Self {
        Context { type_dictionary: TypeDictionary::standard(), resolver: Box::new(resolver) }
    }

    pub fn serialize<W: Write>(&self, msg: &Message, taxonomy_id: i16, sink: &mut W) -> Result<(), EncodeError> {
        envelope::write_envelope(msg, taxonomy_id, 1, self.resolver.as_ref(), sink)
    }

    pub fn deserialize<R: Read>(&self, source: &mut R) -> Result<Envelope, DecodeError> {
        envelope::read_envelope(source, &self.type_dictionary, self.resolver.as_ref())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
