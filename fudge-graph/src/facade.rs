//! The write-only streaming facade a surrogate populates. Every mutating call translates
//! directly into a field pushed onto the sub-message being written; readback is unsupported.

use std::any::Any;
use std::rc::Rc;

use fudge_wire::{Field, Message, Value};

use crate::error::GraphError;
use crate::ser::SerializationContext;

pub struct StreamingMessageFacade<'a, 'b> {
    pub(crate) ctx: &'a mut SerializationContext<'b>,
    pub(crate) message: Message,
    pub(crate) own_index: usize,
}

impl<'a, 'b> StreamingMessageFacade<'a, 'b> {
    pub(crate) fn new(ctx: &'a mut SerializationContext<'b>, own_index: usize) -> Self {
        StreamingMessageFacade { ctx, message: Message::new(), own_index }
    }

    pub(crate) fn into_message(self) -> Message {
        self.message
    }

    /// Write a scalar value through unchanged.
    pub fn add_primitive(&mut self, name: Option<&str>, ordinal: Option<i16>, value: Value) {
        self.push_field(name, ordinal, value);
    }

    /// Reference-eligible: if `obj` was already emitted during this encode, writes a compact
    /// relative back-reference instead of serializing it again; otherwise inlines it here.
    pub fn add_object<T: Any>(&mut self, name: Option<&str>, ordinal: Option<i16>, obj: Rc<T>) -> Result<(), GraphError> {
        let obj: Rc<dyn Any> = obj;
        let value = self.ctx.resolve_or_inline(obj, self.own_index)?;
        self.push_field(name, ordinal, value);
        Ok(())
    }

    /// Always emits a fresh nested sub-message, even if `obj` was already emitted elsewhere;
    /// the identity map is overwritten with this closer index. Inline cycles fail hard.
    pub fn add_inline<T: Any>(&mut self, name: Option<&str>, ordinal: Option<i16>, obj: Rc<T>) -> Result<(), GraphError> {
        let obj: Rc<dyn Any> = obj;
        let msg = self.ctx.force_inline(obj)?;
        self.push_field(name, ordinal, Value::Message(msg));
        Ok(())
    }

    /// Defer `obj` to an out-of-line top-level sibling message once the encode queue drains.
    /// If something else references it first, that reference inlines it instead and the
    /// eventual drain becomes a no-op for this object.
    pub fn enqueue<T: Any>(&mut self, obj: Rc<T>) {
        let obj: Rc<dyn Any> = obj;
        self.ctx.enqueue(obj);
    }

    fn push_field(&mut self, name: Option<&str>, ordinal: Option<i16>, value: Value) {
        let mut field = Field::new(value);
        if let Some(n) = name {
            field = field.with_name(n);
        }
        if let Some(o) = ordinal {
            field = field.with_ordinal(o);
        }
        self.message.push(field);
    }

    /// The facade is write-only; any readback operation fails hard.
    pub fn get(&self, _name: &str) -> Result<&Value, GraphError> {
        Err(GraphError::InvalidFacadeOperation("readback is not supported by the streaming facade"))
    }
}
