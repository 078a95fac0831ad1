//! The deserialization context: a growing, index-keyed vector of reconstructed objects that
//! mirrors the serialization context's identity map one direction.

use std::any::Any;
use std::io::Read;
use std::rc::Rc;

use fudge_wire::taxonomy::NoResolver;
use fudge_wire::{Field, Message, Value};

use crate::error::GraphError;
use crate::type_map::SerializationTypeMap;
use crate::TYPE_ID_FIELD;

pub struct DeserializationContext<'a> {
    types: &'a SerializationTypeMap,
    objects: Vec<Rc<dyn Any>>,
    current_index: usize,
}

impl<'a> DeserializationContext<'a> {
    fn new(types: &'a SerializationTypeMap) -> Self {
        DeserializationContext { types, objects: Vec::new(), current_index: 0 }
    }

    /// Decode an object field: a nested sub-message starts a brand-new object, an integer is a
    /// relative reference to one already reconstructed.
    pub fn decode_child<T: Any>(&mut self, field: &Field) -> Result<Rc<T>, GraphError> {
        let obj = self.decode_object_value(&field.value)?;
        obj.downcast::<T>().map_err(|_| GraphError::UnknownType("decoded object type did not match the requested type".to_string()))
    }

    fn decode_object_value(&mut self, value: &Value) -> Result<Rc<dyn Any>, GraphError> {
        match value {
            Value::Message(sub) => self.decode_new_object(sub),
            other => {
                let delta = other
                    .as_i64()
                    .ok_or_else(|| GraphError::UnknownType(format!("object field held an unexpected value {:?}", other)))?;
                let target = (self.current_index as i64 + delta) as usize;
                self.objects
                    .get(target)
                    .cloned()
                    .ok_or_else(|| GraphError::UnknownType(format!("reference target {} is out of range", target)))
            }
        }
    }

    fn decode_new_object(&mut self, msg: &Message) -> Result<Rc<dyn Any>, GraphError> {
        let id = self.objects.len();
        self.objects.push(Rc::new(()) as Rc<dyn Any>);

        let type_field = msg
            .by_ordinal(TYPE_ID_FIELD)
            .ok_or_else(|| GraphError::UnknownType("sub-message carried no type marker field".to_string()))?;

        let type_id = match &type_field.value {
            Value::Str(name) => self.types.get_type(name).ok_or_else(|| GraphError::UnknownType(name.clone()))?,
            other => {
                let delta = other
                    .as_i64()
                    .ok_or_else(|| GraphError::UnknownType(format!("type marker held an unexpected value {:?}", other)))?;
                let target = (id as i64 + delta) as usize;
                let target_obj = self
                    .objects
                    .get(target)
                    .ok_or_else(|| GraphError::UnknownType(format!("type-delta target {} is out of range", target)))?;
                target_obj.type_id()
            }
        };

        let surrogate = self.types.get_surrogate(type_id).ok_or_else(|| {
            GraphError::UnknownType(self.types.get_name(type_id).unwrap_or("<unregistered>").to_string())
        })?;

        let previous_index = self.current_index;
        self.current_index = id;
        let obj = surrogate.decode(msg, self)?;
        self.current_index = previous_index;

        self.objects[id] = obj.clone();
        Ok(obj)
    }
}

/// Decodes an envelope produced by `serialize_graph` and reconstructs the root object.
pub fn deserialize_graph<R: Read>(source: &mut R, types: &SerializationTypeMap) -> Result<Rc<dyn Any>, GraphError> {
    let dict = fudge_wire::TypeDictionary::standard();
    let envelope = fudge_wire::envelope::read_envelope(source, &dict, &NoResolver)?;

    let mut ctx = DeserializationContext::new(types);
    let mut root = None;
    for field in envelope.message.iter() {
        if let Value::Message(sub) = &field.value {
            let obj = ctx.decode_new_object(sub)?;
            if root.is_none() {
                root = Some(obj);
            }
        }
    }
    root.ok_or_else(|| GraphError::UnknownType("envelope contained no top-level object message".to_string()))
}
