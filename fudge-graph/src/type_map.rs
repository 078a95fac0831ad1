//! The serialization type map: registration of a surrogate and a stable wire type-name per
//! runtime type, plus the type-mapping strategy the taxonomy-free type-delta chain consults.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use fudge_wire::Message;

use crate::error::GraphError;
use crate::facade::StreamingMessageFacade;
use crate::ser::SerializationContext;
use crate::de::DeserializationContext;

/// A pair (encoder, decoder) attached to one runtime type.
pub trait Surrogate {
    fn encode(&self, obj: &dyn Any, facade: &mut StreamingMessageFacade) -> Result<(), GraphError>;
    fn decode(&self, msg: &Message, ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, GraphError>;
}

/// Converts a runtime type to a stable wire type-name and back. `SerializationTypeMap`
/// implements this itself; a caller only needs a separate implementation to share naming
/// across multiple type maps.
pub trait TypeMappingStrategy {
    fn get_name(&self, type_id: TypeId) -> Option<&str>;
    fn get_type(&self, name: &str) -> Option<TypeId>;
}

/// Registration is append-only; its order does not affect correctness.
#[derive(Default)]
pub struct SerializationTypeMap {
    surrogates: HashMap<TypeId, Box<dyn Surrogate>>,
    names: HashMap<TypeId, String>,
    by_name: HashMap<String, TypeId>,
}

impl SerializationTypeMap {
    pub fn new() -> Self {
        SerializationTypeMap { surrogates: HashMap::new(), names: HashMap::new(), by_name: HashMap::new() }
    }

    pub fn register<T: Any>(&mut self, name: impl Into<String>, surrogate: impl Surrogate + 'static) {
        let type_id = TypeId::of::<T>();
        let name = name.into();
        self.by_name.insert(name.clone(), type_id);
        self.names.insert(type_id, name);
        self.surrogates.insert(type_id, Box::new(surrogate));
    }

    pub fn get_surrogate(&self, type_id: TypeId) -> Option<&dyn Surrogate> {
        self.surrogates.get(&type_id).map(|b| b.as_ref())
    }

    pub fn get_surrogate_factory(&self, type_id: TypeId) -> Option<&dyn Surrogate> {
        self.get_surrogate(type_id)
    }
}

impl TypeMappingStrategy for SerializationTypeMap {
    fn get_name(&self, type_id: TypeId) -> Option<&str> {
        self.names.get(&type_id).map(|s| s.as_str())
    }

    fn get_type(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct NoopSurrogate;
    impl Surrogate for NoopSurrogate {
        fn encode(&self, _obj: &dyn Any, _facade: &mut StreamingMessageFacade) -> Result<(), GraphError> {
            Ok(())
        }
        fn decode(&self, _msg: &Message, _ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, GraphError> {
            Ok(Rc::new(()))
        }
    }

    #[test]
    fn registration_is_queryable_both_ways() {
        let mut map = SerializationTypeMap::new();
        map.register::<i32>("i32", NoopSurrogate);
        let id = TypeId::of::<i32>();
        assert_eq!(map.get_name(id), Some("i32"));
        assert_eq!(map.get_type("i32"), Some(id));
        assert!(map.get_surrogate(id).is_some());
    }

    #[test]
    fn unregistered_type_is_absent() {
        let map = SerializationTypeMap::new();
        assert!(map.get_name(TypeId::of::<i32>()).is_none());
        assert!(map.get_type("i32").is_none());
    }
}
