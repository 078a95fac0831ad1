//! The serialization context: the encode queue, identity map, inline stack and last-type map
//! that together drive a single `serialize_graph` invocation.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::rc::Rc;

use fudge_wire::taxonomy::NoResolver;
use fudge_wire::{Field, Message, Value};

use crate::error::GraphError;
use crate::facade::StreamingMessageFacade;
use crate::identity::{identity, Identity};
use crate::type_map::SerializationTypeMap;
use crate::TYPE_ID_FIELD;

pub struct SerializationContext<'a> {
    types: &'a SerializationTypeMap,
    id_map: HashMap<Identity, usize>,
    inline_stack: Vec<Identity>,
    last_type: HashMap<std::any::TypeId, usize>,
    queue: VecDeque<Rc<dyn Any>>,
    queued: HashSet<Identity>,
    next_id: usize,
}

impl<'a> SerializationContext<'a> {
    fn new(types: &'a SerializationTypeMap) -> Self {
        SerializationContext {
            types,
            id_map: HashMap::new(),
            inline_stack: Vec::new(),
            last_type: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            next_id: 0,
        }
    }

    /// Reference-eligible: back-reference if already emitted, otherwise a fresh inline message.
    pub(crate) fn resolve_or_inline(&mut self, obj: Rc<dyn Any>, containing_index: usize) -> Result<Value, GraphError> {
        let ident = identity(&obj);
        if let Some(&target_id) = self.id_map.get(&ident) {
            Ok(Value::I32(relative(target_id, containing_index)))
        } else {
            let msg = self.start_object(obj, None)?;
            Ok(Value::Message(msg))
        }
    }

    /// WriteInline: always a fresh message, overwriting any prior identity-map entry with the
    /// closer index.
    pub(crate) fn force_inline(&mut self, obj: Rc<dyn Any>) -> Result<Message, GraphError> {
        let ident = identity(&obj);
        let id = self.allocate_id();
        self.id_map.insert(ident, id);
        self.start_object(obj, Some(id))
    }

    /// Defer `obj` to a top-level sibling message once the queue drains. A no-op if it is
    /// already queued.
    pub(crate) fn enqueue(&mut self, obj: Rc<dyn Any>) {
        let ident = identity(&obj);
        if self.queued.insert(ident) {
            self.queue.push_back(obj);
        }
    }

    fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Starts a brand-new sub-message for `obj`: registers it on the inline stack (detecting
    /// cycles), writes type information, and invokes its surrogate on a fresh facade.
    /// `reuse_id`, when given, is an id already registered in `id_map` by the caller;
    /// otherwise one is allocated here.
    fn start_object(&mut self, obj: Rc<dyn Any>, reuse_id: Option<usize>) -> Result<Message, GraphError> {
        let ident = identity(&obj);
        if self.inline_stack.contains(&ident) {
            return Err(GraphError::InlineCycle);
        }

        let id = match reuse_id {
            Some(id) => id,
            None => {
                let id = self.allocate_id();
                self.id_map.insert(ident, id);
                id
            }
        };

        let type_id = obj.type_id();
        let surrogate = self.types.get_surrogate(type_id).ok_or_else(|| {
            GraphError::UnregisteredObjectType(self.types.get_name(type_id).unwrap_or("<unregistered>").to_string())
        })?;

        let mut message = Message::new();
        match self.last_type.get(&type_id) {
            Some(&last_seen) if last_seen < id => {
                message.push(Field::ordinal(TYPE_ID_FIELD, Value::I32(relative(last_seen, id))));
            }
            _ => {
                let name = self
                    .types
                    .get_name(type_id)
                    .ok_or_else(|| GraphError::UnregisteredObjectType("<unnamed>".to_string()))?;
                message.push(Field::ordinal(TYPE_ID_FIELD, Value::Str(name.to_owned())));
            }
        }
        self.last_type.insert(type_id, id);

        self.inline_stack.push(ident);
        let mut facade = StreamingMessageFacade::new(self, id);
        surrogate.encode(obj.as_ref(), &mut facade)?;
        let fields = facade.into_message();
        for field in fields {
            message.push(field);
        }
        self.inline_stack.pop();

        Ok(message)
    }

    fn drain_queue(&mut self) -> Result<Vec<Message>, GraphError> {
        let mut siblings = Vec::new();
        while let Some(obj) = self.queue.pop_front() {
            let ident = identity(&obj);
            if self.id_map.contains_key(&ident) {
                continue; // already resolved by an earlier reference or a duplicate enqueue
            }
            siblings.push(self.start_object(obj, None)?);
        }
        Ok(siblings)
    }
}

/// `target - containing`: non-positive when `target` was already emitted earlier in wire order.
fn relative(target_id: usize, containing_index: usize) -> i32 {
    target_id as i64 as i32 - containing_index as i64 as i32
}

/// Serializes the object graph rooted at `root` to `sink` as a single envelope: the root
/// message followed by any queue-drained sibling messages, in FIFO order.
pub fn serialize_graph<W: Write>(root: Rc<dyn Any>, types: &SerializationTypeMap, sink: &mut W) -> Result<(), GraphError> {
    let mut ctx = SerializationContext::new(types);
    let root_ident = identity(&root);
    ctx.id_map.insert(root_ident, 0);
    ctx.next_id = 1;
    let root_msg = ctx.start_object(root, Some(0))?;

    let siblings = ctx.drain_queue()?;

    let mut top = Message::new();
    top.push(Field::new(Value::Message(root_msg)));
    for sibling in siblings {
        top.push(Field::new(Value::Message(sibling)));
    }

    fudge_wire::envelope::write_envelope(&top, 0, 1, &NoResolver, sink)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::de::{deserialize_graph, DeserializationContext};
    use crate::type_map::Surrogate;
    use fudge_wire::Message as WireMessage;

    struct Leaf {
        value: i32,
    }

    struct LeafSurrogate;
    impl Surrogate for LeafSurrogate {
        fn encode(&self, obj: &dyn Any, facade: &mut StreamingMessageFacade) -> Result<(), GraphError> {
            let leaf = obj.downcast_ref::<Leaf>().unwrap();
            facade.add_primitive(Some("value"), None, Value::I32(leaf.value));
            Ok(())
        }
        fn decode(&self, msg: &WireMessage, _ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, GraphError> {
            let value = msg.by_name("value").and_then(|f| f.value.as_i64()).unwrap_or(0) as i32;
            Ok(Rc::new(Leaf { value }))
        }
    }

    #[test]
    fn single_object_roundtrips() {
        let mut types = SerializationTypeMap::new();
        types.register::<Leaf>("Leaf", LeafSurrogate);

        let root: Rc<dyn Any> = Rc::new(Leaf { value: 7 });
        let mut buf = Vec::new();
        serialize_graph(root, &types, &mut buf).unwrap();

        let decoded = deserialize_graph(&mut &buf[..], &types).unwrap();
        let leaf = decoded.downcast_ref::<Leaf>().unwrap();
        assert_eq!(leaf.value, 7);
    }

    struct Pair {
        a: Rc<Leaf>,
        b: Rc<Leaf>,
    }

    struct PairSurrogate;
    impl Surrogate for PairSurrogate {
        fn encode(&self, obj: &dyn Any, facade: &mut StreamingMessageFacade) -> Result<(), GraphError> {
            let pair = obj.downcast_ref::<Pair>().unwrap();
            facade.add_object(Some("a"), None, pair.a.clone())?;
            facade.add_object(Some("b"), None, pair.b.clone())?;
            Ok(())
        }
        fn decode(&self, msg: &WireMessage, ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, GraphError> {
            let a = ctx.decode_child::<Leaf>(msg.by_name("a").unwrap())?;
            let b = ctx.decode_child::<Leaf>(msg.by_name("b").unwrap())?;
            Ok(Rc::new(Pair { a, b }))
        }
    }

    #[test]
    fn shared_child_becomes_a_back_reference() {
        let mut types = SerializationTypeMap::new();
        types.register::<Leaf>("Leaf", LeafSurrogate);
        types.register::<Pair>("Pair", PairSurrogate);

        let shared = Rc::new(Leaf { value: 42 });
        let root: Rc<dyn Any> = Rc::new(Pair { a: shared.clone(), b: shared.clone() });

        let mut buf = Vec::new();
        serialize_graph(root, &types, &mut buf).unwrap();

        let decoded = deserialize_graph(&mut &buf[..], &types).unwrap();
        let pair = decoded.downcast_ref::<Pair>().unwrap();
        assert_eq!(pair.a.value, 42);
        assert_eq!(pair.b.value, 42);
    }
}
