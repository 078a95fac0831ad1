use std::any::Any;
use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result};
use fudge_graph::{deserialize_graph, serialize_graph, DeserializationContext, SerializationTypeMap, StreamingMessageFacade, Surrogate};
use fudge_wire::{Message, Value};

#[derive(PartialEq, Debug, Clone, Copy)]
enum Species {
    PrionailurusViverrinus,
    LynxLynx,
    FelisCatus,
}

impl Species {
    fn from_i8(n: i8) -> Option<Self> {
        match n {
            0 => Some(Species::PrionailurusViverrinus),
            1 => Some(Species::LynxLynx),
            2 => Some(Species::FelisCatus),
            _ => None,
        }
    }
}

#[derive(PartialEq, Debug)]
struct Cat {
    name: String,
    species: Species,
}

struct CatSurrogate;
impl Surrogate for CatSurrogate {
    fn encode(&self, obj: &dyn Any, facade: &mut StreamingMessageFacade) -> Result<(), fudge_graph::GraphError> {
        let cat = obj.downcast_ref::<Cat>().unwrap();
        facade.add_primitive(Some("name"), None, Value::Str(cat.name.clone()));
        facade.add_primitive(Some("species"), None, Value::I8(cat.species as i8));
        Ok(())
    }

    fn decode(&self, msg: &Message, _ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, fudge_graph::GraphError> {
        let name = msg.by_name("name").and_then(|f| f.value.as_str()).unwrap_or_default().to_string();
        let species = msg
            .by_name("species")
            .and_then(|f| f.value.as_i64())
            .and_then(|n| Species::from_i8(n as i8))
            .unwrap_or(Species::FelisCatus);
        Ok(Rc::new(Cat { name, species }))
    }
}

/// Holds a colony of cats, some of which may be shared with other colonies — demonstrating
/// the object-graph engine's back-reference compression.
struct Colony {
    cats: Vec<Rc<Cat>>,
}

struct ColonySurrogate;
impl Surrogate for ColonySurrogate {
    fn encode(&self, obj: &dyn Any, facade: &mut StreamingMessageFacade) -> Result<(), fudge_graph::GraphError> {
        let colony = obj.downcast_ref::<Colony>().unwrap();
        for cat in &colony.cats {
            facade.add_object(Some("cat"), None, cat.clone())?;
        }
        Ok(())
    }

    fn decode(&self, msg: &Message, ctx: &mut DeserializationContext) -> Result<Rc<dyn Any>, fudge_graph::GraphError> {
        let cats = msg.by_name_all("cat").map(|f| ctx.decode_child::<Cat>(f)).collect::<Result<Vec<_>, _>>()?;
        Ok(Rc::new(Colony { cats }))
    }
}

fn main() -> Result<()> {
    let mut types = SerializationTypeMap::new();
    types.register::<Cat>("Cat", CatSurrogate);
    types.register::<Colony>("Colony", ColonySurrogate);

    let founder = Rc::new(Cat { name: "Jessica".to_string(), species: Species::PrionailurusViverrinus });
    let colony = Rc::new(Colony {
        cats: vec![
            founder.clone(),
            Rc::new(Cat { name: "Wantan".to_string(), species: Species::LynxLynx }),
            Rc::new(Cat { name: "Sphinx".to_string(), species: Species::FelisCatus }),
            founder.clone(),
        ],
    });

    let root: Rc<dyn Any> = colony;
    let mut bytes = Vec::new();
    serialize_graph(root, &types, &mut bytes).context("failed to serialize the colony")?;
    std::io::stdout().write_all(&bytes).context("failed to write bytes")?;

    let decoded = deserialize_graph(&mut &bytes[..], &types).context("failed to deserialize the colony")?;
    let colony = decoded.downcast_ref::<Colony>().expect("root is a Colony");
    assert!(Rc::ptr_eq(&colony.cats[0], &colony.cats[3]), "the founder back-reference should resolve to the same instance");
    eprintln!("round-tripped {} cats ({} bytes on the wire)", colony.cats.len(), bytes.len());

    Ok(())
}
