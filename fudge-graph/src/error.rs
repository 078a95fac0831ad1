use std::fmt::{self, Display};

#[derive(Debug)]
pub enum GraphError {
    Encode(fudge_wire::EncodeError),
    Decode(fudge_wire::DecodeError),
    /// encode-time: no surrogate registered for this runtime type
    UnregisteredObjectType(String),
    /// decode-time: neither a type-delta nor any type name in the chain had a registered surrogate
    UnknownType(String),
    /// an object appeared twice on the inline stack
    InlineCycle,
    /// readback was attempted on the write-only streaming facade
    InvalidFacadeOperation(&'static str),
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Encode(e) => Some(e),
            GraphError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Encode(_) => f.write_str("error while encoding the wire representation"),
            GraphError::Decode(_) => f.write_str("error while decoding the wire representation"),
            GraphError::UnregisteredObjectType(name) => write!(f, "no surrogate registered for type {}", name),
            GraphError::UnknownType(name) => write!(f, "no surrogate registered for decoded type {}", name),
            GraphError::InlineCycle => f.write_str("object appears twice on the inline stack"),
            GraphError::InvalidFacadeOperation(reason) => write!(f, "invalid facade operation: {}", reason),
        }
    }
}

impl From<fudge_wire::EncodeError> for GraphError {
    fn from(e: fudge_wire::EncodeError) -> GraphError {
        GraphError::Encode(e)
    }
}

impl From<fudge_wire::DecodeError> for GraphError {
    fn from(e: fudge_wire::DecodeError) -> GraphError {
        GraphError::Decode(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_non_empty() {
        assert!(!GraphError::InlineCycle.to_string().is_empty());
        assert!(!GraphError::UnregisteredObjectType("Cat".into()).to_string().is_empty());
    }
}
