//! Envelope framing and the field-by-field encoder/decoder that recurses into sub-messages.
//! See the wire layout documented in `lib.rs`.

use std::io::{Read, Write};

use crate::error::{DecodeError, EncodeError};
use crate::field::{Field, Message};
use crate::prefix::Prefix;
use crate::taxonomy::TaxonomyResolver;
use crate::types::{TypeDictionary, Value, PRIMITIVE_TYPE_IDS};

const HEADER_LEN: u32 = 8;

/// A decoded top-level envelope: the schema version carried alongside the message it framed.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: u8,
    pub taxonomy_id: i16,
    pub message: Message,
}

/// Write `msg` as a fully framed envelope to `sink`. If `resolver` resolves `taxonomy_id` to a
/// taxonomy, fields are rewritten in a clone of `msg` before emission: a present name gains its
/// ordinal, and a field carrying both name and ordinal has its name dropped when the taxonomy
/// agrees with it.
pub fn write_envelope<W: Write>(
    msg: &Message,
    taxonomy_id: i16,
    version: u8,
    resolver: &dyn TaxonomyResolver,
    sink: &mut W,
) -> Result<(), EncodeError> {
    let rewritten;
    let msg = if let Some(taxonomy) = resolver.resolve(taxonomy_id) {
        rewritten = rewrite_for_encode(msg, taxonomy);
        &rewritten
    } else {
        msg
    };

    let mut body = Vec::new();
    encode_fields(msg, &mut body)?;

    let total_size = HEADER_LEN as u64 + body.len() as u64;
    if total_size > u32::MAX as u64 {
        return Err(EncodeError::Length(total_size));
    }

    sink.write_all(&[0u8])?; // processing-directives
    sink.write_all(&[version])?;
    sink.write_all(&taxonomy_id.to_be_bytes())?;
    sink.write_all(&(total_size as u32).to_be_bytes())?;
    sink.write_all(&body)?;
    Ok(())
}

/// Read a fully framed envelope from `source`. If `resolver` resolves the envelope's
/// taxonomy-id, the decoded message tree is walked and missing names/ordinals are filled in
/// (an existing name or ordinal is never overwritten).
pub fn read_envelope<R: Read>(
    source: &mut R,
    dict: &TypeDictionary,
    resolver: &dyn TaxonomyResolver,
) -> Result<Envelope, DecodeError> {
    let mut header = [0u8; HEADER_LEN as usize];
    source.read_exact(&mut header)?;
    let version = header[1];
    let taxonomy_id = i16::from_be_bytes([header[2], header[3]]);
    let total_size = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    if total_size < HEADER_LEN {
        return Err(DecodeError::MalformedEnvelope { expected: total_size, actual: HEADER_LEN });
    }
    let body_size = (total_size - HEADER_LEN) as usize;
    let mut body = vec![0u8; body_size];
    source.read_exact(&mut body).map_err(|_| DecodeError::TruncatedInput {
        expected: body_size,
        available: 0,
    })?;

    let mut message = decode_fields(&mut &body[..], dict, body_size)?;

    if let Some(taxonomy) = resolver.resolve(taxonomy_id) {
        rewrite_for_decode(&mut message, taxonomy);
    }

    Ok(Envelope { version, taxonomy_id, message })
}

/// Encode every field of `msg` in order, with no envelope framing. Used both for the top-level
/// body and recursively for sub-message values.
pub fn encode_fields<W: Write>(msg: &Message, sink: &mut W) -> Result<(), EncodeError> {
    for field in msg.iter() {
        encode_field(field, sink)?;
    }
    Ok(())
}

fn encode_field<W: Write>(field: &Field, sink: &mut W) -> Result<(), EncodeError> {
    let type_id = field.value.type_id();
    let fixed_width = PRIMITIVE_TYPE_IDS.contains(&type_id);

    let mut value_bytes = Vec::new();
    write_value(&field.value, &mut value_bytes)?;

    let varsize_bytes = if fixed_width { 0 } else { Prefix::varsize_width(value_bytes.len() as u32) };

    let prefix = Prefix {
        fixed_width,
        varsize_bytes,
        has_ordinal: field.ordinal.is_some(),
        has_name: field.name.is_some(),
    };

    sink.write_all(&[prefix.encode()])?;
    sink.write_all(&[type_id])?;

    if let Some(ordinal) = field.ordinal {
        sink.write_all(&ordinal.to_be_bytes())?;
    }

    if let Some(name) = &field.name {
        let mut encoded = Vec::with_capacity(name.len());
        crate::mutf8::encode(name, &mut encoded);
        if encoded.len() > 255 {
            return Err(EncodeError::NameTooLong(encoded.len()));
        }
        sink.write_all(&[encoded.len() as u8])?;
        sink.write_all(&encoded)?;
    }

    if !fixed_width {
        match varsize_bytes {
            0 => {}
            1 => sink.write_all(&(value_bytes.len() as u8).to_be_bytes())?,
            2 => sink.write_all(&(value_bytes.len() as u16).to_be_bytes())?,
            4 => sink.write_all(&(value_bytes.len() as u32).to_be_bytes())?,
            other => unreachable!("invalid varsize width {}", other),
        }
    }

    sink.write_all(&value_bytes)?;
    Ok(())
}

fn write_value(value: &Value, sink: &mut dyn Write) -> Result<(), EncodeError> {
    match value {
        Value::Message(m) => encode_fields(m, sink),
        Value::Unknown(_, bytes) => {
            sink.write_all(bytes)?;
            Ok(())
        }
        other => other.write_primitive(sink),
    }
}

/// Decode fields from `source` until exactly `size` bytes have been consumed.
pub fn decode_fields<R: Read>(source: &mut R, dict: &TypeDictionary, size: usize) -> Result<Message, DecodeError> {
    let mut msg = Message::new();
    let mut consumed = 0usize;
    while consumed < size {
        let (field, field_len) = decode_field(source, dict)?;
        consumed += field_len;
        msg.push(field);
    }
    if consumed != size {
        return Err(DecodeError::MalformedEnvelope { expected: size as u32, actual: consumed as u32 });
    }
    Ok(msg)
}

fn decode_field<R: Read>(source: &mut R, dict: &TypeDictionary) -> Result<(Field, usize), DecodeError> {
    let mut prefix_byte = [0u8; 1];
    source.read_exact(&mut prefix_byte)?;
    let prefix = Prefix::decode(prefix_byte[0])?;
    let mut len = 1usize;

    let mut type_id_byte = [0u8; 1];
    source.read_exact(&mut type_id_byte)?;
    let type_id = type_id_byte[0];
    len += 1;

    let ordinal = if prefix.has_ordinal {
        let mut b = [0u8; 2];
        source.read_exact(&mut b)?;
        len += 2;
        Some(i16::from_be_bytes(b))
    } else {
        None
    };

    let name = if prefix.has_name {
        let mut name_len = [0u8; 1];
        source.read_exact(&mut name_len)?;
        len += 1;
        let mut buf = vec![0u8; name_len[0] as usize];
        source.read_exact(&mut buf)?;
        len += buf.len();
        Some(crate::mutf8::decode(&buf)?)
    } else {
        None
    };

    let descriptor = match dict.get_by_type_id(type_id) {
        Some(ty) => *ty,
        None => {
            if prefix.fixed_width {
                return Err(DecodeError::UnknownFixedType(type_id));
            }
            TypeDictionary::get_unknown_type(type_id)
        }
    };

    let size = if descriptor.is_fixed_width() {
        descriptor.fixed_size.unwrap()
    } else {
        let size = match prefix.varsize_bytes {
            0 => 0,
            1 => {
                let mut b = [0u8; 1];
                source.read_exact(&mut b)?;
                len += 1;
                b[0] as usize
            }
            2 => {
                let mut b = [0u8; 2];
                source.read_exact(&mut b)?;
                len += 2;
                u16::from_be_bytes(b) as usize
            }
            4 => {
                let mut b = [0u8; 4];
                source.read_exact(&mut b)?;
                len += 4;
                u32::from_be_bytes(b) as usize
            }
            other => return Err(DecodeError::BadVarsizeWidth(other)),
        };
        size
    };

    let mut value = (descriptor.read)(source, size, dict)?;
    if let Value::Unknown(ref mut tid, _) = value {
        *tid = type_id;
    }
    len += size;

    Ok((Field { name, ordinal, value }, len))
}

fn rewrite_for_encode(msg: &Message, taxonomy: &crate::taxonomy::Taxonomy) -> Message {
    msg.iter()
        .map(|field| {
            let mut field = field.clone();
            if let Value::Message(inner) = &field.value {
                field.value = Value::Message(rewrite_for_encode(inner, taxonomy));
            }
            if field.ordinal.is_none() {
                if let Some(name) = &field.name {
                    if let Some(ordinal) = taxonomy.ordinal_for(name) {
                        field.ordinal = Some(ordinal);
                    }
                }
            } else if field.name.is_some() {
                if let Some(name) = &field.name {
                    if taxonomy.ordinal_for(name) == field.ordinal {
                        field.name = None;
                    }
                }
            }
            field
        })
        .collect()
}

fn rewrite_for_decode(msg: &mut Message, taxonomy: &crate::taxonomy::Taxonomy) {
    for field in msg.iter_mut() {
        if let Value::Message(inner) = &mut field.value {
            rewrite_for_decode(inner, taxonomy);
        }
        if field.name.is_none() {
            if let Some(ordinal) = field.ordinal {
                if let Some(name) = taxonomy.name_for(ordinal) {
                    field.name = Some(name.to_owned());
                }
            }
        }
        if field.ordinal.is_none() {
            if let Some(name) = &field.name {
                if let Some(ordinal) = taxonomy.ordinal_for(name) {
                    field.ordinal = Some(ordinal);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::taxonomy::NoResolver;
    use crate::types::Value;

    fn roundtrip(msg: Message) -> Envelope {
        let dict = TypeDictionary::standard();
        let resolver = NoResolver;
        let mut buf = Vec::new();
        write_envelope(&msg, 0, 1, &resolver, &mut buf).unwrap();
        read_envelope(&mut &buf[..], &dict, &resolver).unwrap()
    }

    #[test]
    fn empty_message_roundtrips() {
        let env = roundtrip(Message::new());
        assert!(env.message.is_empty());
        assert_eq!(env.version, 1);
    }

    #[test]
    fn scalar_fields_roundtrip() {
        let mut msg = Message::new();
        msg.push(Field::named("active", Value::Bool(true)));
        msg.push(Field::ordinal(3, Value::I32(42)));
        msg.push(Field::new(Value::Str("hello".into())));
        let env = roundtrip(msg.clone());
        assert_eq!(env.message, msg);
    }

    #[test]
    fn nested_message_roundtrips() {
        let mut inner = Message::new();
        inner.push(Field::named("x", Value::I64(7)));
        let mut outer = Message::new();
        outer.push(Field::named("child", Value::Message(inner)));
        let env = roundtrip(outer.clone());
        assert_eq!(env.message, outer);
    }

    #[test]
    fn size_is_exact() {
        let mut msg = Message::new();
        msg.push(Field::new(Value::Str("size check".into())));
        let mut buf = Vec::new();
        write_envelope(&msg, 0, 1, &NoResolver, &mut buf).unwrap();
        let declared = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(declared as usize, buf.len());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut msg = Message::new();
        msg.push(Field::new(Value::Str("oops".into())));
        let mut buf = Vec::new();
        write_envelope(&msg, 0, 1, &NoResolver, &mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        let dict = TypeDictionary::standard();
        assert!(read_envelope(&mut &buf[..], &dict, &NoResolver).is_err());
    }
}
