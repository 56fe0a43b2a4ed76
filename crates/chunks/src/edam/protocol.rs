//! Thrift binary protocol codec
//!
//! Schema-agnostic: structs decode to `(field id, value)` pairs and field
//! names are attached afterwards (see [`super::record`]). Only the strict
//! message header is written; both strict and legacy headers are read.

/// Strict protocol version marker
const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;

/// Maximum struct/collection nesting accepted on read
pub const MAX_DEPTH: usize = 64;

/// Wire type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TType {
    Stop,
    Bool,
    Byte,
    Double,
    I16,
    I32,
    I64,
    String,
    Struct,
    Map,
    Set,
    List,
}

impl TType {
    fn from_code(code: u8) -> Result<Self, ProtocolError> {
        Ok(match code {
            0 => TType::Stop,
            2 => TType::Bool,
            3 => TType::Byte,
            4 => TType::Double,
            6 => TType::I16,
            8 => TType::I32,
            10 => TType::I64,
            11 => TType::String,
            12 => TType::Struct,
            13 => TType::Map,
            14 => TType::Set,
            15 => TType::List,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }

    fn code(self) -> u8 {
        match self {
            TType::Stop => 0,
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::I16 => 6,
            TType::I32 => 8,
            TType::I64 => 10,
            TType::String => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }
}

/// A decoded (or to-be-encoded) wire value
#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    /// Thrift `string` and `binary` share one encoding
    Binary(Vec<u8>),
    Struct(Vec<(i16, Wire)>),
    Map(TType, TType, Vec<(Wire, Wire)>),
    Set(TType, Vec<Wire>),
    List(TType, Vec<Wire>),
}

impl Wire {
    pub fn string(s: impl Into<String>) -> Self {
        Wire::Binary(s.into().into_bytes())
    }

    pub fn ttype(&self) -> TType {
        match self {
            Wire::Bool(_) => TType::Bool,
            Wire::Byte(_) => TType::Byte,
            Wire::I16(_) => TType::I16,
            Wire::I32(_) => TType::I32,
            Wire::I64(_) => TType::I64,
            Wire::Double(_) => TType::Double,
            Wire::Binary(_) => TType::String,
            Wire::Struct(_) => TType::Struct,
            Wire::Map(..) => TType::Map,
            Wire::Set(..) => TType::Set,
            Wire::List(..) => TType::List,
        }
    }

    /// Field of a struct by id
    pub fn field(&self, id: i16) -> Option<&Wire> {
        match self {
            Wire::Struct(fields) => fields.iter().find(|(fid, _)| *fid == id).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Wire::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Wire::Byte(n) => Some(i32::from(*n)),
            Wire::I16(n) => Some(i32::from(*n)),
            Wire::I32(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Wire::I64(n) => Some(*n),
            other => other.as_i32().map(i64::from),
        }
    }

    /// String content, lossily decoded as UTF-8
    pub fn as_string(&self) -> Option<String> {
        match self {
            Wire::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

/// Thrift message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
    Exception,
    Oneway,
}

impl MessageType {
    fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }

    fn code(self) -> u8 {
        match self {
            MessageType::Call => 1,
            MessageType::Reply => 2,
            MessageType::Exception => 3,
            MessageType::Oneway => 4,
        }
    }
}

/// Message envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageType,
    pub seq_id: i32,
}

/// Malformed input on the wire
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unexpected end of input at offset {0}")]
    Truncated(usize),
    #[error("Unknown type code {0}")]
    UnknownType(u8),
    #[error("Unknown message type {0}")]
    UnknownMessageType(u8),
    #[error("Bad protocol version {0:#010x}")]
    BadVersion(u32),
    #[error("Negative length {0}")]
    NegativeLength(i32),
    #[error("Nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("Unexpected {0:?} where a struct was expected")]
    NotAStruct(TType),
}

/// Encode a message: header followed by an argument struct
pub fn encode_message(header: &MessageHeader, args: &[(i16, Wire)]) -> Vec<u8> {
    let mut encoder = Encoder::default();
    encoder.write_u32(VERSION_1 | u32::from(header.kind.code()));
    encoder.write_binary(header.name.as_bytes());
    encoder.write_i32(header.seq_id);
    encoder.write_fields(args);
    encoder.buf
}

/// Decode a message: header followed by a struct body
pub fn decode_message(bytes: &[u8]) -> Result<(MessageHeader, Wire), ProtocolError> {
    let mut decoder = Decoder::new(bytes);
    let header = decoder.read_message_header()?;
    let body = decoder.read_struct(0)?;
    Ok((header, body))
}

/// Encode a single value (no envelope)
pub fn encode_value(value: &Wire) -> Vec<u8> {
    let mut encoder = Encoder::default();
    encoder.write_value(value);
    encoder.buf
}

/// Decode a single value of a known type (no envelope)
pub fn decode_value(bytes: &[u8], ttype: TType) -> Result<Wire, ProtocolError> {
    Decoder::new(bytes).read_value(ttype, 0)
}

#[derive(Default)]
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_len(&mut self, len: usize) {
        self.write_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    fn write_binary(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    fn write_fields(&mut self, fields: &[(i16, Wire)]) {
        for (id, value) in fields {
            self.write_u8(value.ttype().code());
            self.write_i16(*id);
            self.write_value(value);
        }
        self.write_u8(TType::Stop.code());
    }

    fn write_value(&mut self, value: &Wire) {
        match value {
            Wire::Bool(b) => self.write_u8(u8::from(*b)),
            Wire::Byte(n) => self.buf.extend_from_slice(&n.to_be_bytes()),
            Wire::I16(n) => self.write_i16(*n),
            Wire::I32(n) => self.write_i32(*n),
            Wire::I64(n) => self.write_i64(*n),
            Wire::Double(f) => self.buf.extend_from_slice(&f.to_bits().to_be_bytes()),
            Wire::Binary(bytes) => self.write_binary(bytes),
            Wire::Struct(fields) => self.write_fields(fields),
            Wire::Map(key_type, value_type, entries) => {
                self.write_u8(key_type.code());
                self.write_u8(value_type.code());
                self.write_len(entries.len());
                for (k, v) in entries {
                    self.write_value(k);
                    self.write_value(v);
                }
            }
            Wire::Set(elem_type, items) | Wire::List(elem_type, items) => {
                self.write_u8(elem_type.code());
                self.write_len(items.len());
                for item in items {
                    self.write_value(item);
                }
            }
        }
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::Truncated(self.pos));
        }
        let input = self.input;
        let slice = &input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    /// Read a length prefix, rejecting negatives and lengths past the input
    fn read_len(&mut self) -> Result<usize, ProtocolError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        if len > self.remaining() {
            return Err(ProtocolError::Truncated(self.pos));
        }
        Ok(len)
    }

    fn read_binary(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_message_header(&mut self) -> Result<MessageHeader, ProtocolError> {
        let first = self.read_i32()?;
        if first < 0 {
            let word = first as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(ProtocolError::BadVersion(word));
            }
            let kind = MessageType::from_code((word & 0xff) as u8)?;
            let name = String::from_utf8_lossy(&self.read_binary()?).into_owned();
            let seq_id = self.read_i32()?;
            Ok(MessageHeader { name, kind, seq_id })
        } else {
            // Legacy header: the first word is the name length
            let name_len = first as usize;
            let name = String::from_utf8_lossy(self.take(name_len)?).into_owned();
            let kind = MessageType::from_code(self.read_u8()?)?;
            let seq_id = self.read_i32()?;
            Ok(MessageHeader { name, kind, seq_id })
        }
    }

    fn read_struct(&mut self, depth: usize) -> Result<Wire, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::TooDeep(MAX_DEPTH));
        }
        let mut fields = Vec::new();
        loop {
            let ttype = TType::from_code(self.read_u8()?)?;
            if ttype == TType::Stop {
                break;
            }
            let id = self.read_i16()?;
            let value = self.read_value(ttype, depth + 1)?;
            fields.push((id, value));
        }
        Ok(Wire::Struct(fields))
    }

    fn read_value(&mut self, ttype: TType, depth: usize) -> Result<Wire, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::TooDeep(MAX_DEPTH));
        }
        Ok(match ttype {
            TType::Stop => return Err(ProtocolError::UnknownType(0)),
            TType::Bool => Wire::Bool(self.read_u8()? != 0),
            TType::Byte => Wire::Byte(self.read_u8()? as i8),
            TType::Double => Wire::Double(f64::from_bits(self.read_i64()? as u64)),
            TType::I16 => Wire::I16(self.read_i16()?),
            TType::I32 => Wire::I32(self.read_i32()?),
            TType::I64 => Wire::I64(self.read_i64()?),
            TType::String => Wire::Binary(self.read_binary()?),
            TType::Struct => self.read_struct(depth)?,
            TType::Map => {
                let key_type = TType::from_code(self.read_u8()?)?;
                let value_type = TType::from_code(self.read_u8()?)?;
                let size = self.read_len()?;
                let mut entries = Vec::with_capacity(size);
                for _ in 0..size {
                    let k = self.read_value(key_type, depth + 1)?;
                    let v = self.read_value(value_type, depth + 1)?;
                    entries.push((k, v));
                }
                Wire::Map(key_type, value_type, entries)
            }
            TType::Set | TType::List => {
                let elem_type = TType::from_code(self.read_u8()?)?;
                let size = self.read_len()?;
                let mut items = Vec::with_capacity(size);
                for _ in 0..size {
                    items.push(self.read_value(elem_type, depth + 1)?);
                }
                if ttype == TType::Set {
                    Wire::Set(elem_type, items)
                } else {
                    Wire::List(elem_type, items)
                }
            }
        })
    }
}

/// Expect a struct where one is required
pub fn expect_struct(wire: Wire) -> Result<Vec<(i16, Wire)>, ProtocolError> {
    match wire {
        Wire::Struct(fields) => Ok(fields),
        other => Err(ProtocolError::NotAStruct(other.ttype())),
    }
}
