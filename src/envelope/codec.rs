//! Binary wire format for envelopes.
//!
//! # Frame Layout
//!
//! ```text
//! +-------------+------+------------------+----------------+
//! | magic (4)   | kind | body (variable)  | crc32 (4, LE)  |
//! | 47 57 45 01 | u8   | kind-specific    | of body bytes  |
//! +-------------+------+------------------+----------------+
//! ```
//!
//! Body fields are length-prefixed with LEB128 varints; integers are
//! little-endian fixed width. Per kind:
//!
//! | Kind         | Body fields                                        |
//! |--------------|----------------------------------------------------|
//! | AUTH         | status: i32                                        |
//! | REGISTRATION | service_name: str, url: str                        |
//! | ALIVE        | (empty)                                            |
//! | REQUEST      | transaction: str, source: str, dest: str, payload  |
//! | EVENT        | source: str, dest: str, payload                    |
//! | CREATE..DELETE | transaction, source, dest, path: str, payload    |
//!
//! Decoding rejects bad magic, truncated input, checksum mismatches, and
//! trailing bytes. A frame whose kind octet is not assigned decodes to
//! [`CodecError::UnknownKind`] so the session can report it separately from
//! malformed input.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{CrudMessage, Envelope, EventMessage, MessageKind, RegistrationMessage, RequestMessage};

/// Frame magic: ASCII "GWE" followed by the format version octet.
pub const MAGIC: [u8; 4] = [0x47, 0x57, 0x45, 0x01];

/// Smallest representable frame: magic, kind, empty body, checksum.
const MIN_FRAME_LEN: usize = MAGIC.len() + 1 + 4;

/// Errors produced while encoding or decoding envelope frames.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the frame was complete.
    #[error("frame truncated")]
    Truncated,

    /// The frame does not start with the expected magic/version prefix.
    #[error("bad magic or unsupported version")]
    BadMagic,

    /// The kind octet is not assigned to any message kind.
    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    /// The body checksum does not match its contents.
    #[error("checksum mismatch")]
    Checksum,

    /// A string field is not valid UTF-8.
    #[error("field is not valid utf-8")]
    Utf8,

    /// A length prefix exceeds what a frame can carry.
    #[error("length prefix overflows frame")]
    Overflow,

    /// Bytes remain after the body was fully parsed.
    #[error("trailing bytes after message body")]
    TrailingData,
}

impl Envelope {
    /// Encode this envelope into a wire frame.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut body = BytesMut::new();
        match self {
            Self::Auth(msg) => body.put_i32_le(msg.status),
            Self::Registration(msg) => {
                put_str(&mut body, &msg.service_name)?;
                put_str(&mut body, &msg.url)?;
            }
            Self::Alive => {}
            Self::Request(msg) => {
                put_str(&mut body, &msg.transaction)?;
                put_str(&mut body, &msg.source)?;
                put_str(&mut body, &msg.destination)?;
                put_bytes(&mut body, &msg.payload)?;
            }
            Self::Event(msg) => {
                put_str(&mut body, &msg.source)?;
                put_str(&mut body, &msg.destination)?;
                put_bytes(&mut body, &msg.payload)?;
            }
            Self::Create(msg) | Self::Retrieve(msg) | Self::Update(msg) | Self::Delete(msg) => {
                put_str(&mut body, &msg.transaction)?;
                put_str(&mut body, &msg.source)?;
                put_str(&mut body, &msg.destination)?;
                put_str(&mut body, &msg.path)?;
                put_bytes(&mut body, &msg.payload)?;
            }
        }

        let mut frame = BytesMut::with_capacity(MIN_FRAME_LEN + body.len());
        frame.put_slice(&MAGIC);
        frame.put_u8(self.kind() as u8);
        let checksum = crc32fast::hash(&body);
        frame.put_slice(&body);
        frame.put_u32_le(checksum);
        Ok(frame.freeze())
    }

    /// Decode one wire frame into an envelope.
    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(CodecError::Truncated);
        }
        if frame[..MAGIC.len()] != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let kind_octet = frame[MAGIC.len()];
        let kind = MessageKind::try_from(kind_octet).map_err(CodecError::UnknownKind)?;

        let body = &frame[MAGIC.len() + 1..frame.len() - 4];
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&frame[frame.len() - 4..]);
        if crc32fast::hash(body) != u32::from_le_bytes(crc) {
            return Err(CodecError::Checksum);
        }

        let mut reader = Reader::new(body);
        let envelope = match kind {
            MessageKind::Auth => Envelope::Auth(super::AuthMessage {
                status: reader.read_i32()?,
            }),
            MessageKind::Registration => Envelope::Registration(RegistrationMessage {
                service_name: reader.read_str()?,
                url: reader.read_str()?,
            }),
            MessageKind::Alive => Envelope::Alive,
            MessageKind::Request => Envelope::Request(RequestMessage {
                transaction: reader.read_str()?,
                source: reader.read_str()?,
                destination: reader.read_str()?,
                payload: reader.read_bytes()?,
            }),
            MessageKind::Event => Envelope::Event(EventMessage {
                source: reader.read_str()?,
                destination: reader.read_str()?,
                payload: reader.read_bytes()?,
            }),
            MessageKind::Create
            | MessageKind::Retrieve
            | MessageKind::Update
            | MessageKind::Delete => {
                let msg = CrudMessage {
                    transaction: reader.read_str()?,
                    source: reader.read_str()?,
                    destination: reader.read_str()?,
                    path: reader.read_str()?,
                    payload: reader.read_bytes()?,
                };
                match kind {
                    MessageKind::Create => Envelope::Create(msg),
                    MessageKind::Retrieve => Envelope::Retrieve(msg),
                    MessageKind::Update => Envelope::Update(msg),
                    _ => Envelope::Delete(msg),
                }
            }
        };
        if !reader.is_empty() {
            return Err(CodecError::TrailingData);
        }
        Ok(envelope)
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

fn put_str(buf: &mut BytesMut, value: &str) -> Result<(), CodecError> {
    put_bytes(buf, value.as_bytes())
}

fn put_bytes(buf: &mut BytesMut, value: &[u8]) -> Result<(), CodecError> {
    if value.len() > u32::MAX as usize {
        return Err(CodecError::Overflow);
    }
    put_varint(buf, value.len() as u64);
    buf.put_slice(value);
    Ok(())
}

/// Bounds-checked body reader; never panics on short input.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn read_varint(&mut self) -> Result<u64, CodecError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self.buf.get(self.pos).ok_or(CodecError::Truncated)?;
            self.pos += 1;
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 64 {
                return Err(CodecError::Overflow);
            }
        }
        Ok(result)
    }

    fn read_i32(&mut self) -> Result<i32, CodecError> {
        let end = self.pos.checked_add(4).ok_or(CodecError::Overflow)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(slice);
        Ok(i32::from_le_bytes(raw))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| CodecError::Overflow)?;
        let end = self.pos.checked_add(len).ok_or(CodecError::Overflow)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        Ok(slice.to_vec())
    }

    fn read_str(&mut self) -> Result<String, CodecError> {
        let raw = self.read_bytes()?;
        String::from_utf8(raw).map_err(|_| CodecError::Utf8)
    }
}
