//! OSC type tags and their classification

use crate::error::Status;

/// The comma that begins every typetag string.
pub const TYPETAG_ID: u8 = b',';

/// Recognised payload type tags.
///
/// The required OSC 1.0 set is `i f s b`; the remainder are the extension
/// tags this implementation carries unconditionally. Host function pointers
/// ride inside ordinary blobs and have no tag of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Int32 = b'i',
    Float = b'f',
    String = b's',
    Blob = b'b',
    Symbol = b'S',
    Double = b'd',
    Int64 = b'h',
    Uint32 = b'u',
    Uint64 = b'U',
    Timetag = b't',
    True = b'T',
    False = b'F',
    Null = b'N',
    Infinitum = b'I',
}

impl TypeTag {
    /// Decode a tag byte.
    pub fn from_byte(c: u8) -> Result<Self, Status> {
        Ok(match c {
            b'i' => Self::Int32,
            b'f' => Self::Float,
            b's' => Self::String,
            b'b' => Self::Blob,
            b'S' => Self::Symbol,
            b'd' => Self::Double,
            b'h' => Self::Int64,
            b'u' => Self::Uint32,
            b'U' => Self::Uint64,
            b't' => Self::Timetag,
            b'T' => Self::True,
            b'F' => Self::False,
            b'N' => Self::Null,
            b'I' => Self::Infinitum,
            _ => return Err(Status::UnknownTypetag),
        })
    }

    /// The tag byte as written on the wire.
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Strings and symbols share the padded-string encoding.
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Symbol)
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Uint32 | Self::Uint64)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Tags that carry no payload bytes at all.
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::True | Self::False | Self::Null | Self::Infinitum)
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, Self::True | Self::False)
    }
}

/// True for characters permitted in an OSC address.
pub fn is_address_byte(c: u8) -> bool {
    (0x20..0x7f).contains(&c) && !matches!(c, b' ' | b'#')
}
