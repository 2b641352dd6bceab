//! Error types and helpers.
use {crate::desc::Kind, core::str::Utf8Error, thiserror::Error};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("buffer exhausted while reading or writing {0} bytes")]
    BufferExhausted(usize),
    #[error("nesting depth exceeded the configured maximum of {0}")]
    DepthExceeded(usize),
    #[error("unsupported kind tag: {0:#04x}")]
    UnsupportedKind(u8),
    #[error("malformed value: {0}")]
    InvalidValue(&'static str),
    #[error("value kind {found} does not match descriptor kind {expected}")]
    KindMismatch { expected: Kind, found: Kind },
    #[error("float is NaN or infinite")]
    NonFiniteFloat,
    #[error("null is not permitted for this destination")]
    NullNotPermitted,
    #[error("string of {0} bytes exceeds the maximum representable length")]
    StringTooLong(usize),
    #[error("destination capacity {capacity} is too small for incoming length {needed}")]
    DestinationTooSmall { needed: usize, capacity: usize },
    #[error("{0} elements exceed the counted-length field")]
    TooManyElements(usize),
    #[error("wire tag mismatch: expected {expected:#04x}, found {found:#04x}")]
    TagMismatch { expected: u8, found: u8 },
    #[error("container rejected the appended element")]
    AppendRejected,
    #[error("object member is missing a map key")]
    MapKeyMissing,
    #[error("map key kind is not representable as a JSON key")]
    MapKeyNotRepresentable,
    #[error(transparent)]
    InvalidUtf8(#[from] Utf8Error),
    #[error("sequence preallocation of {needed} bytes exceeds the limit of {limit} bytes")]
    PreallocationLimit { needed: usize, limit: usize },
}

pub type Result<T> = core::result::Result<T, Error>;

#[cold]
pub const fn buffer_exhausted(len: usize) -> Error {
    Error::BufferExhausted(len)
}

#[cold]
pub const fn depth_exceeded(max: usize) -> Error {
    Error::DepthExceeded(max)
}

#[cold]
pub const fn unsupported_kind(tag: u8) -> Error {
    Error::UnsupportedKind(tag)
}

#[cold]
pub const fn invalid_value(context: &'static str) -> Error {
    Error::InvalidValue(context)
}

#[cold]
pub const fn kind_mismatch(expected: Kind, found: Kind) -> Error {
    Error::KindMismatch { expected, found }
}

#[cold]
pub const fn non_finite_float() -> Error {
    Error::NonFiniteFloat
}

#[cold]
pub const fn null_not_permitted() -> Error {
    Error::NullNotPermitted
}

#[cold]
pub const fn string_too_long(len: usize) -> Error {
    Error::StringTooLong(len)
}

#[cold]
pub const fn destination_too_small(needed: usize, capacity: usize) -> Error {
    Error::DestinationTooSmall { needed, capacity }
}

#[cold]
pub const fn too_many_elements(len: usize) -> Error {
    Error::TooManyElements(len)
}

#[cold]
pub const fn tag_mismatch(expected: u8, found: u8) -> Error {
    Error::TagMismatch { expected, found }
}

#[cold]
pub const fn append_rejected() -> Error {
    Error::AppendRejected
}

#[cold]
pub const fn map_key_missing() -> Error {
    Error::MapKeyMissing
}

#[cold]
pub const fn map_key_not_representable() -> Error {
    Error::MapKeyNotRepresentable
}

#[cold]
pub const fn preallocation_limit(needed: usize, limit: usize) -> Error {
    Error::PreallocationLimit { needed, limit }
}
