//! Type descriptors.
//!
//! A [`Descriptor`] is an immutable, runtime-built description of one wire
//! shape. A tree of descriptors is constructed once at startup and then
//! passed by shared reference into every codec call; it carries no mutable
//! state and may be shared freely across threads.
//!
//! For records, descriptor field order defines binary wire order. The JSON
//! codec matches fields by [`Field::name`] instead, which is why every
//! record member carries a name by construction.
//!
//! # Example
//!
//! ```
//! use tagcode::{record, Descriptor, Value};
//!
//! let point = record! {
//!     x: Descriptor::int32(),
//!     y: Descriptor::int32(),
//!     label: Descriptor::string().nullable(),
//! };
//!
//! let value = Value::Record(vec![Value::I32(3), Value::I32(-4), Value::Null]);
//! let bytes = tagcode::binary::encode(&point, &value).unwrap();
//! assert_eq!(tagcode::binary::decode(&point, &bytes).unwrap(), value);
//! ```
use {
    crate::value::Value,
    core::fmt,
    std::sync::Arc,
};

/// Flat kind discriminator, used for mismatch reporting and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Record,
    List,
    Map,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::I8 => "int8",
            Kind::I16 => "int16",
            Kind::I32 => "int32",
            Kind::I64 => "int64",
            Kind::U8 => "uint8",
            Kind::U16 => "uint16",
            Kind::U32 => "uint32",
            Kind::U64 => "uint64",
            Kind::F32 => "float32",
            Kind::F64 => "float64",
            Kind::Str => "string",
            Kind::Record => "record",
            Kind::List => "list",
            Kind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Custom construction hooks for reference-typed destinations.
///
/// `create` produces the pre-initialized destination value (pool-backed
/// storage, non-zero defaults); `dismantle` undoes whatever side effects
/// `create` had, and is registered with the decode ledger so that a failed
/// decode finalizes every custom-constructed object. Any "init arguments"
/// live in the implementing type's own state.
pub trait Construct: Send + Sync {
    fn create(&self) -> Value;
    fn dismantle(&self);
}

/// One named record member.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    desc: Descriptor,
}

impl Field {
    pub fn new(name: impl Into<String>, desc: Descriptor) -> Self {
        Self {
            name: name.into(),
            desc,
        }
    }

    /// Member name, used by the JSON codec only.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }
}

/// The shape of one descriptor.
///
/// `Str`/`FixedStr` and `List`/`Array` share a wire representation; they
/// differ in the destination they describe (owned and open-ended vs.
/// capacity-bounded with the element count carried alongside).
#[derive(Debug, Clone)]
pub enum Shape {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Owned, unbounded string destination.
    Str,
    /// Fixed-capacity string destination; decoding a longer string fails.
    FixedStr { capacity: usize },
    Record(Vec<Field>),
    List(Box<Descriptor>),
    /// Fixed-size array destination with a known capacity.
    Array {
        elem: Box<Descriptor>,
        capacity: usize,
    },
    Map {
        key: Box<Descriptor>,
        value: Box<Descriptor>,
    },
}

/// Immutable metadata describing one field or element wire shape.
#[derive(Clone)]
pub struct Descriptor {
    shape: Shape,
    nullable: bool,
    constructor: Option<Arc<dyn Construct>>,
}

macro_rules! scalar_ctor {
    ($($fn_name:ident => $shape:ident),+ $(,)?) => {
        $(
            pub fn $fn_name() -> Self {
                Self::new(Shape::$shape)
            }
        )+
    };
}

impl Descriptor {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            nullable: false,
            constructor: None,
        }
    }

    scalar_ctor! {
        bool => Bool,
        int8 => I8,
        int16 => I16,
        int32 => I32,
        int64 => I64,
        uint8 => U8,
        uint16 => U16,
        uint32 => U32,
        uint64 => U64,
        float32 => F32,
        float64 => F64,
        string => Str,
    }

    pub fn fixed_string(capacity: usize) -> Self {
        Self::new(Shape::FixedStr { capacity })
    }

    pub fn record(fields: Vec<Field>) -> Self {
        Self::new(Shape::Record(fields))
    }

    pub fn list(elem: Descriptor) -> Self {
        Self::new(Shape::List(Box::new(elem)))
    }

    pub fn array(elem: Descriptor, capacity: usize) -> Self {
        Self::new(Shape::Array {
            elem: Box::new(elem),
            capacity,
        })
    }

    /// Map descriptor. The key descriptor must be a non-nullable scalar
    /// kind representable as a map key (bool, integer, string); anything
    /// else is a programmer error in the descriptor table, not a runtime
    /// condition.
    pub fn map(key: Descriptor, value: Descriptor) -> Self {
        debug_assert!(
            key.kind().is_map_key_kind(),
            "map key descriptor must be bool, integer, or string"
        );
        debug_assert!(!key.is_nullable(), "map key descriptor must not be nullable");
        Self::new(Shape::Map {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    /// Permit the null tag for this slot (the destination is
    /// reference-typed).
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach custom construction hooks for this destination.
    pub fn with_constructor(mut self, constructor: Arc<dyn Construct>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn constructor(&self) -> Option<&Arc<dyn Construct>> {
        self.constructor.as_ref()
    }

    pub fn kind(&self) -> Kind {
        match &self.shape {
            Shape::Bool => Kind::Bool,
            Shape::I8 => Kind::I8,
            Shape::I16 => Kind::I16,
            Shape::I32 => Kind::I32,
            Shape::I64 => Kind::I64,
            Shape::U8 => Kind::U8,
            Shape::U16 => Kind::U16,
            Shape::U32 => Kind::U32,
            Shape::U64 => Kind::U64,
            Shape::F32 => Kind::F32,
            Shape::F64 => Kind::F64,
            Shape::Str | Shape::FixedStr { .. } => Kind::Str,
            Shape::Record(_) => Kind::Record,
            Shape::List(_) | Shape::Array { .. } => Kind::List,
            Shape::Map { .. } => Kind::Map,
        }
    }

    /// The value an unmatched destination keeps: the constructor's
    /// `create` output when one is attached, null for nullable slots,
    /// zero/empty otherwise.
    pub fn default_value(&self) -> Value {
        if let Some(constructor) = &self.constructor {
            return constructor.create();
        }
        if self.nullable {
            return Value::Null;
        }
        match &self.shape {
            Shape::Bool => Value::Bool(false),
            Shape::I8 => Value::I8(0),
            Shape::I16 => Value::I16(0),
            Shape::I32 => Value::I32(0),
            Shape::I64 => Value::I64(0),
            Shape::U8 => Value::U8(0),
            Shape::U16 => Value::U16(0),
            Shape::U32 => Value::U32(0),
            Shape::U64 => Value::U64(0),
            Shape::F32 => Value::F32(0.0),
            Shape::F64 => Value::F64(0.0),
            Shape::Str | Shape::FixedStr { .. } => Value::Str(String::new()),
            Shape::Record(fields) => {
                Value::Record(fields.iter().map(|f| f.desc.default_value()).collect())
            }
            Shape::List(_) | Shape::Array { .. } => Value::List(Vec::new()),
            Shape::Map { .. } => Value::Map(Vec::new()),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("shape", &self.shape)
            .field("nullable", &self.nullable)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

impl Kind {
    /// Kinds usable as map keys in both wire formats.
    pub fn is_map_key_kind(self) -> bool {
        matches!(
            self,
            Kind::Bool
                | Kind::I8
                | Kind::I16
                | Kind::I32
                | Kind::I64
                | Kind::U8
                | Kind::U16
                | Kind::U32
                | Kind::U64
                | Kind::Str
        )
    }
}

/// Build a record [`Descriptor`] from a terse field list.
///
/// ```
/// use tagcode::{record, Descriptor};
///
/// let desc = record! {
///     id: Descriptor::uint64(),
///     name: Descriptor::string(),
///     scores: Descriptor::list(Descriptor::float64()),
/// };
/// assert_eq!(desc.kind(), tagcode::Kind::Record);
/// ```
#[macro_export]
macro_rules! record {
    ($($name:ident : $desc:expr),+ $(,)?) => {
        $crate::Descriptor::record(::std::vec![
            $($crate::Field::new(stringify!($name), $desc)),+
        ])
    };
}
