//! JSON encoding of operation values.
//!
//! A value is serialised inside a one-element array and the brackets are
//! stripped afterwards, so scalars encode the same way objects and arrays do
//! regardless of how the peer decoder treats bare top-level scalars.
//!
//! JSON has no representation for NaN or infinities. `serde_json` writes them
//! as `null`, so values are walked first and rejected if they contain one.

use std::{fmt, io};

use serde::{Serialize, ser};
use snafu::{ResultExt, Snafu, ensure};

/// Error type for value encoding.
#[derive(Debug, Snafu)]
pub enum ValueError {
    /// The value could not be serialised to JSON.
    #[snafu(display("Value encoding failed: {source}"))]
    Encode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// The value contains a NaN or infinite float.
    #[snafu(display("Value encoding failed: non-finite float has no JSON representation"))]
    NonFinite,
}

/// Encodes a value as the JSON fragment carried by a mutation spec.
///
/// # Errors
///
/// Returns `ValueError::Encode` if the value cannot be serialised, for example
/// a map with non-string keys, and `ValueError::NonFinite` if it contains a
/// NaN or infinite float.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ValueError> {
    let mut fragment = Fragment::default();
    serde_json::to_writer(&mut fragment, &[value]).context(EncodeSnafu)?;
    ensure!(value.serialize(FiniteCheck).is_ok(), NonFiniteSnafu);
    // `]`
    fragment.bytes.pop();
    Ok(fragment.bytes)
}

/// Writer that drops the opening bracket of the one-element array.
#[derive(Default)]
struct Fragment {
    bytes: Vec<u8>,
    opened: bool,
}

impl io::Write for Fragment {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let skip = usize::from(!self.opened && !buf.is_empty());
        self.opened |= skip == 1;
        self.bytes.extend_from_slice(buf.get(skip..).unwrap_or_default());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Raised by [`FiniteCheck`] on the first NaN or infinite float.
#[derive(Debug)]
struct NonFiniteFloat;

impl fmt::Display for NonFiniteFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("non-finite float")
    }
}

impl std::error::Error for NonFiniteFloat {}

impl ser::Error for NonFiniteFloat {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self
    }
}

/// Serializer that produces nothing and fails on non-finite floats.
#[derive(Clone, Copy)]
struct FiniteCheck;

type Check = Result<(), NonFiniteFloat>;

macro_rules! accept_scalars {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(fn $method(self, _: $ty) -> Check { Ok(()) })*
    };
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept_scalars!(
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    );

    fn serialize_f32(self, v: f32) -> Check {
        if v.is_finite() { Ok(()) } else { Err(NonFiniteFloat) }
    }

    fn serialize_f64(self, v: f64) -> Check {
        if v.is_finite() { Ok(()) } else { Err(NonFiniteFloat) }
    }

    fn serialize_none(self) -> Check {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Check {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Check {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Check {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _: &'static str, value: &T) -> Check {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Check {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, NonFiniteFloat> {
        Ok(self)
    }
}

macro_rules! check_elements {
    ($($trait:ident::$method:ident),* $(,)?) => {
        $(
            impl ser::$trait for FiniteCheck {
                type Ok = ();
                type Error = NonFiniteFloat;

                fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Check {
                    value.serialize(*self)
                }

                fn end(self) -> Check {
                    Ok(())
                }
            }
        )*
    };
}

check_elements!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field,
);

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Check {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Check {
        value.serialize(*self)
    }

    fn end(self) -> Check {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Check {
        value.serialize(*self)
    }

    fn end(self) -> Check {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Check {
        value.serialize(*self)
    }

    fn end(self) -> Check {
        Ok(())
    }
}
