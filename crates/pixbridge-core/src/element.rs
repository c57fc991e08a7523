//! Element types and numeric cast policies.
//!
//! Every dtype in the registry is backed by a Rust type implementing
//! [`Element`]. Conversions between element types go through a widened
//! [`Scalar`] so that a single `from_scalar` per type covers every source type,
//! with the narrowing behaviour selected by a [`CastPolicy`].
//!
//! # Cast semantics
//!
//! | policy     | float -> int                          | int -> narrower int | f64 -> f32         |
//! |------------|---------------------------------------|---------------------|--------------------|
//! | `Clamp`    | truncate toward zero, saturate, NaN=0 | saturate            | saturate if finite |
//! | `Wrap`     | truncate toward zero, mod 2^bits      | mod 2^bits          | plain conversion   |
//! | `Truncate` | `as` conversion, no range check       | keep low bits       | plain conversion   |
//!
//! Boolean destinations take `value != 0` (NaN is false); boolean sources
//! convert to 0 or 1.
//!
//! ```
//! use pixbridge_core::{CastPolicy, Element};
//!
//! assert_eq!(u8::cast_from(300.0f32, CastPolicy::Clamp), 255);
//! assert_eq!(u8::cast_from(300.0f32, CastPolicy::Wrap), 44);
//! assert_eq!(i8::cast_from(200u16, CastPolicy::Truncate), -56);
//! ```

use crate::dtype::DType;
use crate::error::{Error, Result};
use half::f16;
use std::fmt;
use std::str::FromStr;

/// Rule governing value conversion when narrowing between numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CastPolicy {
    /// Saturate to the destination range.
    #[default]
    Clamp,
    /// Reduce modulo 2^bits of the destination.
    Wrap,
    /// Raw conversion without range checking.
    Truncate,
}

impl CastPolicy {
    /// Lowercase policy name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Wrap => "wrap",
            Self::Truncate => "truncate",
        }
    }
}

impl fmt::Display for CastPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CastPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" | "saturate" => Ok(Self::Clamp),
            "wrap" | "modulo" => Ok(Self::Wrap),
            "truncate" | "raw" => Ok(Self::Truncate),
            _ => Err(Error::invalid_argument(format!("unknown cast policy: {s}"))),
        }
    }
}

/// Widened intermediate value used for all element conversions.
///
/// `i128` holds every supported integer exactly, `f64` every supported float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Any signed or unsigned integer
    Int(i128),
    /// Any floating-point value
    Float(f64),
}

impl Scalar {
    /// Returns the value as `f64` (booleans map to 0.0 / 1.0).
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Trait for the element types a [`DType`] can name.
///
/// Elements are read from and written to unaligned native-endian byte slices,
/// which is how both pixel buffers and foreign array views store them.
pub trait Element:
    bytemuck::NoUninit + Copy + Default + PartialEq + Send + Sync + fmt::Debug + 'static
{
    /// Runtime tag of this type.
    const DTYPE: DType;

    /// Reads one element from the first `size_of::<Self>()` bytes.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Widens this element.
    fn to_scalar(self) -> Scalar;

    /// Narrows a scalar into this type according to `policy`.
    fn from_scalar(value: Scalar, policy: CastPolicy) -> Self;

    /// Writes this element into the first `size_of::<Self>()` bytes.
    #[inline]
    fn write_ne(self, out: &mut [u8]) {
        let bytes = bytemuck::bytes_of(&self);
        out[..bytes.len()].copy_from_slice(bytes);
    }

    /// Converts an element of another type.
    #[inline]
    fn cast_from<S: Element>(value: S, policy: CastPolicy) -> Self {
        Self::from_scalar(value.to_scalar(), policy)
    }
}

macro_rules! impl_int_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            #[inline]
            fn read_ne(bytes: &[u8]) -> Self {
                bytemuck::pod_read_unaligned(&bytes[..size_of::<$t>()])
            }

            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::Int(self as i128)
            }

            #[inline]
            fn from_scalar(value: Scalar, policy: CastPolicy) -> Self {
                match value {
                    Scalar::Bool(b) => <$t>::from(b),
                    Scalar::Int(i) => match policy {
                        CastPolicy::Clamp => i.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t,
                        CastPolicy::Wrap | CastPolicy::Truncate => i as $t,
                    },
                    Scalar::Float(f) => match policy {
                        // `as` truncates toward zero, saturates and maps NaN to 0
                        CastPolicy::Clamp | CastPolicy::Truncate => f as $t,
                        CastPolicy::Wrap => {
                            if f.is_finite() {
                                let modulus = 2f64.powi(<$t>::BITS as i32);
                                (f.trunc().rem_euclid(modulus) as i128) as $t
                            } else {
                                0
                            }
                        }
                    },
                }
            }
        }
    )*};
}

impl_int_element!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn read_ne(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    #[inline]
    fn from_scalar(value: Scalar, _policy: CastPolicy) -> Self {
        match value {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(f) => f != 0.0 && !f.is_nan(),
        }
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn read_ne(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..4])
    }

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Float(f64::from(self))
    }

    #[inline]
    fn from_scalar(value: Scalar, policy: CastPolicy) -> Self {
        match value {
            Scalar::Bool(b) => f32::from(u8::from(b)),
            Scalar::Int(i) => i as f32,
            Scalar::Float(f) => match policy {
                CastPolicy::Clamp if f.is_finite() => {
                    f.clamp(f64::from(f32::MIN), f64::from(f32::MAX)) as f32
                }
                _ => f as f32,
            },
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn read_ne(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..8])
    }

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    #[inline]
    fn from_scalar(value: Scalar, _policy: CastPolicy) -> Self {
        value.as_f64()
    }
}

impl Element for f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn read_ne(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..2])
    }

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    #[inline]
    fn from_scalar(value: Scalar, policy: CastPolicy) -> Self {
        match (value, policy) {
            (Scalar::Float(f), CastPolicy::Clamp) if f.is_finite() => {
                f16::from_f64(f.clamp(f16::MIN.to_f64(), f16::MAX.to_f64()))
            }
            _ => f16::from_f64(value.as_f64()),
        }
    }
}

/// Expands `$body` once per dtype with `$T` bound to the matching element type.
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::dtype::DType::Bool => {
                type $T = bool;
                $body
            }
            $crate::dtype::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::dtype::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::dtype::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::dtype::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::dtype::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::dtype::DType::F16 => {
                type $T = half::f16;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_dtype;

/// Reads one element of runtime type `dtype` as a [`Scalar`].
#[inline]
pub(crate) fn read_scalar(dtype: DType, bytes: &[u8]) -> Scalar {
    dispatch_dtype!(dtype, T => T::read_ne(bytes).to_scalar())
}

/// Writes `value` as one element of runtime type `dtype`.
#[inline]
pub(crate) fn write_scalar(dtype: DType, value: Scalar, policy: CastPolicy, out: &mut [u8]) {
    dispatch_dtype!(dtype, T => T::from_scalar(value, policy).write_ne(out))
}
