//! Element type tags and the dtype registry.
//!
//! A [`DType`] names one of the twelve element types a pixel buffer or an
//! array view may hold. Foreign array producers describe element types either
//! with a DLPack-style [`DTypeTag`] (`code`, `bits`, `lanes`) or with an
//! array-interface typestr such as `"<f4"` or `"|u1"`; the [`DTypeRegistry`]
//! resolves both to an entry carrying the import and export handlers for that
//! type.
//!
//! # Architecture
//!
//! The registry is built once via [`DTypeRegistry::global()`] and never
//! mutated afterwards. Each [`DTypeEntry`] holds plain function pointers,
//! monomorphised for its element type, that route through the copy engine.
//!
//! # Example
//!
//! ```
//! use pixbridge_core::{DType, DTypeRegistry, DTypeTag};
//!
//! let registry = DTypeRegistry::global();
//! let entry = registry.lookup(DTypeTag::new(2, 32, 1)).unwrap();
//! assert_eq!(entry.dtype, DType::F32);
//!
//! let entry = registry.lookup_typestr("|u1").unwrap();
//! assert_eq!(entry.dtype, DType::U8);
//! ```

use crate::axis::AxisPermutation;
use crate::buffer::PixelBuffer;
use crate::copy::{self, CopyPath};
use crate::element::{CastPolicy, Element};
use crate::error::{Error, Result};
use crate::export;
use crate::view::ArrayView;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Numeric kind of a [`DType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    UInt,
    /// IEEE floating point
    Float,
}

impl DTypeKind {
    /// DLPack type code (`kDLInt`, `kDLUInt`, `kDLFloat`, `kDLBool`).
    pub const fn code(self) -> u8 {
        match self {
            Self::Int => 0,
            Self::UInt => 1,
            Self::Float => 2,
            Self::Bool => 6,
        }
    }

    /// Array-interface kind character.
    pub const fn typestr_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Int => 'i',
            Self::UInt => 'u',
            Self::Float => 'f',
        }
    }
}

/// Element type of a buffer or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// bool, stored as one byte (0 or 1)
    Bool,
    /// i8
    I8,
    /// i16
    I16,
    /// i32
    I32,
    /// i64
    I64,
    /// u8
    #[default]
    U8,
    /// u16
    U16,
    /// u32
    U32,
    /// u64
    U64,
    /// IEEE 754 half precision
    F16,
    /// f32
    F32,
    /// f64
    F64,
}

impl DType {
    /// All dtypes, in registry order.
    pub const ALL: [DType; 12] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F16,
        DType::F32,
        DType::F64,
    ];

    /// Position of this dtype in [`DType::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Size of one element in bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        (self.size() * 8) as u8
    }

    /// Numeric kind.
    pub const fn kind(self) -> DTypeKind {
        match self {
            Self::Bool => DTypeKind::Bool,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => DTypeKind::Int,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => DTypeKind::UInt,
            Self::F16 | Self::F32 | Self::F64 => DTypeKind::Float,
        }
    }

    /// Returns true for f16, f32 and f64.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self.kind(), DTypeKind::Float)
    }

    /// Canonical lowercase name (`"uint8"`, `"float32"`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F16 => "float16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// DLPack-style runtime tag.
    #[inline]
    pub const fn tag(self) -> DTypeTag {
        DTypeTag::new(self.kind().code(), self.bits(), 1)
    }

    /// Array-interface typestr in native byte order (`"<f4"`, `"|u1"`).
    pub fn typestr(self) -> String {
        let order = if self.size() == 1 {
            '|'
        } else if cfg!(target_endian = "little") {
            '<'
        } else {
            '>'
        };
        format!("{order}{}{}", self.kind().typestr_char(), self.size())
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    /// Parses a dtype name, a short alias or a typestr.
    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s.to_ascii_lowercase().as_str() {
            "bool" | "b1" => Self::Bool,
            "int8" | "i8" => Self::I8,
            "int16" | "i16" | "short" => Self::I16,
            "int32" | "i32" | "int" => Self::I32,
            "int64" | "i64" | "long" => Self::I64,
            "uint8" | "u8" => Self::U8,
            "uint16" | "u16" | "ushort" => Self::U16,
            "uint32" | "u32" | "uint" => Self::U32,
            "uint64" | "u64" | "ulong" => Self::U64,
            "float16" | "f16" | "half" => Self::F16,
            "float32" | "f32" | "float" => Self::F32,
            "float64" | "f64" | "double" => Self::F64,
            _ => return DTypeRegistry::global().lookup_typestr(s).map(|e| e.dtype),
        };
        Ok(dtype)
    }
}

/// DLPack-style element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DTypeTag {
    /// Type code (0 = int, 1 = uint, 2 = float, 6 = bool)
    pub code: u8,
    /// Bits per lane
    pub bits: u8,
    /// Number of lanes (1 for scalar elements)
    pub lanes: u16,
}

impl DTypeTag {
    /// Creates a tag.
    pub const fn new(code: u8, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }
}

impl fmt::Display for DTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code={}, bits={}, lanes={})", self.code, self.bits, self.lanes)
    }
}

/// Imports a foreign view into a native buffer.
pub type ImportFn =
    fn(&ArrayView<'_>, &mut PixelBuffer, &AxisPermutation, CastPolicy) -> Result<CopyPath>;

/// Exports a native buffer as an owned view of the entry's element type.
///
/// Arguments are the buffer, the requested axis order, the first z-plane and
/// the cast policy.
pub type ExportFn =
    fn(&PixelBuffer, &AxisPermutation, usize, CastPolicy) -> Result<ArrayView<'static>>;

/// Registry entry for one element type.
#[derive(Clone)]
pub struct DTypeEntry {
    /// Element type
    pub dtype: DType,
    /// DLPack-style tag
    pub tag: DTypeTag,
    /// Native-order typestr
    pub typestr: String,
    /// Copies foreign elements of this type into a native buffer.
    pub import: ImportFn,
    /// Copies a native buffer out as elements of this type.
    pub export: ExportFn,
}

impl fmt::Debug for DTypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DTypeEntry")
            .field("dtype", &self.dtype)
            .field("tag", &self.tag)
            .field("typestr", &self.typestr)
            .finish_non_exhaustive()
    }
}

impl DTypeEntry {
    fn of<T: Element>() -> Self {
        Self {
            dtype: T::DTYPE,
            tag: T::DTYPE.tag(),
            typestr: T::DTYPE.typestr(),
            import: copy::import_as::<T>,
            export: export::export_as::<T>,
        }
    }
}

/// Immutable table of supported element types.
///
/// # Thread Safety
///
/// The table is built once and only read afterwards; the global instance can
/// be shared by any number of threads.
#[derive(Debug)]
pub struct DTypeRegistry {
    entries: Vec<DTypeEntry>,
}

impl DTypeRegistry {
    /// Returns the global registry with all built-in element types.
    pub fn global() -> &'static DTypeRegistry {
        static INSTANCE: OnceLock<DTypeRegistry> = OnceLock::new();
        INSTANCE.get_or_init(Self::builtin)
    }

    fn builtin() -> Self {
        // Order must follow DType::ALL so that `entry` can index directly.
        let entries = vec![
            DTypeEntry::of::<bool>(),
            DTypeEntry::of::<i8>(),
            DTypeEntry::of::<i16>(),
            DTypeEntry::of::<i32>(),
            DTypeEntry::of::<i64>(),
            DTypeEntry::of::<u8>(),
            DTypeEntry::of::<u16>(),
            DTypeEntry::of::<u32>(),
            DTypeEntry::of::<u64>(),
            DTypeEntry::of::<half::f16>(),
            DTypeEntry::of::<f32>(),
            DTypeEntry::of::<f64>(),
        ];
        tracing::debug!(count = entries.len(), "dtype registry built");
        Self { entries }
    }

    /// All entries in [`DType::ALL`] order.
    pub fn entries(&self) -> &[DTypeEntry] {
        &self.entries
    }

    /// Entry for a known dtype.
    #[inline]
    pub fn entry(&self, dtype: DType) -> &DTypeEntry {
        &self.entries[dtype.index()]
    }

    /// Finds the entry matching a DLPack-style tag.
    pub fn lookup(&self, tag: DTypeTag) -> Result<&DTypeEntry> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .ok_or_else(|| Error::invalid_argument(format!("unsupported dtype tag {tag}")))
    }

    /// Finds the entry matching an array-interface typestr.
    ///
    /// Accepts `<`, `>`, `=` and `|` byte-order prefixes (or none). A prefix
    /// naming the non-native byte order for a multi-byte type is rejected.
    pub fn lookup_typestr(&self, typestr: &str) -> Result<&DTypeEntry> {
        let unsupported = || Error::invalid_argument(format!("unsupported dtype typestr {typestr:?}"));
        let (prefix, body) = match typestr.chars().next() {
            Some(p @ ('<' | '>' | '=' | '|')) => (Some(p), &typestr[1..]),
            Some(_) => (None, typestr),
            None => return Err(unsupported()),
        };
        let entry = self
            .entries
            .iter()
            .find(|e| &e.typestr[1..] == body)
            .ok_or_else(unsupported)?;

        if entry.dtype.size() > 1 {
            let foreign = if cfg!(target_endian = "little") { '>' } else { '<' };
            if prefix == Some(foreign) {
                return Err(Error::invalid_argument(format!(
                    "non-native byte order in typestr {typestr:?}"
                )));
            }
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_dtypes() {
        let registry = DTypeRegistry::global();
        assert_eq!(registry.entries().len(), DType::ALL.len());
        for dtype in DType::ALL {
            assert_eq!(registry.entry(dtype).dtype, dtype);
        }
    }

    #[test]
    fn test_lookup_by_tag() {
        let registry = DTypeRegistry::global();
        assert_eq!(registry.lookup(DTypeTag::new(1, 8, 1)).unwrap().dtype, DType::U8);
        assert_eq!(registry.lookup(DTypeTag::new(0, 64, 1)).unwrap().dtype, DType::I64);
        assert_eq!(registry.lookup(DTypeTag::new(2, 16, 1)).unwrap().dtype, DType::F16);
        assert_eq!(registry.lookup(DTypeTag::new(6, 8, 1)).unwrap().dtype, DType::Bool);
    }

    #[test]
    fn test_lookup_miss_names_tag() {
        let err = DTypeRegistry::global()
            .lookup(DTypeTag::new(5, 64, 1))
            .unwrap_err();
        assert!(err.to_string().contains("code=5"));
        let err = DTypeRegistry::global()
            .lookup(DTypeTag::new(2, 32, 4))
            .unwrap_err();
        assert!(err.to_string().contains("lanes=4"));
    }

    #[test]
    fn test_typestr() {
        assert_eq!(DType::U8.typestr(), "|u1");
        assert_eq!(DType::Bool.typestr(), "|b1");
        #[cfg(target_endian = "little")]
        assert_eq!(DType::F32.typestr(), "<f4");

        let registry = DTypeRegistry::global();
        assert_eq!(registry.lookup_typestr("f8").unwrap().dtype, DType::F64);
        assert_eq!(registry.lookup_typestr("=i2").unwrap().dtype, DType::I16);
        assert!(registry.lookup_typestr("<c8").is_err());
        assert!(registry.lookup_typestr("").is_err());
        #[cfg(target_endian = "little")]
        assert!(registry.lookup_typestr(">f4").is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("float".parse::<DType>().unwrap(), DType::F32);
        assert_eq!("UINT16".parse::<DType>().unwrap(), DType::U16);
        assert_eq!("|u1".parse::<DType>().unwrap(), DType::U8);
        assert!("complex64".parse::<DType>().is_err());
    }

    #[test]
    fn test_sizes() {
        assert_eq!(DType::F16.size(), 2);
        assert_eq!(DType::U64.bits(), 64);
        assert_eq!(DType::Bool.tag(), DTypeTag::new(6, 8, 1));
        assert!(DType::F64.is_float());
        assert!(!DType::I32.is_float());
    }
}
