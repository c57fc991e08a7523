//! # pixbridge-core
//!
//! Exchange of N-dimensional array data with fixed-order 4-axis pixel buffers.
//!
//! This crate provides:
//!
//! - [`PixelBuffer`] - Native buffer with `x, y, z, c` axes, x fastest
//! - [`ArrayView`] - Strided view of 1 to 4 axes over foreign or native memory
//! - [`AxisPermutation`] - Mapping from a requested axis order to native axes
//! - [`DType`], [`DTypeRegistry`] - Element types and their conversion handlers
//! - [`copy`] - Strided import with casting ([`CastPolicy`])
//! - [`export`] - Zero-copy (or converting) export as views, encoded as
//!   [`ArrayInterface`] or [`TensorDescriptor`]
//!
//! ## Data Flow
//!
//! ```text
//!  foreign array ──> ArrayView ──(AxisPermutation, DTypeRegistry)──> copy ──> PixelBuffer
//!                                                                               │
//!  consumer <── ArrayInterface / TensorDescriptor <── ArrayView <── export <────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use pixbridge_core::prelude::*;
//!
//! // A 2x2 RGB image stored row-major as (y, x, c)
//! let pixels: Vec<u8> = (0..12).collect();
//! let view = ArrayView::from_slice(&pixels, &[2, 2, 3]).unwrap();
//! let yxc = AxisPermutation::parse("yxc").unwrap();
//!
//! let buf = copy::import(&view, &yxc, DType::F32, CastPolicy::Clamp).unwrap();
//! assert_eq!(buf.dims(), [2, 2, 1, 3]);
//! assert_eq!(buf.get::<f32>(1, 0, 0, 2).unwrap(), 5.0);
//!
//! let back = export::export(&buf, &yxc, Some(DType::U8), false).unwrap();
//! assert_eq!(back.to_vec::<u8>().unwrap(), pixels);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod axis;
pub mod buffer;
pub mod copy;
pub mod descriptor;
pub mod dtype;
pub mod element;
pub mod error;
pub mod export;
pub mod layout;
pub mod view;

// Re-exports for convenience
pub use axis::{Axis, AxisPermutation};
pub use buffer::{resolve_index, Allocation, BufferSource, PixelBuffer, SharedStorage};
pub use copy::{copy_into_plane, CopyPath};
pub use descriptor::{ArrayInterface, TensorDescriptor};
pub use dtype::{DType, DTypeEntry, DTypeKind, DTypeRegistry, DTypeTag};
pub use element::{CastPolicy, Element, Scalar};
pub use error::{Error, ErrorKind, Result};
pub use export::{export_with, ExportOptions};
pub use layout::MemoryOrder;
pub use view::{ArrayView, Device, StrideUnit};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use pixbridge_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::axis::{Axis, AxisPermutation};
    pub use crate::buffer::PixelBuffer;
    pub use crate::copy::{self, CopyPath};
    pub use crate::dtype::{DType, DTypeRegistry};
    pub use crate::element::{CastPolicy, Element, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::export::{self, ExportOptions};
    pub use crate::view::ArrayView;
}
