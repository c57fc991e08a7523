//! Descriptor encodings handed to foreign array consumers.
//!
//! - [`ArrayInterface`] mirrors the explicit array-interface protocol:
//!   typestr, `(address, readonly)`, shape, byte strides, version 3.
//! - [`TensorDescriptor`] mirrors a DLPack tensor without strides, which
//!   consumers read as row-major contiguous. It can only be produced for views
//!   that actually are row-major contiguous.
//!
//! Both only describe memory; the [`ArrayView`] they were made from must be
//! kept alive for as long as a consumer reads through the address.

use crate::dtype::DTypeTag;
use crate::error::{Error, Result};
use crate::layout::{self, MemoryOrder};
use crate::view::{ArrayView, Device};

/// Explicit strided descriptor, version 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInterface {
    /// Element typestr such as `"<f4"`
    pub typestr: String,
    /// Address of element zero and read-only flag
    pub data: (usize, bool),
    /// Axis extents
    pub shape: Vec<usize>,
    /// Byte strides
    pub strides: Vec<isize>,
    /// Protocol version (always 3)
    pub version: u32,
}

impl ArrayInterface {
    /// Protocol version produced.
    pub const VERSION: u32 = 3;

    /// Describes `view`.
    pub fn from_view(view: &ArrayView<'_>) -> Result<Self> {
        Ok(Self {
            typestr: view.dtype().typestr(),
            data: (view.address()?, !view.is_writable()),
            shape: view.shape().to_vec(),
            strides: view.strides().to_vec(),
            version: Self::VERSION,
        })
    }

    /// Byte offset of `index` from the data address.
    pub fn byte_offset(&self, index: &[usize]) -> Option<isize> {
        offset_with(&self.shape, &self.strides, index)
    }
}

/// Minimal descriptor with implied row-major strides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    /// Address of element zero
    pub data: usize,
    /// Number of axes
    pub ndim: usize,
    /// Axis extents
    pub shape: Vec<usize>,
    /// Element type tag
    pub dtype: DTypeTag,
    /// Device holding the memory
    pub device: Device,
}

impl TensorDescriptor {
    /// Describes `view`, which must be row-major contiguous.
    pub fn from_view(view: &ArrayView<'_>) -> Result<Self> {
        if !view.is_contiguous(MemoryOrder::RowMajor) {
            return Err(Error::invalid_argument(format!(
                "view with shape {:?} and strides {:?} is not row-major contiguous",
                view.shape(),
                view.strides()
            )));
        }
        Ok(Self {
            data: view.address()?,
            ndim: view.rank(),
            shape: view.shape().to_vec(),
            dtype: view.tag(),
            device: view.device(),
        })
    }

    /// Implied byte strides.
    pub fn strides(&self) -> Vec<isize> {
        let itemsize = (self.dtype.bits as isize / 8) * self.dtype.lanes as isize;
        layout::contiguous_strides(&self.shape, MemoryOrder::RowMajor)
            .into_iter()
            .map(|s| s * itemsize)
            .collect()
    }

    /// Byte offset of `index` from the data address.
    pub fn byte_offset(&self, index: &[usize]) -> Option<isize> {
        offset_with(&self.shape, &self.strides(), index)
    }
}

fn offset_with(shape: &[usize], strides: &[isize], index: &[usize]) -> Option<isize> {
    if index.len() != shape.len() {
        return None;
    }
    index
        .iter()
        .zip(shape.iter().zip(strides))
        .try_fold(0isize, |acc, (&i, (&extent, &stride))| (i < extent).then(|| acc + i as isize * stride))
}

impl ArrayView<'_> {
    /// Explicit descriptor of this view.
    pub fn array_interface(&self) -> Result<ArrayInterface> {
        ArrayInterface::from_view(self)
    }

    /// Minimal descriptor of this view; fails unless row-major contiguous.
    pub fn tensor_descriptor(&self) -> Result<TensorDescriptor> {
        TensorDescriptor::from_view(self)
    }
}
