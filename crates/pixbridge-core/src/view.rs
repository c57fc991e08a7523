//! Strided views over foreign or native array memory.
//!
//! An [`ArrayView`] describes up to four axes of elements laid out with
//! arbitrary (possibly negative) byte strides. Its data is one of:
//!
//! - borrowed bytes, for foreign arrays imported into a buffer;
//! - an alias of a [`PixelBuffer`](crate::PixelBuffer)'s storage, for
//!   zero-copy exports;
//! - owned bytes, for exports that needed a cast or reordering.
//!
//! Bounds are validated when the view is constructed, so element access never
//! reads outside the backing memory.

use crate::buffer::{Allocation, SharedStorage};
use crate::dtype::{DType, DTypeTag};
use crate::element::{self, Element, Scalar};
use crate::error::{Error, Result};
use crate::layout::{self, MemoryOrder};
use std::sync::Arc;

/// Device holding the array memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory
    #[default]
    Cpu,
    /// CUDA device memory
    Cuda(i32),
    /// Any other DLPack device type and id
    Other {
        /// DLPack device type code
        kind: i32,
        /// Device ordinal
        id: i32,
    },
}

impl Device {
    /// DLPack `(device_type, device_id)` pair.
    pub fn dlpack(self) -> (i32, i32) {
        match self {
            Device::Cpu => (1, 0),
            Device::Cuda(id) => (2, id),
            Device::Other { kind, id } => (kind, id),
        }
    }

    /// Device from a DLPack `(device_type, device_id)` pair.
    pub fn from_dlpack(kind: i32, id: i32) -> Self {
        match kind {
            1 => Device::Cpu,
            2 => Device::Cuda(id),
            _ => Device::Other { kind, id },
        }
    }
}

/// Unit in which caller-supplied strides are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrideUnit {
    /// Strides count elements.
    #[default]
    Elements,
    /// Strides count bytes.
    Bytes,
}

#[derive(Debug, Clone)]
enum ViewData<'a> {
    Borrowed(&'a [u8]),
    Shared {
        storage: SharedStorage,
        generation: u64,
        allocation: Allocation,
    },
    Owned(Arc<[u8]>),
}

/// Strided view of 1 to 4 axes of typed elements.
#[derive(Debug, Clone)]
pub struct ArrayView<'a> {
    data: ViewData<'a>,
    offset: usize,
    dtype: DType,
    shape: Vec<usize>,
    strides: Vec<isize>,
    device: Device,
    writable: bool,
}

impl<'a> ArrayView<'a> {
    /// Creates a read-only view of row-major contiguous data.
    ///
    /// `data` must hold exactly `product(shape)` elements.
    pub fn new(data: &'a [u8], dtype: DType, shape: &[usize]) -> Result<Self> {
        let needed = dense_len(shape, dtype)?;
        if data.len() != needed {
            return Err(Error::invalid_argument(format!(
                "shape {shape:?} of {dtype} needs {needed} bytes, buffer has {}",
                data.len()
            )));
        }
        let strides = row_major_bytes(shape, dtype);
        Self::build(ViewData::Borrowed(data), data.len(), 0, dtype, shape, strides)
    }

    /// Creates a read-only view with explicit strides.
    ///
    /// `offset` is the byte position of the element at index zero. Strides of
    /// `None` mean row-major contiguous.
    pub fn strided(
        data: &'a [u8],
        offset: usize,
        dtype: DType,
        shape: &[usize],
        strides: Option<&[isize]>,
        unit: StrideUnit,
    ) -> Result<Self> {
        check_rank(shape.len())?;
        let strides = match strides {
            None => {
                layout::dense_span(shape, dtype.size())?;
                row_major_bytes(shape, dtype)
            }
            Some(s) if s.len() != shape.len() => {
                return Err(Error::invalid_argument(format!(
                    "{} strides given for rank {}",
                    s.len(),
                    shape.len()
                )));
            }
            Some(s) => match unit {
                StrideUnit::Bytes => s.to_vec(),
                StrideUnit::Elements => s
                    .iter()
                    .map(|&v| v.checked_mul(dtype.size() as isize))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| Error::invalid_argument(format!("element strides {s:?} overflow")))?,
            },
        };
        Self::build(ViewData::Borrowed(data), data.len(), offset, dtype, shape, strides)
    }

    /// Row-major view of a typed slice.
    pub fn from_slice<T: Element>(data: &'a [T], shape: &[usize]) -> Result<Self> {
        Self::new(bytemuck::cast_slice(data), T::DTYPE, shape)
    }

    /// View of a typed slice with element strides, starting at `data[0]`.
    pub fn from_slice_strided<T: Element>(data: &'a [T], shape: &[usize], strides: &[isize]) -> Result<Self> {
        Self::strided(
            bytemuck::cast_slice(data),
            0,
            T::DTYPE,
            shape,
            Some(strides),
            StrideUnit::Elements,
        )
    }

    /// Sets the device marker.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    fn build(
        data: ViewData<'a>,
        data_len: usize,
        offset: usize,
        dtype: DType,
        shape: &[usize],
        strides: Vec<isize>,
    ) -> Result<Self> {
        if !shape.contains(&0) && shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n)).is_none() {
            return Err(Error::invalid_argument(format!("shape {shape:?} has too many elements")));
        }
        if let Some((lo, hi)) = layout::byte_extent(shape, &strides, dtype.size())? {
            let offset = isize::try_from(offset)
                .map_err(|_| Error::invalid_argument(format!("offset {offset} out of range")))?;
            let (start, end) = match (offset.checked_add(lo), offset.checked_add(hi)) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(Error::invalid_argument(format!("offset {offset} out of range"))),
            };
            if start < 0 || end > data_len as isize {
                return Err(Error::invalid_argument(format!(
                    "shape {shape:?} with strides {strides:?} at offset {offset} \
                     addresses bytes {start}..{end}, buffer has {data_len}"
                )));
            }
        }
        Ok(Self {
            data,
            offset,
            dtype,
            shape: shape.to_vec(),
            strides,
            device: Device::Cpu,
            writable: false,
        })
    }
}

impl ArrayView<'static> {
    /// Row-major view owning `bytes`.
    pub fn owned(bytes: Vec<u8>, dtype: DType, shape: &[usize]) -> Result<Self> {
        let needed = dense_len(shape, dtype)?;
        if bytes.len() != needed {
            return Err(Error::invalid_argument(format!(
                "shape {shape:?} of {dtype} needs {needed} bytes, got {}",
                bytes.len()
            )));
        }
        let len = bytes.len();
        let strides = row_major_bytes(shape, dtype);
        Self::build(ViewData::Owned(bytes.into()), len, 0, dtype, shape, strides)
    }

    /// Alias of buffer storage at its current generation.
    pub(crate) fn aliased(
        storage: SharedStorage,
        generation: u64,
        offset: usize,
        dtype: DType,
        shape: &[usize],
        strides: Vec<isize>,
        writable: bool,
    ) -> Result<Self> {
        let allocation = storage.allocation_at(generation)?;
        let len = allocation.byte_len();
        let mut view = Self::build(
            ViewData::Shared {
                storage,
                generation,
                allocation,
            },
            len,
            offset,
            dtype,
            shape,
            strides,
        )?;
        view.writable = writable;
        Ok(view)
    }

    /// View with an all-zero shape and no data.
    pub fn degenerate(dtype: DType, rank: usize) -> Self {
        let rank = rank.clamp(1, 4);
        Self {
            data: ViewData::Owned(Arc::from(Vec::new())),
            offset: 0,
            dtype,
            shape: vec![0; rank],
            strides: vec![0; rank],
            device: Device::Cpu,
            writable: false,
        }
    }
}

impl ArrayView<'_> {
    /// Element type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// DLPack-style tag of the element type.
    #[inline]
    pub fn tag(&self) -> DTypeTag {
        self.dtype.tag()
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Axis extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte strides.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Byte offset of the element at index zero.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Device marker.
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// True if writes through this view reach the owner's storage.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        if self.shape.contains(&0) {
            return 0;
        }
        self.shape.iter().product()
    }

    /// True if some axis has extent 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strides in elements, if every stride is a multiple of the item size.
    pub fn element_strides(&self) -> Option<Vec<isize>> {
        let size = self.dtype.size() as isize;
        self.strides
            .iter()
            .map(|&s| (s % size == 0).then_some(s / size))
            .collect()
    }

    /// True if the elements are laid out without gaps in `order`.
    pub fn is_contiguous(&self, order: MemoryOrder) -> bool {
        layout::is_contiguous_bytes(&self.shape, &self.strides, self.dtype.size(), order)
    }

    /// Storage handle when this view aliases a pixel buffer.
    pub fn owner(&self) -> Option<&SharedStorage> {
        match &self.data {
            ViewData::Shared { storage, .. } => Some(storage),
            _ => None,
        }
    }

    /// Allocation kept alive by this view when it aliases a pixel buffer.
    ///
    /// Remains valid after the buffer reallocates, although reads through the
    /// view then fail.
    pub fn allocation(&self) -> Option<&Allocation> {
        match &self.data {
            ViewData::Shared { allocation, .. } => Some(allocation),
            _ => None,
        }
    }

    /// True if this view aliases `storage`.
    pub fn aliases(&self, storage: &SharedStorage) -> bool {
        self.owner().is_some_and(|s| s.ptr_eq(storage))
    }

    fn require_cpu(&self) -> Result<()> {
        if self.device != Device::Cpu {
            return Err(Error::invalid_argument(format!(
                "array memory on {:?} is not accessible, only CPU is supported",
                self.device
            )));
        }
        Ok(())
    }

    /// Runs `f` on the backing bytes. Element zero is at [`offset`](Self::offset).
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.require_cpu()?;
        match &self.data {
            ViewData::Borrowed(bytes) => Ok(f(*bytes)),
            ViewData::Owned(bytes) => Ok(f(&bytes[..])),
            ViewData::Shared { storage, generation, .. } => storage.read(*generation, f),
        }
    }

    /// Runs `f` on the mutable backing bytes of a writable view.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        self.require_cpu()?;
        match &self.data {
            ViewData::Shared { storage, generation, .. } if self.writable => storage.write(*generation, f),
            _ => Err(Error::invalid_argument("view is read-only")),
        }
    }

    /// Address of element zero, for descriptor encodings.
    pub fn address(&self) -> Result<usize> {
        self.with_bytes(|bytes| bytes.as_ptr() as usize + self.offset)
    }

    /// Byte position of a multi-index relative to the start of the backing bytes.
    pub fn byte_offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::invalid_argument(format!(
                "index of rank {} for view of rank {}",
                index.len(),
                self.rank()
            )));
        }
        let mut pos = self.offset as isize;
        for (axis, ((&i, &extent), &stride)) in index.iter().zip(&self.shape).zip(&self.strides).enumerate() {
            if i >= extent {
                return Err(Error::out_of_range(AXIS_NAMES[axis], i as i64, extent));
            }
            pos += i as isize * stride;
        }
        Ok(pos as usize)
    }

    /// Element at `index` as a scalar.
    pub fn value(&self, index: &[usize]) -> Result<Scalar> {
        let at = self.byte_offset(index)?;
        self.with_bytes(|bytes| element::read_scalar(self.dtype, &bytes[at..]))
    }

    /// Typed element at `index`.
    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T> {
        self.expect_dtype::<T>()?;
        let at = self.byte_offset(index)?;
        self.with_bytes(|bytes| T::read_ne(&bytes[at..]))
    }

    /// Stores a typed element through a writable view.
    pub fn set<T: Element>(&self, index: &[usize], value: T) -> Result<()> {
        self.expect_dtype::<T>()?;
        let at = self.byte_offset(index)?;
        self.with_bytes_mut(|bytes| value.write_ne(&mut bytes[at..]))
    }

    fn expect_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::invalid_argument(format!(
                "view holds {}, requested {}",
                self.dtype,
                T::DTYPE
            )));
        }
        Ok(())
    }

    /// Visits the byte offset of every element in row-major index order.
    fn for_each_offset(&self, mut f: impl FnMut(usize)) {
        if self.is_empty() {
            return;
        }
        let rank = self.rank();
        let mut index = vec![0usize; rank];
        let mut pos = self.offset as isize;
        loop {
            f(pos as usize);
            let mut axis = rank;
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                index[axis] += 1;
                pos += self.strides[axis];
                if index[axis] < self.shape[axis] {
                    break;
                }
                pos -= self.strides[axis] * self.shape[axis] as isize;
                index[axis] = 0;
            }
        }
    }

    /// Elements gathered into row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.expect_dtype::<T>()?;
        self.with_bytes(|bytes| {
            let mut out = Vec::with_capacity(self.len());
            self.for_each_offset(|at| out.push(T::read_ne(&bytes[at..])));
            out
        })
    }

    /// Element bytes gathered into row-major order.
    pub fn to_contiguous_bytes(&self) -> Result<Vec<u8>> {
        let size = self.dtype.size();
        self.with_bytes(|bytes| {
            let mut out = Vec::with_capacity(self.len() * size);
            self.for_each_offset(|at| out.extend_from_slice(&bytes[at..at + size]));
            out
        })
    }

    /// Row-major copy that owns its memory.
    pub fn to_owned_view(&self) -> Result<ArrayView<'static>> {
        let bytes = self.to_contiguous_bytes()?;
        ArrayView::owned(bytes, self.dtype, &self.shape)
    }
}

const AXIS_NAMES: [&str; 4] = ["axis 0", "axis 1", "axis 2", "axis 3"];

fn check_rank(rank: usize) -> Result<()> {
    if !(1..=4).contains(&rank) {
        return Err(Error::invalid_argument(format!("rank {rank} not in 1..=4")));
    }
    Ok(())
}

/// Byte length of a dense `shape`, validating rank and size.
fn dense_len(shape: &[usize], dtype: DType) -> Result<usize> {
    check_rank(shape.len())?;
    layout::dense_span(shape, dtype.size())?;
    Ok(shape.iter().product::<usize>() * dtype.size())
}

fn row_major_bytes(shape: &[usize], dtype: DType) -> Vec<isize> {
    layout::contiguous_strides(shape, MemoryOrder::RowMajor)
        .into_iter()
        .map(|s| s * dtype.size() as isize)
        .collect()
}
