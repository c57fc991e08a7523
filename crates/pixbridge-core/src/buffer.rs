//! Native 4-axis pixel buffers.
//!
//! A [`PixelBuffer`] stores `width * height * depth * channels` elements of a
//! single [`DType`] contiguously in native order: `x` varies fastest, then `y`,
//! `z` and finally `c` (planar channels).
//!
//! Storage is reference counted. [`PixelBuffer::share`] creates an alias of the
//! same storage, and exported views hold the storage alive independently of the
//! buffer. Every reallocation swaps in a new [`Allocation`] and bumps a
//! generation counter; handles created before the reallocation detect it and
//! fail with an internal consistency error instead of reading stale memory.
//! Views still keep their old allocation alive, so raw addresses given to
//! foreign consumers never dangle.
//!
//! # Example
//!
//! ```
//! use pixbridge_core::{DType, PixelBuffer};
//!
//! let mut buf = PixelBuffer::new(4, 3, 1, 3, DType::F32).unwrap();
//! buf.set(1, 2, 0, 1, 0.5f32).unwrap();
//! assert_eq!(buf.get::<f32>(1, 2, 0, 1).unwrap(), 0.5);
//!
//! // Negative coordinates are relative to the end of the axis
//! assert_eq!(buf.get::<f32>(-3, -1, 0, -2).unwrap(), 0.5);
//! ```

use crate::dtype::DType;
use crate::element::{self, CastPolicy, Element, Scalar};
use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// One byte allocation of a [`SharedStorage`].
///
/// Reallocating a storage swaps in a new allocation; views keep the one they
/// were created over, so addresses handed to foreign consumers stay valid for
/// as long as the view lives.
#[derive(Clone)]
pub struct Allocation(Arc<RwLock<Vec<u8>>>);

impl Allocation {
    fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(RwLock::new(bytes)))
    }

    /// Address of the first byte.
    pub fn address(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).as_ptr() as usize
    }

    /// Length in bytes.
    pub fn byte_len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if both handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &Allocation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.0.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allocation({} bytes at {:#x})", self.byte_len(), self.address())
    }
}

struct StorageInner {
    allocation: Allocation,
    generation: u64,
}

/// Reference-counted byte storage shared by buffers and views.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<RwLock<StorageInner>>,
}

impl SharedStorage {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StorageInner {
                allocation: Allocation::new(bytes),
                generation: 0,
            })),
        }
    }

    /// Number of reallocations so far.
    pub fn generation(&self) -> u64 {
        self.read_inner(|inner| inner.generation)
    }

    /// Current length in bytes.
    pub fn byte_len(&self) -> usize {
        self.read_inner(|inner| inner.allocation.byte_len())
    }

    /// Address of the first byte.
    ///
    /// Stable until the next reallocation.
    pub fn address(&self) -> usize {
        self.read_inner(|inner| inner.allocation.address())
    }

    /// Current allocation.
    pub fn allocation(&self) -> Allocation {
        self.read_inner(|inner| inner.allocation.clone())
    }

    /// True if both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &SharedStorage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles (buffers, aliases and views).
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn read_inner<R>(&self, f: impl FnOnce(&StorageInner) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Allocation at `generation`, or a stale error.
    pub(crate) fn allocation_at(&self, generation: u64) -> Result<Allocation> {
        self.read_inner(|inner| {
            if inner.generation != generation {
                return Err(stale(generation, inner.generation));
            }
            Ok(inner.allocation.clone())
        })
    }

    /// Runs `f` on the bytes if the storage is still at `generation`.
    pub(crate) fn read<R>(&self, generation: u64, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if guard.generation != generation {
            return Err(stale(generation, guard.generation));
        }
        Ok(guard.allocation.read(f))
    }

    /// Runs `f` on the mutable bytes if the storage is still at `generation`.
    pub(crate) fn write<R>(&self, generation: u64, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if guard.generation != generation {
            return Err(stale(generation, guard.generation));
        }
        Ok(guard.allocation.write(f))
    }

    /// Swaps in a new allocation and returns the new generation.
    ///
    /// The previous allocation is freed once no view holds it.
    fn replace(&self, bytes: Vec<u8>) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.allocation = Allocation::new(bytes);
        guard.generation += 1;
        guard.generation
    }
}

impl fmt::Debug for SharedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read_inner(|inner| {
            f.debug_struct("SharedStorage")
                .field("len", &inner.allocation.byte_len())
                .field("generation", &inner.generation)
                .field("handles", &Arc::strong_count(&self.inner))
                .finish()
        })
    }
}

fn stale(expected: u64, actual: u64) -> Error {
    Error::internal(format!(
        "storage was reallocated (generation {expected} -> {actual}) while a handle to it was alive"
    ))
}

/// Resolves a possibly negative coordinate against an axis size.
///
/// Negative values count from the end of the axis (`-1` is the last index).
pub fn resolve_index(index: i64, size: usize, axis: &'static str) -> Result<usize> {
    let resolved = if index < 0 { size as i64 + index } else { index };
    if resolved < 0 || resolved >= size as i64 {
        return Err(Error::out_of_range(axis, index, size));
    }
    Ok(resolved as usize)
}

fn byte_len_of(dims: [usize; 4], dtype: DType) -> Result<usize> {
    dims.iter()
        .try_fold(dtype.size(), |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::invalid_argument(format!("buffer of {dims:?} {dtype} is too large")))
}

fn check_dims(dims: [usize; 4]) -> Result<()> {
    if dims.contains(&0) {
        return Err(Error::invalid_argument(format!(
            "buffer axis sizes must be >= 1, got {dims:?}"
        )));
    }
    Ok(())
}

/// A 4-axis native pixel buffer.
///
/// [`try_clone`](Self::try_clone) makes a deep, non-shared copy; use
/// [`share`](Self::share) for an alias of the same storage.
pub struct PixelBuffer {
    dims: [usize; 4],
    dtype: DType,
    storage: SharedStorage,
    generation: u64,
    shared: bool,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(width: usize, height: usize, depth: usize, channels: usize, dtype: DType) -> Result<Self> {
        Self::with_dims([width, height, depth, channels], dtype)
    }

    /// Creates a zero-filled buffer from native `[w, h, d, c]` sizes.
    pub fn with_dims(dims: [usize; 4], dtype: DType) -> Result<Self> {
        check_dims(dims)?;
        let len = byte_len_of(dims, dtype)?;
        Ok(Self::from_parts(dims, dtype, vec![0; len]))
    }

    /// The empty buffer: all four sizes are 0 and there is no data.
    pub fn empty(dtype: DType) -> Self {
        Self::from_parts([0; 4], dtype, Vec::new())
    }

    /// Wraps native-order bytes.
    pub fn from_bytes(dims: [usize; 4], dtype: DType, bytes: Vec<u8>) -> Result<Self> {
        check_dims(dims)?;
        let len = byte_len_of(dims, dtype)?;
        if bytes.len() != len {
            return Err(Error::invalid_argument(format!(
                "buffer of {dims:?} {dtype} needs {len} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self::from_parts(dims, dtype, bytes))
    }

    /// Builds a buffer from native-order elements.
    pub fn from_vec<T: Element>(dims: [usize; 4], data: Vec<T>) -> Result<Self> {
        Self::from_bytes(dims, T::DTYPE, bytemuck::cast_slice::<T, u8>(&data).to_vec())
    }

    /// Creates a buffer with every element set to `value`.
    pub fn filled<T: Element>(dims: [usize; 4], value: T) -> Result<Self> {
        check_dims(dims)?;
        let count = dims.iter().product();
        Self::from_vec(dims, vec![value; count])
    }

    fn from_parts(dims: [usize; 4], dtype: DType, bytes: Vec<u8>) -> Self {
        Self {
            dims,
            dtype,
            storage: SharedStorage::new(bytes),
            generation: 0,
            shared: false,
        }
    }

    /// Width (x extent).
    #[inline]
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    /// Height (y extent).
    #[inline]
    pub fn height(&self) -> usize {
        self.dims[1]
    }

    /// Depth (z extent).
    #[inline]
    pub fn depth(&self) -> usize {
        self.dims[2]
    }

    /// Number of channels (c extent).
    #[inline]
    pub fn channels(&self) -> usize {
        self.dims[3]
    }

    /// Native `[w, h, d, c]` sizes.
    #[inline]
    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    /// Element type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Size of the pixel data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len() * self.dtype.size()
    }

    /// True for the empty buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if this buffer aliases storage owned elsewhere.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Underlying storage handle.
    #[inline]
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Storage generation this buffer was last synchronised with.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Native strides in elements.
    pub fn strides(&self) -> [usize; 4] {
        let [w, h, d, _] = self.dims;
        [1, w, w * h, w * h * d]
    }

    /// Native strides in bytes.
    pub fn byte_strides(&self) -> [usize; 4] {
        self.strides().map(|s| s * self.dtype.size())
    }

    /// Creates an alias of this buffer's storage.
    ///
    /// The alias sees all writes made through this buffer and vice versa. It
    /// cannot be resized to a different byte length.
    pub fn share(&self) -> PixelBuffer {
        Self {
            dims: self.dims,
            dtype: self.dtype,
            storage: self.storage.clone(),
            generation: self.generation,
            shared: true,
        }
    }

    /// Resizes to new native sizes, keeping the element type.
    ///
    /// Keeps the current bytes when the byte length is unchanged; otherwise
    /// reallocates zero-filled storage, invalidating aliases and views.
    pub fn resize(&mut self, dims: [usize; 4]) -> Result<()> {
        check_dims(dims)?;
        let len = byte_len_of(dims, self.dtype)?;
        if len != self.byte_len() {
            if self.shared {
                return Err(Error::invalid_argument(format!(
                    "cannot resize shared buffer from {:?} to {dims:?}",
                    self.dims
                )));
            }
            self.generation = self.storage.replace(vec![0; len]);
            tracing::trace!(?dims, dtype = %self.dtype, generation = self.generation, "buffer reallocated");
        }
        self.dims = dims;
        Ok(())
    }

    /// Runs `f` on the native-order bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.storage.read(self.generation, f)
    }

    /// Runs `f` on the mutable native-order bytes.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        self.storage.write(self.generation, f)
    }

    /// Deep copy in fresh, non-shared storage.
    ///
    /// Fails like any other read when this handle's storage was reallocated.
    pub fn try_clone(&self) -> Result<Self> {
        let bytes = self.to_bytes()?;
        Ok(Self::from_parts(self.dims, self.dtype, bytes))
    }

    /// Copy of the native-order bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// Copy of all elements in native order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.expect_dtype::<T>()?;
        self.with_bytes(|bytes| bytes.chunks_exact(self.dtype.size()).map(T::read_ne).collect())
    }

    /// Sets every element to `value`.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<()> {
        self.expect_dtype::<T>()?;
        let size = self.dtype.size();
        self.with_bytes_mut(|bytes| {
            for chunk in bytes.chunks_exact_mut(size) {
                value.write_ne(chunk);
            }
        })
    }

    fn expect_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::invalid_argument(format!(
                "buffer holds {}, requested {}",
                self.dtype,
                T::DTYPE
            )));
        }
        Ok(())
    }

    /// Element offset of a coordinate, negative values counting from the end.
    pub fn offset_of(&self, x: i64, y: i64, z: i64, c: i64) -> Result<usize> {
        let [w, h, d, ch] = self.dims;
        let x = resolve_index(x, w, "x")?;
        let y = resolve_index(y, h, "y")?;
        let z = resolve_index(z, d, "z")?;
        let c = resolve_index(c, ch, "c")?;
        Ok(x + w * (y + h * (z + d * c)))
    }

    /// Element at `(x, y, z, c)` as a scalar.
    pub fn value(&self, x: i64, y: i64, z: i64, c: i64) -> Result<Scalar> {
        let at = self.offset_of(x, y, z, c)? * self.dtype.size();
        self.with_bytes(|bytes| element::read_scalar(self.dtype, &bytes[at..]))
    }

    /// Stores a scalar at `(x, y, z, c)`, converting with `policy`.
    pub fn set_value(&mut self, x: i64, y: i64, z: i64, c: i64, value: Scalar, policy: CastPolicy) -> Result<()> {
        let at = self.offset_of(x, y, z, c)? * self.dtype.size();
        let dtype = self.dtype;
        self.with_bytes_mut(|bytes| element::write_scalar(dtype, value, policy, &mut bytes[at..]))
    }

    /// Typed element at `(x, y, z, c)`.
    pub fn get<T: Element>(&self, x: i64, y: i64, z: i64, c: i64) -> Result<T> {
        self.expect_dtype::<T>()?;
        let at = self.offset_of(x, y, z, c)? * self.dtype.size();
        self.with_bytes(|bytes| T::read_ne(&bytes[at..]))
    }

    /// Stores a typed element at `(x, y, z, c)`.
    pub fn set<T: Element>(&mut self, x: i64, y: i64, z: i64, c: i64, value: T) -> Result<()> {
        self.expect_dtype::<T>()?;
        let at = self.offset_of(x, y, z, c)? * self.dtype.size();
        self.with_bytes_mut(|bytes| value.write_ne(&mut bytes[at..]))
    }

    /// All channel values of the pixel at `(x, y, z)`.
    ///
    /// `z` may be omitted only when the depth is 1.
    pub fn pixel(&self, x: i64, y: i64, z: Option<i64>) -> Result<Vec<Scalar>> {
        let z = match z {
            Some(z) => z,
            None if self.depth() == 1 => 0,
            None => {
                return Err(Error::invalid_argument(format!(
                    "z can only be omitted when depth is 1, depth is {}",
                    self.depth()
                )));
            }
        };
        let base = self.offset_of(x, y, z, 0)?;
        let plane = self.strides()[3];
        let size = self.dtype.size();
        self.with_bytes(|bytes| {
            (0..self.channels())
                .map(|c| element::read_scalar(self.dtype, &bytes[(base + c * plane) * size..]))
                .collect()
        })
    }

    /// Element addressed by 2 to 4 coordinates.
    ///
    /// - `[x, y, z, c]`
    /// - `[x, y, c]` when depth is 1
    /// - `[x, y]` when depth and channel count are 1
    pub fn at(&self, coords: &[i64]) -> Result<Scalar> {
        let omitted = || {
            Error::invalid_argument(format!(
                "cannot omit coordinates of axes with size > 1 (buffer is {:?})",
                self.dims
            ))
        };
        match *coords {
            [x, y] if self.depth() == 1 && self.channels() == 1 => self.value(x, y, 0, 0),
            [x, y, c] if self.depth() == 1 => self.value(x, y, 0, c),
            [_, _] | [_, _, _] => Err(omitted()),
            [x, y, z, c] => self.value(x, y, z, c),
            _ => Err(Error::invalid_argument(format!(
                "expected 2 to 4 coordinates, got {}",
                coords.len()
            ))),
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("dims", &self.dims)
            .field("dtype", &self.dtype)
            .field("shared", &self.shared)
            .field("generation", &self.generation)
            .finish()
    }
}

impl fmt::Display for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w, h, d, c] = self.dims;
        write!(f, "<PixelBuffer {w}x{h}x{d}x{c} {}", self.dtype)?;
        if self.shared {
            f.write_str(" shared")?;
        }
        f.write_str(">")
    }
}

/// Source of finished pixel buffers, such as a file codec.
///
/// Implementations decide layout and element type themselves; no stride or
/// dtype negotiation takes place.
pub trait BufferSource {
    /// Loads the buffer stored at `path`.
    fn load(&self, path: &Path) -> Result<PixelBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_new_rejects_zero_axes() {
        assert!(PixelBuffer::new(0, 3, 1, 1, DType::U8).is_err());
        assert!(PixelBuffer::with_dims([2, 2, 1, 0], DType::U8).is_err());
        assert!(PixelBuffer::empty(DType::U8).is_empty());
    }

    #[test]
    fn test_native_layout() {
        let data: Vec<u16> = (0..24).collect();
        let buf = PixelBuffer::from_vec([4, 3, 1, 2], data).unwrap();
        assert_eq!(buf.strides(), [1, 4, 12, 12]);
        assert_eq!(buf.get::<u16>(1, 2, 0, 1).unwrap(), 1 + 4 * 2 + 12);
        assert_eq!(buf.byte_strides(), [2, 8, 24, 24]);
    }

    #[test]
    fn test_negative_indices() {
        let buf = PixelBuffer::from_vec([3, 2, 1, 1], vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buf.get::<u8>(-1, -1, 0, 0).unwrap(), 6);
        assert_eq!(buf.get::<u8>(-3, 0, 0, 0).unwrap(), 1);
        let err = buf.get::<u8>(-4, 0, 0, 0).unwrap_err();
        assert_eq!(err, Error::out_of_range("x", -4, 3));
        assert!(buf.get::<u8>(3, 0, 0, 0).is_err());
    }

    #[test]
    fn test_dtype_mismatch() {
        let buf = PixelBuffer::new(2, 2, 1, 1, DType::U8).unwrap();
        assert!(buf.get::<f32>(0, 0, 0, 0).is_err());
        assert!(buf.to_vec::<i8>().is_err());
    }

    #[test]
    fn test_share_aliases_storage() {
        let mut owner = PixelBuffer::new(2, 2, 1, 1, DType::I32).unwrap();
        let alias = owner.share();
        owner.set(1, 1, 0, 0, -9i32).unwrap();
        assert_eq!(alias.get::<i32>(1, 1, 0, 0).unwrap(), -9);
        assert!(alias.is_shared());
        assert!(alias.storage().ptr_eq(owner.storage()));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = PixelBuffer::filled([2, 1, 1, 1], 7u8).unwrap();
        let b = a.try_clone().unwrap();
        a.set(0, 0, 0, 0, 1u8).unwrap();
        assert_eq!(b.get::<u8>(0, 0, 0, 0).unwrap(), 7);
        assert!(!b.storage().ptr_eq(a.storage()));
        assert!(!b.is_shared());
    }

    #[test]
    fn test_clone_of_stale_alias_fails() {
        let mut owner = PixelBuffer::filled([2, 2, 1, 1], 3u8).unwrap();
        let alias = owner.share();
        owner.resize([8, 8, 1, 1]).unwrap();
        let err = alias.try_clone().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
    }

    #[test]
    fn test_resize_keeps_previous_allocation_for_holders() {
        let mut buf = PixelBuffer::filled([2, 2, 1, 1], 5u8).unwrap();
        let old = buf.storage().allocation();
        let address = old.address();
        buf.resize([64, 64, 1, 1]).unwrap();

        let new = buf.storage().allocation();
        assert!(!new.ptr_eq(&old));
        assert_eq!(new.byte_len(), 64 * 64);
        assert_eq!(old.address(), address);
        assert_eq!(old.byte_len(), 4);
    }

    #[test]
    fn test_resize_invalidates_aliases() {
        let mut owner = PixelBuffer::new(2, 2, 1, 1, DType::U8).unwrap();
        let alias = owner.share();
        owner.resize([4, 4, 1, 3]).unwrap();
        assert_eq!(owner.len(), 48);
        let err = alias.get::<u8>(0, 0, 0, 0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resize_same_length_keeps_storage() {
        let mut buf = PixelBuffer::from_vec([4, 1, 1, 1], vec![1u8, 2, 3, 4]).unwrap();
        let before = buf.generation();
        buf.resize([2, 2, 1, 1]).unwrap();
        assert_eq!(buf.generation(), before);
        assert_eq!(buf.get::<u8>(1, 1, 0, 0).unwrap(), 4);
    }

    #[test]
    fn test_shared_resize_rejected() {
        let owner = PixelBuffer::new(2, 2, 1, 1, DType::U8).unwrap();
        let mut alias = owner.share();
        assert!(alias.resize([3, 3, 1, 1]).is_err());
        assert!(alias.resize([4, 1, 1, 1]).is_ok());
    }

    #[test]
    fn test_pixel_and_at() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let buf = PixelBuffer::from_vec([2, 2, 1, 3], data).unwrap();
        let px = buf.pixel(1, 0, None).unwrap();
        assert_eq!(px, vec![Scalar::Float(1.0), Scalar::Float(5.0), Scalar::Float(9.0)]);
        assert_eq!(buf.at(&[1, 1, 2]).unwrap(), Scalar::Float(11.0));
        assert!(buf.at(&[1, 1]).is_err());
        assert!(buf.at(&[1]).is_err());

        let deep = PixelBuffer::new(2, 2, 2, 1, DType::U8).unwrap();
        assert!(deep.pixel(0, 0, None).is_err());
        assert!(deep.pixel(0, 0, Some(-1)).is_ok());
    }

    #[test]
    fn test_set_value_casts() {
        let mut buf = PixelBuffer::new(1, 1, 1, 1, DType::U8).unwrap();
        buf.set_value(0, 0, 0, 0, Scalar::Float(512.0), CastPolicy::Clamp).unwrap();
        assert_eq!(buf.get::<u8>(0, 0, 0, 0).unwrap(), 255);
    }
}
