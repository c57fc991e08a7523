//! Strided copy and cast between array views and pixel buffers.
//!
//! [`copy`] imports a foreign [`ArrayView`] into a [`PixelBuffer`]: the view's
//! axes are mapped onto native axes by an [`AxisPermutation`], the destination
//! is resized to the permuted shape, and every element is converted to the
//! destination's element type.
//!
//! Three paths exist, reported as [`CopyPath`]:
//!
//! - [`CopyPath::Bulk`]: source layout already matches native order and the
//!   element types agree, so one byte copy suffices.
//! - [`CopyPath::Linear`]: layouts match but the element type differs; one
//!   linear cast loop.
//! - [`CopyPath::Strided`]: anything else; a nested loop over `c, z, y, x`
//!   reading each element through the source strides.
//!
//! Bounds are checked when views are built and the destination is sized before
//! the loop starts, so the kernels themselves cannot fail. Should a caller
//! observe an error after the destination was resized, its contents are
//! unspecified.
//!
//! # Example
//!
//! ```
//! use pixbridge_core::{copy, ArrayView, AxisPermutation, CastPolicy, CopyPath, DType, PixelBuffer};
//!
//! // 2 rows, 3 columns, 1 channel, row-major (y, x, c)
//! let data: Vec<f32> = vec![0.0, 1.0, 2.0, 3.0, 4.0, 300.0];
//! let view = ArrayView::from_slice(&data, &[2, 3, 1]).unwrap();
//! let order = AxisPermutation::parse("yxc").unwrap();
//!
//! let mut buf = PixelBuffer::empty(DType::U8);
//! let path = copy::copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap();
//! assert_eq!(path, CopyPath::Linear);
//! assert_eq!(buf.dims(), [3, 2, 1, 1]);
//! assert_eq!(buf.get::<u8>(2, 1, 0, 0).unwrap(), 255);
//! ```

use crate::axis::{Axis, AxisPermutation};
use crate::buffer::{resolve_index, PixelBuffer};
use crate::dtype::{DType, DTypeRegistry};
use crate::element::{dispatch_dtype, CastPolicy, Element};
use crate::error::{Error, Result};
use crate::layout::{self, MemoryOrder};
use crate::view::{ArrayView, Device};
use std::fmt;

/// Loop strategy chosen for a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyPath {
    /// Nothing to copy.
    Empty,
    /// Single byte copy.
    Bulk,
    /// Single linear cast loop.
    Linear,
    /// Nested per-axis loop.
    Strided,
}

impl fmt::Display for CopyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Bulk => "bulk",
            Self::Linear => "linear",
            Self::Strided => "strided",
        })
    }
}

/// Element layout of one copy, in native axis order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Plan {
    pub dims: [usize; 4],
    /// Byte position of the first source element.
    pub src_offset: usize,
    /// Source strides in bytes.
    pub src_strides: [isize; 4],
    /// Element position of the first destination element.
    pub dst_offset: usize,
    /// Destination strides in elements.
    pub dst_strides: [usize; 4],
}

/// Copies the elements described by `plan` from `src` to `dst`, converting
/// `S` to `D`.
pub(crate) fn run<S: Element, D: Element>(plan: &Plan, src: &[u8], dst: &mut [u8], policy: CastPolicy) -> CopyPath {
    let ssize = size_of::<S>();
    let dsize = size_of::<D>();
    let count: usize = plan.dims.iter().product();
    if count == 0 {
        return CopyPath::Empty;
    }

    let dst_strides = plan.dst_strides.map(|s| s as isize);
    let dense = layout::is_contiguous_bytes(&plan.dims, &plan.src_strides, ssize, MemoryOrder::ColumnMajor)
        && layout::is_contiguous(&plan.dims, &dst_strides, MemoryOrder::ColumnMajor);

    if dense {
        let input = &src[plan.src_offset..plan.src_offset + count * ssize];
        let output = &mut dst[plan.dst_offset * dsize..(plan.dst_offset + count) * dsize];
        if S::DTYPE == D::DTYPE {
            output.copy_from_slice(input);
            return CopyPath::Bulk;
        }
        for (i, o) in input.chunks_exact(ssize).zip(output.chunks_exact_mut(dsize)) {
            D::cast_from(S::read_ne(i), policy).write_ne(o);
        }
        return CopyPath::Linear;
    }

    let [w, h, d, c] = plan.dims;
    let [sx, sy, sz, sc] = plan.src_strides;
    let [dx, dy, dz, dc] = plan.dst_strides;
    for ci in 0..c {
        let src_c = plan.src_offset as isize + ci as isize * sc;
        let dst_c = plan.dst_offset + ci * dc;
        for zi in 0..d {
            let src_z = src_c + zi as isize * sz;
            let dst_z = dst_c + zi * dz;
            for yi in 0..h {
                let src_y = src_z + yi as isize * sy;
                let dst_y = dst_z + yi * dy;
                for xi in 0..w {
                    let at = (src_y + xi as isize * sx) as usize;
                    let to = (dst_y + xi * dx) * dsize;
                    D::cast_from(S::read_ne(&src[at..]), policy).write_ne(&mut dst[to..]);
                }
            }
        }
    }
    CopyPath::Strided
}

/// Native sizes and byte strides of `src` seen through `order`.
fn native_layout(src: &ArrayView<'_>, order: &AxisPermutation) -> Result<([usize; 4], [isize; 4])> {
    if src.device() != Device::Cpu {
        return Err(Error::invalid_argument(format!(
            "cannot copy from {:?} memory, only CPU is supported",
            src.device()
        )));
    }
    if src.rank() != order.rank() {
        return Err(Error::invalid_argument(format!(
            "array of rank {} cannot be read with axis order {order} (rank {})",
            src.rank(),
            order.rank()
        )));
    }
    let dims = order.to_native(src.shape(), 1)?;
    let strides = order.to_native(src.strides(), 0)?;
    Ok((dims, strides))
}

fn run_into<S: Element>(src: &ArrayView<'_>, dst: &mut PixelBuffer, plan: &Plan, policy: CastPolicy) -> Result<CopyPath> {
    let dtype = dst.dtype();
    let path = src.with_bytes(|input| {
        dst.with_bytes_mut(|output| dispatch_dtype!(dtype, D => run::<S, D>(plan, input, output, policy)))
    })??;
    Ok(path)
}

/// Import handler for source element type `S`.
///
/// Registered in the [`DTypeRegistry`]; use [`copy`] instead of calling this
/// directly.
pub fn import_as<S: Element>(
    src: &ArrayView<'_>,
    dst: &mut PixelBuffer,
    order: &AxisPermutation,
    policy: CastPolicy,
) -> Result<CopyPath> {
    if src.dtype() != S::DTYPE {
        return Err(Error::internal(format!(
            "{} import handler called for {} array",
            S::DTYPE,
            src.dtype()
        )));
    }
    let (dims, src_strides) = native_layout(src, order)?;

    if src.is_empty() {
        if dst.is_shared() {
            return Err(Error::invalid_argument("cannot import an empty array into a shared buffer"));
        }
        *dst = PixelBuffer::empty(dst.dtype());
        return Ok(CopyPath::Empty);
    }

    // Source aliasing the destination would be clobbered by the resize.
    if src.aliases(dst.storage()) {
        let snapshot = src.to_owned_view()?;
        return import_as::<S>(&snapshot, dst, order, policy);
    }

    dst.resize(dims)?;
    let plan = Plan {
        dims,
        src_offset: src.offset(),
        src_strides,
        dst_offset: 0,
        dst_strides: dst.strides(),
    };
    run_into::<S>(src, dst, &plan, policy)
}

/// Copies `src` into `dst`, resizing `dst` to the permuted shape.
///
/// `order` names the native axis of each source axis; its rank must equal the
/// source rank. The destination keeps its element type and values are
/// converted with `policy`.
pub fn copy(src: &ArrayView<'_>, dst: &mut PixelBuffer, order: &AxisPermutation, policy: CastPolicy) -> Result<CopyPath> {
    let entry = DTypeRegistry::global().lookup(src.tag())?;
    let path = (entry.import)(src, dst, order, policy)?;
    tracing::trace!(
        from = %src.dtype(),
        to = %dst.dtype(),
        %order,
        shape = ?src.shape(),
        %path,
        "array copied into buffer"
    );
    Ok(path)
}

/// Imports `src` into a new buffer of element type `dtype`.
pub fn import(src: &ArrayView<'_>, order: &AxisPermutation, dtype: DType, policy: CastPolicy) -> Result<PixelBuffer> {
    let mut buf = PixelBuffer::empty(dtype);
    copy(src, &mut buf, order, policy)?;
    Ok(buf)
}

/// Copies a source without a `z` axis into plane `z` of an existing buffer.
///
/// The width, height and channel count of the source must match `dst`; the
/// buffer is not resized. Negative `z` counts from the last plane.
pub fn copy_into_plane(
    src: &ArrayView<'_>,
    dst: &mut PixelBuffer,
    order: &AxisPermutation,
    z: i64,
    policy: CastPolicy,
) -> Result<CopyPath> {
    if order.contains(Axis::Z) {
        return Err(Error::invalid_argument(format!(
            "axis order {order} includes z, cannot copy into a single plane"
        )));
    }
    let (dims, src_strides) = native_layout(src, order)?;
    let [w, h, depth, c] = dst.dims();
    if dims[0] != w || dims[1] != h || dims[3] != c {
        return Err(Error::invalid_argument(format!(
            "array of native size {dims:?} does not fit plane of buffer {:?}",
            dst.dims()
        )));
    }
    let z = resolve_index(z, depth, "z")?;
    if src.aliases(dst.storage()) {
        let snapshot = src.to_owned_view()?;
        return copy_into_plane(&snapshot, dst, order, z as i64, policy);
    }

    let plan = Plan {
        dims,
        src_offset: src.offset(),
        src_strides,
        dst_offset: z * w * h,
        dst_strides: dst.strides(),
    };
    let path = dispatch_dtype!(src.dtype(), S => run_into::<S>(src, dst, &plan, policy))?;
    tracing::trace!(z, %order, %path, "array copied into plane");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_order_is_bulk() {
        let data: Vec<u16> = (0..24).collect();
        // column-major (x fastest) strides over x, y, z, c
        let view = ArrayView::from_slice_strided(&data, &[4, 3, 1, 2], &[1, 4, 12, 12]).unwrap();
        let mut buf = PixelBuffer::empty(DType::U16);
        let path = copy(&view, &mut buf, &AxisPermutation::native(), CastPolicy::Clamp).unwrap();
        assert_eq!(path, CopyPath::Bulk);
        assert_eq!(buf.to_vec::<u16>().unwrap(), data);
    }

    #[test]
    fn test_reversed_row_major_is_bulk() {
        let data: Vec<u8> = (0..24).collect();
        let view = ArrayView::from_slice(&data, &[2, 3, 4]).unwrap();
        let order = AxisPermutation::parse("cyx").unwrap();
        let mut buf = PixelBuffer::empty(DType::U8);
        assert_eq!(copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap(), CopyPath::Bulk);
        assert_eq!(buf.dims(), [4, 3, 1, 2]);
        assert_eq!(buf.get::<u8>(3, 2, 0, 1).unwrap(), 23);
    }

    #[test]
    fn test_linear_cast_path() {
        let data = [0.5f32, 1.5, -2.0, 400.0];
        let view = ArrayView::from_slice(&data, &[4]).unwrap();
        let mut buf = PixelBuffer::empty(DType::U8);
        let order = AxisPermutation::parse("x").unwrap();
        assert_eq!(copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap(), CopyPath::Linear);
        assert_eq!(buf.to_vec::<u8>().unwrap(), vec![0, 1, 0, 255]);
    }

    #[test]
    fn test_strided_writes_values() {
        let data: Vec<i32> = vec![10, 11, 12, 20, 21, 22];
        let view = ArrayView::from_slice(&data, &[2, 3]).unwrap();
        let order = AxisPermutation::parse("xy").unwrap();
        let mut buf = PixelBuffer::empty(DType::I32);
        assert_eq!(copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap(), CopyPath::Strided);
        assert_eq!(buf.dims(), [2, 3, 1, 1]);
        assert_eq!(buf.to_vec::<i32>().unwrap(), vec![10, 20, 11, 21, 12, 22]);
        assert_eq!(buf.get::<i32>(0, 1, 0, 0).unwrap(), 11);
    }

    #[test]
    fn test_rank_mismatch() {
        let data = [0u8; 6];
        let view = ArrayView::from_slice(&data, &[2, 3]).unwrap();
        let mut buf = PixelBuffer::empty(DType::U8);
        let order = AxisPermutation::parse("yxc").unwrap();
        assert!(copy(&view, &mut buf, &order, CastPolicy::Clamp).is_err());
    }

    #[test]
    fn test_empty_source() {
        let data: [f32; 0] = [];
        let view = ArrayView::from_slice(&data, &[0, 3]).unwrap();
        let mut buf = PixelBuffer::new(2, 2, 1, 1, DType::F32).unwrap();
        let order = AxisPermutation::parse("yx").unwrap();
        assert_eq!(copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap(), CopyPath::Empty);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_self_import_via_alias() {
        let mut buf = PixelBuffer::from_vec([2, 1, 1, 1], vec![1u8, 2]).unwrap();
        let view = crate::export::export(&buf, &AxisPermutation::parse("x").unwrap(), None, false).unwrap();
        let order = AxisPermutation::parse("y").unwrap();
        copy(&view, &mut buf, &order, CastPolicy::Clamp).unwrap();
        assert_eq!(buf.dims(), [1, 2, 1, 1]);
        assert_eq!(buf.to_vec::<u8>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_copy_into_plane() {
        let mut buf = PixelBuffer::new(2, 2, 3, 1, DType::F32).unwrap();
        let plane = [1.0f32, 2.0, 3.0, 4.0];
        let view = ArrayView::from_slice(&plane, &[2, 2]).unwrap();
        let order = AxisPermutation::parse("yx").unwrap();
        copy_into_plane(&view, &mut buf, &order, -1, CastPolicy::Clamp).unwrap();
        assert_eq!(buf.dims(), [2, 2, 3, 1]);
        assert_eq!(buf.get::<f32>(1, 0, 2, 0).unwrap(), 2.0);
        assert_eq!(buf.get::<f32>(0, 1, 2, 0).unwrap(), 3.0);
        assert_eq!(buf.get::<f32>(0, 1, 0, 0).unwrap(), 0.0);

        assert!(copy_into_plane(&view, &mut buf, &order, 3, CastPolicy::Clamp).is_err());
        let wrong = [0f32; 6];
        let view = ArrayView::from_slice(&wrong, &[2, 3]).unwrap();
        assert!(copy_into_plane(&view, &mut buf, &order, 0, CastPolicy::Clamp).is_err());
    }
}
