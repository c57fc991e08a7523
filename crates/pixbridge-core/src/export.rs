//! Exporting pixel buffers as array views.
//!
//! When the requested element type matches the buffer's, [`export`] returns a
//! view that aliases the buffer storage: no bytes are copied, and writes
//! through a writable view are visible in the buffer. Otherwise the buffer is
//! converted into a new row-major array owned by the view.
//!
//! Native axes missing from the requested order must have size 1, except that
//! a single z-plane may be selected with [`ExportOptions::plane`].
//!
//! # Example
//!
//! ```
//! use pixbridge_core::{export, AxisPermutation, DType, PixelBuffer};
//!
//! let buf = PixelBuffer::new(640, 480, 1, 3, DType::U8).unwrap();
//! let yxc = AxisPermutation::parse("yxc").unwrap();
//!
//! let view = export::export(&buf, &yxc, None, false).unwrap();
//! assert_eq!(view.shape(), &[480, 640, 3]);
//! assert_eq!(view.strides(), &[640, 1, 640 * 480]);
//! assert!(view.aliases(buf.storage()));
//! ```

use crate::axis::{Axis, AxisPermutation};
use crate::buffer::{resolve_index, PixelBuffer};
use crate::copy::{self, Plan};
use crate::dtype::{DType, DTypeRegistry};
use crate::element::{dispatch_dtype, CastPolicy, Element};
use crate::error::{Error, Result};
use crate::layout::{self, MemoryOrder};
use crate::view::ArrayView;

/// Options for [`export_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Axis order of the exported view.
    pub order: AxisPermutation,
    /// Element type of the view; `None` keeps the buffer's.
    pub dtype: Option<DType>,
    /// Request a view whose writes reach the buffer.
    pub writable: bool,
    /// Conversion rule when the element type changes.
    pub policy: CastPolicy,
    /// Z-plane to export when `order` has no `z` axis. Negative values count
    /// from the last plane.
    pub plane: Option<i64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            order: AxisPermutation::native(),
            dtype: None,
            writable: false,
            policy: CastPolicy::Clamp,
            plane: None,
        }
    }
}

impl ExportOptions {
    /// Options for the given axis order.
    pub fn new(order: AxisPermutation) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// Sets the element type.
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Requests a writable view.
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Sets the cast policy.
    pub fn policy(mut self, policy: CastPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Selects a z-plane.
    pub fn plane(mut self, z: i64) -> Self {
        self.plane = Some(z);
        self
    }
}

/// Native extent of the exported region and its first z-plane.
fn export_extent(buf: &PixelBuffer, order: &AxisPermutation, plane: Option<i64>) -> Result<([usize; 4], usize)> {
    let mut dims = buf.dims();
    let first = match plane {
        Some(z) => {
            if order.contains(Axis::Z) {
                return Err(Error::invalid_argument(format!(
                    "axis order {order} includes z, cannot select a plane"
                )));
            }
            dims[Axis::Z.index()] = 1;
            resolve_index(z, buf.depth(), "z")?
        }
        None => 0,
    };
    for &axis in order.unspecified() {
        let size = dims[axis.index()];
        if size != 1 {
            return Err(Error::invalid_argument(format!(
                "axis {axis} has size {size} but is missing from axis order {order}"
            )));
        }
    }
    Ok((dims, first))
}

/// Exports `buf` in `order`, optionally converting to `dtype`.
///
/// Returns an alias of the buffer storage when no conversion is needed.
/// Requesting a writable view together with a conversion is an error.
pub fn export(
    buf: &PixelBuffer,
    order: &AxisPermutation,
    dtype: Option<DType>,
    writable: bool,
) -> Result<ArrayView<'static>> {
    export_with(
        buf,
        &ExportOptions {
            order: *order,
            dtype,
            writable,
            ..Default::default()
        },
    )
}

/// Exports `buf` according to `options`.
pub fn export_with(buf: &PixelBuffer, options: &ExportOptions) -> Result<ArrayView<'static>> {
    let order = &options.order;
    let dtype = options.dtype.unwrap_or(buf.dtype());
    if buf.is_empty() {
        return Ok(ArrayView::degenerate(dtype, order.rank()));
    }
    // Fail early on a buffer whose storage was reallocated under it.
    buf.with_bytes(|_| ())?;

    let (dims, plane) = export_extent(buf, order, options.plane)?;

    if dtype == buf.dtype() {
        let byte_strides = buf.byte_strides().map(|s| s as isize);
        let shape = order.apply(&dims);
        let strides = order.apply(&byte_strides);
        let offset = plane * buf.byte_strides()[Axis::Z.index()];
        tracing::debug!(%order, %dtype, plane, writable = options.writable, "exporting buffer alias");
        return ArrayView::aliased(
            buf.storage().clone(),
            buf.generation(),
            offset,
            dtype,
            &shape,
            strides,
            options.writable,
        );
    }

    if options.writable {
        return Err(Error::invalid_argument(format!(
            "a writable view cannot convert {} to {dtype}",
            buf.dtype()
        )));
    }
    let entry = DTypeRegistry::global().entry(dtype);
    (entry.export)(buf, order, plane, options.policy)
}

/// Export handler for destination element type `D`.
///
/// Produces a row-major array in `order` starting at z-plane `plane`.
/// Registered in the [`DTypeRegistry`]; use [`export_with`] instead of
/// calling this directly.
pub fn export_as<D: Element>(
    buf: &PixelBuffer,
    order: &AxisPermutation,
    plane: usize,
    policy: CastPolicy,
) -> Result<ArrayView<'static>> {
    if buf.is_empty() {
        return Ok(ArrayView::degenerate(D::DTYPE, order.rank()));
    }
    let plane_opt = (!order.contains(Axis::Z)).then_some(plane as i64);
    if plane_opt.is_none() && plane != 0 {
        return Err(Error::invalid_argument(format!(
            "axis order {order} includes z, cannot select plane {plane}"
        )));
    }
    let (dims, plane) = export_extent(buf, order, plane_opt)?;

    let shape = order.apply(&dims);
    let row_major: Vec<usize> = layout::contiguous_strides(&shape, MemoryOrder::RowMajor)
        .into_iter()
        .map(|s| s as usize)
        .collect();
    let plan = Plan {
        dims,
        src_offset: plane * buf.byte_strides()[Axis::Z.index()],
        src_strides: buf.byte_strides().map(|s| s as isize),
        dst_offset: 0,
        dst_strides: order.to_native(&row_major, 0)?,
    };

    let count: usize = dims.iter().product();
    let mut out = vec![0u8; count * D::DTYPE.size()];
    let path = buf.with_bytes(|input| {
        dispatch_dtype!(buf.dtype(), S => copy::run::<S, D>(&plan, input, &mut out, policy))
    })?;
    tracing::debug!(%order, from = %buf.dtype(), to = %D::DTYPE, %policy, %path, "exporting buffer copy");
    ArrayView::owned(out, D::DTYPE, &shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dims: [usize; 4]) -> PixelBuffer {
        let count: usize = dims.iter().product();
        PixelBuffer::from_vec(dims, (0..count).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_same_dtype_aliases() {
        let mut buf = ramp([4, 3, 1, 2]);
        let view = export(&buf, &AxisPermutation::parse("cyx").unwrap(), None, true).unwrap();
        assert_eq!(view.shape(), &[2, 3, 4]);
        assert!(view.is_contiguous(MemoryOrder::RowMajor));
        view.set(&[1, 2, 3], -1.0f32).unwrap();
        assert_eq!(buf.get::<f32>(3, 2, 0, 1).unwrap(), -1.0);
        buf.set(0, 0, 0, 0, 42.0f32).unwrap();
        assert_eq!(view.get::<f32>(&[0, 0, 0]).unwrap(), 42.0);
    }

    #[test]
    fn test_cast_export_copies() {
        let buf = ramp([2, 2, 1, 1]);
        let order = AxisPermutation::parse("yx").unwrap();
        let view = export(&buf, &order, Some(DType::U8), false).unwrap();
        assert!(view.owner().is_none());
        assert_eq!(view.dtype(), DType::U8);
        assert_eq!(view.to_vec::<u8>().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_writable_cast_rejected() {
        let buf = ramp([2, 2, 1, 1]);
        let order = AxisPermutation::parse("yx").unwrap();
        assert!(export(&buf, &order, Some(DType::U8), true).is_err());
    }

    #[test]
    fn test_missing_axis_must_be_unit() {
        let buf = ramp([2, 2, 1, 3]);
        assert!(export(&buf, &AxisPermutation::parse("yx").unwrap(), None, false).is_err());
        assert!(export(&buf, &AxisPermutation::parse("yxc").unwrap(), None, false).is_ok());
    }

    #[test]
    fn test_plane_selection() {
        let buf = ramp([2, 2, 3, 1]);
        let order = AxisPermutation::parse("yx").unwrap();
        assert!(export(&buf, &order, None, false).is_err());

        let view = export_with(&buf, &ExportOptions::new(order).plane(1)).unwrap();
        assert_eq!(view.to_vec::<f32>().unwrap(), vec![4.0, 5.0, 6.0, 7.0]);

        let view = export_with(&buf, &ExportOptions::new(order).plane(-1).dtype(DType::I16)).unwrap();
        assert_eq!(view.to_vec::<i16>().unwrap(), vec![8, 9, 10, 11]);

        assert!(export_with(&buf, &ExportOptions::new(order).plane(3)).is_err());
        let xyz = AxisPermutation::parse("xyz").unwrap();
        assert!(export_with(&buf, &ExportOptions::new(xyz).plane(0)).is_err());
    }

    #[test]
    fn test_empty_buffer_exports_degenerate_view() {
        let buf = PixelBuffer::empty(DType::F32);
        let view = export(&buf, &AxisPermutation::parse("yxc").unwrap(), None, false).unwrap();
        assert_eq!(view.shape(), &[0, 0, 0]);
        assert_eq!(view.strides(), &[0, 0, 0]);
    }

    #[test]
    fn test_export_handler_layout_is_row_major() {
        let buf = ramp([3, 2, 1, 2]);
        let order = AxisPermutation::parse("yxc").unwrap();
        let view = export_as::<f64>(&buf, &order, 0, CastPolicy::Clamp).unwrap();
        assert_eq!(view.shape(), &[2, 3, 2]);
        assert!(view.is_contiguous(MemoryOrder::RowMajor));
        // (y=1, x=2, c=1) -> native offset 2 + 3*1 + 6*1
        assert_eq!(view.get::<f64>(&[1, 2, 1]).unwrap(), 11.0);
    }
}
