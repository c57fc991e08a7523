//! Stride arithmetic and contiguity checks.

use crate::error::{Error, Result};

/// Memory ordering of a strided layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryOrder {
    /// Last axis varies fastest (C order).
    #[default]
    RowMajor,
    /// First axis varies fastest (Fortran order). Native buffers use this
    /// order over `x, y, z, c`.
    ColumnMajor,
}

/// Contiguous strides, in elements, for `shape` in the given order.
pub fn contiguous_strides(shape: &[usize], order: MemoryOrder) -> Vec<isize> {
    let mut strides = vec![0isize; shape.len()];
    let mut acc = 1isize;
    let mut assign = |i: usize| {
        strides[i] = acc;
        acc *= shape[i].max(1) as isize;
    };
    match order {
        MemoryOrder::RowMajor => (0..shape.len()).rev().for_each(&mut assign),
        MemoryOrder::ColumnMajor => (0..shape.len()).for_each(&mut assign),
    }
    strides
}

/// Checks whether element `strides` describe a gap-free layout of `shape`.
///
/// Strides of axes with extent 1 are ignored, as are all strides when some
/// axis has extent 0.
pub fn is_contiguous(shape: &[usize], strides: &[isize], order: MemoryOrder) -> bool {
    if shape.len() != strides.len() {
        return false;
    }
    if shape.contains(&0) {
        return true;
    }
    let mut expected = 1isize;
    let mut check = |i: usize| -> bool {
        if shape[i] == 1 {
            return true;
        }
        let ok = strides[i] == expected;
        expected *= shape[i] as isize;
        ok
    };
    match order {
        MemoryOrder::RowMajor => (0..shape.len()).rev().all(&mut check),
        MemoryOrder::ColumnMajor => (0..shape.len()).all(&mut check),
    }
}

/// [`is_contiguous`] for byte strides of elements `itemsize` bytes wide.
pub fn is_contiguous_bytes(
    shape: &[usize],
    byte_strides: &[isize],
    itemsize: usize,
    order: MemoryOrder,
) -> bool {
    let itemsize = itemsize as isize;
    let mut elements = Vec::with_capacity(byte_strides.len());
    for (&stride, &extent) in byte_strides.iter().zip(shape) {
        if extent > 1 && stride % itemsize != 0 {
            return false;
        }
        elements.push(stride / itemsize);
    }
    is_contiguous(shape, &elements, order)
}

/// Byte range `[lo, hi)` touched by a strided layout, relative to the first
/// element. Returns `None` when the layout has no elements.
///
/// Fails when the range does not fit in `isize`.
pub fn byte_extent(shape: &[usize], byte_strides: &[isize], itemsize: usize) -> Result<Option<(isize, isize)>> {
    if shape.contains(&0) {
        return Ok(None);
    }
    let overflow = || {
        Error::invalid_argument(format!(
            "shape {shape:?} with strides {byte_strides:?} exceeds the address space"
        ))
    };
    let mut lo = 0isize;
    let mut hi = isize::try_from(itemsize).map_err(|_| overflow())?;
    for (&extent, &stride) in shape.iter().zip(byte_strides) {
        let span = isize::try_from(extent - 1)
            .ok()
            .and_then(|n| n.checked_mul(stride))
            .ok_or_else(overflow)?;
        if span < 0 {
            lo = lo.checked_add(span).ok_or_else(overflow)?;
        } else {
            hi = hi.checked_add(span).ok_or_else(overflow)?;
        }
    }
    hi.checked_sub(lo).ok_or_else(overflow)?;
    Ok(Some((lo, hi)))
}

/// Bytes spanned by a dense layout of `shape`, counting empty axes as 1.
///
/// This bounds every contiguous stride of the layout, so a successful result
/// means those strides fit in `isize`.
pub fn dense_span(shape: &[usize], itemsize: usize) -> Result<usize> {
    shape
        .iter()
        .try_fold(itemsize, |acc, &n| acc.checked_mul(n.max(1)))
        .filter(|&span| isize::try_from(span).is_ok())
        .ok_or_else(|| Error::invalid_argument(format!("shape {shape:?} exceeds the address space")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_strides() {
        assert_eq!(contiguous_strides(&[2, 3, 4], MemoryOrder::RowMajor), vec![12, 4, 1]);
        assert_eq!(contiguous_strides(&[2, 3, 4], MemoryOrder::ColumnMajor), vec![1, 2, 6]);
    }

    #[test]
    fn test_own_strides_are_contiguous() {
        let shape = [5, 4, 3];
        for order in [MemoryOrder::RowMajor, MemoryOrder::ColumnMajor] {
            let strides = contiguous_strides(&shape, order);
            assert!(is_contiguous(&shape, &strides, order));
        }
    }

    #[test]
    fn test_permuted_shape_breaks_contiguity() {
        let strides = contiguous_strides(&[2, 3], MemoryOrder::RowMajor);
        assert!(!is_contiguous(&[3, 2], &strides, MemoryOrder::RowMajor));
        assert!(!is_contiguous(&[2, 3], &strides, MemoryOrder::ColumnMajor));
    }

    #[test]
    fn test_unit_axes_ignored() {
        assert!(is_contiguous(&[4, 1, 3], &[3, 999, 1], MemoryOrder::RowMajor));
        assert!(is_contiguous(&[0, 3], &[7, 7], MemoryOrder::RowMajor));
    }

    #[test]
    fn test_byte_strides() {
        assert!(is_contiguous_bytes(&[2, 3], &[12, 4], 4, MemoryOrder::RowMajor));
        assert!(!is_contiguous_bytes(&[2, 3], &[12, 5], 4, MemoryOrder::RowMajor));
    }

    #[test]
    fn test_byte_extent_negative_strides() {
        assert_eq!(byte_extent(&[3, 2], &[-8, 4], 4).unwrap(), Some((-16, 8)));
        assert_eq!(byte_extent(&[3, 0], &[8, 4], 4).unwrap(), None);
    }

    #[test]
    fn test_byte_extent_overflow() {
        assert!(byte_extent(&[usize::MAX, 2], &[1, 1], 1).is_err());
        assert!(byte_extent(&[3, 3], &[isize::MAX, 1], 1).is_err());
        assert!(byte_extent(&[3, 3], &[isize::MIN / 2, 1], 1).is_err());
    }

    #[test]
    fn test_dense_span() {
        assert_eq!(dense_span(&[2, 0, 3], 4).unwrap(), 24);
        assert!(dense_span(&[usize::MAX, 2], 1).is_err());
        assert!(dense_span(&[1 << 40, 1 << 40], 1).is_err());
    }
}
