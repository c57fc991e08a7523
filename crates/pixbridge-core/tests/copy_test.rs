//! Copy engine, permutation and exporter behaviour through the public API.

use pixbridge_core::layout::{contiguous_strides, is_contiguous};
use pixbridge_core::prelude::*;
use pixbridge_core::{Device, MemoryOrder, StrideUnit};

#[test]
fn test_scenario_import_yx_uint8() {
    let source: [[u8; 3]; 2] = [[1, 2, 3], [4, 5, 6]];
    let flat: Vec<u8> = source.iter().flatten().copied().collect();
    let view = ArrayView::from_slice(&flat, &[2, 3]).unwrap();
    let buf = copy::import(&view, &AxisPermutation::parse("yx").unwrap(), DType::U8, CastPolicy::Clamp).unwrap();

    assert_eq!(buf.width(), 3);
    assert_eq!(buf.height(), 2);
    assert_eq!(buf.depth(), 1);
    assert_eq!(buf.channels(), 1);
    for (y, row) in source.iter().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            assert_eq!(buf.get::<u8>(x as i64, y as i64, 0, 0).unwrap(), value);
        }
    }
}

#[test]
fn test_scenario_export_yxc_clamped() {
    let mut buf = PixelBuffer::with_dims([4, 4, 1, 3], DType::F32).unwrap();
    buf.fill(12.5f32).unwrap();
    buf.set(2, 1, 0, 2, 300.0f32).unwrap();

    let yxc = AxisPermutation::parse("yxc").unwrap();
    let view = export::export_with(&buf, &ExportOptions::new(yxc).dtype(DType::U8)).unwrap();
    assert_eq!(view.shape(), &[4, 4, 3]);
    assert_eq!(view.get::<u8>(&[1, 2, 2]).unwrap(), 255);
    assert_eq!(view.get::<u8>(&[0, 0, 0]).unwrap(), 12);
}

#[test]
fn test_permutation_inverse_law() {
    let shape = [640, 480, 7, 3];
    let labels = ['x', 'y', 'z', 'c'];
    // every ordering of every non-empty subset
    for mask in 1u8..16 {
        let chosen: Vec<char> = (0..4).filter(|i| mask & (1 << i) != 0).map(|i| labels[i]).collect();
        for perm in permutations(&chosen) {
            let order: String = perm.iter().collect();
            let p = AxisPermutation::parse(&order).unwrap();
            let permuted: [usize; 4] = p.completed().apply(&shape).try_into().unwrap();
            let restored = p.inverse().apply(&permuted);
            assert_eq!(restored, shape.to_vec(), "order {order}");
        }
    }
}

fn permutations(items: &[char]) -> Vec<Vec<char>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_contiguity_of_buffer_strides() {
    let buf = PixelBuffer::new(5, 4, 3, 2, DType::U16).unwrap();
    let shape = buf.dims();
    let strides = buf.strides().map(|s| s as isize);
    assert!(is_contiguous(&shape, &strides, MemoryOrder::ColumnMajor));
    assert_eq!(contiguous_strides(&shape, MemoryOrder::ColumnMajor), strides.to_vec());

    // permute the axes but keep the strides
    let permuted = [shape[1], shape[0], shape[2], shape[3]];
    assert!(!is_contiguous(&permuted, &strides, MemoryOrder::ColumnMajor));
}

#[test]
fn test_fast_and_slow_paths_agree() {
    // (y, x, c) = (3, 4, 2) row-major
    let dense: Vec<f32> = (0..24).map(|v| v as f32 * 1.5).collect();

    // Same logical array, stored as (c, y, x) and read through permuted strides
    let mut planar = vec![0f32; 24];
    for y in 0..3 {
        for x in 0..4 {
            for c in 0..2 {
                planar[c * 12 + y * 4 + x] = dense[y * 8 + x * 2 + c];
            }
        }
    }
    let yxc = AxisPermutation::parse("yxc").unwrap();

    let fast_view = ArrayView::from_slice_strided(&planar, &[3, 4, 2], &[4, 1, 12]).unwrap();
    let slow_view = ArrayView::from_slice(&dense, &[3, 4, 2]).unwrap();

    for dtype in [DType::F32, DType::U8, DType::F64] {
        let mut fast = PixelBuffer::empty(dtype);
        let mut slow = PixelBuffer::empty(dtype);
        let fast_path = copy::copy(&fast_view, &mut fast, &yxc, CastPolicy::Clamp).unwrap();
        let slow_path = copy::copy(&slow_view, &mut slow, &yxc, CastPolicy::Clamp).unwrap();
        assert_ne!(fast_path, CopyPath::Strided);
        assert_eq!(slow_path, CopyPath::Strided);
        assert_eq!(fast.dims(), slow.dims());
        assert_eq!(fast.to_bytes().unwrap(), slow.to_bytes().unwrap(), "{dtype}");
    }
}

#[test]
fn test_byte_strides_and_offset() {
    // Every other element of a 2x4 i16 array, starting from the end.
    let data: Vec<i16> = (0..8).collect();
    let bytes: &[u8] = bytemuck::cast_slice(&data);
    let view = ArrayView::strided(bytes, 14, DType::I16, &[2, 2], Some(&[-8, -4]), StrideUnit::Bytes).unwrap();
    let buf = copy::import(&view, &AxisPermutation::parse("yx").unwrap(), DType::I16, CastPolicy::Clamp).unwrap();
    assert_eq!(buf.to_vec::<i16>().unwrap(), vec![7, 5, 3, 1]);
}

#[test]
fn test_unknown_device_rejected() {
    let data = [0u8; 4];
    let view = ArrayView::from_slice(&data, &[2, 2]).unwrap().with_device(Device::Cuda(0));
    let mut buf = PixelBuffer::new(1, 1, 1, 1, DType::U8).unwrap();
    let err = copy::copy(&view, &mut buf, &AxisPermutation::parse("yx").unwrap(), CastPolicy::Clamp).unwrap_err();
    assert_eq!(err.kind(), pixbridge_core::ErrorKind::InvalidArgument);
    // destination untouched when validation fails
    assert_eq!(buf.dims(), [1, 1, 1, 1]);
}

#[test]
fn test_view_keeps_storage_alive() {
    let view = {
        let buf = PixelBuffer::from_vec([2, 1, 1, 1], vec![9u8, 8]).unwrap();
        export::export(&buf, &AxisPermutation::parse("x").unwrap(), None, false).unwrap()
    };
    assert_eq!(view.to_vec::<u8>().unwrap(), vec![9, 8]);
    assert_eq!(view.owner().map(|s| s.handle_count()), Some(1));
}
