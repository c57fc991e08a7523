//! Export/import round trips across every pair of registered dtypes.

use approx::assert_relative_eq;
use pixbridge_core::prelude::*;
use pixbridge_core::{ExportOptions, Scalar};

const DIMS: [usize; 4] = [3, 2, 2, 2];

/// Buffer of `dtype` whose values fit every registered type.
fn sample(dtype: DType) -> PixelBuffer {
    let mut buf = PixelBuffer::with_dims(DIMS, dtype).unwrap();
    let bool_pair = dtype == DType::Bool;
    let [w, h, d, c] = DIMS;
    let mut i = 0i128;
    for ci in 0..c {
        for zi in 0..d {
            for yi in 0..h {
                for xi in 0..w {
                    let v = if bool_pair { i % 2 } else { i };
                    buf.set_value(xi as i64, yi as i64, zi as i64, ci as i64, Scalar::Int(v), CastPolicy::Clamp)
                        .unwrap();
                    i += 1;
                }
            }
        }
    }
    buf
}

#[test]
fn test_all_dtype_pairs_round_trip() {
    let order = AxisPermutation::parse("zcyx").unwrap();
    for a in DType::ALL {
        for b in DType::ALL {
            // Bool only holds 0/1; build the source in the narrower domain.
            let source = if b == DType::Bool { sample(DType::Bool) } else { sample(a) };
            let source = if source.dtype() == a {
                source
            } else {
                let view = export::export(&source, &AxisPermutation::native(), Some(a), false).unwrap();
                copy::import(&view, &AxisPermutation::native(), a, CastPolicy::Clamp).unwrap()
            };

            let exported = export::export(&source, &order, None, false).unwrap();
            let converted = copy::import(&exported, &order, b, CastPolicy::Clamp).unwrap();
            assert_eq!(converted.dims(), DIMS, "{a} -> {b}");

            let back = export::export(&converted, &order, Some(a), false).unwrap();
            assert_eq!(
                back.to_contiguous_bytes().unwrap(),
                exported.to_contiguous_bytes().unwrap(),
                "{a} -> {b} -> {a}"
            );
        }
    }
}

#[test]
fn test_clamp_saturates_across_pairs() {
    let buf = PixelBuffer::from_vec([3, 1, 1, 1], vec![300.0f64, -300.0, 1e40]).unwrap();
    let x = AxisPermutation::parse("x").unwrap();

    let u8_view = export::export(&buf, &x, Some(DType::U8), false).unwrap();
    assert_eq!(u8_view.to_vec::<u8>().unwrap(), vec![255, 0, 255]);

    let i8_view = export::export(&buf, &x, Some(DType::I8), false).unwrap();
    assert_eq!(i8_view.to_vec::<i8>().unwrap(), vec![127, -128, 127]);

    let f32_view = export::export(&buf, &x, Some(DType::F32), false).unwrap();
    let values = f32_view.to_vec::<f32>().unwrap();
    assert_relative_eq!(values[0], 300.0);
    assert_eq!(values[2], f32::MAX);
}

#[test]
fn test_wrap_and_truncate_policies() {
    let buf = PixelBuffer::from_vec([3, 1, 1, 1], vec![256i32, 257, -1]).unwrap();
    let x = AxisPermutation::parse("x").unwrap();

    let wrap = ExportOptions::new(x).dtype(DType::U8).policy(CastPolicy::Wrap);
    let view = export::export_with(&buf, &wrap).unwrap();
    assert_eq!(view.to_vec::<u8>().unwrap(), vec![0, 1, 255]);

    let clamp = ExportOptions::new(x).dtype(DType::U8);
    let view = export::export_with(&buf, &clamp).unwrap();
    assert_eq!(view.to_vec::<u8>().unwrap(), vec![255, 255, 0]);

    let truncate = ExportOptions::new(x).dtype(DType::I8).policy(CastPolicy::Truncate);
    let view = export::export_with(&buf, &truncate).unwrap();
    assert_eq!(view.to_vec::<i8>().unwrap(), vec![0, 1, -1]);
}

#[test]
fn test_half_precision_import() {
    let data: Vec<half::f16> = [0.25f32, -1.5, 2.0].iter().map(|&v| half::f16::from_f32(v)).collect();
    let view = ArrayView::from_slice(&data, &[3]).unwrap();
    let buf = copy::import(&view, &AxisPermutation::parse("c").unwrap(), DType::F32, CastPolicy::Clamp).unwrap();
    assert_eq!(buf.dims(), [1, 1, 1, 3]);
    assert_eq!(buf.to_vec::<f32>().unwrap(), vec![0.25, -1.5, 2.0]);
}
