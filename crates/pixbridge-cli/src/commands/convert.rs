//! Convert command.
//!
//! Loads a raw file into an image, exports it in the requested order and
//! element type, and writes the exported array as densely packed row-major
//! bytes.

use crate::ConvertArgs;
use anyhow::{Context, Result};
use pixbridge_core::ExportOptions;
use pixbridge_engine::Image;
use tracing::{debug, info, trace};

/// Runs the convert command.
pub fn run(args: ConvertArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), output = %args.output.display(), "convert::run");

    let source = super::RawSource::new(args.layout.clone())?;
    let image = Image::load(&source, &args.input)
        .with_context(|| format!("Failed to load: {}", args.input.display()))?;

    let order = match args.to_order {
        Some(order) => order,
        None => args.layout.order()?,
    };
    let dtype = args.to_dtype.unwrap_or(args.layout.dtype);
    let mut options = ExportOptions::new(order).dtype(dtype).policy(args.policy);
    if let Some(z) = args.plane {
        options = options.plane(z);
    }

    info!(
        input = %args.input.display(),
        dims = ?image.dims(),
        output = %args.output.display(),
        %order,
        %dtype,
        policy = %args.policy,
        "Converting array"
    );
    if verbose > 0 {
        println!(
            "Converting {} ({} {}) -> {} ({} {})",
            args.input.display(),
            args.layout.shape,
            args.layout.dtype,
            args.output.display(),
            order,
            dtype
        );
    }

    let view = image
        .export(&options)
        .with_context(|| format!("Failed to export as {order} {dtype}"))?;
    debug!(shape = ?view.shape(), "exported");
    let bytes = view.to_contiguous_bytes()?;
    super::write_raw(&args.output, &bytes)?;

    if verbose > 0 {
        let shape: Vec<String> = view.shape().iter().map(ToString::to_string).collect();
        println!("  Output shape: {}", shape.join("x"));
        println!("Done.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Shape;
    use crate::RawLayout;
    use pixbridge_core::{AxisPermutation, CastPolicy, DType};
    use std::path::Path;
    use tempfile::tempdir;

    fn args(input: &Path, output: &Path, shape: &[usize], dtype: DType, order: &str) -> ConvertArgs {
        ConvertArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            layout: RawLayout {
                shape: Shape(shape.to_vec()),
                dtype,
                order: Some(AxisPermutation::parse(order).unwrap()),
            },
            to_dtype: None,
            to_order: None,
            policy: CastPolicy::Clamp,
            plane: None,
        }
    }

    #[test]
    fn test_interleaved_to_planar() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.raw");
        let output = dir.path().join("out.raw");
        // (y, x, c) = (1, 2, 3)
        std::fs::write(&input, [1u8, 2, 3, 4, 5, 6]).unwrap();

        let mut a = args(&input, &output, &[1, 2, 3], DType::U8, "yxc");
        a.to_order = Some(AxisPermutation::parse("cyx").unwrap());
        run(a, 0).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_float_to_uint8_clamped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("depth.raw");
        let output = dir.path().join("depth8.raw");
        let values = [-4.0f32, 12.7, 300.0, 255.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        std::fs::write(&input, bytes).unwrap();

        let mut a = args(&input, &output, &[2, 2], DType::F32, "yx");
        a.to_dtype = Some(DType::U8);
        run(a, 0).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), vec![0, 12, 255, 255]);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("absent.raw");
        let output = dir.path().join("out.raw");
        let err = run(args(&input, &output, &[2], DType::U8, "x"), 0).unwrap_err();
        assert!(format!("{err:#}").contains("absent.raw"));
        assert!(!output.exists());
    }
}
