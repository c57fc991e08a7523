//! Inspect command.
//!
//! Shows how a raw file maps onto the native buffer: native sizes, which copy
//! path an import takes, and the descriptors an export in the same order
//! would hand out.

use crate::InspectArgs;
use anyhow::{Context, Result};
use pixbridge_core::{copy, export, CastPolicy, MemoryOrder, PixelBuffer};
use tracing::{debug, trace};

/// Runs the inspect command.
pub fn run(args: InspectArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), "inspect::run");
    let report = inspect(&args)?;
    print!("{report}");
    if verbose > 0 {
        println!("  Layout:     {:?}", args.layout);
    }
    Ok(())
}

/// Builds the inspection report for `args`.
pub fn inspect(args: &InspectArgs) -> Result<String> {
    let layout = &args.layout;
    let order = layout.order()?;
    let bytes = super::read_raw(&args.input, layout)?;
    let view = super::view_of(&bytes, layout)?;

    let mut buf = PixelBuffer::empty(layout.dtype);
    let path = copy::copy(&view, &mut buf, &order, CastPolicy::Clamp)
        .with_context(|| format!("Failed to import {} as {order}", args.input.display()))?;
    debug!(%path, dims = ?buf.dims(), "imported");

    let [w, h, d, c] = buf.dims();
    let mut out = String::new();
    let mut line = |label: &str, value: String| out.push_str(&format!("  {label:<11} {value}\n"));

    line("Shape:", format!("{} ({order})", layout.shape));
    line("Dtype:", super::describe_dtype(layout.dtype));
    line("Native:", format!("width={w} height={h} depth={d} spectrum={c}"));
    line("Copy path:", path.to_string());

    let exported = export::export(&buf, &order, None, false)
        .with_context(|| format!("Failed to export {} as {order}", args.input.display()))?;
    line(
        "Contiguous:",
        format!(
            "row-major={} column-major={}",
            exported.is_contiguous(MemoryOrder::RowMajor),
            exported.is_contiguous(MemoryOrder::ColumnMajor)
        ),
    );

    let ai = exported.array_interface()?;
    line(
        "Interface:",
        format!(
            "typestr={} shape={:?} strides={:?} readonly={} version={}",
            ai.typestr, ai.shape, ai.strides, ai.data.1, ai.version
        ),
    );
    let tensor = match exported.tensor_descriptor() {
        Ok(td) => format!("ndim={} shape={:?} dtype={} device={:?}", td.ndim, td.shape, td.dtype, td.device),
        Err(e) => format!("unavailable ({e})"),
    };
    line("Tensor:", tensor);

    Ok(format!("{}\n{out}", args.input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Shape;
    use crate::RawLayout;
    use pixbridge_core::{AxisPermutation, DType};
    use tempfile::tempdir;

    #[test]
    fn test_inspect_yxc_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("frame.raw");
        std::fs::write(&input, (0u8..24).collect::<Vec<_>>()).unwrap();

        let args = InspectArgs {
            input,
            layout: RawLayout {
                shape: Shape(vec![2, 4, 3]),
                dtype: DType::U8,
                order: Some(AxisPermutation::parse("yxc").unwrap()),
            },
        };
        let report = inspect(&args).unwrap();
        assert!(report.contains("width=4 height=2 depth=1 spectrum=3"), "{report}");
        assert!(report.contains("Copy path:  strided"), "{report}");
        assert!(report.contains("row-major=false"), "{report}");
        assert!(report.contains("unavailable"), "{report}");
    }

    #[test]
    fn test_inspect_rejects_short_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("short.raw");
        std::fs::write(&input, [0u8; 5]).unwrap();

        let args = InspectArgs {
            input,
            layout: RawLayout {
                shape: Shape(vec![2, 3]),
                dtype: DType::U8,
                order: None,
            },
        };
        let err = inspect(&args).unwrap_err();
        assert!(format!("{err:#}").contains("needs 6"));
    }
}
