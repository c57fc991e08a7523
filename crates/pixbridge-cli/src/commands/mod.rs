//! CLI command implementations

pub mod convert;
pub mod inspect;

use crate::RawLayout;
use anyhow::{bail, Context, Result};
use pixbridge_core::{ArrayView, AxisPermutation, BufferSource, CastPolicy, DType, Error, PixelBuffer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Array shape as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape(pub Vec<usize>);

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let dims = s
            .split(['x', 'X', ','])
            .map(|part| part.trim().parse::<usize>().map_err(|e| format!("invalid extent {part:?}: {e}")))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if dims.is_empty() || dims.len() > 4 {
            return Err(format!("shape needs 1 to 4 extents, got {}", dims.len()));
        }
        Ok(Shape(dims))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("x"))
    }
}

impl RawLayout {
    /// Axis order of the file, defaulting to the native prefix of its rank.
    pub fn order(&self) -> Result<AxisPermutation> {
        match self.order {
            Some(order) if order.rank() != self.shape.0.len() => bail!(
                "order {order} names {} axes but shape {} has {}",
                order.rank(),
                self.shape,
                self.shape.0.len()
            ),
            Some(order) => Ok(order),
            None => Ok(AxisPermutation::native_prefix(self.shape.0.len())?),
        }
    }

    /// Expected file size in bytes.
    pub fn byte_len(&self) -> usize {
        self.shape.0.iter().product::<usize>() * self.dtype.size()
    }
}

/// Headerless file of densely packed row-major elements.
pub struct RawSource {
    layout: RawLayout,
    order: AxisPermutation,
}

impl RawSource {
    /// Source reading files laid out as `layout`.
    pub fn new(layout: RawLayout) -> Result<Self> {
        let order = layout.order()?;
        Ok(Self { layout, order })
    }
}

impl BufferSource for RawSource {
    fn load(&self, path: &Path) -> pixbridge_core::Result<PixelBuffer> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::invalid_argument(format!("cannot read {}: {e}", path.display())))?;
        let view = view_of(&bytes, &self.layout).map_err(|e| Error::invalid_argument(format!("{e:#}")))?;
        pixbridge_core::copy::import(&view, &self.order, self.layout.dtype, CastPolicy::Clamp)
    }
}

/// Reads a raw file, checking its size against `layout`.
pub fn read_raw(path: &Path, layout: &RawLayout) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))?;
    if bytes.len() != layout.byte_len() {
        bail!(
            "{} holds {} bytes, shape {} of {} needs {}",
            path.display(),
            bytes.len(),
            layout.shape,
            layout.dtype,
            layout.byte_len()
        );
    }
    Ok(bytes)
}

/// Row-major view of `bytes` as described by `layout`.
pub fn view_of<'a>(bytes: &'a [u8], layout: &RawLayout) -> Result<ArrayView<'a>> {
    ArrayView::new(bytes, layout.dtype, &layout.shape.0)
        .with_context(|| format!("{} bytes do not hold shape {} of {}", bytes.len(), layout.shape, layout.dtype))
}

/// Writes bytes to `path`.
pub fn write_raw(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

/// Human readable dtype summary, e.g. `float32 <f4 (code=2, bits=32, lanes=1)`.
pub fn describe_dtype(dtype: DType) -> String {
    format!("{dtype} {} {}", dtype.typestr(), dtype.tag())
}
