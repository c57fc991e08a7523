//! Python bindings for pixbridge.
//!
//! Moves numpy arrays in and out of native x, y, z, c pixel buffers with any
//! axis order, element type and cast policy.

use pyo3::prelude::*;

mod convert;
mod image;
mod list;
mod yxc;

pub use image::Image;
pub use list::ImageList;
pub use yxc::YXCWrapper;

/// Names of the supported element types.
#[pyfunction]
fn dtypes() -> Vec<&'static str> {
    pixbridge_core::DType::ALL.iter().map(|d| d.name()).collect()
}

/// pixbridge - numpy interop for native pixel buffers
#[pymodule]
fn pixbridge(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    m.add_class::<Image>()?;
    m.add_class::<ImageList>()?;
    m.add_class::<YXCWrapper>()?;

    m.add_function(wrap_pyfunction!(dtypes, m)?)?;
    Ok(())
}
