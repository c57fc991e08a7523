//! (y, x, c) ordered access for libraries using interleaved images.

use crate::convert::{self, to_py, Exported};
use crate::image::Image;
use pixbridge_core::{copy_into_plane, ArrayView, AxisPermutation, CastPolicy, DType, Device, ExportOptions};
use pixbridge_engine::Image as EngineImage;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use numpy::PyUntypedArrayMethods;
use pyo3::types::{PyBytes, PyDict};

/// Exports one z plane of an image as a (height, width, channels) array.
///
/// The plane defaults to 0 for images of depth 1 and must be selected with
/// `wrapper[z]` otherwise. Every export reads the image as it is at the time
/// of the call.
#[pyclass(name = "YXCWrapper", module = "pixbridge")]
pub struct YXCWrapper {
    owner: Py<Image>,
    image: EngineImage,
    z: Option<i64>,
    dtype: Option<DType>,
    policy: CastPolicy,
    exported: Exported,
}

impl YXCWrapper {
    pub(crate) fn new(owner: Py<Image>, image: EngineImage) -> Self {
        Self {
            owner,
            image,
            z: None,
            dtype: None,
            policy: CastPolicy::default(),
            exported: Exported::default(),
        }
    }

    fn with(&self, py: Python<'_>, z: Option<i64>, dtype: Option<DType>, policy: CastPolicy) -> Self {
        Self {
            owner: self.owner.clone_ref(py),
            image: self.image.clone(),
            z,
            dtype,
            policy,
            exported: Exported::default(),
        }
    }

    fn order() -> PyResult<AxisPermutation> {
        AxisPermutation::parse("yxc").map_err(to_py)
    }

    fn effective_z(&self) -> PyResult<i64> {
        match self.z {
            Some(z) => Ok(z),
            None if self.image.dims()[2] == 1 => Ok(0),
            None => Err(PyRuntimeError::new_err(
                "select a z plane before using the wrapper unless the image depth is 1",
            )),
        }
    }

    fn options(&self) -> PyResult<ExportOptions> {
        let mut options = ExportOptions::new(Self::order()?)
            .policy(self.policy)
            .plane(self.effective_z()?);
        if let Some(dtype) = self.dtype {
            options = options.dtype(dtype);
        }
        Ok(options)
    }

    /// True when exports alias the image instead of converting it.
    fn aliases(&self) -> bool {
        self.dtype.is_none_or(|dtype| dtype == self.image.dtype())
    }

    /// Exports the selected plane from the current image content.
    fn export(&self, writable: bool) -> PyResult<ArrayView<'static>> {
        let options = self.options()?.writable(writable);
        self.image.export(&options).map_err(to_py)
    }
}

#[pymethods]
impl YXCWrapper {
    /// The wrapped image.
    #[getter]
    fn image(&self, py: Python<'_>) -> Py<Image> {
        self.owner.clone_ref(py)
    }

    /// Selected z plane, if any.
    #[getter]
    fn z(&self) -> Option<i64> {
        self.z
    }

    /// Wrapper for plane `z`.
    fn __getitem__(&self, py: Python<'_>, z: i64) -> Self {
        self.with(py, Some(z), self.dtype, self.policy)
    }

    /// Wrapper converting to `dtype` on export.
    fn with_dtype(&self, py: Python<'_>, dtype: &str) -> PyResult<Self> {
        let dtype = dtype.parse::<DType>().map_err(to_py)?;
        Ok(self.with(py, self.z, Some(dtype), self.policy))
    }

    /// Wrapper using cast policy `name` (clamp, wrap, truncate).
    fn with_policy(&self, py: Python<'_>, name: &str) -> PyResult<Self> {
        let policy = name.parse::<CastPolicy>().map_err(to_py)?;
        Ok(self.with(py, self.z, self.dtype, policy))
    }

    /// (height, width, spectrum)
    #[getter]
    fn shape(&self) -> PyResult<(usize, usize, usize)> {
        self.effective_z()?;
        let [w, h, _, c] = self.image.dims();
        Ok((h, w, c))
    }

    /// Copy as a numpy array.
    fn to_numpy<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        convert::to_numpy(py, &self.export(false)?)
    }

    /// Packed row-major bytes of the plane.
    fn tobytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        convert::to_bytes(py, &self.export(false)?)
    }

    /// Explicit descriptor of the exported plane.
    ///
    /// The wrapper keeps the described memory alive; converted exports are
    /// snapshots taken at the time of the call.
    #[getter]
    fn __array_interface__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let view = self.export(false)?;
        let dict = convert::interface_dict(py, &view)?;
        self.exported.hold(view);
        Ok(dict)
    }

    /// DLPack capsule of the plane; aliases the image unless a dtype
    /// conversion is requested.
    #[pyo3(signature = (**kwargs))]
    fn __dlpack__<'py>(&self, py: Python<'py>, kwargs: Option<&Bound<'py, PyDict>>) -> PyResult<Bound<'py, PyAny>> {
        convert::dlpack(py, self.export(self.aliases())?, kwargs)
    }

    /// DLPack `(device_type, device_id)`; always the CPU.
    fn __dlpack_device__(&self) -> (i32, i32) {
        Device::Cpu.dlpack()
    }

    /// Copies a (height, width[, channels]) array into the image.
    ///
    /// With `same_dims` the array must match the current plane. Otherwise the
    /// image is reallocated to depth 1 with the array's sizes.
    #[pyo3(signature = (array, same_dims=true))]
    fn assign(&self, py: Python<'_>, array: &Bound<'_, PyAny>, same_dims: bool) -> PyResult<Py<Image>> {
        let array = convert::as_array(array)?;
        let order = match array.ndim() {
            2 => AxisPermutation::parse("yx").map_err(to_py)?,
            3 => Self::order()?,
            n => {
                return Err(PyValueError::new_err(format!(
                    "array should be 2- or 3-dimensional, got {n} dimensions"
                )));
            }
        };
        let storage = self.image.buffer().read().storage().clone();
        let view = convert::detach(convert::view_of(&array)?, &storage)?;
        let [h, w] = [view.shape()[0], view.shape()[1]];
        let c = view.shape().get(2).copied().unwrap_or(1);

        if same_dims {
            let [bw, bh, _, bc] = self.image.dims();
            if (bw, bh, bc) != (w, h, c) {
                return Err(PyValueError::new_err(
                    "can't assign an array with different dimensions, use assign(array, same_dims=False)",
                ));
            }
            let z = self.effective_z()?;
            let mut buf = self.image.buffer().write();
            copy_into_plane(&view, &mut buf, &order, z, self.policy).map_err(to_py)?;
        } else {
            if self.z.is_some() {
                return Err(PyValueError::new_err("can't assign new dims to a wrapper with z set"));
            }
            self.image.assign(&view, &order, self.policy).map_err(to_py)?;
        }
        Ok(self.owner.clone_ref(py))
    }

    fn __repr__(&self) -> String {
        let [w, h, _, c] = self.image.dims();
        let dtype = self.dtype.unwrap_or(self.image.dtype());
        match self.z {
            Some(z) => format!("<pixbridge.YXCWrapper ({h}x{w}x{c}) z={z} {dtype} {}>", self.policy),
            None => format!("<pixbridge.YXCWrapper ({h}x{w}x{c}) {dtype} {}>", self.policy),
        }
    }
}
