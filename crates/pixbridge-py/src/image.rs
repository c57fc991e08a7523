//! Image type with numpy interop.

use crate::convert::{self, to_py, Exported};
use crate::yxc::YXCWrapper;
use pixbridge_core::{ArrayView, AxisPermutation, CastPolicy, Device, ExportOptions, PixelBuffer};
use pixbridge_engine::Image as EngineImage;
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use numpy::PyUntypedArrayMethods;
use pyo3::types::{PyDict, PyTuple};

/// A 4-axis pixel buffer (x, y, z, c).
///
/// # Example
/// ```python
/// import numpy as np
/// import pixbridge
///
/// # (width, height) = (3, 2)
/// img = pixbridge.Image(np.zeros((3, 2), dtype=np.uint8))
///
/// # From an interleaved (height, width, channels) array
/// rgb = pixbridge.Image.from_yxc(np.zeros((1080, 1920, 3), dtype=np.float32))
///
/// # Zero-copy view in native order
/// arr = np.asarray(img)
///
/// # Zero-copy tensor for DLPack consumers
/// t = np.from_dlpack(img)
/// ```
#[pyclass(name = "Image", module = "pixbridge")]
pub struct Image {
    pub(crate) inner: EngineImage,
    exported: Exported,
}

impl Image {
    pub(crate) fn wrap(inner: EngineImage) -> Self {
        Self {
            inner,
            exported: Exported::default(),
        }
    }

    /// Writable alias of the buffer in native order.
    fn native_view(&self) -> PyResult<ArrayView<'static>> {
        self.inner
            .export(&ExportOptions::new(AxisPermutation::native()).writable(true))
            .map_err(to_py)
    }

    fn buffer(&self) -> std::sync::RwLockReadGuard<'_, PixelBuffer> {
        self.inner.buffer().read()
    }

    /// Copies `array` into this image in `order`, reallocating if needed.
    pub(crate) fn assign_array(&self, array: &Bound<'_, PyAny>, order: Option<&str>, policy: CastPolicy) -> PyResult<()> {
        let array = convert::as_array(array)?;
        let storage = self.buffer().storage().clone();
        let view = convert::detach(convert::view_of(&array)?, &storage)?;
        let order = match order {
            Some(o) => AxisPermutation::parse(o).map_err(to_py)?,
            None => AxisPermutation::native_prefix(view.rank()).map_err(to_py)?,
        };
        self.inner.assign(&view, &order, policy).map_err(to_py)
    }
}

#[pymethods]
impl Image {
    /// Creates an image, importing `array` in x, y, z, c order when given.
    ///
    /// `order` names the axes of `array` (e.g. `"yxc"`); `dtype` defaults to
    /// the array's element type.
    #[new]
    #[pyo3(signature = (array=None, *, order=None, dtype=None, policy="clamp"))]
    fn new(array: Option<&Bound<'_, PyAny>>, order: Option<&str>, dtype: Option<&str>, policy: &str) -> PyResult<Self> {
        let dtype = convert::parse_dtype(dtype)?;
        let policy: CastPolicy = policy.parse().map_err(to_py)?;
        let Some(array) = array else {
            return Ok(Self::wrap(EngineImage::empty(dtype.unwrap_or_default())));
        };

        let array = convert::as_array(array)?;
        let view = convert::view_of(&array)?;
        let order = match order {
            Some(o) => AxisPermutation::parse(o).map_err(to_py)?,
            None => AxisPermutation::native_prefix(view.rank()).map_err(to_py)?,
        };
        let dtype = dtype.unwrap_or(view.dtype());
        let inner = EngineImage::from_view(&view, &order, dtype, policy).map_err(to_py)?;
        Ok(Self::wrap(inner))
    }

    /// Creates an image from a (height, width[, channels]) array.
    #[staticmethod]
    #[pyo3(signature = (array, *, dtype=None, policy="clamp"))]
    fn from_yxc(array: &Bound<'_, PyAny>, dtype: Option<&str>, policy: &str) -> PyResult<Self> {
        let ndim = convert::as_array(array)?.ndim();
        let order = match ndim {
            2 => "yx",
            3 => "yxc",
            n => {
                return Err(pyo3::exceptions::PyValueError::new_err(format!(
                    "array should be 2- or 3-dimensional, got {n} dimensions"
                )));
            }
        };
        Self::new(Some(array), Some(order), dtype, policy)
    }

    /// Width (x size).
    #[getter]
    fn width(&self) -> usize {
        self.inner.dims()[0]
    }

    /// Height (y size).
    #[getter]
    fn height(&self) -> usize {
        self.inner.dims()[1]
    }

    /// Depth (z size).
    #[getter]
    fn depth(&self) -> usize {
        self.inner.dims()[2]
    }

    /// Number of channels (c size).
    #[getter]
    fn spectrum(&self) -> usize {
        self.inner.dims()[3]
    }

    /// Total number of elements.
    #[getter]
    fn size(&self) -> usize {
        self.buffer().len()
    }

    /// (width, height, depth, spectrum)
    #[getter]
    fn shape(&self) -> (usize, usize, usize, usize) {
        let [w, h, d, c] = self.inner.dims();
        (w, h, d, c)
    }

    /// Native strides in elements, in (x, y, z, c) order.
    #[getter]
    fn strides(&self) -> (usize, usize, usize, usize) {
        let [x, y, z, c] = self.buffer().strides();
        (x, y, z, c)
    }

    /// Element type name.
    #[getter]
    fn dtype(&self) -> &'static str {
        self.inner.dtype().name()
    }

    /// Element at `(x, y[, z], c)`; negative indices count from the end.
    fn __getitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<PyObject> {
        let coords: Vec<i64> = match key.downcast::<PyTuple>() {
            Ok(tuple) => tuple.extract()?,
            Err(_) => return Err(PyTypeError::new_err("index with a tuple (x, y[, z], c)")),
        };
        let value = self.buffer().at(&coords).map_err(to_py)?;
        convert::scalar_to_py(py, value)
    }

    /// All channel values of pixel `(x, y[, z])`.
    #[pyo3(signature = (x, y, z=None))]
    fn at<'py>(&self, py: Python<'py>, x: i64, y: i64, z: Option<i64>) -> PyResult<Bound<'py, PyTuple>> {
        let values = self.buffer().pixel(x, y, z).map_err(to_py)?;
        let items = values
            .into_iter()
            .map(|v| convert::scalar_to_py(py, v))
            .collect::<PyResult<Vec<_>>>()?;
        PyTuple::new(py, items)
    }

    /// Copy as a numpy array in `order` (default x, y, z, c).
    #[pyo3(signature = (order="xyzc", *, dtype=None, policy="clamp"))]
    fn to_numpy<'py>(&self, py: Python<'py>, order: &str, dtype: Option<&str>, policy: &str) -> PyResult<Bound<'py, PyAny>> {
        let mut options = ExportOptions::new(AxisPermutation::parse(order).map_err(to_py)?)
            .policy(policy.parse().map_err(to_py)?);
        if let Some(dtype) = convert::parse_dtype(dtype)? {
            options = options.dtype(dtype);
        }
        let view = self.inner.export(&options).map_err(to_py)?;
        convert::to_numpy(py, &view)
    }

    /// Replaces the content with `array`, reallocating as needed.
    #[pyo3(signature = (array, *, order=None, policy="clamp"))]
    fn assign(&self, array: &Bound<'_, PyAny>, order: Option<&str>, policy: &str) -> PyResult<()> {
        self.assign_array(array, order, policy.parse().map_err(to_py)?)
    }

    /// Zero-copy description of the buffer in native order.
    ///
    /// Arrays built from it read the live buffer. After the image reallocates
    /// they keep the previous memory, which the image holds until it is freed.
    #[getter]
    fn __array_interface__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let view = self.native_view()?;
        let dict = convert::interface_dict(py, &view)?;
        self.exported.hold(view);
        Ok(dict)
    }

    /// DLPack capsule aliasing the buffer in native order.
    #[pyo3(signature = (**kwargs))]
    fn __dlpack__<'py>(&self, py: Python<'py>, kwargs: Option<&Bound<'py, PyDict>>) -> PyResult<Bound<'py, PyAny>> {
        convert::dlpack(py, self.native_view()?, kwargs)
    }

    /// DLPack `(device_type, device_id)`; always the CPU.
    fn __dlpack_device__(&self) -> (i32, i32) {
        Device::Cpu.dlpack()
    }

    /// Wrapper exporting in (y, x, c) order.
    #[getter]
    fn yxc(slf: &Bound<'_, Self>) -> YXCWrapper {
        let inner = slf.borrow().inner.clone();
        YXCWrapper::new(slf.clone().unbind(), inner)
    }

    fn __repr__(&self) -> String {
        let [w, h, d, c] = self.inner.dims();
        format!("<pixbridge.Image ({w}x{h}x{d}x{c}) {}>", self.inner.dtype())
    }
}
