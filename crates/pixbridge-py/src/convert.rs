//! numpy arrays to views and back, plus error mapping.

use numpy::{PyUntypedArray, PyUntypedArrayMethods};
use pixbridge_core::layout::byte_extent;
use pixbridge_core::{ArrayView, DType, DTypeRegistry, Error, ErrorKind, Scalar, SharedStorage, StrideUnit};
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyTuple};
use std::sync::{Mutex, PoisonError};

/// Maps a buffer-layer error to the matching Python exception.
pub(crate) fn to_py(err: Error) -> PyErr {
    let msg = err.to_string();
    match err.kind() {
        ErrorKind::InvalidArgument => PyValueError::new_err(msg),
        ErrorKind::OutOfRange => PyIndexError::new_err(msg),
        ErrorKind::InternalConsistency => PyRuntimeError::new_err(msg),
    }
}

/// Parses an optional dtype name (`"float32"`, `"u1"`, `"<f4"`, ...).
pub(crate) fn parse_dtype(name: Option<&str>) -> PyResult<Option<DType>> {
    name.map(|n| n.parse::<DType>().map_err(to_py)).transpose()
}

/// Converts any array-like object to a numpy array, without copying numpy input.
pub(crate) fn as_array<'py>(obj: &Bound<'py, PyAny>) -> PyResult<Bound<'py, PyUntypedArray>> {
    if let Ok(arr) = obj.downcast::<PyUntypedArray>() {
        return Ok(arr.clone());
    }
    let numpy = obj.py().import("numpy")?;
    let arr = numpy.call_method1("asarray", (obj,))?;
    Ok(arr.downcast_into::<PyUntypedArray>()?)
}

/// Read-only view over the memory of a numpy array.
pub(crate) fn view_of<'a>(array: &'a Bound<'_, PyUntypedArray>) -> PyResult<ArrayView<'a>> {
    let typestr: String = array.dtype().getattr("str")?.extract()?;
    let dtype = DTypeRegistry::global().lookup_typestr(&typestr).map_err(to_py)?.dtype;
    let shape = array.shape();
    let strides = array.strides();

    let Some((lo, hi)) = byte_extent(shape, strides, dtype.size()).map_err(to_py)? else {
        return ArrayView::strided(&[], 0, dtype, shape, Some(strides), StrideUnit::Bytes).map_err(to_py);
    };
    // SAFETY: numpy keeps every element addressed by shape and strides inside
    // the allocation, so [data + lo, data + hi) is readable. The slice lives
    // no longer than the borrow of `array`, and the GIL is held throughout.
    let data = unsafe {
        let base = (*array.as_array_ptr()).data as *const u8;
        std::slice::from_raw_parts(base.offset(lo), (hi - lo) as usize)
    };
    ArrayView::strided(data, (-lo) as usize, dtype, shape, Some(strides), StrideUnit::Bytes).map_err(to_py)
}

/// Detaches `view` from memory it shares with `storage`.
///
/// A numpy array obtained from a buffer can be assigned back to it; the copy
/// then must not read memory it is writing.
pub(crate) fn detach<'a>(view: ArrayView<'a>, storage: &SharedStorage) -> PyResult<ArrayView<'a>> {
    let Some((lo, hi)) = byte_extent(view.shape(), view.strides(), view.dtype().size()).map_err(to_py)? else {
        return Ok(view);
    };
    let start = view.address().map_err(to_py)? as isize + lo;
    let end = start + (hi - lo);
    let base = storage.address() as isize;
    let overlaps = start < base + storage.byte_len() as isize && base < end;
    if overlaps {
        tracing::debug!(shape = ?view.shape(), "source overlaps destination, copying first");
        return view.to_owned_view().map_err(to_py);
    }
    Ok(view)
}

/// Python value of one element.
pub(crate) fn scalar_to_py(py: Python<'_>, value: Scalar) -> PyResult<PyObject> {
    Ok(match value {
        Scalar::Bool(v) => v.into_pyobject(py)?.to_owned().into_any().unbind(),
        Scalar::Int(v) => v.into_pyobject(py)?.into_any().unbind(),
        Scalar::Float(v) => v.into_pyobject(py)?.into_any().unbind(),
    })
}

/// `__array_interface__` dictionary describing `view`.
pub(crate) fn interface_dict<'py>(py: Python<'py>, view: &ArrayView<'_>) -> PyResult<Bound<'py, PyDict>> {
    let ai = view.array_interface().map_err(to_py)?;
    let dict = PyDict::new(py);
    dict.set_item("typestr", ai.typestr)?;
    dict.set_item("data", (ai.data.0, ai.data.1))?;
    dict.set_item("shape", PyTuple::new(py, ai.shape)?)?;
    dict.set_item("strides", PyTuple::new(py, ai.strides)?)?;
    dict.set_item("version", ai.version)?;
    Ok(dict)
}

/// Dense row-major bytes of `view`.
pub(crate) fn to_bytes<'py>(py: Python<'py>, view: &ArrayView<'_>) -> PyResult<Bound<'py, PyBytes>> {
    let bytes = view.to_contiguous_bytes().map_err(to_py)?;
    Ok(PyBytes::new(py, &bytes))
}

/// Writable numpy copy of `view`.
pub(crate) fn to_numpy<'py>(py: Python<'py>, view: &ArrayView<'_>) -> PyResult<Bound<'py, PyAny>> {
    let bytes = to_bytes(py, view)?;
    let numpy = py.import("numpy")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("dtype", view.dtype().typestr())?;
    let flat = numpy.call_method("frombuffer", (bytes,), Some(&kwargs))?;
    let shaped = flat.call_method1("reshape", (PyTuple::new(py, view.shape())?,))?;
    shaped.call_method0("copy")
}

/// Views whose memory was handed out through `__array_interface__`.
///
/// numpy keeps the exporting object alive as the array's base, so holding
/// the views here keeps every address it was given valid, including
/// allocations the buffer has since replaced.
#[derive(Default)]
pub(crate) struct Exported(Mutex<Vec<ArrayView<'static>>>);

impl Exported {
    /// Keeps `view` alive, replacing an older view of the same allocation.
    pub(crate) fn hold(&self, view: ArrayView<'static>) {
        let mut held = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(allocation) = view.allocation() {
            held.retain(|v| !v.allocation().is_some_and(|a| a.ptr_eq(allocation)));
        }
        held.push(view);
    }
}

/// Single exported view presented to numpy through `__array_interface__`.
#[pyclass(module = "pixbridge", frozen)]
pub(crate) struct ExportedArray {
    view: ArrayView<'static>,
}

#[pymethods]
impl ExportedArray {
    #[getter]
    fn __array_interface__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        interface_dict(py, &self.view)
    }
}

/// DLPack capsule for `view`, produced by numpy over the view's memory.
///
/// Read-only views are copied first since DLPack cannot mark a tensor
/// read-only.
pub(crate) fn dlpack<'py>(
    py: Python<'py>,
    view: ArrayView<'static>,
    kwargs: Option<&Bound<'py, PyDict>>,
) -> PyResult<Bound<'py, PyAny>> {
    let writable = view.is_writable();
    let holder = Bound::new(py, ExportedArray { view })?;
    let mut array = py.import("numpy")?.call_method1("asarray", (holder,))?;
    if !writable {
        array = array.call_method0("copy")?;
    }
    array.call_method("__dlpack__", (), kwargs)
}
