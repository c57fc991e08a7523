//! Image list type.

use crate::convert::to_py;
use crate::image::Image;
use pixbridge_engine::ImageList as EngineList;
use pyo3::prelude::*;

/// Ordered list of images sharing their buffers with the list.
///
/// # Example
/// ```python
/// images = pixbridge.ImageList()
/// images.append(pixbridge.Image(arr))
/// first = images[0]
/// ```
#[pyclass(name = "ImageList", module = "pixbridge")]
pub struct ImageList {
    inner: EngineList,
}

#[pymethods]
impl ImageList {
    /// Creates a list, optionally filled with `images`.
    #[new]
    #[pyo3(signature = (images=None))]
    fn new(images: Option<Vec<PyRef<'_, Image>>>) -> Self {
        let inner = EngineList::new();
        for image in images.iter().flatten() {
            inner.push(&image.inner);
        }
        Self { inner }
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Image at `index`; negative indices count from the end.
    fn __getitem__(&self, index: i64) -> PyResult<Image> {
        self.inner.get(index).map(Image::wrap).map_err(to_py)
    }

    /// Appends `image`; both then share one buffer.
    fn append(&self, image: PyRef<'_, Image>) {
        self.inner.push(&image.inner);
    }

    fn __repr__(&self) -> String {
        let items: Vec<String> = (0..self.inner.len() as i64)
            .filter_map(|i| self.inner.get(i).ok())
            .map(|img| {
                let [w, h, d, c] = img.dims();
                format!("({w}x{h}x{d}x{c}) {}", img.dtype())
            })
            .collect();
        format!("<pixbridge.ImageList [{}]>", items.join(", "))
    }
}
