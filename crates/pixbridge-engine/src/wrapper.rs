//! Raw engine handles and the caller-facing wrappers around them.
//!
//! The engine only sees raw handles ([`BufferRef`], [`ListRef`],
//! [`NamesRef`]): reference-counted, lockable native values that it may mutate
//! in place. Callers hold wrappers ([`Image`], [`ImageList`], [`StringList`])
//! that add identity and metadata on top of one raw handle. Cloning a wrapper
//! clones the reference, not the data, so clones share one identity.

use pixbridge_core::{
    copy, export, ArrayView, AxisPermutation, BufferSource, CastPolicy, DType, ExportOptions,
    PixelBuffer,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identity of a raw handle: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId(usize);

impl RawId {
    fn of<T>(arc: &Arc<T>) -> Self {
        Self(Arc::as_ptr(arc) as *const () as usize)
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident => $target:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<RwLock<$target>>);

        impl $name {
            /// Wraps a value in a new handle.
            pub fn new(value: $target) -> Self {
                Self(Arc::new(RwLock::new(value)))
            }

            /// Identity of this handle.
            pub fn id(&self) -> RawId {
                RawId::of(&self.0)
            }

            /// True if both handles refer to the same value.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }

            /// Shared access to the value.
            pub fn read(&self) -> RwLockReadGuard<'_, $target> {
                self.0.read().unwrap_or_else(PoisonError::into_inner)
            }

            /// Exclusive access to the value.
            pub fn write(&self) -> RwLockWriteGuard<'_, $target> {
                self.0.write().unwrap_or_else(PoisonError::into_inner)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id())
            }
        }
    };
}

raw_handle!(
    /// Raw handle to one native pixel buffer.
    BufferRef => PixelBuffer
);

raw_handle!(
    /// Raw handle to an engine image list.
    ListRef => Vec<BufferRef>
);

raw_handle!(
    /// Raw handle to an engine list of image names.
    NamesRef => Vec<String>
);

impl Default for ListRef {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Default for NamesRef {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Kind tag of a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// [`Image`]
    Image,
    /// [`ImageList`]
    ImageList,
    /// [`StringList`]
    StringList,
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "Image",
            Self::ImageList => "ImageList",
            Self::StringList => "StringList",
        })
    }
}

/// Identity of a wrapper instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WrapperId(usize);

struct ImageInner {
    buffer: BufferRef,
    attributes: RwLock<BTreeMap<String, String>>,
}

/// Caller-facing image: one pixel buffer plus free-form attributes.
#[derive(Clone)]
pub struct Image {
    inner: Arc<ImageInner>,
}

impl Image {
    /// Wraps an owned buffer.
    pub fn new(buffer: PixelBuffer) -> Self {
        Self::from_ref(BufferRef::new(buffer))
    }

    /// Wraps an existing raw handle.
    pub fn from_ref(buffer: BufferRef) -> Self {
        Self {
            inner: Arc::new(ImageInner {
                buffer,
                attributes: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Empty image of the given element type.
    pub fn empty(dtype: DType) -> Self {
        Self::new(PixelBuffer::empty(dtype))
    }

    /// Imports an array view into a new image.
    pub fn from_view(
        view: &ArrayView<'_>,
        order: &AxisPermutation,
        dtype: DType,
        policy: CastPolicy,
    ) -> pixbridge_core::Result<Self> {
        copy::import(view, order, dtype, policy).map(Self::new)
    }

    /// Loads an image through a buffer source such as a file codec.
    pub fn load(source: &dyn BufferSource, path: &Path) -> pixbridge_core::Result<Self> {
        let buffer = source.load(path)?;
        tracing::debug!(path = %path.display(), dims = ?buffer.dims(), "image loaded");
        Ok(Self::new(buffer))
    }

    /// Identity of this wrapper.
    pub fn id(&self) -> WrapperId {
        WrapperId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// True if both wrappers are the same instance.
    pub fn ptr_eq(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Raw handle of the wrapped buffer.
    pub fn buffer(&self) -> &BufferRef {
        &self.inner.buffer
    }

    /// Current native `[w, h, d, c]` sizes.
    pub fn dims(&self) -> [usize; 4] {
        self.inner.buffer.read().dims()
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.inner.buffer.read().dtype()
    }

    /// Replaces the content with `src` imported in `order`.
    pub fn assign(&self, src: &ArrayView<'_>, order: &AxisPermutation, policy: CastPolicy) -> pixbridge_core::Result<()> {
        let mut buffer = self.inner.buffer.write();
        copy::copy(src, &mut buffer, order, policy).map(|_| ())
    }

    /// Exports the buffer; see [`export::export_with`].
    pub fn export(&self, options: &ExportOptions) -> pixbridge_core::Result<ArrayView<'static>> {
        export::export_with(&self.inner.buffer.read(), options)
    }

    /// Attribute value.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.inner
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Sets an attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id())
            .field("buffer", &*self.inner.buffer.read())
            .finish()
    }
}

/// Caller-facing list of images.
#[derive(Clone, Debug)]
pub struct ImageList {
    list: Arc<ListRef>,
}

impl ImageList {
    /// Empty list.
    pub fn new() -> Self {
        Self::from_ref(ListRef::default())
    }

    /// Wraps an existing raw handle.
    pub fn from_ref(list: ListRef) -> Self {
        Self { list: Arc::new(list) }
    }

    /// Identity of this wrapper.
    pub fn id(&self) -> WrapperId {
        WrapperId(Arc::as_ptr(&self.list) as *const () as usize)
    }

    /// True if both wrappers are the same instance.
    pub fn ptr_eq(&self, other: &ImageList) -> bool {
        Arc::ptr_eq(&self.list, &other.list)
    }

    /// Raw handle of the wrapped list.
    pub fn list(&self) -> &ListRef {
        &self.list
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    /// True if the list holds no images.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an image; the list shares its buffer.
    pub fn push(&self, image: &Image) {
        self.list.write().push(image.buffer().clone());
    }

    /// Image at `index`, negative values counting from the end.
    pub fn get(&self, index: i64) -> pixbridge_core::Result<Image> {
        let list = self.list.read();
        let at = pixbridge_core::resolve_index(index, list.len(), "image")?;
        Ok(Image::from_ref(list[at].clone()))
    }
}

impl Default for ImageList {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-facing list of names.
#[derive(Clone, Debug)]
pub struct StringList {
    names: Arc<NamesRef>,
}

impl StringList {
    /// List holding `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_ref(NamesRef::new(names.into_iter().map(Into::into).collect()))
    }

    /// Wraps an existing raw handle.
    pub fn from_ref(names: NamesRef) -> Self {
        Self { names: Arc::new(names) }
    }

    /// Identity of this wrapper.
    pub fn id(&self) -> WrapperId {
        WrapperId(Arc::as_ptr(&self.names) as *const () as usize)
    }

    /// True if both wrappers are the same instance.
    pub fn ptr_eq(&self, other: &StringList) -> bool {
        Arc::ptr_eq(&self.names, &other.names)
    }

    /// Raw handle of the wrapped names.
    pub fn names(&self) -> &NamesRef {
        &self.names
    }

    /// Copy of the names.
    pub fn to_vec(&self) -> Vec<String> {
        self.names.read().clone()
    }
}

/// Value as held by callers.
#[derive(Clone, Debug)]
pub enum Value {
    /// Image wrapper
    Image(Image),
    /// Image list wrapper
    ImageList(ImageList),
    /// Name list wrapper
    StringList(StringList),
    /// Plain string
    Text(String),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// No value
    None,
}

impl Value {
    /// Wrapper kind, `None` for plain values.
    pub fn kind(&self) -> Option<WrapperKind> {
        match self {
            Value::Image(_) => Some(WrapperKind::Image),
            Value::ImageList(_) => Some(WrapperKind::ImageList),
            Value::StringList(_) => Some(WrapperKind::StringList),
            _ => None,
        }
    }

    /// Wrapper identity, `None` for plain values.
    pub fn wrapper_id(&self) -> Option<WrapperId> {
        match self {
            Value::Image(v) => Some(v.id()),
            Value::ImageList(v) => Some(v.id()),
            Value::StringList(v) => Some(v.id()),
            _ => None,
        }
    }
}

/// Value as passed to the engine.
#[derive(Clone, Debug)]
pub enum Raw {
    /// Pixel buffer handle
    Buffer(BufferRef),
    /// Image list handle
    List(ListRef),
    /// Name list handle
    Names(NamesRef),
    /// Plain string
    Text(String),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// No value
    None,
}

impl Raw {
    /// Handle identity, `None` for plain values.
    pub fn id(&self) -> Option<RawId> {
        match self {
            Raw::Buffer(h) => Some(h.id()),
            Raw::List(h) => Some(h.id()),
            Raw::Names(h) => Some(h.id()),
            _ => None,
        }
    }

    /// Wrapper kind that owns this kind of handle.
    pub fn wrapper_kind(&self) -> Option<WrapperKind> {
        match self {
            Raw::Buffer(_) => Some(WrapperKind::Image),
            Raw::List(_) => Some(WrapperKind::ImageList),
            Raw::Names(_) => Some(WrapperKind::StringList),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_identity() {
        let img = Image::new(PixelBuffer::new(2, 2, 1, 1, DType::U8).unwrap());
        let other = img.clone();
        assert!(img.ptr_eq(&other));
        assert_eq!(img.id(), other.id());
        assert!(img.buffer().ptr_eq(other.buffer()));
    }

    #[test]
    fn test_attributes() {
        let img = Image::empty(DType::F32);
        assert_eq!(img.attribute("name"), None);
        img.set_attribute("name", "plate");
        assert_eq!(img.attribute("name").as_deref(), Some("plate"));
    }

    #[test]
    fn test_list_shares_buffers() {
        let img = Image::new(PixelBuffer::new(1, 1, 1, 1, DType::U8).unwrap());
        let list = ImageList::new();
        list.push(&img);
        let got = list.get(-1).unwrap();
        assert!(got.buffer().ptr_eq(img.buffer()));
        assert!(!got.ptr_eq(&img));
        assert!(list.get(1).is_err());
    }

    #[test]
    fn test_exports_read_current_content() {
        let img = Image::new(PixelBuffer::filled([2, 1, 1, 1], 1u8).unwrap());
        let options = ExportOptions::new(AxisPermutation::parse("yxc").unwrap()).dtype(DType::F32);
        let before = img.export(&options).unwrap();

        let src = [9u8, 8];
        let view = ArrayView::from_slice(&src, &[1, 2]).unwrap();
        img.assign(&view, &AxisPermutation::parse("yx").unwrap(), CastPolicy::Clamp).unwrap();

        let after = img.export(&options).unwrap();
        assert_eq!(before.to_vec::<f32>().unwrap(), vec![1.0, 1.0]);
        assert_eq!(after.to_vec::<f32>().unwrap(), vec![9.0, 8.0]);
    }

    #[test]
    fn test_native_export_outlives_reallocation() {
        let img = Image::new(PixelBuffer::filled([4, 4, 1, 1], 2u8).unwrap());
        let view = img
            .export(&ExportOptions::new(AxisPermutation::native()).writable(true))
            .unwrap();
        let address = view.array_interface().unwrap().data.0;

        img.buffer().write().resize([32, 32, 1, 3]).unwrap();

        let held = view.allocation().unwrap();
        assert_eq!(held.address() + view.offset(), address);
        assert!(!held.ptr_eq(&img.buffer().read().storage().allocation()));
        assert!(view.to_vec::<u8>().unwrap_err().is_fatal());
    }

    #[test]
    fn test_raw_kinds() {
        let raw = Raw::Names(NamesRef::new(vec!["a".into()]));
        assert_eq!(raw.wrapper_kind(), Some(WrapperKind::StringList));
        assert!(Raw::Int(3).id().is_none());
    }
}
