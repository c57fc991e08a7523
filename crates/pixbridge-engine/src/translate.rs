//! Call-scoped translation between wrappers and raw engine handles.
//!
//! Before a call every wrapper argument is unwrapped to its raw handle and
//! the pair is recorded. After the call, raw results are mapped back: a handle
//! that was passed in comes back as the very wrapper the caller passed, so
//! in-place engine mutation is visible through the caller's object.
//!
//! # Lifecycle
//!
//! ```text
//! Empty ──translate──> Populated ──untranslate──> Consulted ──finish──> (dropped)
//! ```
//!
//! A registry lives for one engine call; [`TranslationRegistry::finish`]
//! consumes it, so nothing recorded can leak into a later call.

use crate::wrapper::{Image, ImageList, Raw, RawId, StringList, Value, WrapperKind};
use pixbridge_core::{Error, Result};
use std::collections::HashMap;

/// Lifecycle state of a [`TranslationRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Nothing translated yet
    Empty,
    /// Arguments translated, call not returned
    Populated,
    /// Results are being translated back
    Consulted,
}

#[derive(Debug)]
struct Entry {
    kind: WrapperKind,
    wrapper: Value,
}

/// Raw-handle to wrapper map for one engine call.
#[derive(Debug)]
pub struct TranslationRegistry {
    entries: HashMap<RawId, Entry>,
    state: RegistryState,
}

impl Default for TranslationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            state: RegistryState::Empty,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Number of recorded handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unwraps `value` to what the engine receives, recording wrappers.
    ///
    /// The first wrapper recorded for a raw handle wins; a later wrapper
    /// around the same handle translates to the same raw value but does not
    /// replace the recording.
    pub fn translate(&mut self, value: &Value) -> Result<Raw> {
        if self.state == RegistryState::Consulted {
            return Err(Error::internal("translation registry already consulted"));
        }
        self.state = RegistryState::Populated;

        let raw = match value {
            Value::Image(img) => Raw::Buffer(img.buffer().clone()),
            Value::ImageList(list) => Raw::List(list.list().clone()),
            Value::StringList(names) => Raw::Names(names.names().clone()),
            Value::Text(s) => Raw::Text(s.clone()),
            Value::Int(v) => Raw::Int(*v),
            Value::Float(v) => Raw::Float(*v),
            Value::Bool(v) => Raw::Bool(*v),
            Value::None => Raw::None,
        };

        if let (Some(id), Some(kind)) = (raw.id(), value.kind()) {
            let recorded = self.entries.entry(id).or_insert_with(|| Entry {
                kind,
                wrapper: value.clone(),
            });
            tracing::trace!(raw = %id, %kind, first = recorded.wrapper.wrapper_id() == value.wrapper_id(), "recorded translation");
        }
        Ok(raw)
    }

    /// Translates every value in order.
    pub fn translate_all(&mut self, values: &[Value]) -> Result<Vec<Raw>> {
        if self.state == RegistryState::Consulted {
            return Err(Error::internal("translation registry already consulted"));
        }
        self.state = RegistryState::Populated;
        values.iter().map(|v| self.translate(v)).collect()
    }

    /// Maps an engine value back to a wrapper.
    ///
    /// A recorded handle returns the original wrapper instance. An unknown
    /// handle gets a new wrapper that owns it.
    pub fn untranslate(&mut self, raw: Raw) -> Result<Value> {
        let expected = raw.wrapper_kind();
        self.untranslate_inner(raw, expected)
    }

    /// Like [`untranslate`](Self::untranslate) but requires wrapper `kind`.
    ///
    /// A recorded handle whose wrapper has another kind is an internal
    /// consistency error.
    pub fn untranslate_as(&mut self, raw: Raw, kind: WrapperKind) -> Result<Value> {
        self.untranslate_inner(raw, Some(kind))
    }

    fn untranslate_inner(&mut self, raw: Raw, expected: Option<WrapperKind>) -> Result<Value> {
        if self.state == RegistryState::Empty {
            return Err(Error::internal("translation registry consulted before translation"));
        }
        self.state = RegistryState::Consulted;

        if let Some(id) = raw.id() {
            if let Some(entry) = self.entries.get(&id) {
                if let Some(kind) = expected {
                    if kind != entry.kind {
                        return Err(Error::internal(format!(
                            "handle {id} was recorded for {} but requested as {kind}",
                            entry.kind
                        )));
                    }
                }
                tracing::trace!(raw = %id, kind = %entry.kind, "translation hit");
                return Ok(entry.wrapper.clone());
            }
        }

        let value = match (raw, expected) {
            (Raw::Buffer(h), None | Some(WrapperKind::Image)) => Value::Image(Image::from_ref(h)),
            (Raw::List(h), None | Some(WrapperKind::ImageList)) => Value::ImageList(ImageList::from_ref(h)),
            (Raw::Names(h), None | Some(WrapperKind::StringList)) => Value::StringList(StringList::from_ref(h)),
            (Raw::Text(s), None) => Value::Text(s),
            (Raw::Int(v), None) => Value::Int(v),
            (Raw::Float(v), None) => Value::Float(v),
            (Raw::Bool(v), None) => Value::Bool(v),
            (Raw::None, None) => Value::None,
            (raw, Some(kind)) => {
                return Err(Error::internal(format!(
                    "engine value {raw:?} cannot be wrapped as {kind}"
                )));
            }
        };
        Ok(value)
    }

    /// Discards the registry at the end of a call.
    pub fn finish(self) {
        tracing::trace!(entries = self.entries.len(), "translation registry discarded");
    }
}
