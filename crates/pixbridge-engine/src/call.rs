//! Calls into the external processing engine.

use crate::error::EngineResult;
use crate::translate::TranslationRegistry;
use crate::wrapper::{ImageList, Raw, StringList, Value, WrapperKind};

/// External engine that runs commands on raw handles.
///
/// Implementations may mutate buffers and lists in place through the handles
/// they receive, including reallocating them, and may return handles they
/// received or new ones.
pub trait CommandEngine {
    /// Runs `command` with `args`.
    fn call(&mut self, command: &str, args: Vec<Raw>) -> EngineResult<Raw>;
}

impl<E: CommandEngine + ?Sized> CommandEngine for &mut E {
    fn call(&mut self, command: &str, args: Vec<Raw>) -> EngineResult<Raw> {
        (**self).call(command, args)
    }
}

impl<E: CommandEngine + ?Sized> CommandEngine for Box<E> {
    fn call(&mut self, command: &str, args: Vec<Raw>) -> EngineResult<Raw> {
        (**self).call(command, args)
    }
}

/// Runs `command` with wrapper arguments and wraps the result.
///
/// Handles passed in come back as the caller's own wrappers. The translation
/// registry lives for this call only and is discarded on every exit path.
pub fn invoke<E: CommandEngine + ?Sized>(engine: &mut E, command: &str, args: Vec<Value>) -> EngineResult<Value> {
    let mut registry = TranslationRegistry::new();
    let result = invoke_with(&mut registry, engine, command, &args);
    registry.finish();
    result
}

fn invoke_with<E: CommandEngine + ?Sized>(
    registry: &mut TranslationRegistry,
    engine: &mut E,
    command: &str,
    args: &[Value],
) -> EngineResult<Value> {
    let raws = registry.translate_all(args)?;
    tracing::debug!(command, args = raws.len(), recorded = registry.len(), "engine call");
    let raw = engine.call(command, raws)?;
    Ok(registry.untranslate(raw)?)
}

/// Runs a command pipeline on an image list.
///
/// With no list a fresh one is created. The returned list is the caller's
/// list instance, mutated in place, unless the engine answers with a
/// different list handle.
pub fn run<E: CommandEngine + ?Sized>(
    engine: &mut E,
    command: &str,
    images: Option<&ImageList>,
    names: Option<&StringList>,
) -> EngineResult<ImageList> {
    let images = images.cloned().unwrap_or_default();
    let names = names.cloned().unwrap_or_else(|| StringList::new(Vec::<String>::new()));

    let mut registry = TranslationRegistry::new();
    let result = run_with(&mut registry, engine, command, &images, &names);
    registry.finish();
    result
}

fn run_with<E: CommandEngine + ?Sized>(
    registry: &mut TranslationRegistry,
    engine: &mut E,
    command: &str,
    images: &ImageList,
    names: &StringList,
) -> EngineResult<ImageList> {
    let list = registry.translate(&Value::ImageList(images.clone()))?;
    let names = registry.translate(&Value::StringList(names.clone()))?;
    tracing::debug!(command, images = images.len(), "engine run");

    let raw = match engine.call(command, vec![list.clone(), names])? {
        Raw::None => list,
        other => other,
    };
    match registry.untranslate_as(raw, WrapperKind::ImageList)? {
        Value::ImageList(out) => Ok(out),
        other => Err(pixbridge_core::Error::internal(format!("engine run produced {other:?}")).into()),
    }
}
