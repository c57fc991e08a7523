//! Engine calls through mock engines: identity, in-place mutation, isolation.

use pixbridge_core::prelude::*;
use pixbridge_engine::{invoke, run, BufferRef, CommandEngine, EngineError, EngineResult, Image, ImageList, Raw, StringList, Value};

/// Resizes the first buffer argument in place and returns it.
struct Resizer {
    dims: [usize; 4],
}

impl CommandEngine for Resizer {
    fn call(&mut self, _command: &str, args: Vec<Raw>) -> EngineResult<Raw> {
        let Some(Raw::Buffer(handle)) = args.into_iter().next() else {
            return Err(EngineError::engine("resize", "expected an image"));
        };
        handle.write().resize(self.dims)?;
        Ok(Raw::Buffer(handle))
    }
}

/// Remembers the last buffer it saw and returns the one from the previous call.
#[derive(Default)]
struct Hoarder {
    kept: Option<BufferRef>,
}

impl CommandEngine for Hoarder {
    fn call(&mut self, _command: &str, args: Vec<Raw>) -> EngineResult<Raw> {
        let previous = self.kept.take();
        if let Some(Raw::Buffer(handle)) = args.into_iter().next() {
            self.kept = Some(handle);
        }
        Ok(previous.map(Raw::Buffer).unwrap_or(Raw::None))
    }
}

/// Appends a new image to the list and names it.
struct Appender;

impl CommandEngine for Appender {
    fn call(&mut self, command: &str, args: Vec<Raw>) -> EngineResult<Raw> {
        let mut args = args.into_iter();
        let (Some(Raw::List(list)), Some(Raw::Names(names))) = (args.next(), args.next()) else {
            return Err(EngineError::engine(command, "expected list and names"));
        };
        let buf = PixelBuffer::new(4, 4, 1, 3, DType::F32)?;
        list.write().push(BufferRef::new(buf));
        names.write().push(command.to_string());
        Ok(Raw::None)
    }
}

struct Failing;

impl CommandEngine for Failing {
    fn call(&mut self, command: &str, _args: Vec<Raw>) -> EngineResult<Raw> {
        Err(EngineError::engine(command, "unknown command"))
    }
}

fn image(w: usize, h: usize) -> Image {
    let mut buf = PixelBuffer::new(w, h, 1, 1, DType::U8).unwrap();
    buf.fill(7u8).unwrap();
    Image::new(buf)
}

#[test]
fn test_scenario_in_place_resize() {
    let img = image(5, 5);
    let mut engine = Resizer { dims: [10, 10, 1, 1] };
    let out = invoke(&mut engine, "resize 10,10", vec![Value::Image(img.clone())]).unwrap();

    let Value::Image(out) = out else {
        panic!("expected an image, got {out:?}");
    };
    assert!(out.ptr_eq(&img));
    assert_eq!(img.dims(), [10, 10, 1, 1]);

    // the caller's wrapper sees the reallocated storage
    let view = img.export(&ExportOptions::new(AxisPermutation::parse("yx").unwrap())).unwrap();
    assert_eq!(view.shape(), &[10, 10]);
}

#[test]
fn test_same_length_resize_keeps_pixels() {
    let img = image(4, 2);
    let mut engine = Resizer { dims: [2, 4, 1, 1] };
    invoke(&mut engine, "reshape", vec![Value::Image(img.clone())]).unwrap();
    assert_eq!(img.dims(), [2, 4, 1, 1]);
    assert_eq!(img.buffer().read().to_vec::<u8>().unwrap(), vec![7; 8]);
}

#[test]
fn test_registry_does_not_leak_between_calls() {
    let img = image(2, 2);
    let mut engine = Hoarder::default();

    let first = invoke(&mut engine, "keep", vec![Value::Image(img.clone())]).unwrap();
    assert!(matches!(first, Value::None));

    let second = invoke(&mut engine, "keep", vec![Value::Int(1)]).unwrap();
    let Value::Image(returned) = second else {
        panic!("expected an image, got {second:?}");
    };
    // same storage, but a fresh wrapper: the first call's registry is gone
    assert!(returned.buffer().ptr_eq(img.buffer()));
    assert!(!returned.ptr_eq(&img));
}

#[test]
fn test_run_mutates_caller_list() {
    let list = ImageList::new();
    list.push(&image(1, 1));
    let names = StringList::new(["base"]);

    let out = run(&mut Appender, "grow", Some(&list), Some(&names)).unwrap();
    assert!(out.ptr_eq(&list));
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(-1).unwrap().dims(), [4, 4, 1, 3]);
    assert_eq!(names.to_vec(), vec!["base".to_string(), "grow".to_string()]);
}

#[test]
fn test_run_without_list_creates_one() {
    let out = run(&mut Appender, "new", None, None).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.get(0).unwrap().dtype(), DType::F32);
}

#[test]
fn test_engine_failure_propagates() {
    let img = image(1, 1);
    let err = invoke(&mut Failing, "nope", vec![Value::Image(img.clone())]).unwrap_err();
    assert!(matches!(err, EngineError::Engine { ref command, .. } if command == "nope"));
    assert!(!err.is_fatal());
    assert_eq!(img.dims(), [1, 1, 1, 1]);
}

#[test]
fn test_boxed_engine() {
    let mut engine: Box<dyn CommandEngine> = Box::new(Resizer { dims: [3, 1, 1, 1] });
    let img = image(1, 1);
    invoke(&mut engine, "resize", vec![Value::Image(img.clone())]).unwrap();
    assert_eq!(img.dims(), [3, 1, 1, 1]);
}
