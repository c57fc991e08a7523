//! # pixbridge-engine
//!
//! Identity-preserving calls into an external pixel processing engine.
//!
//! Callers hold wrappers ([`Image`], [`ImageList`], [`StringList`]); the
//! engine receives raw handles it may mutate in place. A call-scoped
//! [`TranslationRegistry`] maps handles that come back to the exact wrapper
//! instances that went in.
//!
//! ## Example
//!
//! ```
//! use pixbridge_core::{DType, PixelBuffer};
//! use pixbridge_engine::{invoke, CommandEngine, EngineResult, Image, Raw, Value};
//!
//! /// Doubles the width of every image it receives.
//! struct Widen;
//!
//! impl CommandEngine for Widen {
//!     fn call(&mut self, _command: &str, mut args: Vec<Raw>) -> EngineResult<Raw> {
//!         if let Some(Raw::Buffer(handle)) = args.first() {
//!             let mut buf = handle.write();
//!             let [w, h, d, c] = buf.dims();
//!             buf.resize([w * 2, h, d, c])?;
//!         }
//!         Ok(args.swap_remove(0))
//!     }
//! }
//!
//! let img = Image::new(PixelBuffer::new(3, 2, 1, 1, DType::U8).unwrap());
//! let out = invoke(&mut Widen, "widen", vec![Value::Image(img.clone())]).unwrap();
//! let Value::Image(out) = out else { unreachable!() };
//! assert!(out.ptr_eq(&img));
//! assert_eq!(img.dims(), [6, 2, 1, 1]);
//! ```

#![warn(missing_docs)]

pub mod call;
pub mod error;
pub mod translate;
pub mod wrapper;

pub use call::{invoke, run, CommandEngine};
pub use error::{EngineError, EngineResult};
pub use translate::{RegistryState, TranslationRegistry};
pub use wrapper::{BufferRef, Image, ImageList, ListRef, NamesRef, Raw, RawId, StringList, Value, WrapperId, WrapperKind};
