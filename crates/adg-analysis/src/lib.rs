// ABOUTME: Bounded multi-language source analysis: classification, guarded
// ABOUTME: parsing, IR extraction, fallback scanning, and the run pipeline.

pub mod classify;
pub mod collect;
pub mod fallback;
pub mod guard;
pub mod languages;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod strategy;

pub use collect::*;
pub use fallback::*;
pub use guard::*;
pub use languages::{extract_ir, IrExtractor};
pub use pipeline::*;
pub use registry::*;
pub use source::*;
pub use strategy::*;
