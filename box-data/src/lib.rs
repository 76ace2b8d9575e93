//! Batch assembly and box label encoding for grid-based object detectors.
//!
//! Records are pulled from an ordered record store in a cyclic order,
//! decoded, augmented and packed into fixed-shape batches. Each batch
//! carries one image tensor and one label tensor per configured side,
//! filled by a background worker while the consumer reads the previous
//! batch.

mod common;
pub mod assembler;
pub mod batch;
pub mod config;
pub mod error;
pub mod label_encoder;
pub mod layer;
pub mod prefetch;
pub mod profiling;
pub mod record;
pub mod store;
pub mod transform;

pub use assembler::*;
pub use batch::*;
pub use config::*;
pub use error::*;
pub use label_encoder::*;
pub use layer::*;
pub use prefetch::*;
pub use record::*;
pub use store::*;
pub use transform::*;
