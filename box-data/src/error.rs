//! Fatal error kinds of the data layer.

use thiserror::Error;

/// The contract violations that abort a run.
///
/// Functions of this crate return [anyhow::Error]. Errors of these kinds
/// can be recovered with `error.downcast_ref::<BoxDataError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoxDataError {
    #[error("too many labels in one image: {boxes} boxes exceed the capacity of {max_labels} slots")]
    TooManyLabels { boxes: usize, max_labels: usize },
    #[error("class label must be >= 0, but get {class}")]
    NegativeClass { class: i32 },
    #[error("side num not equal to top size: {sides} sides configured, but {outputs} label outputs expected")]
    SideCountMismatch { sides: usize, outputs: usize },
    #[error("image shape {found:?} differs from the batch shape {expect:?}")]
    ShapeMismatch { expect: [usize; 3], found: [usize; 3] },
    #[error("the record store '{path}' has no records")]
    EmptyStore { path: String },
    #[error("malformed record: {0}")]
    Decode(String),
}
