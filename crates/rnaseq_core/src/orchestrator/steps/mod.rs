//! Pipeline stage implementations.
//!
//! Each stage wraps one external tool of the analysis.

mod align;
mod reference;
mod compare;
mod convert;
mod quantify;

pub use align::AlignStep;
pub use reference::ReferenceIndex;
pub use compare::{DiffExpressionStep, NormalizeStep, NORMALIZED_TABLE};
pub use convert::{AnnotateStep, SortStep};
pub use quantify::QuantifyStep;
