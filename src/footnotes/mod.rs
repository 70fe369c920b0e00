//! Footnote style normalization.

mod normalizer;
mod policy;
mod schema;

pub use normalizer::{FootnoteNormalizer, FootnoteStats};
pub use policy::StylePolicy;
pub use schema::{PARAGRAPH_PROPERTIES, RUN_PROPERTIES};
