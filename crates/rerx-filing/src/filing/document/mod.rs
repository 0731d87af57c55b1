//! Builds the batch document for one report and refuses to emit anything
//! that has not passed preflight.

mod builder;
mod checklist;
mod model;
mod preflight;
mod render;

pub use builder::{BuiltDocument, DocumentBuilder, DocumentSummary};
pub use checklist::{verify_structure, StructureError, StructureReport};
pub use preflight::PreflightError;
