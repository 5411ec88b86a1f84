//! # solstice-core
//!
//! Core data model and on-disk cache store for the Solstice document
//! pipeline.
//!
//! This crate defines the types every other Solstice crate speaks:
//!
//! - [`BoundingBox`]: pixel-space geometry with total operations
//!   (area, IoU, intersection-over-smaller, union);
//! - [`LayoutBox`]: a detection artifact with label, score, and lineage;
//! - [`Block`] / [`Document`]: the persisted block-addressable document
//!   with per-page reading order and validated structural invariants;
//! - [`DocumentPaths`] and the store helpers: the deterministic
//!   `<cache_root>/<doc_id>/<stage>` directory layout and canonical JSON
//!   persistence used by every stage.
//!
//! Coordinates are page-raster pixels with y increasing downward. The
//! document JSON round-trip is exact: `Document → JSON → Document` is the
//! identity under canonical serialization.

pub mod bbox;
pub mod boxes;
pub mod document;
pub mod error;
pub mod store;

pub use bbox::BoundingBox;
pub use boxes::{detection_id, merge_id, BoxLabel, LayoutBox};
pub use document::{Block, BlockRole, Document, DocumentMetadata, PipelineMetadata};
pub use error::{Result, SolsticeError};
pub use store::{
    clear_all, clear_document, document_id, list_ingested, load_document, read_json,
    write_json_pretty, DocumentPaths,
};
