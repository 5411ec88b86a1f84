//! # solstice-layout
//!
//! Geometric consolidation of detector output: overlap resolution and
//! reading-order prediction.
//!
//! The overlap resolver takes the raw, frequently-overlapping boxes a
//! layout model emits and produces a clean set where no two boxes overlap
//! more than the configured minor threshold (captions inside figures are
//! deliberately preserved). Resolution is a bounded iteration over a
//! strategy table: merge near-duplicates, drop nested losers, shrink
//! partial overlaps apart.
//!
//! Reading order offers two policies: a fixed two-column heuristic
//! ([`simple_order`]) and a column-detecting DAG sort ([`hybrid_order`]).
//!
//! Everything in this crate is pure computation: no I/O, no suspension, and
//! deterministic output for a given input ordering.

pub mod config;
pub mod expand;
pub mod merge;
pub mod overlap;
pub mod reading_order;
pub mod resolver;

pub use config::ResolverConfig;
pub use expand::expand_boxes;
pub use merge::merge_same_label;
pub use overlap::{box_weight, OverlapInfo};
pub use reading_order::{hybrid_order, simple_order, OrderPolicy};
pub use resolver::resolve_all;
