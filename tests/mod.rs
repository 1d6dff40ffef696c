//! Top-level test module for sqlstep
//!
//! Library-level pipeline tests against the sample tables, organised by topic.

mod group_by;
mod helpers;
mod join;
mod pipeline;
