//! Gridscope filter engine
//!
//! Evaluates filter trees over in-memory rows and compiles the same trees to
//! SQL for columnar snapshots, with both paths returning identical rows.

pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
