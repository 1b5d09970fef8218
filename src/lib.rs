//! Client for a project management API whose payloads are
//! reference-preserving object graphs.

pub mod config;
pub mod graph;
pub mod logging;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod ui;
