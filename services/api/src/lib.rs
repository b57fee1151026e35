//! services/api/src/lib.rs
//!
//! The HTTP service around the viewer core: provider and storage adapters,
//! configuration, and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
