//! services/api/src/lib.rs
//!
//! The HTTP service around the voicebook core: configuration, storage and
//! speech adapters, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
