// src/filesystem/mod.rs

//! Filesystem safety for ibex
//!
//! Everything the extractor writes is derived from untrusted manifest
//! data, so every destination path passes through this module's
//! sanitization before any write occurs.

pub mod path;

pub use path::{safe_join, sanitize_component, sanitize_path};
