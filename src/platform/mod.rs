//! Platform abstraction layer
//!
//! Browser bindings live in `web` (wasm32 only):
//! - LocalStorage-backed key-value store
//! - A `wasm-bindgen` facade over the session controller
//!
//! Native builds use `persistence::FileStore` and drive the session directly.

#[cfg(target_arch = "wasm32")]
pub mod web;
