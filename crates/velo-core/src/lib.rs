//! Core types and trait definitions for the velo consolidation pipeline.
//!
//! This crate is free of database and filesystem dependencies. The adapters,
//! the SQLite backend and the pipeline all depend on it.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures instead.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod city;
pub mod error;
pub mod provider;
pub mod snapshot;
pub mod source;
pub mod star;
pub mod station;
pub mod store;

pub use error::{Error, Result};
