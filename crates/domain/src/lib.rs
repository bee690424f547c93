//! `ags-domain`: configuration and shared error types for agstream.
//!
//! Everything operator-facing lives here: the TOML config tree (with a
//! default for every field) and the [`error::Error`] used when loading it.
//! The streaming core (`ags-sse`) converts these into its own runtime
//! config types.

pub mod config;
pub mod error;
