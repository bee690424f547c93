//! `agstream`: command-line front end for the `ags-sse` client.
//!
//! The binary is thin: it loads [`ags_domain::config::Config`], builds the
//! credential header, starts a reconnecting stream, and prints frames.

pub mod auth;
pub mod cli;
pub mod display;
pub mod logging;
