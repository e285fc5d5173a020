//! # Questline
//!
//! Command-line host for the questline-core progression engine.
//!
//! - `cli`: clap commands over a `ProgressionStore`
//! - `config`: `questline.toml` loading
//! - `storage`: snapshot backend selection and the file backend

pub mod cli;
pub mod config;
pub mod storage;
