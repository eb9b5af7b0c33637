//! Persistent daemon settings.

pub mod config;
