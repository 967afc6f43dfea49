//! Core application plumbing.
pub mod config;
pub mod container;
