//! Tradebook Library
//!
//! Tracks the lifecycle of trades submitted as versioned INSERT / UPDATE /
//! CANCEL transactions and nets the result into a position per security.

pub mod application;
pub mod config;
pub mod domain;
pub mod persistence;
