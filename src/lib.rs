//! Roki split keyboard firmware library.
//!
//! Everything here is hardware independent and builds for the host, so
//! the protocol, keymap and role logic are tested with `cargo test`.
//! The embedded binary (`main.rs`, `embedded` feature) binds these
//! modules to the nRF52840 peripherals.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod codec;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod hid;
pub mod input;
pub mod keycodes;
pub mod keymap;
pub mod layer_manager;
pub mod link;
pub mod matrix;
pub mod role;

pub use error::{Error, LinkError, Result};
