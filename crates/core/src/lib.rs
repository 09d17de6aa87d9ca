//! Storefront Core - Shared value types.
//!
//! This crate provides the small set of types shared by every storefront
//! component:
//! - `storefront` - Catalog, filters, cart and checkout state machine
//! - `cli` - Terminal front end driving the storefront
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, prices and stock status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
