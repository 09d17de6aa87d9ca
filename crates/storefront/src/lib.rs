//! Esencia de Romero storefront library.
//!
//! Client-side state for a small shop: the catalog loader, the filter
//! engine, the persistent cart, and the hosted checkout hand-off, all driven
//! through the [`state::Storefront`] object and rendered through a
//! [`presenter::Presenter`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod filter;
pub mod presenter;
pub mod state;
pub mod storage;

pub use state::Storefront;
