//! shopcart core - shared cart types.
//!
//! This crate provides the types shared by every shopcart component:
//! - `storefront` - Checkout proxy in front of the Shopify Storefront API
//! - `client` - Cart state manager that talks to the proxy
//! - `cli` - Command-line front end for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Cart data is
//! validated once at the ingestion boundary ([`wire`]), so everything that
//! holds a [`Cart`] can rely on its invariants without re-checking.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, quantities and the cart aggregate
//! - [`wire`] - JSON envelope exchanged between the proxy and its clients

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod wire;

pub use types::*;
