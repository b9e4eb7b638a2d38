//! Core types for shopcart.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod money;
pub mod quantity;

pub use cart::{Cart, CartCost, CartDataError, CartLine, Image, Merchandise, MerchandiseProduct};
pub use id::*;
pub use money::{Money, MoneyError};
pub use quantity::{Quantity, QuantityError};
