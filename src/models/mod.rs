//! Domain model module declarations.

pub mod cart;
pub mod recipe;
