//! Domain Layer
//!
//! Entities, value objects, and the store trait at the boundary to the
//! external authentication collaborator.

pub mod entity;
pub mod store;
pub mod value_object;
