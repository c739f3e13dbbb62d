//! Catalog Data Client
//!
//! Read-only access to the portal's course catalog and per-student
//! progress rows, served by the hosted data API (PostgREST-style
//! filters over plain tables). Queries are made with the public API
//! key; an access token from the session layer scopes row visibility
//! to the signed-in student.

pub mod client;
pub mod error;
pub mod model;

pub use client::CatalogClient;
pub use error::{CatalogError, CatalogResult};
pub use model::{Course, StudentProgress};
