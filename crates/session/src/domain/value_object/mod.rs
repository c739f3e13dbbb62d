//! Value Objects

pub mod credentials;
pub mod email;
pub mod profile;

pub use credentials::{SignInCredentials, SignUpCredentials};
pub use email::Email;
pub use profile::Profile;
