//! Argon2id digests for passwords and refresh secrets.

pub mod argon2;
pub mod errors;

pub use argon2::PasswordHasher;
pub use errors::PasswordError;
