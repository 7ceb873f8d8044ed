//! Authentication primitives library
//!
//! Provides reusable credential building blocks:
//! - Password and secret hashing (Argon2id)
//! - JWT access token signing and verification
//! - Random opaque secrets for refresh tokens
//!
//! Services define their own ports and adapt these implementations behind them.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## JWT Tokens
//! ```
//! use auth::{Claims, JwtHandler};
//! use chrono::Duration;
//!
//! let handler = JwtHandler::new(b"secret_key_at_least_32_bytes_long!");
//! let claims = Claims::for_user("user123", "alice@example.com", true, Duration::minutes(15));
//! let token = handler.encode(&claims).unwrap();
//! let decoded: Claims = handler.decode(&token).unwrap();
//! assert_eq!(decoded.email(), Some("alice@example.com"));
//! ```
//!
//! ## Refresh Secrets
//! ```
//! let secret = auth::generate_secret();
//! assert_eq!(secret.len(), 64);
//! ```

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use secret::generate_secret;
