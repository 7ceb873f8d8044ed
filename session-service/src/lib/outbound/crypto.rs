pub mod password;
pub mod token;

pub use password::Argon2PasswordVerifier;
pub use token::JwtTokenCodec;
