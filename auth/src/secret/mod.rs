pub mod generator;

pub use generator::generate_secret;
pub use generator::SECRET_BYTES;
