use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a generated secret.
pub const SECRET_BYTES: usize = 32;

/// Generate a high-entropy opaque secret.
///
/// Draws `SECRET_BYTES` bytes from the operating system CSPRNG.
///
/// # Returns
/// Lowercase hex string (64 characters)
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
