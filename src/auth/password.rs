//! Password hashing

/// bcrypt only looks at the first 72 bytes of its input
const BCRYPT_MAX_BYTES: usize = 72;

/// Cuts `password` to bcrypt's input limit without splitting a UTF-8 sequence.
fn truncate_for_bcrypt(password: &str) -> &str {
    if password.len() <= BCRYPT_MAX_BYTES {
        return password;
    }
    let mut end = BCRYPT_MAX_BYTES;
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    &password[..end]
}

/// Hashes a password using bcrypt at `cost`
///
/// Each hash includes a random salt, so the same password will produce
/// different hashes.
pub fn hash_password_with_cost(password: &str, cost: u32) -> crate::Result<String> {
    bcrypt::hash(truncate_for_bcrypt(password), cost)
        .map_err(|e| crate::OmniError::internal(format!("Failed to hash password: {}", e)))
}

/// Verifies password against bcrypt hash
///
/// Returns true if the password matches the hash, false otherwise
/// (including when the stored hash is malformed).
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(truncate_for_bcrypt(password), hash).unwrap_or(false)
}
