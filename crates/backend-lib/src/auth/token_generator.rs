// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure token generation for email verification
This module provides cryptographically secure opaque tokens. They are
carried in verification links, so the encoding is URL-safe. */
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Floor on token size (20 bytes = 160 bits of entropy)
pub const MIN_TOKEN_BYTES: usize = 20;

/** Generate a verification token
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_verification_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
Sizes below `MIN_TOKEN_BYTES` are raised to it.
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes.max(MIN_TOKEN_BYTES)];
    // ThreadRng is a CSPRNG reseeded from the OS
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_generation() {
        let token1 = generate_verification_token();
        let token2 = generate_verification_token();

        assert_ne!(token1, token2);

        // 32 bytes of entropy encoded in base64 is 43 chars
        assert_eq!(token1.len(), 43);
        assert!(token1
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_minimum_entropy_is_enforced() {
        let small = generate_secure_token_with_size(4);
        let floor = generate_secure_token_with_size(MIN_TOKEN_BYTES);
        assert_eq!(small.len(), floor.len());
        assert_eq!(URL_SAFE_NO_PAD.decode(&small).unwrap().len(), MIN_TOKEN_BYTES);
    }

    #[test]
    fn test_no_collisions_in_sample() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate_verification_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }
}
