//! One-time login code generation

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::shared::error::{PlatformError, Result};

/// Length of the one-time login code
pub const LOGIN_CODE_LENGTH: usize = 32;

/// URL-safe alphabet, 64 symbols so every byte maps without bias
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Generate a one-time login code from the operating system CSPRNG.
///
/// Fails instead of falling back to a weaker source when the OS RNG
/// is unavailable.
pub fn generate_login_code() -> Result<String> {
    let mut bytes = [0u8; LOGIN_CODE_LENGTH];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PlatformError::internal(format!("OS random source unavailable: {}", e)))?;

    Ok(bytes
        .iter()
        .map(|b| ALPHABET[(b & 0x3f) as usize] as char)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_length_and_alphabet() {
        let code = generate_login_code().unwrap();
        assert_eq!(code.len(), LOGIN_CODE_LENGTH);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_login_code().unwrap()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
