//! Secret generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Characters a generated key may contain.
pub const KEY_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}|;:,.<>?";

/// Default key length in characters.
pub const DEFAULT_KEY_LENGTH: usize = 27;

/// Produces opaque keys of a fixed length.
///
/// Each character comes from one OS RNG byte reduced modulo the alphabet
/// size. With 88 symbols the first 80 are slightly more likely than the
/// last 8; keys are shared secrets handed out in chat, not key material,
/// so the bias is accepted.
#[derive(Debug, Clone, Copy)]
pub struct SecretGenerator {
    length: usize,
}

impl SecretGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate a fresh key.
    ///
    /// # Panics
    ///
    /// Panics if the operating system cannot provide entropy. Nothing in the
    /// bot can proceed without it.
    pub fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.length];
        OsRng.fill_bytes(&mut bytes);
        bytes
            .iter()
            .map(|b| KEY_ALPHABET[*b as usize % KEY_ALPHABET.len()] as char)
            .collect()
    }

    /// Whether `value` could have been produced by this generator.
    pub fn is_well_formed(&self, value: &str) -> bool {
        value.len() == self.length && value.bytes().all(|b| KEY_ALPHABET.contains(&b))
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_has_configured_length() {
        for len in [1, 8, DEFAULT_KEY_LENGTH, 64] {
            let key = SecretGenerator::new(len).generate();
            assert_eq!(key.chars().count(), len);
        }
    }

    #[test]
    fn test_generated_key_uses_alphabet_only() {
        let gen = SecretGenerator::default();
        for _ in 0..200 {
            let key = gen.generate();
            assert!(gen.is_well_formed(&key), "unexpected character in {key}");
        }
    }

    #[test]
    fn test_zero_length_generates_empty_key() {
        assert_eq!(SecretGenerator::new(0).generate(), "");
    }

    #[test]
    fn test_consecutive_keys_differ() {
        let gen = SecretGenerator::default();
        assert_ne!(gen.generate(), gen.generate());
    }

    #[test]
    fn test_well_formed_rejects_foreign_characters() {
        let gen = SecretGenerator::new(3);
        assert!(gen.is_well_formed("aB!"));
        assert!(!gen.is_well_formed("a b"));
        assert!(!gen.is_well_formed("abcd"));
    }
}
