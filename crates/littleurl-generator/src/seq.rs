use crate::Generator;
use littleurl_core::ShortKey;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const KEYSPACE: u64 = 36 * 36 * 36;

/// A deterministic key generator walking the 3-character base36 keyspace.
///
/// Produces "000", "001", ... "zzz" and then wraps around. Useful for
/// reproducible setups and tests; a wrapped generator collides with its own
/// earlier output.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
        }
    }
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Creates a generator starting from a specific position in the keyspace.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }

    /// Creates a generator whose first key is `key`.
    ///
    /// Returns `None` unless `key` is three base36 characters.
    pub fn starting_at(key: &str) -> Option<Self> {
        if key.len() != 3 {
            return None;
        }
        let offset = key.to_ascii_lowercase().bytes().try_fold(0u64, |acc, b| {
            let digit = ALPHABET.iter().position(|&c| c == b)? as u64;
            Some(acc * 36 + digit)
        })?;
        Some(Self::with_offset(offset))
    }

    fn encode(mut value: u64) -> String {
        value %= KEYSPACE;
        let mut out = [b'0'; 3];
        for slot in out.iter_mut().rev() {
            *slot = ALPHABET[(value % 36) as usize];
            value /= 36;
        }
        out.iter().map(|&b| b as char).collect()
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SeqGenerator {
    type Output = ShortKey;

    fn generate(&self) -> ShortKey {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortKey::new_unchecked(Self::encode(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequential_keys() {
        let generator = SeqGenerator::new();

        assert_eq!(generator.generate().as_str(), "000");
        assert_eq!(generator.generate().as_str(), "001");
        assert_eq!(generator.generate().as_str(), "002");
    }

    #[test]
    fn with_offset() {
        let generator = SeqGenerator::with_offset(36);
        assert_eq!(generator.generate().as_str(), "010");
    }

    #[test]
    fn starting_at_key() {
        let generator = SeqGenerator::starting_at("ab1").unwrap();
        assert_eq!(generator.generate().as_str(), "ab1");
        assert_eq!(generator.generate().as_str(), "ab2");

        assert!(SeqGenerator::starting_at("a+1").is_none());
        assert!(SeqGenerator::starting_at("ab").is_none());
    }

    #[test]
    fn wraps_around_keyspace() {
        let generator = SeqGenerator::with_offset(KEYSPACE - 1);
        assert_eq!(generator.generate().as_str(), "zzz");
        assert_eq!(generator.generate().as_str(), "000");
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::new();
        generator.generate();
        generator.generate();

        let cloned = generator.clone();

        assert_eq!(generator.generate().as_str(), "002");
        assert_eq!(cloned.generate().as_str(), "002");
    }

    #[test]
    fn keys_are_well_formed() {
        let generator = SeqGenerator::with_offset(12_345);
        for _ in 0..100 {
            assert!(generator.generate().is_well_formed());
        }
    }
}
