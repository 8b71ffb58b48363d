use crate::Generator;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use littleurl_core::shortkey::KEY_LENGTH;
use littleurl_core::ShortKey;
use rand::Rng;

/// Generates random 3-character alphanumeric keys.
///
/// Three random bytes are base64-encoded and the first three characters are
/// kept. The base64 alphabet includes `+` and `/`, so candidates containing
/// them are rejected and redrawn. The accepted key is lowercased, which
/// narrows the effective keyspace to 36^3.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Turns three random bytes into a key, or `None` if the encoding
    /// produced a non-alphanumeric character.
    pub fn candidate(bytes: [u8; 3]) -> Option<ShortKey> {
        let encoded = STANDARD.encode(bytes);
        let key = ShortKey::new_unchecked(&encoded[..KEY_LENGTH]);
        key.is_well_formed().then_some(key)
    }
}

impl Generator for RandomKeyGenerator {
    type Output = ShortKey;

    fn generate(&self) -> ShortKey {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 3];
        loop {
            rng.fill(&mut bytes);
            if let Some(key) = Self::candidate(bytes) {
                return key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_is_lowercased_prefix() {
        // "AbC" base64-encodes to "QWJD"
        let key = RandomKeyGenerator::candidate(*b"AbC").unwrap();
        assert_eq!(key.as_str(), "qwj");
    }

    #[test]
    fn candidate_rejects_punctuation() {
        // 0xfb 0xff 0xff encodes to "+///"
        assert!(RandomKeyGenerator::candidate([0xfb, 0xff, 0xff]).is_none());
        // 0x00 0x0f 0xff encodes to "AA//", the third character is '/'
        assert!(RandomKeyGenerator::candidate([0x00, 0x0f, 0xff]).is_none());
    }

    #[test]
    fn generated_keys_are_well_formed() {
        let generator = RandomKeyGenerator::new();
        for _ in 0..1_000 {
            let key = generator.generate();
            assert!(key.is_well_formed(), "bad key {key}");
            assert_eq!(key.as_str(), key.as_str().to_lowercase());
        }
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomKeyGenerator>();
    }
}
