pub mod random;
pub mod seq;

pub use random::RandomKeyGenerator;
pub use seq::SeqGenerator;

use littleurl_core::ShortKey;

/// Trait for generating short keys.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not guaranteed; the caller decides how a colliding key is
/// written (see `CollisionPolicy`).
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortKey>;
    /// Generates a candidate key.
    fn generate(&self) -> Self::Output;
}
