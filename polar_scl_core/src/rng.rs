//! RNG helpers separating reproducible, seed-derived randomness from the OS RNG.
//!
//! Masks and simulated measurement noise for tests, benches and the demo are
//! derived from a caller-supplied seed through BLAKE3 into `ChaCha20Rng`, so
//! a seed always reproduces the same mask and the same bit errors. Anything
//! that must be unpredictable uses `OsRng`.

use blake3::Hasher;
use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

/// Convenience alias for the OS-backed RNG.
pub type SecureRng = OsRng;

/// Deterministic RNG derived from a seed and a stream counter.
pub fn derive_rng(seed: &[u8], stream: u64) -> ChaCha20Rng {
    let mut hasher = Hasher::new();
    hasher.update(b"polar-scl::rng");
    hasher.update(seed);
    hasher.update(&stream.to_le_bytes());
    ChaCha20Rng::from_seed(*hasher.finalize().as_bytes())
}

pub fn secure_rng() -> SecureRng {
    OsRng
}
