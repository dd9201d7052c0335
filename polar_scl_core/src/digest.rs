//! Digest used by the fuzzy extractor to validate candidates and derive keys.

use blake3::Hasher;

pub const DIGEST_BYTES: usize = 32;

pub const VALIDATION_DOMAIN: &[u8] = b"polar-scl::validation";
pub const KEY_DOMAIN: &[u8] = b"polar-scl::key";

/// A domain-separated hash over a byte string.
pub trait KeyDigest {
    fn digest(&self, domain: &[u8], data: &[u8]) -> [u8; DIGEST_BYTES];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Digest;

impl KeyDigest for Blake3Digest {
    fn digest(&self, domain: &[u8], data: &[u8]) -> [u8; DIGEST_BYTES] {
        let mut hasher = Hasher::new();
        hasher.update(&(domain.len() as u64).to_le_bytes());
        hasher.update(domain);
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }
}

impl<D: KeyDigest + ?Sized> KeyDigest for &D {
    fn digest(&self, domain: &[u8], data: &[u8]) -> [u8; DIGEST_BYTES] {
        (**self).digest(domain, data)
    }
}
