//! Code-offset fuzzy extractor over the polar list decoder.
//!
//! Enrollment encodes a fingerprint reading, publishes the codeword's frozen
//! positions as helper data together with a validation digest, and derives a
//! key from the codeword's information positions. Reproduction encodes a fresh
//! (noisy) reading, forces the frozen positions back to the enrolled values,
//! list-decodes, and keeps the first candidate whose digest matches.

use log::{debug, warn};
use zeroize::Zeroizing;

use crate::bits::{bytes_for_bits, get_bit, set_bit};
use crate::digest::{Blake3Digest, DIGEST_BYTES, KEY_DOMAIN, KeyDigest, VALIDATION_DOMAIN};
use crate::encoder::check_word;
use crate::error::PolarError;
use crate::helper::HelperData;
use crate::mask::FrozenMask;
use crate::params::PolarParams;
use crate::session::PolarSession;
use crate::versioning::HELPER_DATA_VERSION;

pub type ExtractedKey = Zeroizing<[u8; DIGEST_BYTES]>;

/// A reproduced key with the list slot it was recovered from.
#[derive(Debug)]
pub struct Reproduction {
    pub key: ExtractedKey,
    pub slot: usize,
    pub candidates: usize,
}

#[derive(Clone, Debug)]
pub struct FuzzyExtractor<D = Blake3Digest> {
    session: PolarSession,
    digest: D,
}

impl FuzzyExtractor<Blake3Digest> {
    pub fn new(params: PolarParams) -> Self {
        Self::with_digest(params, Blake3Digest)
    }
}

impl<D: KeyDigest> FuzzyExtractor<D> {
    pub fn with_digest(params: PolarParams, digest: D) -> Self {
        Self {
            session: PolarSession::new(params),
            digest,
        }
    }

    pub fn params(&self) -> &PolarParams {
        self.session.params()
    }

    pub fn enroll(
        &self,
        mask: &FrozenMask,
        fingerprint: &[u8],
    ) -> Result<(HelperData, ExtractedKey), PolarError> {
        let params = *self.params();
        let mask = FrozenMask::from_bytes(&params, mask.as_bytes())?;
        check_word(&params, fingerprint, "fingerprint")?;

        let codeword = Zeroizing::new(self.session.encode(fingerprint, mask.as_bytes())?);
        let mut helper_bits = vec![0u8; bytes_for_bits(params.frozen_length())];
        for (k, position) in mask.frozen_positions().enumerate() {
            set_bit(&mut helper_bits, k, get_bit(&codeword, position));
        }
        let enrolled = Zeroizing::new(mask.restrict(fingerprint));
        let validation_hash = self.digest.digest(VALIDATION_DOMAIN, &enrolled);
        let key = self.derive_key(&mask, &codeword);
        debug!(
            "enrolled N={} K={}: {} helper bits",
            params.code_length(),
            params.info_length(),
            params.frozen_length()
        );

        let helper = HelperData {
            version: HELPER_DATA_VERSION,
            params,
            frozen_mask: mask,
            helper_bits,
            validation_hash,
        };
        Ok((helper, key))
    }

    pub fn reproduce(&self, fingerprint: &[u8], helper: &HelperData) -> Result<ExtractedKey, PolarError> {
        self.reproduce_with_report(fingerprint, helper)
            .map(|reproduction| reproduction.key)
    }

    pub fn reproduce_with_report(
        &self,
        fingerprint: &[u8],
        helper: &HelperData,
    ) -> Result<Reproduction, PolarError> {
        let params = *self.params();
        helper.validate(&params)?;
        check_word(&params, fingerprint, "fingerprint")?;
        let mask = &helper.frozen_mask;

        let mut received = Zeroizing::new(self.session.encode(fingerprint, mask.as_bytes())?);
        for (k, position) in mask.frozen_positions().enumerate() {
            set_bit(&mut received, position, get_bit(&helper.helper_bits, k));
        }

        let candidates = self.session.decode(&received, mask.as_bytes())?;
        let total = candidates.iter().flatten().count();
        // Candidates other than the selected one are dropped (and wiped) here.
        let selected = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(slot, word)| word.map(|word| (slot, Zeroizing::new(word))))
            .find(|(_, word)| self.digest.digest(VALIDATION_DOMAIN, word) == helper.validation_hash);
        let Some((slot, word)) = selected else {
            warn!("no candidate among {} matches the validation hash", total);
            return Err(PolarError::NoMatchingCandidate);
        };

        let codeword = Zeroizing::new(self.session.encode(&word, mask.as_bytes())?);
        let key = self.derive_key(mask, &codeword);
        debug!("reproduced key from slot {} of {} candidates", slot, total);
        Ok(Reproduction {
            key,
            slot,
            candidates: total,
        })
    }

    fn derive_key(&self, mask: &FrozenMask, codeword: &[u8]) -> ExtractedKey {
        let raw_key = Zeroizing::new(mask.extract(codeword));
        Zeroizing::new(self.digest.digest(KEY_DOMAIN, &raw_key))
    }
}
