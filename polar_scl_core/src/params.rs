use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};

use crate::bits::bytes_for_bits;
use crate::error::PolarError;

pub const MIN_CODE_LENGTH: usize = 8;
pub const MAX_CODE_LENGTH: usize = 1 << 15;
pub const MAX_LIST_SIZE: usize = u8::MAX as usize;

/// Session-wide code parameters: block length N, information length K and
/// list size L (the number of parallel decoder paths).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PolarParams {
    code_length: usize,
    info_length: usize,
    list_size: usize,
}

impl PolarParams {
    pub fn new(
        code_length: usize,
        info_length: usize,
        list_size: usize,
    ) -> Result<Self, PolarError> {
        if !code_length.is_power_of_two() {
            return Err(PolarError::InvalidParams {
                reason: "code length must be a power of two",
            });
        }
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code_length) {
            return Err(PolarError::InvalidParams {
                reason: "code length must lie between 8 and 32768 bits",
            });
        }
        if info_length > code_length {
            return Err(PolarError::InvalidParams {
                reason: "information length exceeds code length",
            });
        }
        if list_size == 0 || list_size > MAX_LIST_SIZE {
            return Err(PolarError::InvalidParams {
                reason: "list size must lie between 1 and 255",
            });
        }
        Ok(Self {
            code_length,
            info_length,
            list_size,
        })
    }

    const fn from_profile(code_length: usize, info_length: usize, list_size: usize) -> Self {
        Self {
            code_length,
            info_length,
            list_size,
        }
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn info_length(&self) -> usize {
        self.info_length
    }

    pub fn list_size(&self) -> usize {
        self.list_size
    }

    /// Depth of the decoding tree, `log2(N)`.
    pub fn depth(&self) -> usize {
        self.code_length.trailing_zeros() as usize
    }

    pub fn code_bytes(&self) -> usize {
        self.code_length / 8
    }

    pub fn info_bytes(&self) -> usize {
        bytes_for_bits(self.info_length)
    }

    pub fn frozen_length(&self) -> usize {
        self.code_length - self.info_length
    }

    pub fn with_list_size(self, list_size: usize) -> Result<Self, PolarError> {
        Self::new(self.code_length, self.info_length, list_size)
    }
}

impl<'de> Deserialize<'de> for PolarParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            code_length: usize,
            info_length: usize,
            list_size: usize,
        }
        let helper = Helper::deserialize(deserializer)?;
        PolarParams::new(helper.code_length, helper.info_length, helper.list_size)
            .map_err(D::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub params: PolarParams,
}

const PROFILE_TINY: ParamProfile = ParamProfile {
    name: "tiny",
    description: "16-bit worked example, list of 4",
    params: PolarParams::from_profile(16, 8, 4),
};

const PROFILE_SRAM_1024: ParamProfile = ParamProfile {
    name: "sram-1024",
    description: "1024-bit SRAM fingerprint, 128-bit raw key, list of 2",
    params: PolarParams::from_profile(1024, 128, 2),
};

const PROFILE_SRAM_1024_WIDE: ParamProfile = ParamProfile {
    name: "sram-1024-wide",
    description: "1024-bit SRAM fingerprint, 128-bit raw key, list of 8",
    params: PolarParams::from_profile(1024, 128, 8),
};

const PROFILE_SRAM_2048: ParamProfile = ParamProfile {
    name: "sram-2048",
    description: "2048-bit SRAM fingerprint, 256-bit raw key, list of 4",
    params: PolarParams::from_profile(2048, 256, 4),
};

static PROFILES: [ParamProfile; 4] = [
    PROFILE_TINY,
    PROFILE_SRAM_1024,
    PROFILE_SRAM_1024_WIDE,
    PROFILE_SRAM_2048,
];

pub fn profiles() -> &'static [ParamProfile] {
    &PROFILES
}

pub fn profile_by_name(name: &str) -> Option<&'static ParamProfile> {
    PROFILES.iter().find(|profile| profile.name == name)
}

/// The 16/8/4 profile used by the worked example and most unit tests.
pub fn profile_tiny() -> PolarParams {
    PROFILE_TINY.params
}

/// The SRAM fingerprint defaults: N = 1024, K = 128, L = 2.
pub fn profile_sram() -> PolarParams {
    PROFILE_SRAM_1024.params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            PolarParams::new(24, 8, 2),
            Err(PolarError::InvalidParams { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(PolarParams::new(4, 2, 1).is_err());
        assert!(PolarParams::new(1 << 16, 8, 1).is_err());
        assert!(PolarParams::new(16, 17, 1).is_err());
    }

    #[test]
    fn rejects_bad_list_size() {
        assert!(PolarParams::new(16, 8, 0).is_err());
        assert!(PolarParams::new(16, 8, 256).is_err());
        assert!(PolarParams::new(16, 8, 255).is_ok());
    }

    #[test]
    fn derived_sizes() {
        let params = PolarParams::new(1024, 100, 4).unwrap();
        assert_eq!(params.depth(), 10);
        assert_eq!(params.code_bytes(), 128);
        assert_eq!(params.info_bytes(), 13);
        assert_eq!(params.frozen_length(), 924);
    }

    #[test]
    fn every_profile_validates() {
        for profile in profiles() {
            let p = profile.params;
            assert_eq!(
                PolarParams::new(p.code_length(), p.info_length(), p.list_size()),
                Ok(p),
                "profile {} is inconsistent",
                profile.name
            );
        }
        assert_eq!(profile_by_name("tiny").map(|p| p.params), Some(profile_tiny()));
        assert!(profile_by_name("missing").is_none());
    }

    #[test]
    fn deserialization_validates() {
        let ok: PolarParams =
            serde_json::from_str(r#"{"code_length":16,"info_length":8,"list_size":4}"#).unwrap();
        assert_eq!(ok, profile_tiny());
        let bad = serde_json::from_str::<PolarParams>(
            r#"{"code_length":12,"info_length":8,"list_size":4}"#,
        );
        assert!(bad.is_err());
    }
}
