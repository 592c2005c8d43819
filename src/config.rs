//! Engine configuration and its wire encoding.
//!
//! Three parameters fix behavior for an engine instance: the rotated-IoU
//! suppression threshold, the per-image output cap, and the uniform candidate
//! count. All are validated eagerly; an engine cannot be constructed from an
//! invalid configuration.
//!
//! The serialized form is a fixed-order, fixed-width concatenation with no
//! padding: `nms_thresh` as little-endian `f32`, `detections_per_im` as
//! little-endian `u32`, `count` as little-endian `u64`. Versioning is carried
//! by the registry version string, not inside the blob.

use crate::util::{RotNmsError, RotNmsResult};

/// Byte length of an encoded [`NmsConfig`].
pub const ENCODED_CONFIG_LEN: usize = 16;

/// Validated suppression parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Rotated-IoU threshold above which a lower-scored candidate is
    /// suppressed. Must be positive.
    pub nms_thresh: f32,
    /// Maximum kept detections per image. Must be positive.
    pub detections_per_im: usize,
    /// Candidates per image, uniform across the batch. Must be positive.
    pub count: usize,
}

impl NmsConfig {
    /// Creates a validated configuration.
    pub fn new(nms_thresh: f32, detections_per_im: usize, count: usize) -> RotNmsResult<Self> {
        let config = Self {
            nms_thresh,
            detections_per_im,
            count,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> RotNmsResult<()> {
        if !(self.nms_thresh > 0.0) {
            return Err(RotNmsError::InvalidConfig {
                field: "nms_thresh",
                value: f64::from(self.nms_thresh),
            });
        }
        if self.detections_per_im == 0 || self.detections_per_im > u32::MAX as usize {
            return Err(RotNmsError::InvalidConfig {
                field: "detections_per_im",
                value: self.detections_per_im as f64,
            });
        }
        if self.count == 0 {
            return Err(RotNmsError::InvalidConfig {
                field: "count",
                value: self.count as f64,
            });
        }
        Ok(())
    }

    /// Encodes the configuration into its fixed 16-byte schema.
    pub fn encode(&self) -> [u8; ENCODED_CONFIG_LEN] {
        let mut out = [0u8; ENCODED_CONFIG_LEN];
        out[0..4].copy_from_slice(&self.nms_thresh.to_le_bytes());
        out[4..8].copy_from_slice(&(self.detections_per_im as u32).to_le_bytes());
        out[8..16].copy_from_slice(&(self.count as u64).to_le_bytes());
        out
    }

    /// Decodes and validates a configuration from its fixed schema.
    pub fn decode(bytes: &[u8]) -> RotNmsResult<Self> {
        if bytes.len() != ENCODED_CONFIG_LEN {
            return Err(RotNmsError::MalformedConfig {
                expected: ENCODED_CONFIG_LEN,
                got: bytes.len(),
            });
        }
        let nms_thresh = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let detections_per_im = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let count = u64::from_le_bytes([
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        ]);
        let count = usize::try_from(count).map_err(|_| RotNmsError::InvalidConfig {
            field: "count",
            value: count as f64,
        })?;
        Self::new(nms_thresh, detections_per_im as usize, count)
    }
}

#[cfg(test)]
mod tests {
    use super::{NmsConfig, ENCODED_CONFIG_LEN};
    use crate::util::RotNmsError;

    #[test]
    fn rejects_nonpositive_parameters() {
        assert_eq!(
            NmsConfig::new(0.0, 10, 100).err().unwrap(),
            RotNmsError::InvalidConfig {
                field: "nms_thresh",
                value: 0.0,
            }
        );
        assert_eq!(
            NmsConfig::new(-0.5, 10, 100).err().unwrap(),
            RotNmsError::InvalidConfig {
                field: "nms_thresh",
                value: -0.5,
            }
        );
        assert_eq!(
            NmsConfig::new(0.5, 0, 100).err().unwrap(),
            RotNmsError::InvalidConfig {
                field: "detections_per_im",
                value: 0.0,
            }
        );
        assert_eq!(
            NmsConfig::new(0.5, 10, 0).err().unwrap(),
            RotNmsError::InvalidConfig {
                field: "count",
                value: 0.0,
            }
        );
    }

    #[test]
    fn rejects_nan_threshold() {
        assert!(NmsConfig::new(f32::NAN, 10, 100).is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let config = NmsConfig::new(0.35, 300, 120_087).unwrap();
        let bytes = config.encode();
        assert_eq!(bytes.len(), ENCODED_CONFIG_LEN);
        assert_eq!(NmsConfig::decode(&bytes).unwrap(), config);
    }

    #[test]
    fn encoded_layout_is_fixed_order_little_endian() {
        let config = NmsConfig::new(0.5, 2, 3).unwrap();
        let bytes = config.encode();
        assert_eq!(&bytes[0..4], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = NmsConfig::decode(&[0u8; 15]).err().unwrap();
        assert_eq!(
            err,
            RotNmsError::MalformedConfig {
                expected: ENCODED_CONFIG_LEN,
                got: 15,
            }
        );
    }

    #[test]
    fn decode_revalidates_fields() {
        let mut bytes = NmsConfig::new(0.5, 2, 3).unwrap().encode();
        bytes[8..16].copy_from_slice(&0u64.to_le_bytes());
        assert!(NmsConfig::decode(&bytes).is_err());
    }
}
