//! Observer pipeline configuration.
//!
//! Parameters for the frame-stitching stage. Parsing itself is
//! configuration-free: the wire grammar leaves nothing to tune.

use serde::{Deserialize, Serialize};
use spejare_protocols::mqtt::StitchOptions;
use validator::{self, Validate};

/// Observer configuration parameters.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ObserverConfig {
    /// Request/response stitching parameters.
    #[validate(nested)]
    pub stitcher: StitcherConfig,
}

/// Stitcher tuning.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StitcherConfig {
    /// Age (milliseconds) past which an unanswered request is evicted and
    /// counted as an error. Unset disables aging and leaves cleanup to the
    /// surrounding connection bookkeeping.
    #[validate(range(min = 1, max = 3_600_000))]
    #[serde(default)]
    pub max_request_age_ms: Option<u64>,
}

impl StitcherConfig {
    /// Stitching knobs in the form the protocol core takes.
    pub fn stitch_options(&self) -> StitchOptions {
        StitchOptions {
            max_request_age_ns: self.max_request_age_ms.map(|ms| ms * 1_000_000),
        }
    }
}

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            max_request_age_ms: None,
        }
    }
}
