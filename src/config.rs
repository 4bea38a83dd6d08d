//! Relay path configuration.
//!
//! These types define the deserializable shape of a relay path; loading the
//! file and wiring real chain endpoints are collaborator concerns.

use serde::{Deserialize, Serialize};

use crate::processor::path::DEFAULT_INCOMPLETE_LOOKBACK;
use crate::processor::PathProcessor;
use crate::types::{ChannelKey, PathEnd};

fn default_incomplete_lookback() -> usize {
    DEFAULT_INCOMPLETE_LOOKBACK
}

/// One configured relay path between two chain endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayPathConfig {
    pub path_end_1: PathEnd,
    pub path_end_2: PathEnd,

    /// Channel pairs relayed on this path. Empty relays every observed pair.
    #[serde(default)]
    pub channels: Vec<ChannelKey>,

    /// Flush cycles a partial packet record is retained before being dropped.
    #[serde(default = "default_incomplete_lookback")]
    pub incomplete_lookback: usize,
}

impl RelayPathConfig {
    pub fn path_processor(&self) -> PathProcessor {
        PathProcessor::new(self.path_end_1.clone(), self.path_end_2.clone())
            .with_channel_filter(self.channels.clone())
            .with_incomplete_lookback(self.incomplete_lookback)
    }
}
