//! Run-loop level errors.
//!
//! Everything the parser or the path processors encounter while decoding and
//! reconciling messages is recovered locally and surfaced through tracing;
//! only collaborator failures (a chain source giving up, the submitter
//! rejecting a batch) terminate the run loop with one of these.

use thiserror::Error;

use crate::types::ChainId;

#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("chain event source for {chain_id} failed: {reason}")]
    ChainSource { chain_id: ChainId, reason: String },

    #[error("failed to send event batch through channel")]
    ChannelSend,

    #[error("relay submitter rejected batch: {0}")]
    Submitter(String),
}

impl Error {
    pub fn chain_source(chain_id: &ChainId, reason: impl Into<String>) -> Self {
        Self::ChainSource {
            chain_id: chain_id.clone(),
            reason: reason.into(),
        }
    }
}
