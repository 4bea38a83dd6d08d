//! Chain event sources.
//!
//! A [`ChainProcessor`] is the per-chain collaborator that watches one chain
//! and yields, for each observed height, the typed messages extracted from
//! that height's transactions. The event processor runs one such source per
//! chain on its own thread and fans the batches out to the path processors.

pub mod mock;

use crate::error::Error;
use crate::types::{ChainId, IbcMessage};

/// A batch of typed messages extracted from one chain at a specific height.
#[derive(Clone, Debug)]
pub struct EventBatch {
    pub chain_id: ChainId,
    pub height: u64,
    /// Block timestamp in unix nanoseconds, used for packet timeout checks.
    pub timestamp: u64,
    pub messages: Vec<IbcMessage>,
}

/// One chain's event source. Implementations block on their own network I/O
/// inside [`next_batch`](ChainProcessor::next_batch); the core never does.
pub trait ChainProcessor: Send {
    fn chain_id(&self) -> &ChainId;

    /// Called once before the run loop starts. `block_history` is how many
    /// recent blocks the source should replay to warm up the path state.
    fn bootstrap(&mut self, _block_history: u64) -> Result<(), Error> {
        Ok(())
    }

    /// Produce the next height's batch, or `Ok(None)` when no new block is
    /// available yet.
    fn next_batch(&mut self) -> Result<Option<EventBatch>, Error>;
}
