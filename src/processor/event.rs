//! The run loop wiring chain event sources to path processors.
//!
//! [`EventProcessor::run`] spawns one thread per chain source, funnels their
//! batches through a single channel, routes each batch to the path
//! processors whose endpoints include that chain, and hands the resulting
//! relay actions to the submitter. Shutdown is requested by dropping the
//! sender side of the `shutdown` channel: closing it is observed by every
//! receiver clone at once, where a single `send(())` would wake only one.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use tracing::{debug, error, info, warn};

use crate::chain::{ChainProcessor, EventBatch};
use crate::error::Error;
use crate::processor::{NullSubmitter, PathProcessor, RelaySubmitter};

/// How long a chain thread sleeps when its source had no new block.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct EventProcessorBuilder {
    chain_processors: Vec<Box<dyn ChainProcessor>>,
    path_processors: Vec<Arc<PathProcessor>>,
    submitter: Arc<dyn RelaySubmitter>,
    initial_block_history: u64,
    poll_interval: Duration,
}

impl EventProcessorBuilder {
    fn new() -> Self {
        Self {
            chain_processors: Vec::new(),
            path_processors: Vec::new(),
            submitter: Arc::new(NullSubmitter),
            initial_block_history: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_chain_processors(mut self, processors: Vec<Box<dyn ChainProcessor>>) -> Self {
        self.chain_processors.extend(processors);
        self
    }

    pub fn with_path_processors(mut self, processors: Vec<Arc<PathProcessor>>) -> Self {
        self.path_processors.extend(processors);
        self
    }

    /// How many recent blocks each chain source replays before the run loop
    /// starts, to warm up the path state.
    pub fn with_initial_block_history(mut self, blocks: u64) -> Self {
        self.initial_block_history = blocks;
        self
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn RelaySubmitter>) -> Self {
        self.submitter = submitter;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> EventProcessor {
        EventProcessor {
            chain_processors: self.chain_processors,
            path_processors: self.path_processors,
            submitter: self.submitter,
            initial_block_history: self.initial_block_history,
            poll_interval: self.poll_interval,
        }
    }
}

/// Drives the chain sources and path processors until shutdown or a fatal
/// error.
pub struct EventProcessor {
    chain_processors: Vec<Box<dyn ChainProcessor>>,
    path_processors: Vec<Arc<PathProcessor>>,
    submitter: Arc<dyn RelaySubmitter>,
    initial_block_history: u64,
    poll_interval: Duration,
}

impl EventProcessor {
    pub fn builder() -> EventProcessorBuilder {
        EventProcessorBuilder::new()
    }

    /// Run until the `shutdown` channel is closed, every chain source has
    /// stopped, or an error is fatal. Returns the first chain source error
    /// if any thread failed.
    pub fn run(mut self, shutdown: Receiver<()>) -> Result<(), Error> {
        // Bounded so a stalled consumer applies backpressure to the chain
        // threads instead of buffering unbounded history.
        let (batch_tx, batch_rx) = bounded::<EventBatch>(64);

        let mut handles = Vec::with_capacity(self.chain_processors.len());
        for mut processor in self.chain_processors.drain(..) {
            processor.bootstrap(self.initial_block_history)?;
            let tx = batch_tx.clone();
            let stop = shutdown.clone();
            let poll_interval = self.poll_interval;
            handles.push(thread::spawn(move || {
                chain_loop(processor, tx, stop, poll_interval)
            }));
        }
        // The loop below must see Disconnected once every chain thread is
        // done, so the original sender cannot outlive them.
        drop(batch_tx);

        info!(chains = handles.len(), paths = self.path_processors.len(), "event processor started");

        let mut run_result = Ok(());
        loop {
            select! {
                recv(shutdown) -> _ => {
                    info!("shutdown requested");
                    break;
                }
                recv(batch_rx) -> batch => match batch {
                    Ok(batch) => {
                        if let Err(e) = self.handle_batch(batch) {
                            error!("stopping after submit failure: {e}");
                            run_result = Err(e);
                            break;
                        }
                    }
                    Err(_) => {
                        warn!("all chain event sources have stopped");
                        break;
                    }
                }
            }
        }

        // A producer parked in a blocking send on the full batch channel
        // never observes the shutdown channel; closing the receiver fails
        // its send and unblocks it.
        drop(batch_rx);

        // The receiver clones held by the chain threads observe the same
        // closed shutdown channel, so they stop on their own.
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("chain event source failed: {e}");
                    if run_result.is_ok() {
                        run_result = Err(e);
                    }
                }
                Err(_) => error!("chain event source thread panicked"),
            }
        }

        run_result
    }

    fn handle_batch(&self, batch: EventBatch) -> Result<(), Error> {
        debug!(
            chain = %batch.chain_id,
            height = batch.height,
            messages = batch.messages.len(),
            "routing event batch"
        );
        for path in &self.path_processors {
            if !path.involves_chain(&batch.chain_id) {
                continue;
            }
            path.ingest(&batch);
            let actions = path.flush();
            if !actions.is_empty() {
                self.submitter.submit(actions)?;
            }
        }
        Ok(())
    }
}

fn chain_loop(
    mut processor: Box<dyn ChainProcessor>,
    tx: Sender<EventBatch>,
    shutdown: Receiver<()>,
    poll_interval: Duration,
) -> Result<(), Error> {
    loop {
        match shutdown.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => {
                debug!(chain = %processor.chain_id(), "chain event source stopping");
                return Ok(());
            }
        }

        match processor.next_batch() {
            Ok(Some(batch)) => {
                if tx.send(batch).is_err() {
                    // Normal when the run loop exited after a shutdown
                    // request; an error if it vanished without one.
                    return match shutdown.try_recv() {
                        Err(TryRecvError::Empty) => Err(Error::ChannelSend),
                        _ => Ok(()),
                    };
                }
            }
            Ok(None) => thread::sleep(poll_interval),
            Err(e) => return Err(e),
        }
    }
}
