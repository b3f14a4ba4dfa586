//! Mining on a dedicated thread.
//!
//! The owner and the worker share nothing but channels and a cancellation
//! flag. The protocol is: one `Start` (the block) from owner to worker, then
//! zero or more [`WorkerMessage::Progress`] and at most one terminal message
//! from worker to owner. Message volume is bounded by the progress interval,
//! so the channel is unbounded.
//!
//! A worker runs a single search. Starting a new one means spawning a fresh
//! worker; [`MiningSession`] terminates the previous worker first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::utils::*;
use crate::error::{Error, ErrorKind};
use crate::block::Block;
use crate::config::EngineConfig;
use crate::miner::Miner;


/// Message from the worker to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// Liveness report with the current nonce.
    Progress { nonce: String },

    /// Terminal: accepted nonce and hash.
    Solved { nonce: String, hash: String, elapsed_seconds: f64 },

    /// Terminal: the search could not start (e.g. unknown criterion).
    Failed { reason: String },
}


/// Owner-side handle of a mining thread.
pub struct MiningWorker {
    start: Option<oneshot::Sender<Block>>,
    messages: mpsc::UnboundedReceiver<WorkerMessage>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}


/// Owner of at most one active worker.
pub struct MiningSession {
    config: EngineConfig,
    current: Option<MiningWorker>,
}


impl WorkerMessage {
    /// Check if no message follows this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}


impl MiningWorker {
    /// Spawn a worker thread waiting for its block.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let (start_tx, start_rx) = oneshot::channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancel);
        let config = config.clone();
        let thread = thread::Builder::new()
            .name("pow-miner".to_string())
            .spawn(move || worker_main(start_rx, message_tx, flag, config))
            .map_err(|err| Error::new(
                ErrorKind::WorkerState,
                format!("failed to spawn miner thread: {}", err),
            ))?;

        Ok(Self {
            start: Some(start_tx),
            messages: message_rx,
            cancel,
            thread: Some(thread),
        })
    }

    /// Send the block to mine. Only one start per worker.
    pub fn start(&mut self, block: Block) -> Result<()> {
        let sender = self.start.take().ok_or_else(|| Error::new(
            ErrorKind::WorkerState, "worker already started".to_string()
        ))?;
        debug!(index = %block.index, "sending block to miner");
        sender.send(block).map_err(|_| Error::new(
            ErrorKind::WorkerState, "worker is gone".to_string()
        ))
    }

    /// Next message. `None` once the worker has finished and every message
    /// was read.
    pub async fn next_message(&mut self) -> Option<WorkerMessage> {
        self.messages.recv().await
    }

    /// Blocking version of `next_message`. Must not be called from an async
    /// context.
    pub fn blocking_next(&mut self) -> Option<WorkerMessage> {
        self.messages.blocking_recv()
    }

    /// Ask the search to stop at the next iteration.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Cancel and wait for the thread to exit.
    pub fn terminate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel();
        // A worker still waiting for its block exits when the sender drops
        self.start.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("miner thread panicked");
            }
        }
    }
}


impl Drop for MiningWorker {
    fn drop(&mut self) {
        self.cancel();
        self.start.take();
    }
}


impl MiningSession {
    /// Create a session without a worker.
    pub fn new(config: EngineConfig) -> Self {
        Self { config, current: None }
    }

    /// Terminate the current worker, if any, and mine `block` on a fresh one.
    pub fn mine(&mut self, block: Block) -> Result<&mut MiningWorker> {
        self.stop();
        let mut worker = MiningWorker::spawn(&self.config)?;
        worker.start(block)?;
        Ok(self.current.insert(worker))
    }

    /// Current worker.
    pub fn current(&mut self) -> Option<&mut MiningWorker> {
        self.current.as_mut()
    }

    /// Terminate the current worker.
    pub fn stop(&mut self) {
        if let Some(worker) = self.current.take() {
            debug!("terminating previous miner");
            worker.terminate();
        }
    }
}


fn worker_main(start: oneshot::Receiver<Block>,
               messages: mpsc::UnboundedSender<WorkerMessage>,
               cancel: Arc<AtomicBool>, config: EngineConfig) {
    let block = match start.blocking_recv() {
        Ok(block) => block,
        Err(_) => {
            debug!("miner dropped before start");
            return;
        },
    };

    let mut miner = Miner::new(block, &config);
    let result = miner.run(&cancel, |nonce| {
        let progress = WorkerMessage::Progress { nonce: nonce.to_string() };
        if messages.send(progress).is_err() {
            // Nobody listens anymore
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let terminal = match result {
        Ok(Some(solution)) => WorkerMessage::Solved {
            elapsed_seconds: solution.elapsed_seconds(),
            nonce: solution.nonce,
            hash: solution.hash,
        },
        Ok(None) => return,
        Err(err) => WorkerMessage::Failed { reason: err.to_string() },
    };

    if messages.send(terminal).is_err() {
        debug!("miner owner is gone");
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::criterion::CriterionRecord;
    use crate::transaction::Transaction;

    fn sample_block(difficulty: u64) -> Block {
        Block::new(
            "42",
            "00c0ffee",
            vec![
                Transaction::new("Alice", "Bob", 10),
                Transaction::new("Carol", "Alice", 4),
            ],
            CriterionRecord::leading_zeros(difficulty),
            "1714000000.5",
        )
    }

    fn config(progress_interval: u64) -> EngineConfig {
        EngineConfig { progress_interval, ..EngineConfig::default() }
    }

    #[tokio::test]
    async fn test_solved() {
        let block = sample_block(2);
        let mut worker = MiningWorker::spawn(&config(8)).unwrap();
        worker.start(block.clone()).unwrap();

        let mut progress = 0;
        let terminal = loop {
            let message = worker.next_message().await.unwrap();
            if message.is_terminal() {
                break message;
            }
            progress += 1;
        };

        match terminal {
            WorkerMessage::Solved { nonce, hash, elapsed_seconds } => {
                assert!(hash.starts_with("00"));
                assert_eq!(block.get_hash_with_nonce(&nonce), hash);
                assert!(elapsed_seconds >= 0.0);
                assert!(progress >= 1);
            },
            other => panic!("unexpected message {:?}", other),
        }

        assert!(worker.next_message().await.is_none());
        worker.terminate();
    }

    #[test]
    fn test_blocking_zero_difficulty() {
        let block = sample_block(0);
        let mut worker = MiningWorker::spawn(&EngineConfig::default()).unwrap();
        worker.start(block.clone()).unwrap();

        match worker.blocking_next() {
            Some(WorkerMessage::Solved { nonce, hash, .. }) => {
                assert_eq!(nonce, "0");
                assert_eq!(hash, block.get_hash_with_nonce("0"));
            },
            other => panic!("unexpected message {:?}", other),
        }
        assert!(worker.blocking_next().is_none());
    }

    #[test]
    fn test_single_start() {
        let mut worker = MiningWorker::spawn(&EngineConfig::default()).unwrap();
        worker.start(sample_block(0)).unwrap();

        let err = worker.start(sample_block(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WorkerState);
        worker.terminate();
    }

    #[test]
    fn test_unknown_criterion() {
        let mut block = sample_block(1);
        block.criterion = CriterionRecord::new("mystery", 1);

        let mut worker = MiningWorker::spawn(&EngineConfig::default()).unwrap();
        worker.start(block).unwrap();

        match worker.blocking_next() {
            Some(WorkerMessage::Failed { reason }) =>
                assert!(reason.contains("mystery")),
            other => panic!("unexpected message {:?}", other),
        }
        assert!(worker.blocking_next().is_none());
    }

    #[test]
    fn test_cancel() {
        let mut worker = MiningWorker::spawn(&config(100)).unwrap();
        worker.start(sample_block(64)).unwrap();

        match worker.blocking_next() {
            Some(WorkerMessage::Progress { nonce }) => assert_eq!(nonce, "0"),
            other => panic!("unexpected message {:?}", other),
        }

        worker.cancel();
        assert!(worker.is_cancelled());

        // Only progress until the channel closes, no terminal message
        while let Some(message) = worker.blocking_next() {
            assert!(!message.is_terminal());
        }
        worker.terminate();
    }

    #[test]
    fn test_terminate_before_start() {
        let worker = MiningWorker::spawn(&EngineConfig::default()).unwrap();
        worker.terminate();
    }

    #[test]
    fn test_session_replaces_worker() {
        let mut session = MiningSession::new(config(1000));

        session.mine(sample_block(64)).unwrap();
        assert!(session.current().is_some());

        let block = sample_block(0);
        let worker = session.mine(block.clone()).unwrap();
        match worker.blocking_next() {
            Some(WorkerMessage::Solved { nonce, hash, .. }) => {
                assert_eq!(nonce, "0");
                assert_eq!(hash, block.get_hash_with_nonce("0"));
            },
            other => panic!("unexpected message {:?}", other),
        }

        session.stop();
        assert!(session.current().is_none());
    }
}
