//! Proof-of-work nonce search.
//!
//! The miner walks the nonces `0, 1, 2, ...` as decimal strings, hashes the
//! block header for each one and stops on the first hash accepted by the
//! block criterion. The search is synchronous; `worker` runs it on a
//! dedicated thread.
//!
//! States: `Idle -> Searching -> {Solved, Cancelled, Failed}`. A miner runs
//! once; terminal states are final.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::validate;
use crate::utils::*;
use crate::block::Block;
use crate::config::EngineConfig;
use crate::criterion::MiningCriterion;


/// State of a miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Searching,
    Solved,
    Cancelled,
    Failed,
}


/// Accepted nonce with its header hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub nonce: String,
    pub hash: String,
    pub elapsed: Duration,
}


/// Arbitrary-precision decimal counter. It never overflows.
#[derive(Debug, Clone)]
pub struct NonceCounter {
    // Most significant digit first, values 0..=9
    digits: Vec<u8>,
    text: String,
}


/// Nonce search over a single block.
pub struct Miner {
    block: Block,
    progress_interval: u64,
    state: MinerState,
}


impl Solution {
    /// Elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}


impl NonceCounter {
    /// Counter at zero.
    pub fn new() -> Self {
        Self { digits: vec![0], text: "0".to_string() }
    }

    /// Decimal form of the current value.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Add one.
    pub fn increment(&mut self) {
        let mut ix = self.digits.len();
        loop {
            if ix == 0 {
                self.digits.insert(0, 1);
                break;
            }
            ix -= 1;
            if self.digits[ix] == 9 {
                self.digits[ix] = 0;
            } else {
                self.digits[ix] += 1;
                break;
            }
        }

        self.text.clear();
        self.text.extend(self.digits.iter().map(|d| char::from(b'0' + d)));
    }
}


impl Default for NonceCounter {
    fn default() -> Self {
        Self::new()
    }
}


impl Miner {
    /// Create an idle miner. The nonce of the block is reset.
    pub fn new(mut block: Block, config: &EngineConfig) -> Self {
        block.reset_nonce();
        Self {
            block,
            progress_interval: config.progress_interval.max(1),
            state: MinerState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> MinerState {
        self.state
    }

    /// Block being mined. After `Solved` it carries the accepted nonce.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Take the block out of the miner.
    pub fn into_block(self) -> Block {
        self.block
    }

    /// Run the search until a nonce is accepted (`Ok(Some(..))`) or `cancel`
    /// is raised (`Ok(None)`). `on_progress` gets the current nonce every
    /// `progress_interval` rejected attempts, starting with nonce `0`. An
    /// unknown criterion fails before the first attempt.
    pub fn run<F: FnMut(&str)>(&mut self, cancel: &AtomicBool,
                               mut on_progress: F) -> Result<Option<Solution>> {
        validate!(self.state == MinerState::Idle, MinerState,
                  "miner cannot run from state {:?}", self.state)?;

        let criterion = match MiningCriterion::try_from(&self.block.criterion) {
            Ok(criterion) => criterion,
            Err(err) => {
                self.state = MinerState::Failed;
                warn!(index = %self.block.index, error = %err,
                      "mining aborted");
                return Err(err);
            },
        };

        self.state = MinerState::Searching;
        info!(index = %self.block.index, difficulty = criterion.difficulty(),
              "mining started");

        let hasher = self.block.header_hasher();
        let mut counter = NonceCounter::new();
        let mut attempts: u64 = 0;
        let start = Instant::now();

        loop {
            if cancel.load(Ordering::Relaxed) {
                self.state = MinerState::Cancelled;
                info!(index = %self.block.index, nonce = counter.as_str(),
                      "mining cancelled");
                return Ok(None);
            }

            let hash = hasher.hash(counter.as_str());

            if criterion.check(&hash) {
                let solution = Solution {
                    nonce: counter.as_str().to_string(),
                    hash,
                    elapsed: start.elapsed(),
                };
                self.block.nonce = solution.nonce.clone();
                self.state = MinerState::Solved;
                info!(index = %self.block.index, nonce = %solution.nonce,
                      hash = %solution.hash,
                      elapsed = solution.elapsed_seconds(), "block mined");
                return Ok(Some(solution));
            }

            if attempts % self.progress_interval == 0 {
                trace!(nonce = counter.as_str(), "mining progress");
                on_progress(counter.as_str());
            }

            attempts = attempts.wrapping_add(1);
            counter.increment();
        }
    }
}
