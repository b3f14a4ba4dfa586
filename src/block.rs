use sha2::{Sha256, Digest};

use crate::utils::*;
use crate::hash::{sha256_hex, hex_as_integer};
use crate::criterion::CriterionRecord;
use crate::transaction::Transaction;


/// Nonce of a block that has not been mined yet.
pub const INITIAL_NONCE: &str = "0";


/// Basic structure for block. The nonce is rewritten only while mining.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub index: String,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pub criterion: CriterionRecord,
    pub timestamp: String,
    pub nonce: String,
}


/// SHA-256 state pre-fed with the nonce-independent part of the header.
/// Cloning it per attempt saves rehashing the prefix.
#[derive(Clone)]
pub struct HeaderHasher {
    prefix: Sha256,
}


impl Block {
    /// New pending block with the initial nonce.
    pub fn new(index: &str, previous_hash: &str, transactions: Vec<Transaction>,
               criterion: CriterionRecord, timestamp: &str) -> Self {
        Self {
            index: index.to_string(),
            previous_hash: previous_hash.to_string(),
            transactions,
            criterion,
            timestamp: timestamp.to_string(),
            nonce: INITIAL_NONCE.to_string(),
        }
    }

    /// Genesis block: index `0`, previous hash `"0"`, no transactions.
    pub fn genesis(criterion: CriterionRecord, timestamp: &str) -> Self {
        Self::new("0", "0", Vec::new(), criterion, timestamp)
    }

    /// Calculate the nonce-independent part of the header: previous hash,
    /// timestamp and the transaction hashes as hex integers, in list order
    /// and without separators.
    pub fn calc_prefix(previous_hash: &str, timestamp: &str,
                       transactions: &[Transaction]) -> String {
        let mut prefix = String::new();
        prefix.push_str(previous_hash);
        prefix.push_str(timestamp);
        for tr in transactions {
            prefix.push_str(hex_as_integer(&tr.get_hash()));
        }
        prefix
    }

    /// Header hash: SHA-256 of the prefix followed by the nonce.
    pub fn get_hash(&self) -> String {
        self.header_hasher().hash(&self.nonce)
    }

    /// Header hash with a different nonce.
    pub fn get_hash_with_nonce(&self, nonce: &str) -> String {
        self.header_hasher().hash(nonce)
    }

    /// Hash of the content without the nonce. It pins the transactions and
    /// the chain link independently of mining.
    pub fn get_canonical_hash(&self) -> String {
        sha256_hex(Self::calc_prefix(&self.previous_hash, &self.timestamp,
                                     &self.transactions).as_bytes())
    }

    /// Hasher for the mining loop.
    pub fn header_hasher(&self) -> HeaderHasher {
        HeaderHasher::new(&Self::calc_prefix(&self.previous_hash,
                                             &self.timestamp,
                                             &self.transactions))
    }

    /// Check that the current nonce satisfies the criterion.
    pub fn check_pow(&self) -> Result<bool> {
        self.criterion.check(&self.get_hash())
    }

    /// Reset the nonce before a new search.
    pub fn reset_nonce(&mut self) {
        self.nonce = INITIAL_NONCE.to_string();
    }
}


impl HeaderHasher {
    /// Create a hasher with the given prefix.
    pub fn new(prefix: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prefix.as_bytes());
        Self { prefix: hasher }
    }

    /// Hash of the prefix followed by `nonce`, lowercase hex.
    pub fn hash(&self, nonce: &str) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.as_bytes());
        hex::encode(hasher.finalize())
    }
}
