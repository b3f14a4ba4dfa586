//! Records exchanged with the coordinating service.
//!
//! Inbound records (pending blocks, auth responses) are validated field by
//! field and fail with `ErrorKind::PayloadInvalid` naming the offending path,
//! e.g. `pending_blocks[0].data[1].amount`. Outbound records are the action
//! envelopes `{action_type, action_data}`.

use rand::{Rng, CryptoRng};
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::validate;
use crate::utils::*;
use crate::error::{Error, ErrorKind};
use crate::crypto::{Schema, PublicKey, Signature};
use crate::block::Block;
use crate::criterion::CriterionRecord;
use crate::miner::Solution;
use crate::transaction::{Transaction, TransactionRecord};


/// Bounds of a username, in characters.
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;


/// Registration or login request. The public key is `[x, y]` in decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub public_key: [String; 2],
}


/// Answer of the service to a registration or login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}


/// Header of a mined block with the miner's signature over its hash. The
/// transactions are not repeated: the service pins them by the pending block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockValidationData {
    pub index: String,
    pub previous_hash: String,
    pub timestamp: String,
    pub nonce: String,
    pub criterion: CriterionRecord,
    pub miner: String,
    pub signature: [String; 2],
}


/// Outbound action envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", content = "action_data", rename_all = "snake_case")]
pub enum Action {
    SubmitTransaction(TransactionRecord),
    MinedBlockValidation(BlockValidationData),
}


/// Delivery of actions to the service. Implementations do one attempt per
/// call.
pub trait ActionTransport {
    type Error: std::fmt::Display;

    fn send(&mut self, action: &Action) -> std::result::Result<(), Self::Error>;
}


impl RegistrationRequest {
    /// Request for `public`, optionally under `username`.
    pub fn new(username: Option<&str>, public: &PublicKey) -> Self {
        Self {
            username: username.map(|u| u.to_string()),
            public_key: public.to_strings(),
        }
    }

    /// Check the username and parse the public key.
    pub fn validate(&self, schema: &Schema) -> Result<PublicKey> {
        if let Some(username) = &self.username {
            check_username(username, "username")?;
        }
        PublicKey::from_strings(schema, &self.public_key)
    }
}


impl AuthResponse {
    /// Parse and validate a response.
    pub fn from_json(json: &str) -> Result<Self> {
        let response: Self = serde_json::from_str(json)
            .map_err(|err| Error::payload("$", &err.to_string()))?;
        response.validate()?;
        Ok(response)
    }

    /// Check the flag and the username.
    pub fn validate(&self) -> Result<()> {
        if self.success > 1 {
            return Err(Error::payload("success", "expected 0 or 1"));
        }
        if let Some(username) = &self.username {
            check_username(username, "username")?;
        }
        Ok(())
    }

    /// Check if the service accepted the request.
    pub fn is_success(&self) -> bool {
        self.success == 1
    }
}


impl BlockValidationData {
    /// Check a mined header against the pending block it claims to solve:
    /// same content, satisfied criterion, valid miner signature over the
    /// header hash.
    pub fn verify(&self, pending: &Block, miner: &PublicKey,
                  schema: &Schema) -> Result<bool> {
        let mut candidate = Block::new(
            &self.index,
            &self.previous_hash,
            pending.transactions.clone(),
            self.criterion.clone(),
            &self.timestamp,
        );
        candidate.nonce = self.nonce.clone();

        if candidate.get_canonical_hash() != pending.get_canonical_hash() {
            debug!(index = %self.index, "mined block content differs");
            return Ok(false);
        }

        if !pending.criterion.check(&candidate.get_hash())? {
            debug!(index = %self.index, "mined block misses the criterion");
            return Ok(false);
        }

        let signature = match Signature::from_strings(&self.signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(schema.check_signature(candidate.get_hash().as_bytes(), miner,
                                  &signature))
    }
}


impl Action {
    /// JSON form of the envelope.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}


/// Parse a pending block record `{index, previousHash, data, criterion,
/// timestamp, nonce}`. The nonce is reset.
pub fn parse_pending_block(value: &Value) -> Result<Block> {
    parse_block_at(value, "")
}


/// Parse the pending blocks from `{pending_blocks: [...]}` or a bare array.
pub fn parse_pending_feed(value: &Value) -> Result<Vec<Block>> {
    let (items, prefix) = match value {
        Value::Array(items) => (items, ""),
        Value::Object(obj) => match obj.get("pending_blocks") {
            Some(Value::Array(items)) => (items, "pending_blocks"),
            Some(_) => return Err(Error::payload("pending_blocks",
                                                 "expected an array")),
            None => return Err(Error::payload("pending_blocks",
                                              "missing field")),
        },
        _ => return Err(Error::payload("$", "expected an object or an array")),
    };

    items.iter().enumerate()
        .map(|(ix, item)| parse_block_at(item, &format!("{}[{}]", prefix, ix)))
        .collect()
}


/// Envelope submitting a signed transaction.
pub fn submit_transaction_action(transaction: &Transaction) -> Result<Action> {
    validate!(transaction.is_signed(), TransactionUnsigned,
              "only signed transactions are submitted")?;
    Ok(Action::SubmitTransaction(transaction.to_record()))
}


/// Envelope reporting a solved block. The hash is recomputed with the solved
/// nonce first; a mismatch discards the candidate and nothing is signed.
pub fn mined_block_validation<R: Rng + CryptoRng>(
        rng: &mut R, block: &Block, solution: &Solution, miner: &str,
        key: &U512, schema: &Schema) -> Result<Action> {
    let mut verified = block.clone();
    verified.nonce = solution.nonce.clone();
    let hash = verified.get_hash();

    if hash != solution.hash {
        warn!(index = %block.index, expected = %solution.hash, actual = %hash,
              "mined block hash mismatch");
        return Err(Error::new(
            ErrorKind::IntegrityMismatch,
            format!("hash of block {} does not match the solution",
                    block.index),
        ));
    }

    let signature = schema.build_signature(rng, hash.as_bytes(), key)?;

    Ok(Action::MinedBlockValidation(BlockValidationData {
        index: verified.index,
        previous_hash: verified.previous_hash,
        timestamp: verified.timestamp,
        nonce: verified.nonce,
        criterion: verified.criterion,
        miner: miner.to_string(),
        signature: signature.to_strings(),
    }))
}


/// Forward an action once. Failures are reported, never retried.
pub fn submit_action<T: ActionTransport>(transport: &mut T,
                                         action: &Action) -> Result<()> {
    let kind = action_type(action);
    match transport.send(action) {
        Ok(()) => {
            info!(action_type = kind, "action submitted");
            Ok(())
        },
        Err(err) => {
            warn!(action_type = kind, error = %err, "action submission failed");
            Err(Error::new(
                ErrorKind::Transport,
                format!("failed to submit {}: {}", kind, err),
            ))
        },
    }
}


fn action_type(action: &Action) -> &'static str {
    match action {
        Action::SubmitTransaction(_) => "submit_transaction",
        Action::MinedBlockValidation(_) => "mined_block_validation",
    }
}


fn check_username(username: &str, path: &str) -> Result<()> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN || len > USERNAME_MAX_LEN {
        return Err(Error::payload(path, &format!(
            "expected {} to {} characters", USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(())
}


fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}


fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| Error::payload(
        if path.is_empty() { "$" } else { path }, "expected an object"
    ))
}


fn get<'a>(obj: &'a Map<String, Value>, prefix: &str,
           key: &str) -> Result<(&'a Value, String)> {
    let path = join(prefix, key);
    match obj.get(key) {
        Some(value) => Ok((value, path)),
        None => Err(Error::payload(&path, "missing field")),
    }
}


fn as_string(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(Error::payload(path, "expected a string")),
    }
}


// String or number, kept as text
fn as_text(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::payload(path, "expected a string or a number")),
    }
}


fn as_i64(value: &Value, path: &str) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::payload(path, "expected an integer"))
}


fn as_u64(value: &Value, path: &str) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::payload(path, "expected a non-negative integer"))
}


// Decimal integer given as a string or a number
fn as_decimal(value: &Value, path: &str) -> Result<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        _ => return Err(Error::payload(path, "expected a decimal integer")),
    };
    match u512_from_decimal(&text) {
        Some(_) => Ok(text),
        None => Err(Error::payload(path, "expected a decimal integer")),
    }
}


fn parse_criterion(value: &Value, path: &str) -> Result<CriterionRecord> {
    let obj = as_object(value, path)?;
    let (kind, kind_path) = get(obj, path, "type")?;
    let (difficulty, difficulty_path) = get(obj, path, "difficulty")?;
    Ok(CriterionRecord::new(
        &as_string(kind, &kind_path)?,
        as_u64(difficulty, &difficulty_path)?,
    ))
}


fn parse_transaction(value: &Value, path: &str) -> Result<Transaction> {
    let obj = as_object(value, path)?;
    let (sender, sender_path) = get(obj, path, "sender")?;
    let (receiver, receiver_path) = get(obj, path, "receiver")?;
    let (amount, amount_path) = get(obj, path, "amount")?;

    let signature = match obj.get("signature") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) if items.len() == 2 => {
            let signature_path = join(path, "signature");
            Some([
                as_decimal(&items[0], &format!("{}[0]", signature_path))?,
                as_decimal(&items[1], &format!("{}[1]", signature_path))?,
            ])
        },
        Some(_) => return Err(Error::payload(&join(path, "signature"),
                                             "expected a pair of integers")),
    };

    Transaction::from_record(&TransactionRecord {
        sender: as_string(sender, &sender_path)?,
        receiver: as_string(receiver, &receiver_path)?,
        amount: as_i64(amount, &amount_path)?,
        signature,
    })
}


fn parse_block_at(value: &Value, prefix: &str) -> Result<Block> {
    let obj = as_object(value, prefix)?;

    let (index, path) = get(obj, prefix, "index")?;
    let index = as_text(index, &path)?;

    let (previous_hash, path) = get(obj, prefix, "previousHash")?;
    let previous_hash = as_string(previous_hash, &path)?;

    let (timestamp, path) = get(obj, prefix, "timestamp")?;
    let timestamp = as_text(timestamp, &path)?;

    let (criterion, path) = get(obj, prefix, "criterion")?;
    let criterion = parse_criterion(criterion, &path)?;

    let (data, path) = get(obj, prefix, "data")?;
    let transactions = match data {
        Value::Array(items) => items.iter().enumerate()
            .map(|(ix, item)| parse_transaction(item,
                                                &format!("{}[{}]", path, ix)))
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(Error::payload(&path, "expected an array")),
    };

    // Any nonce of the record is dropped: mining starts from zero
    Ok(Block::new(&index, &previous_hash, transactions, criterion, &timestamp))
}
