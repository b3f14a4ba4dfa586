use rand::{Rng, CryptoRng};
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::validate;
use crate::utils::*;
use crate::hash::sha256_hex;
use crate::crypto::{Schema, Signature, PublicKey};


/// Transfer of `amount` from `sender` to `receiver`. The signature covers
/// only the canonical form, so it is excluded from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
    pub signature: Option<Signature>,
}


/// Wire form of a transaction: the signature is a pair of decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<[String; 2]>,
}


impl Transaction {
    /// Create a new unsigned transaction.
    pub fn new(sender: &str, receiver: &str, amount: i64) -> Self {
        Self {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            signature: None,
        }
    }

    /// Build a transaction of `amount` from `sender` to `receiver` signed
    /// with `key`.
    pub fn build<R: Rng + CryptoRng>(rng: &mut R, sender: &str, receiver: &str,
                                     amount: i64, key: &U512,
                                     schema: &Schema) -> Result<Self> {
        let mut transaction = Self::new(sender, receiver, amount);
        transaction.sign(rng, key, schema)?;
        Ok(transaction)
    }

    /// Canonical form: keys `amount`, `receiver`, `sender` in this order,
    /// unquoted amount, no whitespace, no signature. It is both the hash input
    /// and the signed message.
    pub fn canonical(&self) -> String {
        format!(
            r#"{{"amount":{},"receiver":{},"sender":{}}}"#,
            self.amount,
            Value::from(self.receiver.as_str()),
            Value::from(self.sender.as_str()),
        )
    }

    /// Get transaction hash as lowercase hex.
    pub fn get_hash(&self) -> String {
        sha256_hex(self.canonical().as_bytes())
    }

    /// Check if the transaction carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Sign the canonical form. A transaction is signed exactly once.
    pub fn sign<R: Rng + CryptoRng>(&mut self, rng: &mut R, key: &U512,
                                    schema: &Schema) -> Result<()> {
        validate!(!self.is_signed(), TransactionAlreadySigned)?;
        let signature = schema.build_signature(rng, self.canonical().as_bytes(),
                                               key)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Verify the signature against the sender's public key. Unsigned
    /// transactions do not verify.
    pub fn verify(&self, public: &PublicKey, schema: &Schema) -> bool {
        match &self.signature {
            Some(signature) => schema.check_signature(
                self.canonical().as_bytes(), public, signature
            ),
            None => false,
        }
    }

    /// Convert into the wire form.
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            amount: self.amount,
            signature: self.signature.as_ref().map(|s| s.to_strings()),
        }
    }

    /// Build from the wire form.
    pub fn from_record(record: &TransactionRecord) -> Result<Self> {
        let signature = match &record.signature {
            Some(values) => Some(Signature::from_strings(values)?),
            None => None,
        };
        Ok(Self {
            sender: record.sender.clone(),
            receiver: record.receiver.clone(),
            amount: record.amount,
            signature,
        })
    }
}
