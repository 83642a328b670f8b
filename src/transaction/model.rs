use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NodeError, Result};

/// Sender identity used for reward credits.
pub const MINT_SENDER: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique within a node's pool; uuid v4 without dashes.
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Simulated payload weight, only used for block packing.
    pub size: u32,
}

impl Transaction {
    pub fn new(sender: String, recipient: String, amount: u64, size: u32) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            sender,
            recipient,
            amount,
            size,
        }
    }
}

/// Transaction as submitted by a client, before an id and size are assigned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTransaction {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<u64>,
}

/// Checked form of [`NewTransaction`]: only this can enter the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl NewTransaction {
    pub fn validate(self) -> Result<ValidTransaction> {
        let sender = required("sender", self.sender)?;
        if sender == MINT_SENDER {
            return Err(NodeError::validation(format!(
                "sender `{MINT_SENDER}` is reserved for rewards"
            )));
        }
        let recipient = required("recipient", self.recipient)?;
        let amount = self
            .amount
            .ok_or_else(|| NodeError::validation("missing field `amount`"))?;
        Ok(ValidTransaction {
            sender,
            recipient,
            amount,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(NodeError::validation(format!("missing field `{field}`"))),
    }
}
