//! Request and response envelopes of the line-delimited JSON protocol.

use crate::config::SignaturePolicy;
use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable operation codes of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Status = 0,
    AddTransaction = 1,
    Validate = 2,
    View = 3,
    Corrupt = 4,
    Repair = 5,
}

impl Operation {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Append and corrupt change block contents
    pub fn is_mutating(self) -> bool {
        matches!(self, Operation::AddTransaction | Operation::Corrupt)
    }

    pub fn requires_signature(self, policy: SignaturePolicy) -> bool {
        match policy {
            SignaturePolicy::All => true,
            SignaturePolicy::Mutating => self.is_mutating(),
            SignaturePolicy::None => false,
        }
    }
}

impl TryFrom<i64> for Operation {
    type Error = LedgerError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Operation::Status),
            1 => Ok(Operation::AddTransaction),
            2 => Ok(Operation::Validate),
            3 => Ok(Operation::View),
            4 => Ok(Operation::Corrupt),
            5 => Ok(Operation::Repair),
            other => Err(LedgerError::Protocol(format!("Invalid operation {other}"))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Status => "status",
            Operation::AddTransaction => "add-transaction",
            Operation::Validate => "validate",
            Operation::View => "view",
            Operation::Corrupt => "corrupt",
            Operation::Repair => "repair",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub operation: i64,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub difficulty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl RequestMessage {
    /// Unsigned request
    pub fn new(operation: Operation, data: &str, difficulty: u32) -> Self {
        RequestMessage {
            operation: operation.code(),
            data: data.to_string(),
            difficulty,
            client_id: None,
            public_key_e: None,
            public_key_n: None,
            signature: None,
        }
    }

    /// The exact string that is signed and verified: data followed by difficulty
    pub fn signing_payload(&self) -> String {
        format!("{}{}", self.data, self.difficulty)
    }

    /// Attach the wallet's identity, public key and signature
    pub fn signed_by(mut self, wallet: &Wallet) -> Self {
        self.signature = Some(wallet.sign(&self.signing_payload()));
        self.client_id = Some(wallet.get_client_id());
        self.public_key_e = Some(wallet.get_public_key_e());
        self.public_key_n = Some(wallet.get_public_key_n());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| LedgerError::Protocol(format!("Malformed request: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response data: a human-readable string or the chain's blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Text(String),
    Blocks(Vec<Block>),
}

impl fmt::Display for ResponsePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponsePayload::Text(text) => f.write_str(text),
            ResponsePayload::Blocks(blocks) => {
                let json = serde_json::to_string_pretty(blocks).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub status: ResponseStatus,
    pub data: ResponsePayload,
    pub execution_time: u64,
}

impl ResponseMessage {
    pub fn success(data: ResponsePayload, execution_time: u64) -> Self {
        ResponseMessage {
            status: ResponseStatus::Success,
            data,
            execution_time,
        }
    }

    pub fn error(message: impl Into<String>, execution_time: u64) -> Self {
        ResponseMessage {
            status: ResponseStatus::Error,
            data: ResponsePayload::Text(message.into()),
            execution_time,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| LedgerError::Protocol(format!("Malformed response: {e}")))
    }
}
