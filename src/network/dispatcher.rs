//! Verifies request signatures and dispatches operations to the ledger.
//!
//! The dispatcher owns the single ledger instance behind one `RwLock`:
//! append, corrupt and repair take the write lock, status, validate and view
//! share the read lock. A request is fully applied or rejected before the
//! lock is released.

use crate::config::{Settings, SignaturePolicy};
use crate::core::{Blockchain, CancellationToken};
use crate::error::{LedgerError, Result};
use crate::network::message::{Operation, RequestMessage, ResponseMessage, ResponsePayload};
use crate::wallet::{derive_identity, verify_signature};
use log::{info, warn};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

pub const INVALID_SIGNATURE: &str = "Invalid request signature";
pub const MISSING_SIGNATURE: &str = "Missing signature or public key";
pub const CLIENT_ID_MISMATCH: &str = "Client ID does not match public key";
pub const INVALID_BLOCK_ID: &str = "Invalid block ID";

pub struct RequestDispatcher {
    chain: Arc<RwLock<Blockchain>>,
    policy: SignaturePolicy,
    max_difficulty: u32,
    cancel: CancellationToken,
}

impl RequestDispatcher {
    pub fn new(chain: Blockchain, settings: &Settings) -> Self {
        RequestDispatcher {
            chain: Arc::new(RwLock::new(chain)),
            policy: settings.signature_policy,
            max_difficulty: settings.max_difficulty,
            cancel: CancellationToken::new(),
        }
    }

    /// Create the ledger, measure the hash rate and seal the genesis block
    pub fn with_genesis(settings: &Settings) -> Result<Self> {
        let mut chain = Blockchain::with_benchmark_iterations(settings.hash_benchmark_iterations);
        seed_genesis(&mut chain, &settings.genesis_data, settings.genesis_difficulty)?;
        Ok(Self::new(chain, settings))
    }

    pub fn chain(&self) -> Arc<RwLock<Blockchain>> {
        Arc::clone(&self.chain)
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Token that stops an in-flight seal; reset at the start of every mutation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Answer one request. Never fails: every problem becomes an `ERROR` response.
    pub fn process_request(&self, request: &RequestMessage) -> ResponseMessage {
        let operation = match Operation::try_from(request.operation) {
            Ok(operation) => operation,
            Err(_) => {
                warn!("Rejected unknown operation {}", request.operation);
                return ResponseMessage::error(
                    format!("Invalid operation: {}", request.operation),
                    0,
                );
            }
        };

        if operation.requires_signature(self.policy) {
            if let Err(reason) = authenticate(request) {
                warn!("Rejected {operation} request: {reason}");
                return ResponseMessage::error(reason, 0);
            }
        }

        let start = Instant::now();
        let outcome = self.execute(operation, request);
        let execution_time = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                info!("{operation} succeeded in {execution_time} ms");
                ResponseMessage::success(payload, execution_time)
            }
            Err(e) => {
                warn!("{operation} failed in {execution_time} ms: {e}");
                let message = match e {
                    LedgerError::BlockNotFound { .. } => INVALID_BLOCK_ID.to_string(),
                    other => other.to_string(),
                };
                ResponseMessage::error(message, execution_time)
            }
        }
    }

    fn execute(&self, operation: Operation, request: &RequestMessage) -> Result<ResponsePayload> {
        match operation {
            Operation::Status => Ok(ResponsePayload::Text(self.read_chain()?.status_report())),
            Operation::AddTransaction => {
                if request.difficulty > self.max_difficulty {
                    return Err(LedgerError::InvalidBlock(format!(
                        "Difficulty {} exceeds the maximum of {}",
                        request.difficulty, self.max_difficulty
                    )));
                }
                let mut chain = self.write_chain()?;
                let block = chain.new_block(&request.data, request.difficulty)?;
                self.cancel.reset();
                chain.add_block_with_cancel(block, Some(&self.cancel))?;
                Ok(ResponsePayload::Text("Block added successfully".to_string()))
            }
            Operation::Validate => Ok(ResponsePayload::Text(
                self.read_chain()?.is_chain_valid().to_string(),
            )),
            Operation::View => Ok(ResponsePayload::Blocks(
                self.read_chain()?.get_blocks().to_vec(),
            )),
            Operation::Corrupt => {
                let (index, new_data) = parse_corrupt_payload(&request.data)?;
                self.write_chain()?.corrupt_block(index, new_data)?;
                Ok(ResponsePayload::Text(format!("Block {index} corrupted")))
            }
            Operation::Repair => {
                let mut chain = self.write_chain()?;
                self.cancel.reset();
                chain.repair_chain_with_cancel(Some(&self.cancel))?;
                Ok(ResponsePayload::Text("Chain repaired".to_string()))
            }
        }
    }

    fn read_chain(&self) -> Result<RwLockReadGuard<'_, Blockchain>> {
        self.chain.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_chain(&self) -> Result<RwLockWriteGuard<'_, Blockchain>> {
        self.chain.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

/// Append the genesis block to an empty chain
pub fn seed_genesis(chain: &mut Blockchain, data: &str, difficulty: u32) -> Result<String> {
    if chain.get_chain_size() != 0 {
        return Err(LedgerError::InvalidBlock(
            "Genesis block can only seed an empty chain".to_string(),
        ));
    }
    let genesis = chain.new_block(data, difficulty)?;
    chain.add_block(genesis)
}

/// Verify `signature` over `data ‖ difficulty` with the key carried in the
/// request, and that a supplied client id is the one derived from that key.
fn authenticate(request: &RequestMessage) -> std::result::Result<(), &'static str> {
    let (signature, e, n) = match (
        request.signature.as_deref(),
        request.public_key_e.as_deref(),
        request.public_key_n.as_deref(),
    ) {
        (Some(signature), Some(e), Some(n)) => (signature, e, n),
        _ => return Err(MISSING_SIGNATURE),
    };

    if !verify_signature(&request.signing_payload(), signature, e, n) {
        return Err(INVALID_SIGNATURE);
    }

    match request.client_id.as_deref() {
        Some(client_id) if !client_id.is_empty() && client_id != derive_identity(e, n) => {
            Err(CLIENT_ID_MISMATCH)
        }
        _ => Ok(()),
    }
}

/// `blockId,newData`, split at the first comma so new data may contain commas
fn parse_corrupt_payload(data: &str) -> Result<(usize, &str)> {
    let (id, new_data) = data.split_once(',').ok_or_else(|| {
        LedgerError::Protocol("Corrupt request must be formatted as blockId,newData".to_string())
    })?;
    let index = id.trim().parse::<usize>().map_err(|_| {
        LedgerError::Protocol(format!("Block ID {id:?} is not a non-negative integer"))
    })?;
    Ok((index, new_data))
}
