//! Authenticated request protocol
//!
//! This module carries the wire envelopes, the verifying dispatcher that ties
//! signatures to ledger mutations, the TCP server loop, and the client proxy.

pub mod client;
pub mod dispatcher;
pub mod message;
pub mod server;

pub use client::{LedgerClient, LedgerService};
pub use dispatcher::{seed_genesis, RequestDispatcher};
pub use message::{Operation, RequestMessage, ResponseMessage, ResponsePayload, ResponseStatus};
pub use server::{ConnectionState, Server};
