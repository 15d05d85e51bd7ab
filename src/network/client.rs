use crate::error::{LedgerError, Result};
use crate::network::dispatcher::RequestDispatcher;
use crate::network::message::{Operation, RequestMessage, ResponseMessage};
use crate::wallet::Wallet;
use log::debug;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

/// Anything that answers protocol requests: a remote server or an
/// in-process dispatcher.
pub trait LedgerService {
    fn submit(&mut self, request: &RequestMessage) -> Result<ResponseMessage>;
}

impl LedgerService for RequestDispatcher {
    fn submit(&mut self, request: &RequestMessage) -> Result<ResponseMessage> {
        Ok(self.process_request(request))
    }
}

/// Client side of the protocol over one persistent connection.
/// Requests are signed when the client holds a wallet.
pub struct LedgerClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    wallet: Option<Wallet>,
}

impl LedgerClient {
    pub fn connect(addr: &str, wallet: Option<Wallet>) -> Result<LedgerClient> {
        let writer = TcpStream::connect(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(LedgerClient {
            reader,
            writer,
            wallet,
        })
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    /// Build, sign if possible, and submit one request
    pub fn request(
        &mut self,
        operation: Operation,
        data: &str,
        difficulty: u32,
    ) -> Result<ResponseMessage> {
        let mut request = RequestMessage::new(operation, data, difficulty);
        if let Some(wallet) = &self.wallet {
            request = request.signed_by(wallet);
        }
        self.submit(&request)
    }

    pub fn get_status(&mut self) -> Result<ResponseMessage> {
        self.request(Operation::Status, "", 0)
    }

    pub fn add_transaction(&mut self, data: &str, difficulty: u32) -> Result<ResponseMessage> {
        self.request(Operation::AddTransaction, data, difficulty)
    }

    pub fn verify_chain(&mut self) -> Result<ResponseMessage> {
        self.request(Operation::Validate, "", 0)
    }

    pub fn view_chain(&mut self) -> Result<ResponseMessage> {
        self.request(Operation::View, "", 0)
    }

    pub fn corrupt_chain(&mut self, block_id: usize, new_data: &str) -> Result<ResponseMessage> {
        self.request(Operation::Corrupt, &format!("{block_id},{new_data}"), 0)
    }

    pub fn repair_chain(&mut self) -> Result<ResponseMessage> {
        self.request(Operation::Repair, "", 0)
    }
}

impl LedgerService for LedgerClient {
    fn submit(&mut self, request: &RequestMessage) -> Result<ResponseMessage> {
        let mut json = request.to_json()?;
        debug!("Sending request: {json}");
        json.push('\n');
        self.writer
            .write_all(json.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| LedgerError::Network(format!("Failed to send request: {e}")))?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| LedgerError::Network(format!("Failed to read response: {e}")))?;
        if read == 0 {
            return Err(LedgerError::Network(
                "Server closed the connection".to_string(),
            ));
        }
        ResponseMessage::from_json(line.trim_end())
    }
}
