use std::future::Future;

use anyhow::Result;
use num_bigint::BigInt;
use tycho_types::crc::crc_16;
use tycho_types::models::{StateInit, StdAddr};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

use crate::mode::SendMode;

/// Internal message which a wallet sends on behalf of the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderArgs {
    /// Destination contract.
    pub to: StdAddr,
    /// Attached value.
    pub value: Tokens,
    /// Whether the message bounces back on failure.
    pub bounce: bool,
    /// Mode of the wallet's own `SendMsg` action.
    pub send_mode: SendMode,
    /// State init to deploy the destination with.
    pub init: Option<StateInit>,
    /// Message body.
    pub body: Cell,
}

/// Wallet which signs and delivers internal messages.
pub trait Sender {
    fn send(&self, args: SenderArgs) -> impl Future<Output = Result<()>> + Send;
}

/// Read-only access to deployed contracts.
pub trait ContractProvider {
    /// Runs a getter method of the contract at `address`.
    fn run_getter(
        &self,
        address: &StdAddr,
        method_id: u32,
        args: Vec<StackItem>,
    ) -> impl Future<Output = Result<GetterOutput>> + Send;
}

/// Stack value passed to or returned from a getter.
#[derive(Debug, Clone, PartialEq)]
pub enum StackItem {
    Null,
    Int(BigInt),
    Cell(Cell),
    /// Slice contents stored as a standalone cell.
    Slice(Cell),
}

impl StackItem {
    /// Returns the underlying cell of a `Cell` or `Slice` item.
    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            Self::Cell(cell) | Self::Slice(cell) => Some(cell),
            Self::Null | Self::Int(_) => None,
        }
    }
}

/// Getter execution result.
#[derive(Debug, Clone, PartialEq)]
pub struct GetterOutput {
    pub exit_code: i32,
    pub stack: Vec<StackItem>,
}

impl GetterOutput {
    /// Getters finish with exit codes `0` or `1`.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 || self.exit_code == 1
    }
}

/// Computes the id of a getter method from its name.
pub fn getter_method_id(name: &str) -> u32 {
    let crc = crc_16(name.as_bytes());
    crc as u32 | 0x10000
}
