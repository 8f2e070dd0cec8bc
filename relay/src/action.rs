use tycho_types::error::Error;
use tycho_types::models::{CurrencyCollection, StdAddr};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

use crate::message::OutMessage;
use crate::mode::{ReserveMode, SendMode};

/// A single engine action emitted by the relay contract.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayAction {
    /// Send an outbound internal message.
    SendMsg { mode: SendMode, message: OutMessage },
    /// Lock part of the remaining balance.
    Reserve {
        mode: ReserveMode,
        value: CurrencyCollection,
    },
}

impl RelayAction {
    /// Tag for [`RelayAction::SendMsg`].
    pub const TAG_SEND_MSG: u32 = 0x0ec3c86d;
    /// Tag for [`RelayAction::Reserve`].
    pub const TAG_RESERVE: u32 = 0x36e6b809;

    pub fn send(mode: SendMode, message: OutMessage) -> Self {
        Self::SendMsg { mode, message }
    }

    pub fn reserve<T: Into<CurrencyCollection>>(mode: ReserveMode, value: T) -> Self {
        Self::Reserve {
            mode,
            value: value.into(),
        }
    }

    /// Returns the message if this is a `SendMsg` action.
    pub fn as_message(&self) -> Option<&OutMessage> {
        match self {
            Self::SendMsg { message, .. } => Some(message),
            Self::Reserve { .. } => None,
        }
    }
}

impl Store for RelayAction {
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        match self {
            Self::SendMsg { mode, message } => {
                builder.store_u32(Self::TAG_SEND_MSG)?;
                builder.store_u8(mode.bits())?;
                builder.store_reference(CellBuilder::build_from_ext(message, context)?)
            }
            Self::Reserve { mode, value } => {
                builder.store_u32(Self::TAG_RESERVE)?;
                builder.store_u8(mode.bits())?;
                value.store_into(builder, context)
            }
        }
    }
}

impl<'a> Load<'a> for RelayAction {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match slice.load_u32()? {
            Self::TAG_SEND_MSG => {
                let mode = SendMode::from_bits_retain(slice.load_u8()?);
                let message = slice.load_reference()?.parse::<OutMessage>()?;
                Ok(Self::SendMsg { mode, message })
            }
            Self::TAG_RESERVE => {
                let mode = ReserveMode::from_bits_retain(slice.load_u8()?);
                let value = CurrencyCollection::load_from(slice)?;
                Ok(Self::Reserve { mode, value })
            }
            _ => Err(Error::InvalidTag),
        }
    }
}

/// Reserve-then-sweep suffix of a relay batch.
///
/// First locks `reserve` on the relay account, then sends everything
/// that remains to `cashback`. Both actions are always the last two
/// in the list, so the sweep sees the balance left after every other action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub reserve: Tokens,
    pub cashback: StdAddr,
}

impl Settlement {
    /// Number of actions occupied by the settlement.
    pub const ACTIONS: usize = 2;

    pub fn new(reserve: Tokens, cashback: StdAddr) -> Self {
        Self { reserve, cashback }
    }

    /// Reserve phase: keeps the minimal storage balance on the account.
    pub fn reserve_action(&self) -> RelayAction {
        RelayAction::reserve(ReserveMode::empty(), self.reserve)
    }

    /// Sweep phase: carries the rest of the balance to the cashback address.
    pub fn sweep_action(&self) -> RelayAction {
        RelayAction::send(
            SendMode::CARRY_ALL_REMAINING_BALANCE,
            OutMessage::new(self.cashback.clone(), Tokens::ZERO),
        )
    }

    pub fn into_actions(self) -> [RelayAction; Self::ACTIONS] {
        [self.reserve_action(), self.sweep_action()]
    }
}
