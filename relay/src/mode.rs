use tycho_types::models::{ReserveCurrencyFlags, SendMsgFlags};

bitflags::bitflags! {
    /// Flags of the `SendMsg` action.
    ///
    /// Bits are fixed by the engine, combine them with `|`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SendMode: u8 {
        /// Forwarding fees are paid from the account balance
        /// instead of being deducted from the message value.
        const PAY_GAS_SEPARATELY = 1;
        /// Errors during this send do not fail the action phase.
        const IGNORE_ERRORS = 1 << 1;
        /// Failed action phase triggers a bounce of the inbound message.
        const BOUNCE_IF_ACTION_FAIL = 1 << 4;
        /// Account is destroyed when its balance becomes zero.
        const DESTROY_IF_ZERO = 1 << 5;
        /// Attaches the remaining value of the inbound message.
        const CARRY_ALL_REMAINING_INCOMING_VALUE = 1 << 6;
        /// Attaches the whole remaining (not reserved) balance,
        /// message value is ignored.
        const CARRY_ALL_REMAINING_BALANCE = 1 << 7;
    }
}

impl SendMode {
    /// Mode of every fan-out message: self-funded and best-effort.
    pub const FAN_OUT: Self = Self::PAY_GAS_SEPARATELY.union(Self::IGNORE_ERRORS);
}

impl From<SendMode> for SendMsgFlags {
    #[inline]
    fn from(value: SendMode) -> Self {
        Self::from_bits_retain(value.bits())
    }
}

impl From<SendMsgFlags> for SendMode {
    #[inline]
    fn from(value: SendMsgFlags) -> Self {
        Self::from_bits_retain(value.bits())
    }
}

bitflags::bitflags! {
    /// Flags of the `ReserveCurrency` action.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReserveMode: u8 {
        /// Reserve everything except the specified amount.
        const ALL_BUT = 1;
        /// Clamp the amount to the remaining balance instead of failing.
        const IGNORE_ERRORS = 1 << 1;
        /// Add the balance before the compute phase to the amount.
        const WITH_ORIGINAL_BALANCE = 1 << 2;
        /// Subtract the amount from the original balance
        /// (only together with `WITH_ORIGINAL_BALANCE`).
        const REVERSE = 1 << 3;
        /// Failed action phase triggers a bounce of the inbound message.
        const BOUNCE_ON_ERROR = 1 << 4;
    }
}

impl From<ReserveMode> for ReserveCurrencyFlags {
    #[inline]
    fn from(value: ReserveMode) -> Self {
        Self::from_bits_retain(value.bits())
    }
}

impl From<ReserveCurrencyFlags> for ReserveMode {
    #[inline]
    fn from(value: ReserveCurrencyFlags) -> Self {
        Self::from_bits_retain(value.bits())
    }
}
