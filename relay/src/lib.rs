//! Client side of the proxy sender relay contract.
//!
//! The contract receives a list of output actions from its owner and installs
//! it as is, so a single inbound message fans out into up to 255 outbound ones.
//! [`ProxySender`] builds those lists and dispatches them through a [`Sender`].

#[macro_use]
mod log;

pub use self::action::{RelayAction, Settlement};
pub use self::action_list::{
    build_relay_body, decode_relay_body, encode_actions, ActionList, ActionListBuilder,
    MAX_ACTIONS,
};
pub use self::config::{ProxyConfig, RelayParams};
pub use self::error::{RelayError, RelayResult};
pub use self::message::OutMessage;
pub use self::mode::{ReserveMode, SendMode};
pub use self::provider::{
    getter_method_id, ContractProvider, GetterOutput, Sender, SenderArgs, StackItem,
};
pub use self::proxy::ProxySender;

pub mod jetton;

mod action;
mod action_list;
mod config;
mod error;
mod message;
mod mode;
mod provider;
mod proxy;
