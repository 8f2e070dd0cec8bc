use tycho_types::error::Error;
use tycho_types::models::{
    CurrencyCollection, IntAddr, RelaxedIntMsgInfo, RelaxedMessage, RelaxedMsgInfo, StateInit,
    StdAddr,
};
use tycho_types::prelude::*;

/// Outbound internal message emitted by the relay contract.
///
/// Serialized as a relaxed internal message: the source address, fees and
/// timings are left empty and filled in by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OutMessage {
    /// Destination address.
    pub dst: StdAddr,
    /// Attached value (native coins and optional extra currencies).
    pub value: CurrencyCollection,
    /// Message body. Empty cell when there is no payload.
    pub body: Cell,
    /// Whether the message bounces back on failure.
    ///
    /// Default: `true`.
    pub bounce: bool,
    /// State init to deploy the destination with.
    pub init: Option<StateInit>,
}

impl OutMessage {
    pub fn new<T: Into<CurrencyCollection>>(dst: StdAddr, value: T) -> Self {
        Self {
            dst,
            value: value.into(),
            body: Cell::empty_cell(),
            bounce: true,
            init: None,
        }
    }

    pub fn with_body(mut self, body: Cell) -> Self {
        self.body = body;
        self
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn with_init(mut self, init: StateInit) -> Self {
        self.init = Some(init);
        self
    }

    /// Builds a message from the parsed relaxed representation.
    ///
    /// Only internal messages to standard addresses are accepted.
    pub fn from_relaxed(msg: &RelaxedMessage<'_>) -> Result<Self, Error> {
        let RelaxedMsgInfo::Int(info) = &msg.info else {
            return Err(Error::InvalidTag);
        };
        let IntAddr::Std(dst) = &info.dst else {
            return Err(Error::InvalidData);
        };

        Ok(Self {
            dst: dst.clone(),
            value: info.value.clone(),
            body: CellBuilder::build_from(&msg.body)?,
            bounce: info.bounce,
            init: msg.init.clone(),
        })
    }

    fn relaxed_info(&self) -> RelaxedIntMsgInfo {
        RelaxedIntMsgInfo {
            ihr_disabled: true,
            bounce: self.bounce,
            bounced: false,
            src: None,
            dst: self.dst.clone().into(),
            value: self.value.clone(),
            ..Default::default()
        }
    }
}

impl Store for OutMessage {
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        RelaxedMessage {
            info: RelaxedMsgInfo::Int(self.relaxed_info()),
            init: self.init.clone(),
            body: self.body.as_slice_allow_exotic(),
            layout: None,
        }
        .store_into(builder, context)
    }
}

impl<'a> Load<'a> for OutMessage {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let msg = RelaxedMessage::load_from(slice)?;
        Self::from_relaxed(&msg)
    }
}
