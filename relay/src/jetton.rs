//! Payloads for relaying jetton transfers.

use tycho_types::error::Error;
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

/// Jetton wallet `transfer` message body.
///
/// ```text
/// transfer#0f8a7ea5 query_id:uint64 amount:(VarUInteger 16) destination:MsgAddress
///     response_destination:MsgAddress custom_payload:(Maybe ^Cell)
///     forward_ton_amount:(VarUInteger 16) forward_payload:(Either Cell ^Cell)
///     = InternalMsgBody;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JettonTransfer {
    pub query_id: u64,
    pub amount: Tokens,
    pub destination: StdAddr,
    pub response_destination: Option<StdAddr>,
    pub custom_payload: Option<Cell>,
    pub forward_ton_amount: Tokens,
    pub forward_payload: Option<Cell>,
}

impl JettonTransfer {
    pub const OP: u32 = 0x0f8a7ea5;

    /// Minimal forward amount which still triggers a transfer notification.
    pub const DEFAULT_FORWARD_AMOUNT: Tokens = Tokens::new(1);

    pub fn new(destination: StdAddr, amount: Tokens) -> Self {
        Self {
            query_id: 0,
            amount,
            destination,
            response_destination: None,
            custom_payload: None,
            forward_ton_amount: Self::DEFAULT_FORWARD_AMOUNT,
            forward_payload: None,
        }
    }
}

impl Store for JettonTransfer {
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        builder.store_u32(Self::OP)?;
        builder.store_u64(self.query_id)?;
        self.amount.store_into(builder, context)?;
        self.destination.store_into(builder, context)?;
        store_opt_addr(self.response_destination.as_ref(), builder, context)?;
        self.custom_payload.store_into(builder, context)?;
        self.forward_ton_amount.store_into(builder, context)?;
        self.forward_payload.store_into(builder, context)
    }
}

impl<'a> Load<'a> for JettonTransfer {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if slice.load_u32()? != Self::OP {
            return Err(Error::InvalidTag);
        }

        Ok(Self {
            query_id: slice.load_u64()?,
            amount: Tokens::load_from(slice)?,
            destination: StdAddr::load_from(slice)?,
            response_destination: load_opt_addr(slice)?,
            custom_payload: Option::<Cell>::load_from(slice)?,
            forward_ton_amount: Tokens::load_from(slice)?,
            forward_payload: Option::<Cell>::load_from(slice)?,
        })
    }
}

/// Jetton wallet `burn` message body.
///
/// ```text
/// burn#595f07bc query_id:uint64 amount:(VarUInteger 16)
///     response_destination:MsgAddress custom_payload:(Maybe ^Cell)
///     = InternalMsgBody;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JettonBurn {
    pub query_id: u64,
    pub amount: Tokens,
    pub response_destination: StdAddr,
    pub custom_payload: Option<Cell>,
}

impl JettonBurn {
    pub const OP: u32 = 0x595f07bc;

    pub fn new(amount: Tokens, response_destination: StdAddr) -> Self {
        Self {
            query_id: 0,
            amount,
            response_destination,
            custom_payload: None,
        }
    }
}

impl Store for JettonBurn {
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        builder.store_u32(Self::OP)?;
        builder.store_u64(self.query_id)?;
        self.amount.store_into(builder, context)?;
        self.response_destination.store_into(builder, context)?;
        self.custom_payload.store_into(builder, context)
    }
}

impl<'a> Load<'a> for JettonBurn {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if slice.load_u32()? != Self::OP {
            return Err(Error::InvalidTag);
        }

        Ok(Self {
            query_id: slice.load_u64()?,
            amount: Tokens::load_from(slice)?,
            response_destination: StdAddr::load_from(slice)?,
            custom_payload: Option::<Cell>::load_from(slice)?,
        })
    }
}

/// Builds a text comment body (`op = 0` followed by a snake string).
pub fn text_comment(text: &str) -> Result<Cell, Error> {
    const FIRST_CHUNK: usize = (MAX_BIT_LEN - 32) / 8;

    let bytes = text.as_bytes();
    let (head, tail) = bytes.split_at(std::cmp::min(bytes.len(), FIRST_CHUNK));

    let mut b = CellBuilder::new();
    b.store_u32(0)?;
    b.store_raw(head, (head.len() * 8) as u16)?;
    if let Some(next) = build_snake_tail(tail)? {
        b.store_reference(next)?;
    }
    b.build()
}

/// Reads a text comment built by [`text_comment`].
pub fn load_text_comment(body: &DynCell) -> Result<String, Error> {
    let mut cs = body.as_slice()?;
    if cs.load_u32()? != 0 {
        return Err(Error::InvalidTag);
    }

    let mut bytes = Vec::new();
    loop {
        let len = cs.size_bits() / 8;
        let mut chunk = vec![0; len as usize];
        cs.load_raw(&mut chunk, len * 8)?;
        bytes.extend_from_slice(&chunk);

        if cs.size_refs() == 0 {
            break;
        }
        cs = cs.load_reference()?.as_slice()?;
    }

    String::from_utf8(bytes).map_err(|_| Error::InvalidData)
}

const MAX_BIT_LEN: usize = 1023;

fn build_snake_tail(bytes: &[u8]) -> Result<Option<Cell>, Error> {
    const CHUNK: usize = MAX_BIT_LEN / 8;

    let mut next = None::<Cell>;
    for chunk in bytes.chunks(CHUNK).rev() {
        let mut b = CellBuilder::new();
        b.store_raw(chunk, (chunk.len() * 8) as u16)?;
        if let Some(next) = next.take() {
            b.store_reference(next)?;
        }
        next = Some(b.build()?);
    }
    Ok(next)
}

fn store_opt_addr(
    addr: Option<&StdAddr>,
    builder: &mut CellBuilder,
    context: &dyn CellContext,
) -> Result<(), Error> {
    match addr {
        Some(addr) => addr.store_into(builder, context),
        // addr_none$00
        None => builder.store_zeros(2),
    }
}

fn load_opt_addr(slice: &mut CellSlice<'_>) -> Result<Option<StdAddr>, Error> {
    if slice.get_small_uint(0, 2)? == 0 {
        slice.skip_first(2, 0)?;
        Ok(None)
    } else {
        StdAddr::load_from(slice).map(Some)
    }
}
