use serde::{Deserialize, Serialize};
use tycho_types::error::Error;
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

/// Persistent data of the relay contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// The only address allowed to trigger relays.
    pub owner_address: StdAddr,
}

impl ProxyConfig {
    pub fn new(owner_address: StdAddr) -> Self {
        Self { owner_address }
    }
}

impl Store for ProxyConfig {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        self.owner_address.store_into(builder, context)
    }
}

impl Load<'_> for ProxyConfig {
    #[inline]
    fn load_from(slice: &mut CellSlice<'_>) -> Result<Self, Error> {
        Ok(Self {
            owner_address: StdAddr::load_from(slice)?,
        })
    }
}

/// Client-side parameters of relay calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayParams {
    /// Balance which stays on the relay account after a cashback call.
    ///
    /// Default: [`RelayParams::MIN_TONS_FOR_STORAGE`].
    #[serde(with = "serde_tokens")]
    pub min_storage_reserve: Tokens,
    /// Workchain of the relay account.
    ///
    /// Default: `0`.
    pub workchain: i8,
}

impl RelayParams {
    /// 0.005 TON.
    pub const MIN_TONS_FOR_STORAGE: Tokens = Tokens::new(5_000_000);
}

impl Default for RelayParams {
    fn default() -> Self {
        Self {
            min_storage_reserve: Self::MIN_TONS_FOR_STORAGE,
            workchain: 0,
        }
    }
}

/// Nanotons as a decimal string.
mod serde_tokens {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use tycho_types::num::Tokens;

    pub fn serialize<S: Serializer>(value: &Tokens, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.into_inner())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tokens, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = s.trim().parse::<u128>().map_err(Error::custom)?;
        let tokens = Tokens::new(value);
        if !tokens.is_valid() {
            return Err(Error::custom("token amount is out of range"));
        }
        Ok(tokens)
    }
}
