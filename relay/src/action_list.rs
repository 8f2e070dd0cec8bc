use tycho_types::prelude::*;

use crate::action::{RelayAction, Settlement};
use crate::error::{RelayError, RelayResult};
use crate::message::OutMessage;

/// The engine executes at most this many actions per transaction.
pub const MAX_ACTIONS: usize = 255;

/// Ordered list of actions for a single relay call.
///
/// Actions are always stored in execution order. The engine's
/// cons-list layout is handled by [`encode`] and [`decode`] only.
///
/// [`encode`]: ActionList::encode
/// [`decode`]: ActionList::decode
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActionList {
    actions: Vec<RelayAction>,
}

impl ActionList {
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[RelayAction] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RelayAction> {
        self.actions.iter()
    }

    pub fn into_inner(self) -> Vec<RelayAction> {
        self.actions
    }

    /// Iterates over messages of all `SendMsg` actions.
    pub fn messages(&self) -> impl Iterator<Item = &OutMessage> {
        self.actions.iter().filter_map(RelayAction::as_message)
    }

    /// Builds the action list cell.
    ///
    /// Each list item holds a reference to the previous item followed by the
    /// action itself, terminated by an empty cell. The root therefore holds the
    /// last action and the engine unwinds the list back to front, so actions
    /// are executed in the same order as they are stored here.
    ///
    /// Fails with [`RelayError::LimitExceeded`] for more than [`MAX_ACTIONS`]
    /// actions before building anything.
    pub fn encode(&self) -> RelayResult<Cell> {
        encode_actions(&self.actions)
    }

    /// Parses an action list cell back into execution order.
    pub fn decode(root: &DynCell) -> RelayResult<Self> {
        let mut items = Vec::new();
        let mut item = root;
        loop {
            // NOTE: Exotic cells are not allowed in the list.
            let mut cs = item.as_slice()?;
            if cs.is_empty() {
                // Actions list terminates with an empty cell.
                break;
            }

            item = cs.load_reference()?;
            items.push(cs);

            if items.len() > MAX_ACTIONS {
                return Err(RelayError::LimitExceeded {
                    requested: items.len(),
                    limit: MAX_ACTIONS,
                });
            }
        }

        let mut actions = Vec::with_capacity(items.len());
        for mut cs in items.into_iter().rev() {
            let action = RelayAction::load_from(&mut cs)?;
            if !cs.is_empty() {
                return Err(tycho_types::error::Error::InvalidData.into());
            }
            actions.push(action);
        }

        Ok(Self { actions })
    }
}

impl From<Vec<RelayAction>> for ActionList {
    #[inline]
    fn from(actions: Vec<RelayAction>) -> Self {
        Self { actions }
    }
}

impl FromIterator<RelayAction> for ActionList {
    fn from_iter<T: IntoIterator<Item = RelayAction>>(iter: T) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ActionList {
    type Item = RelayAction;
    type IntoIter = std::vec::IntoIter<RelayAction>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a RelayAction;
    type IntoIter = std::slice::Iter<'a, RelayAction>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

/// Folds actions into the engine's `OutList` layout.
pub fn encode_actions(actions: &[RelayAction]) -> RelayResult<Cell> {
    RelayError::check_limit(actions.len(), MAX_ACTIONS)?;

    let mut root = Cell::empty_cell();
    for action in actions {
        root = CellBuilder::build_from((root, action))?;
    }

    relay_log_trace!(actions = actions.len(), list_hash = %root.repr_hash());
    Ok(root)
}

/// Wraps the action list into the relay call body.
///
/// The body has no data bits and a single reference to the list.
pub fn build_relay_body(action_list: Cell) -> RelayResult<Cell> {
    let mut b = CellBuilder::new();
    b.store_reference(action_list)?;
    Ok(b.build()?)
}

/// Extracts and parses the action list from the relay call body.
pub fn decode_relay_body(body: &DynCell) -> RelayResult<ActionList> {
    let mut cs = body.as_slice()?;
    let list = cs.load_reference()?;
    if !cs.is_empty() {
        return Err(tycho_types::error::Error::InvalidData.into());
    }
    ActionList::decode(list)
}

/// Collects actions of a relay batch.
///
/// Plain actions are always placed before the optional [`Settlement`],
/// which is appended only when the list is finalized. Capacity of the
/// builder accounts for the settlement slots.
#[derive(Debug, Default, Clone)]
pub struct ActionListBuilder {
    actions: Vec<RelayAction>,
    settlement: Option<Settlement>,
}

impl ActionListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder which ends the list with the specified settlement.
    pub fn with_settlement(settlement: Settlement) -> Self {
        Self {
            actions: Vec::new(),
            settlement: Some(settlement),
        }
    }

    /// Max number of plain actions this builder accepts.
    pub fn capacity(&self) -> usize {
        match self.settlement {
            Some(_) => MAX_ACTIONS - Settlement::ACTIONS,
            None => MAX_ACTIONS,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn push(&mut self, action: RelayAction) -> RelayResult<()> {
        RelayError::check_limit(self.actions.len() + 1, self.capacity())?;
        self.actions.push(action);
        Ok(())
    }

    /// Appends all actions, failing without changes if they do not fit.
    pub fn extend<I>(&mut self, actions: I) -> RelayResult<()>
    where
        I: IntoIterator<Item = RelayAction>,
    {
        let actions = actions.into_iter().collect::<Vec<_>>();
        RelayError::check_limit(self.actions.len() + actions.len(), self.capacity())?;
        self.actions.extend(actions);
        Ok(())
    }

    pub fn build(self) -> ActionList {
        let mut actions = self.actions;
        if let Some(settlement) = self.settlement {
            actions.extend(settlement.into_actions());
        }
        ActionList { actions }
    }
}
