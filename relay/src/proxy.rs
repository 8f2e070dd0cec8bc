use tycho_types::models::{StateInit, StdAddr};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

use crate::action::{RelayAction, Settlement};
use crate::action_list::{build_relay_body, ActionList, ActionListBuilder, MAX_ACTIONS};
use crate::config::{ProxyConfig, RelayParams};
use crate::error::{RelayError, RelayResult};
use crate::message::OutMessage;
use crate::mode::SendMode;
use crate::provider::{getter_method_id, ContractProvider, Sender, SenderArgs, StackItem};

/// Client of a deployed relay ("proxy sender") contract.
///
/// The contract accepts an action list from its owner and installs it as
/// its own output actions, so every relayed message is sent by the contract
/// within a single transaction.
#[derive(Debug, Clone)]
pub struct ProxySender {
    address: StdAddr,
    init: Option<StateInit>,
    params: RelayParams,
}

impl ProxySender {
    /// Max messages for [`relay_raw`](Self::relay_raw).
    pub const MAX_RAW_MESSAGES: usize = MAX_ACTIONS;
    /// Max messages for [`relay_with_cashback`](Self::relay_with_cashback).
    pub const MAX_CASHBACK_MESSAGES: usize = MAX_ACTIONS - Settlement::ACTIONS;

    pub const OWNER_GETTER: &'static str = "get_proxy_owner_address";

    /// Wallet mode for all calls to the relay contract.
    const CALL_MODE: SendMode = SendMode::PAY_GAS_SEPARATELY;

    /// Opens an already deployed contract.
    pub fn from_address(address: StdAddr) -> Self {
        Self {
            address,
            init: None,
            params: RelayParams::default(),
        }
    }

    /// Computes the contract address from its code and initial data.
    pub fn from_config(config: &ProxyConfig, code: Cell, params: RelayParams) -> RelayResult<Self> {
        let init = StateInit {
            split_depth: None,
            special: None,
            code: Some(code),
            data: Some(CellBuilder::build_from(config)?),
            libraries: Dict::new(),
        };
        let hash = *CellBuilder::build_from(&init)?.repr_hash();

        Ok(Self {
            address: StdAddr::new(params.workchain, hash),
            init: Some(init),
            params,
        })
    }

    pub fn with_params(mut self, params: RelayParams) -> Self {
        self.params = params;
        self
    }

    #[inline]
    pub fn address(&self) -> &StdAddr {
        &self.address
    }

    #[inline]
    pub fn state_init(&self) -> Option<&StateInit> {
        self.init.as_ref()
    }

    #[inline]
    pub fn params(&self) -> &RelayParams {
        &self.params
    }

    /// Balance which remains on the contract after a cashback call.
    #[inline]
    pub fn min_storage_reserve(&self) -> Tokens {
        self.params.min_storage_reserve
    }

    /// Builds the action list for a raw relay.
    ///
    /// Every message is sent with the mode specified next to it.
    pub fn raw_actions(messages: Vec<(SendMode, OutMessage)>) -> RelayResult<ActionList> {
        RelayError::check_limit(messages.len(), Self::MAX_RAW_MESSAGES)?;

        let mut builder = ActionListBuilder::new();
        builder.extend(
            messages
                .into_iter()
                .map(|(mode, message)| RelayAction::send(mode, message)),
        )?;
        Ok(builder.build())
    }

    /// Builds the action list for a relay with cashback.
    ///
    /// Messages are sent with [`SendMode::FAN_OUT`] so that a failed message
    /// never prevents the others. They are followed by the reserve of
    /// [`min_storage_reserve`] and a sweep of the remaining balance to `cashback`.
    ///
    /// [`min_storage_reserve`]: Self::min_storage_reserve
    pub fn cashback_actions(
        &self,
        messages: Vec<OutMessage>,
        cashback: &StdAddr,
    ) -> RelayResult<ActionList> {
        RelayError::check_limit(messages.len(), Self::MAX_CASHBACK_MESSAGES)?;

        let settlement = Settlement::new(self.params.min_storage_reserve, cashback.clone());
        let mut builder = ActionListBuilder::with_settlement(settlement);
        builder.extend(
            messages
                .into_iter()
                .map(|message| RelayAction::send(SendMode::FAN_OUT, message)),
        )?;
        Ok(builder.build())
    }

    /// Deploys the contract.
    pub async fn send_deploy<S: Sender>(&self, via: &S, value: Tokens) -> RelayResult<()> {
        let init = self.init.clone().ok_or(RelayError::NoStateInit)?;

        relay_log_debug!(address = %self.address, %value, "deploying relay contract");

        via.send(SenderArgs {
            to: self.address.clone(),
            value,
            bounce: false,
            send_mode: Self::CALL_MODE,
            init: Some(init),
            body: Cell::empty_cell(),
        })
        .await?;
        Ok(())
    }

    /// Relays up to [`MAX_RAW_MESSAGES`] messages, each with its own mode.
    ///
    /// `value` must cover all relayed messages together with their fees.
    /// Nothing is sent when the limit is exceeded.
    ///
    /// NOTE: Modes are used as is. A message without [`SendMode::IGNORE_ERRORS`]
    /// aborts the whole action phase on failure, including already processed
    /// messages.
    ///
    /// [`MAX_RAW_MESSAGES`]: Self::MAX_RAW_MESSAGES
    pub async fn relay_raw<S: Sender>(
        &self,
        via: &S,
        value: Tokens,
        messages: Vec<(SendMode, OutMessage)>,
    ) -> RelayResult<()> {
        let actions = Self::raw_actions(messages)?;
        self.dispatch(via, value, &actions, "relay_raw").await
    }

    /// Relays up to [`MAX_CASHBACK_MESSAGES`] messages and sends everything
    /// except [`min_storage_reserve`] back to `cashback`.
    ///
    /// Nothing is sent when the limit is exceeded.
    ///
    /// [`MAX_CASHBACK_MESSAGES`]: Self::MAX_CASHBACK_MESSAGES
    /// [`min_storage_reserve`]: Self::min_storage_reserve
    pub async fn relay_with_cashback<S: Sender>(
        &self,
        via: &S,
        value: Tokens,
        messages: Vec<OutMessage>,
        cashback: &StdAddr,
    ) -> RelayResult<()> {
        let actions = self.cashback_actions(messages, cashback)?;
        self.dispatch(via, value, &actions, "relay_with_cashback").await
    }

    /// Reads the owner address from the contract state.
    pub async fn get_owner_address<P: ContractProvider>(&self, provider: &P) -> RelayResult<StdAddr> {
        let method = Self::OWNER_GETTER;

        let output = provider
            .run_getter(&self.address, getter_method_id(method), Vec::new())
            .await?;
        if !output.is_success() {
            return Err(RelayError::GetterFailed {
                method,
                exit_code: output.exit_code,
            });
        }

        match output.stack.first() {
            Some(StackItem::Slice(cell)) => Ok(cell.parse::<StdAddr>()?),
            _ => Err(RelayError::UnexpectedStack { method }),
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn dispatch<S: Sender>(
        &self,
        via: &S,
        value: Tokens,
        actions: &ActionList,
        operation: &'static str,
    ) -> RelayResult<()> {
        let body = build_relay_body(actions.encode()?)?;

        relay_log_debug!(
            operation,
            address = %self.address,
            %value,
            actions = actions.len(),
            "relaying messages"
        );
        relay_log_body!(&body);

        via.send(SenderArgs {
            to: self.address.clone(),
            value,
            bounce: true,
            send_mode: Self::CALL_MODE,
            init: None,
            body,
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    use tracing_test::traced_test;
    use tycho_types::models::CurrencyCollection;

    use super::*;
    use crate::action_list::decode_relay_body;
    use crate::mode::ReserveMode;
    use crate::provider::GetterOutput;
    use crate::tests::{
        make_address, make_proxy, make_tagged_message, EngineModel, MockProvider, RecordingSender,
    };

    fn tagged_messages(n: u32) -> Vec<OutMessage> {
        (0..n).map(make_tagged_message).collect()
    }

    #[test]
    fn address_from_config() -> anyhow::Result<()> {
        let code = CellBuilder::build_from(0xc0de_u32)?;
        let config = ProxyConfig::new(make_address(1));

        let proxy = ProxySender::from_config(&config, code.clone(), RelayParams::default())?;
        let init = proxy.state_init().expect("init must be known");
        assert_eq!(init.code.as_ref(), Some(&code));
        let data = init.data.as_ref().expect("data must be set");
        assert_eq!(data.parse::<ProxyConfig>()?, config);

        let expected = StdAddr::new(0, *CellBuilder::build_from(init)?.repr_hash());
        assert_eq!(proxy.address(), &expected);

        // Different owner gives a different address.
        let other = ProxySender::from_config(
            &ProxyConfig::new(make_address(2)),
            code.clone(),
            RelayParams::default(),
        )?;
        assert_ne!(other.address(), proxy.address());

        // Workchain is taken from params.
        let mc = ProxySender::from_config(&config, code, RelayParams {
            workchain: -1,
            ..Default::default()
        })?;
        assert_eq!(mc.address().workchain, -1);
        assert_eq!(mc.address().address, proxy.address().address);
        Ok(())
    }

    #[tokio::test]
    async fn deploy() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        proxy.send_deploy(&sender, Tokens::new(20_000_000)).await?;

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, *proxy.address());
        assert_eq!(sent[0].value, Tokens::new(20_000_000));
        assert_eq!(sent[0].send_mode, SendMode::PAY_GAS_SEPARATELY);
        assert_eq!(sent[0].init.as_ref(), proxy.state_init());
        assert_eq!(sent[0].body, Cell::empty_cell());

        let opened = ProxySender::from_address(proxy.address().clone());
        assert!(matches!(
            opened.send_deploy(&sender, Tokens::new(1)).await,
            Err(RelayError::NoStateInit)
        ));
        assert!(sender.take().is_empty());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn relay_raw_keeps_order_and_modes() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        let messages = (0..ProxySender::MAX_RAW_MESSAGES as u32)
            .map(|i| {
                let mode = if i % 2 == 0 {
                    SendMode::FAN_OUT
                } else {
                    SendMode::PAY_GAS_SEPARATELY
                };
                (mode, make_tagged_message(i))
            })
            .collect::<Vec<_>>();

        let value = Tokens::new(100_000_000 * 255 + 1_000_000_000);
        proxy.relay_raw(&sender, value, messages.clone()).await?;

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, *proxy.address());
        assert_eq!(sent[0].value, value);
        assert_eq!(sent[0].send_mode, SendMode::PAY_GAS_SEPARATELY);
        assert!(sent[0].init.is_none());

        let list = decode_relay_body(sent[0].body.as_ref())?;
        assert_eq!(list.len(), messages.len());
        for (action, (mode, message)) in list.iter().zip(messages) {
            assert_eq!(action, &RelayAction::send(mode, message));
        }
        Ok(())
    }

    #[tokio::test]
    async fn relay_raw_limit() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        let messages = tagged_messages(256)
            .into_iter()
            .map(|m| (SendMode::FAN_OUT, m))
            .collect();

        let res = proxy.relay_raw(&sender, Tokens::new(1), messages).await;
        assert!(matches!(
            res,
            Err(RelayError::LimitExceeded {
                requested: 256,
                limit: 255
            })
        ));
        assert!(sender.take().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn relay_raw_empty() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        proxy.relay_raw(&sender, Tokens::new(1), Vec::new()).await?;

        let sent = sender.take();
        let mut cs = sent[0].body.as_slice()?;
        let list = cs.load_reference()?;
        assert_eq!(list.repr_hash(), Cell::empty_cell_ref().repr_hash());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn relay_with_cashback_layout() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();
        let cashback = make_address(250);

        for n in [0, 1, 10, ProxySender::MAX_CASHBACK_MESSAGES as u32] {
            let messages = tagged_messages(n);
            proxy
                .relay_with_cashback(&sender, Tokens::new(1_000_000_000), messages.clone(), &cashback)
                .await?;

            let sent = sender.take();
            assert_eq!(sent.len(), 1);

            let list = decode_relay_body(sent[0].body.as_ref())?;
            let actions = list.as_slice();
            let n = n as usize;
            assert_eq!(actions.len(), n + 2);

            for (action, message) in actions[..n].iter().zip(messages) {
                assert_eq!(action, &RelayAction::send(SendMode::FAN_OUT, message));
            }
            assert_eq!(
                actions[n],
                RelayAction::reserve(ReserveMode::empty(), RelayParams::MIN_TONS_FOR_STORAGE)
            );
            assert_eq!(
                actions[n + 1],
                RelayAction::send(
                    SendMode::CARRY_ALL_REMAINING_BALANCE,
                    OutMessage::new(cashback.clone(), CurrencyCollection::ZERO),
                )
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn relay_with_cashback_limit() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        let res = proxy
            .relay_with_cashback(&sender, Tokens::new(1), tagged_messages(254), &make_address(1))
            .await;
        assert!(matches!(
            res,
            Err(RelayError::LimitExceeded {
                requested: 254,
                limit: 253
            })
        ));
        assert!(sender.take().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn relay_with_custom_reserve() -> anyhow::Result<()> {
        let proxy = make_proxy()?.with_params(RelayParams {
            min_storage_reserve: Tokens::new(42),
            ..Default::default()
        });
        let sender = RecordingSender::default();

        proxy
            .relay_with_cashback(&sender, Tokens::new(1), tagged_messages(1), &make_address(1))
            .await?;

        let list = decode_relay_body(sender.take()[0].body.as_ref())?;
        assert_eq!(
            list.as_slice()[1],
            RelayAction::reserve(ReserveMode::empty(), Tokens::new(42))
        );
        Ok(())
    }

    #[tokio::test]
    async fn dispatch_error_is_propagated() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::failing();

        let res = proxy
            .relay_raw(&sender, Tokens::new(1), vec![(SendMode::FAN_OUT, make_tagged_message(0))])
            .await;
        assert!(matches!(res, Err(RelayError::Dispatch(_))));
        Ok(())
    }

    /// Holds the call across a suspension point before recording it.
    #[derive(Default)]
    struct SuspendingSender {
        bodies: Mutex<Vec<Cell>>,
    }

    impl Sender for SuspendingSender {
        fn send(&self, args: SenderArgs) -> impl Future<Output = anyhow::Result<()>> + Send {
            async move {
                tokio::task::yield_now().await;
                anyhow::ensure!(args.body.reference_count() == 1, "relay body without list");
                self.bodies.lock().unwrap().push(args.body);
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn relay_runs_on_spawned_task() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = Arc::new(SuspendingSender::default());
        let cashback = make_address(7);

        let task = tokio::spawn({
            let sender = sender.clone();
            async move {
                let value = Tokens::new(1_000_000_000);
                proxy
                    .relay_with_cashback(&*sender, value, tagged_messages(3), &cashback)
                    .await
            }
        });
        task.await??;

        let bodies = std::mem::take(&mut *sender.bodies.lock().unwrap());
        assert_eq!(bodies.len(), 1);
        let list = decode_relay_body(bodies[0].as_ref())?;
        assert_eq!(list.len(), 3 + 2);
        assert_eq!(list.messages().last().map(|m| &m.dst), Some(&make_address(7)));
        Ok(())
    }

    #[tokio::test]
    async fn getter_stack_crosses_await() -> anyhow::Result<()> {
        struct SlowProvider(StdAddr);

        impl ContractProvider for SlowProvider {
            fn run_getter(
                &self,
                _: &StdAddr,
                _: u32,
                _: Vec<StackItem>,
            ) -> impl Future<Output = anyhow::Result<GetterOutput>> + Send {
                let output = CellBuilder::build_from(&self.0)
                    .map(|owner| GetterOutput {
                        exit_code: 0,
                        stack: vec![StackItem::Slice(owner)],
                    })
                    .map_err(anyhow::Error::from);
                async move {
                    tokio::task::yield_now().await;
                    output
                }
            }
        }

        let proxy = make_proxy()?;
        let provider = SlowProvider(make_address(42));
        let owner = tokio::spawn(async move { proxy.get_owner_address(&provider).await }).await??;
        assert_eq!(owner, make_address(42));
        Ok(())
    }

    #[tokio::test]
    async fn raw_relay_executes_in_order() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();

        let messages = (0..255u32)
            .map(|i| {
                let msg = make_tagged_message(i).with_bounce(false);
                (SendMode::FAN_OUT, msg)
            })
            .collect::<Vec<_>>();

        let value = Tokens::new(100_000_000 * 255 + 1_000_000_000);
        proxy.relay_raw(&sender, value, messages.clone()).await?;

        let mut engine = EngineModel::new(value);
        engine.execute(&decode_relay_body(sender.take()[0].body.as_ref())?)?;

        assert_eq!(engine.delivered.len(), 255);
        for (i, (delivered, (_, msg))) in engine.delivered.iter().zip(&messages).enumerate() {
            assert_eq!(delivered.dst, msg.dst);
            assert_eq!(delivered.body, msg.body);
            assert_eq!(delivered.body.as_slice()?.load_u32()?, i as u32);
        }
        Ok(())
    }

    #[tokio::test]
    async fn cashback_leaves_reserve_and_sweeps_remainder() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();
        let owner = make_address(255);

        let n = ProxySender::MAX_CASHBACK_MESSAGES as u32;
        let value = Tokens::new(100_000_000 * n as u128 + 1_000_000_000);
        proxy.relay_with_cashback(&sender, value, tagged_messages(n), &owner).await?;

        let mut engine = EngineModel::new(value);
        engine.execute(&decode_relay_body(sender.take()[0].body.as_ref())?)?;

        assert_eq!(engine.balance, proxy.min_storage_reserve());

        let fan_out_costs = (1 + EngineModel::FWD_FEE.into_inner()) * n as u128;
        let sweep = engine.delivered.last().expect("sweep message");
        assert_eq!(sweep.dst, owner);
        assert_eq!(
            sweep.attached,
            value - proxy.min_storage_reserve() - Tokens::new(fan_out_costs)
        );
        assert_eq!(engine.delivered.len(), n as usize + 1);
        Ok(())
    }

    #[tokio::test]
    async fn cashback_survives_failed_messages() -> anyhow::Result<()> {
        let proxy = make_proxy()?;
        let sender = RecordingSender::default();
        let owner = make_address(255);

        let mut messages = tagged_messages(5);
        // Way more than attached, must be skipped.
        messages[2].value = CurrencyCollection::new(1_000_000_000_000);

        let value = Tokens::new(1_000_000_000);
        proxy.relay_with_cashback(&sender, value, messages, &owner).await?;

        let mut engine = EngineModel::new(value);
        engine.execute(&decode_relay_body(sender.take()[0].body.as_ref())?)?;

        assert_eq!(engine.skipped, 1);
        assert_eq!(engine.delivered.len(), 4 + 1);
        assert_eq!(engine.balance, proxy.min_storage_reserve());

        let fan_out_costs = (1 + EngineModel::FWD_FEE.into_inner()) * 4;
        let sweep = engine.delivered.last().expect("sweep message");
        assert_eq!(sweep.dst, owner);
        assert_eq!(
            sweep.attached,
            value - proxy.min_storage_reserve() - Tokens::new(fan_out_costs)
        );
        Ok(())
    }

    #[tokio::test]
    async fn owner_address() -> anyhow::Result<()> {
        let owner = make_address(77);
        let proxy = ProxySender::from_config(
            &ProxyConfig::new(owner.clone()),
            Cell::empty_cell(),
            RelayParams::default(),
        )?;

        let provider = MockProvider::new(GetterOutput {
            exit_code: 0,
            stack: vec![StackItem::Slice(CellBuilder::build_from(&owner)?)],
        });
        assert_eq!(proxy.get_owner_address(&provider).await?, owner);

        let calls = provider.take_calls();
        assert_eq!(calls, vec![(
            proxy.address().clone(),
            getter_method_id("get_proxy_owner_address")
        )]);
        Ok(())
    }

    #[tokio::test]
    async fn owner_address_errors() -> anyhow::Result<()> {
        let proxy = make_proxy()?;

        let provider = MockProvider::new(GetterOutput {
            exit_code: 11,
            stack: Vec::new(),
        });
        assert!(matches!(
            proxy.get_owner_address(&provider).await,
            Err(RelayError::GetterFailed { exit_code: 11, .. })
        ));

        let provider = MockProvider::new(GetterOutput {
            exit_code: 0,
            stack: vec![StackItem::Null],
        });
        assert!(matches!(
            proxy.get_owner_address(&provider).await,
            Err(RelayError::UnexpectedStack { .. })
        ));
        Ok(())
    }
}
