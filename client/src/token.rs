use std::sync::Arc;

use log::{debug, log_enabled, trace, warn, Level};
use tokio::sync::Mutex;

use wtez_common::api::node::{Confirmation, NodeApi};
use wtez_common::api::{
    BalanceRequest, BalanceResponse, BurnParam, ClaimParam, CreateTokenParam, EntrypointCall,
    MintParam, OperatorUpdate, TransferParam,
};
use wtez_common::config::DEFAULT_TOKEN_ID;
use wtez_common::crypto::{Address, KeyHash};
use wtez_common::error::TokenError;
use wtez_common::token::{TokenInfo, TokenStorage};

use crate::config::ConfirmationConfig;
use crate::confirmation::confirm_operation;

/// Client for one deployed token contract, acting as one source account.
///
/// Reads are served from a confirmed-state mirror that is replaced
/// wholesale on every refresh, never patched in place. Writes follow the
/// submit, confirm, refresh cycle: the returned [`Confirmation`] means the
/// operation is on chain and the mirror already reflects it.
pub struct TokenClient<A: NodeApi> {
    api: Arc<A>,
    contract: Address,
    source: Address,
    confirmation: ConfirmationConfig,
    storage: Mutex<Option<Arc<TokenStorage>>>,
}

impl<A: NodeApi> TokenClient<A> {
    pub fn new(api: Arc<A>, contract: Address, source: Address) -> Self {
        Self {
            api,
            contract,
            source,
            confirmation: ConfirmationConfig::default(),
            storage: Mutex::new(None),
        }
    }

    /// Like [`new`](Self::new), with the initial mirror fetched up front so
    /// the first read already has a snapshot.
    pub async fn connect(
        api: Arc<A>,
        contract: Address,
        source: Address,
    ) -> Result<Self, TokenError> {
        let client = Self::new(api, contract, source);
        client.update_storage().await?;
        Ok(client)
    }

    /// Replace the poller tuning.
    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// The same contract through the same node, acting as `source`. The new
    /// client starts with an empty mirror.
    pub fn with_source(&self, source: Address) -> Self {
        Self {
            api: Arc::clone(&self.api),
            contract: self.contract.clone(),
            source,
            confirmation: self.confirmation,
            storage: Mutex::new(None),
        }
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn source(&self) -> &Address {
        &self.source
    }

    /// Confirmed snapshot, fetching one if none is mirrored yet.
    pub async fn storage(&self) -> Result<Arc<TokenStorage>, TokenError> {
        if let Some(snapshot) = self.cached_storage().await {
            return Ok(snapshot);
        }
        self.update_storage().await
    }

    /// Whatever snapshot is currently mirrored, without touching the node.
    pub async fn cached_storage(&self) -> Option<Arc<TokenStorage>> {
        self.storage.lock().await.clone()
    }

    /// Re-fetch the contract storage and swap the mirror.
    pub async fn update_storage(&self) -> Result<Arc<TokenStorage>, TokenError> {
        if log_enabled!(Level::Trace) {
            trace!("update_storage {}", self.contract);
        }
        let storage = self.api.get_storage(&self.contract).await?;
        if !storage.conservation_holds(DEFAULT_TOKEN_ID) {
            warn!(
                "mirror of {} out of balance: ledger does not sum to supply",
                self.contract
            );
        }
        let snapshot = Arc::new(storage);
        *self.storage.lock().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Mirror read of the source account's wrapped balance.
    pub async fn balance(&self) -> Result<u64, TokenError> {
        self.balance_of(&self.source).await
    }

    /// Mirror read of `owner`'s wrapped balance; absence reads as zero.
    pub async fn balance_of(&self, owner: &Address) -> Result<u64, TokenError> {
        Ok(self.storage().await?.balance_of(owner, DEFAULT_TOKEN_ID))
    }

    /// Operators currently granted over the source account, mirror read.
    pub async fn operators(&self) -> Result<Vec<Address>, TokenError> {
        Ok(self
            .storage()
            .await?
            .operators_of(&self.source)
            .cloned()
            .collect())
    }

    /// On-chain balance view, bypassing the mirror. Response order mirrors
    /// request order; an undefined token id fails the whole view.
    pub async fn view_balances(
        &self,
        requests: &[BalanceRequest],
    ) -> Result<Vec<BalanceResponse>, TokenError> {
        self.api.run_balance_view(&self.contract, requests).await
    }

    /// Move `amount` of the wrapped token from the source account to `to`.
    pub async fn transfer(&self, to: &Address, amount: u64) -> Result<Confirmation, TokenError> {
        self.transfer_batch(vec![TransferParam::single(
            self.source.clone(),
            to.clone(),
            DEFAULT_TOKEN_ID,
            amount,
        )])
        .await
    }

    /// Submit a multi-leg transfer. Legs apply in order, all or nothing.
    ///
    /// The batch is prechecked against the mirror first, so a transfer the
    /// confirmed state already rules out never leaves the client.
    pub async fn transfer_batch(
        &self,
        batch: Vec<TransferParam>,
    ) -> Result<Confirmation, TokenError> {
        self.storage().await?.check_transfer(&self.source, &batch)?;
        self.submit(EntrypointCall::Transfer(batch), 0).await
    }

    /// Allowance-style sugar over the operator table: any non-zero `amount`
    /// grants `operator`, zero revokes. The table itself is binary, so the
    /// magnitude is discarded.
    pub async fn approve(
        &self,
        operator: &Address,
        amount: u64,
    ) -> Result<Confirmation, TokenError> {
        if amount == 0 {
            self.remove_operator(operator).await
        } else {
            self.add_operator(operator).await
        }
    }

    /// Grant `operator` the right to move the source account's tokens.
    /// Granting an existing operator again changes nothing.
    pub async fn add_operator(&self, operator: &Address) -> Result<Confirmation, TokenError> {
        self.update_operators(vec![OperatorUpdate::add(
            self.source.clone(),
            operator.clone(),
            DEFAULT_TOKEN_ID,
        )])
        .await
    }

    /// Revoke `operator`; revoking an absent grant changes nothing.
    pub async fn remove_operator(&self, operator: &Address) -> Result<Confirmation, TokenError> {
        self.update_operators(vec![OperatorUpdate::remove(
            self.source.clone(),
            operator.clone(),
            DEFAULT_TOKEN_ID,
        )])
        .await
    }

    /// Submit a raw operator update batch, applied in order.
    pub async fn update_operators(
        &self,
        batch: Vec<OperatorUpdate>,
    ) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::UpdateOperators(batch), 0).await
    }

    /// Wrap native value: attach `amount` to the call and have the contract
    /// credit `receiver` one to one.
    pub async fn mint(&self, receiver: &Address, amount: u64) -> Result<Confirmation, TokenError> {
        self.submit(
            EntrypointCall::Mint(MintParam {
                receiver: receiver.clone(),
            }),
            amount,
        )
        .await
    }

    /// Unwrap `amount` from `from`'s balance; the contract pays the native
    /// value to `receiver`. Burning someone else's balance needs their
    /// grant. Prechecked against the mirror.
    pub async fn burn(
        &self,
        from: &Address,
        amount: u64,
        receiver: &Address,
    ) -> Result<Confirmation, TokenError> {
        self.storage()
            .await?
            .check_debit(&self.source, from, DEFAULT_TOKEN_ID, amount)?;
        self.submit(
            EntrypointCall::Burn(BurnParam {
                from_: from.clone(),
                amount,
                receiver: receiver.clone(),
            }),
            0,
        )
        .await
    }

    /// Point the contract's delegation at `delegate`, or clear it. Admin
    /// only; the contract enforces that, not the client.
    pub async fn set_delegate(
        &self,
        delegate: Option<KeyHash>,
    ) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::SetDelegate(delegate), 0).await
    }

    /// Sweep whatever the contract holds beyond the wrapped supply to
    /// `receiver`. Admin only.
    pub async fn claim_baking_rewards(
        &self,
        receiver: &Address,
    ) -> Result<Confirmation, TokenError> {
        self.submit(
            EntrypointCall::ClaimBakingRewards(ClaimParam {
                receiver: receiver.clone(),
            }),
            0,
        )
        .await
    }

    /// Stage a handover to `candidate`. Nothing changes hands until the
    /// candidate approves; re-staging replaces the candidate.
    pub async fn set_admin(&self, candidate: &Address) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::SetAdmin(candidate.clone()), 0)
            .await
    }

    /// Accept a handover staged for the source account.
    pub async fn approve_admin(&self) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::ApproveAdmin, 0).await
    }

    /// Withdraw a staged handover. A no-op when nothing is staged.
    pub async fn cancel_pending_admin(&self) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::CancelPendingAdmin, 0).await
    }

    /// Define the next token id with the given attributes. Admin only.
    pub async fn create_token(&self, token_info: TokenInfo) -> Result<Confirmation, TokenError> {
        self.submit(EntrypointCall::CreateToken(CreateTokenParam { token_info }), 0)
            .await
    }

    /// The write cycle shared by every operation: inject, poll to the
    /// configured depth, then refresh the mirror. On a confirmation timeout
    /// the mirror is left untouched, since the outcome is unknown.
    async fn submit(
        &self,
        call: EntrypointCall,
        amount: u64,
    ) -> Result<Confirmation, TokenError> {
        debug!("submitting {} from {}", call.entrypoint(), self.source);
        let hash = self
            .api
            .inject(&self.source, &self.contract, call, amount)
            .await?;
        let confirmation = confirm_operation(self.api.as_ref(), &hash, &self.confirmation).await?;
        self.update_storage().await?;
        Ok(confirmation)
    }
}
