//! In-memory single-node chain for exercising the token client without a
//! network. One operation per block; an injected operation bakes
//! immediately unless baking is paused, which is how tests hold an
//! operation in the pending state.

pub mod contract;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use wtez_common::api::node::{NodeApi, OperationStatus};
use wtez_common::api::{BalanceRequest, BalanceResponse, EntrypointCall};
use wtez_common::config::{BOOTSTRAP_BALANCE, SANDBOX_ACCOUNTS};
use wtez_common::crypto::{Address, OperationHash};
use wtez_common::error::TokenError;
use wtez_common::token::TokenStorage;

use crate::contract::{CallContext, TokenContract};

struct QueuedOperation {
    hash: OperationHash,
    source: Address,
    contract: Address,
    call: EntrypointCall,
    amount: u64,
}

struct ChainState {
    level: u64,
    /// Native balances, accounts and contracts alike.
    balances: HashMap<Address, u64>,
    contracts: HashMap<Address, TokenContract>,
    operations: HashMap<OperationHash, OperationStatus>,
    mempool: Vec<QueuedOperation>,
    paused: bool,
    counter: u64,
}

/// The local chain authority. Implements [`NodeApi`] so a client can be
/// pointed straight at it.
pub struct SandboxNode {
    chain: Mutex<ChainState>,
}

impl SandboxNode {
    /// Fresh chain with the bootstrap accounts funded.
    pub fn new() -> Self {
        let mut balances = HashMap::new();
        for account in &SANDBOX_ACCOUNTS {
            balances.insert(account.address(), BOOTSTRAP_BALANCE);
        }
        Self {
            chain: Mutex::new(ChainState {
                level: 0,
                balances,
                contracts: HashMap::new(),
                operations: HashMap::new(),
                mempool: Vec::new(),
                paused: false,
                counter: 0,
            }),
        }
    }

    /// Deploy a token contract with the given initial storage, taking one
    /// block, and return its address.
    pub async fn originate(&self, storage: TokenStorage) -> Address {
        let mut state = self.chain.lock().await;
        state.counter += 1;
        let digest = Sha256::digest(state.counter.to_le_bytes());
        let mut payload = [0u8; 20];
        payload.copy_from_slice(&digest[..20]);
        let address = Address::originated(&payload);
        state.balances.insert(address.clone(), 0);
        state
            .contracts
            .insert(address.clone(), TokenContract::originate(storage));
        state.level += 1;
        info!("originated {} at level {}", address, state.level);
        address
    }

    /// Credit an address out of thin air.
    pub async fn fund(&self, address: &Address, amount: u64) {
        let mut state = self.chain.lock().await;
        let balance = state.balances.entry(address.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Move plain native value, contracts included; this is how baking
    /// rewards reach a delegating contract in tests. Takes a block.
    pub async fn transfer_native(
        &self,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        let mut state = self.chain.lock().await;
        if state.balances.get(from).copied().unwrap_or(0) < amount {
            return Err(TokenError::Rejected("source balance too low".into()));
        }
        move_native(&mut state.balances, from, to, amount);
        state.level += 1;
        Ok(())
    }

    pub async fn native_balance(&self, address: &Address) -> u64 {
        self.chain
            .lock()
            .await
            .balances
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Stop including operations; injections queue in the mempool until
    /// [`bake`](Self::bake) or [`resume_baking`](Self::resume_baking).
    pub async fn pause_baking(&self) {
        self.chain.lock().await.paused = true;
    }

    /// Include everything queued, one block per operation. Baking stays
    /// paused for later injections.
    pub async fn bake(&self) {
        let mut state = self.chain.lock().await;
        drain_mempool(&mut state);
    }

    pub async fn resume_baking(&self) {
        let mut state = self.chain.lock().await;
        state.paused = false;
        drain_mempool(&mut state);
    }

    /// Bake `count` empty blocks, deepening every included operation.
    pub async fn advance_blocks(&self, count: u64) {
        self.chain.lock().await.level += count;
    }
}

impl Default for SandboxNode {
    fn default() -> Self {
        Self::new()
    }
}

fn next_hash(state: &mut ChainState) -> OperationHash {
    state.counter += 1;
    let digest = Sha256::digest(state.counter.to_le_bytes());
    OperationHash::from_payload(&digest.into())
}

fn drain_mempool(state: &mut ChainState) {
    let queued: Vec<QueuedOperation> = state.mempool.drain(..).collect();
    for op in queued {
        bake_one(state, op);
    }
}

fn bake_one(state: &mut ChainState, op: QueuedOperation) {
    state.level += 1;
    let status = match apply_queued(state, &op) {
        Ok(()) => OperationStatus::Applied { level: state.level },
        Err(reason) => OperationStatus::Failed { reason },
    };
    debug!("baked {} -> {:?}", op.hash, status);
    state.operations.insert(op.hash, status);
}

/// Run one included operation: move the attached value, run the
/// entrypoint, settle payouts. A refused call keeps its block but leaves
/// balances as they were, refund included.
fn apply_queued(state: &mut ChainState, op: &QueuedOperation) -> Result<(), TokenError> {
    let source_balance = state.balances.get(&op.source).copied().unwrap_or(0);
    if source_balance < op.amount {
        return Err(TokenError::Rejected("source balance too low".into()));
    }
    // The entrypoint sees the attached value already credited.
    move_native(&mut state.balances, &op.source, &op.contract, op.amount);
    let balance = state.balances.get(&op.contract).copied().unwrap_or(0);
    let now = Utc::now();
    let ctx = CallContext {
        sender: &op.source,
        amount: op.amount,
        now,
    };
    let outcome = match state.contracts.get_mut(&op.contract) {
        Some(deployed) => deployed.apply(&ctx, balance, &op.call),
        None => Err(TokenError::Rejected(format!("no contract at {}", op.contract))),
    };
    match outcome {
        Ok(payouts) => {
            for payout in &payouts {
                move_native(&mut state.balances, &op.contract, &payout.to, payout.amount);
            }
            Ok(())
        }
        Err(reason) => {
            move_native(&mut state.balances, &op.contract, &op.source, op.amount);
            Err(reason)
        }
    }
}

fn move_native(balances: &mut HashMap<Address, u64>, from: &Address, to: &Address, amount: u64) {
    if amount == 0 || from == to {
        return;
    }
    debug_assert!(balances.get(from).copied().unwrap_or(0) >= amount);
    let debited = balances
        .get(from)
        .copied()
        .unwrap_or(0)
        .saturating_sub(amount);
    balances.insert(from.clone(), debited);
    let credited = balances.get(to).copied().unwrap_or(0).saturating_add(amount);
    balances.insert(to.clone(), credited);
}

#[async_trait]
impl NodeApi for SandboxNode {
    async fn get_storage(&self, contract: &Address) -> Result<TokenStorage, TokenError> {
        let state = self.chain.lock().await;
        state
            .contracts
            .get(contract)
            .map(|deployed| deployed.storage.clone())
            .ok_or_else(|| TokenError::Rejected(format!("no contract at {contract}")))
    }

    async fn run_balance_view(
        &self,
        contract: &Address,
        requests: &[BalanceRequest],
    ) -> Result<Vec<BalanceResponse>, TokenError> {
        let state = self.chain.lock().await;
        let deployed = state
            .contracts
            .get(contract)
            .ok_or_else(|| TokenError::Rejected(format!("no contract at {contract}")))?;
        crate::contract::run_balance_view(&deployed.storage, requests)
    }

    async fn inject(
        &self,
        source: &Address,
        contract: &Address,
        call: EntrypointCall,
        amount: u64,
    ) -> Result<OperationHash, TokenError> {
        let mut state = self.chain.lock().await;
        let hash = next_hash(&mut state);
        let op = QueuedOperation {
            hash: hash.clone(),
            source: source.clone(),
            contract: contract.clone(),
            call,
            amount,
        };
        if state.paused {
            debug!("queued {} ({})", hash, op.call.entrypoint());
            state
                .operations
                .insert(hash.clone(), OperationStatus::Pending);
            state.mempool.push(op);
        } else {
            bake_one(&mut state, op);
        }
        Ok(hash)
    }

    async fn operation_status(&self, hash: &OperationHash) -> Result<OperationStatus, TokenError> {
        let state = self.chain.lock().await;
        Ok(state
            .operations
            .get(hash)
            .cloned()
            .unwrap_or(OperationStatus::Unknown))
    }

    async fn head_level(&self) -> Result<u64, TokenError> {
        Ok(self.chain.lock().await.level)
    }
}
