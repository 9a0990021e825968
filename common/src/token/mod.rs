mod metadata;

pub use metadata::{
    wrapped_tez_metadata, wrapped_tez_token_info, Bytes, TokenInfo, TokenMetadata,
};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::api::TransferParam;
use crate::crypto::{Address, KeyHash};
use crate::error::TokenError;

/// Numeric token identifier inside one contract. Deployments define id 0 at
/// origination; the model stays multi-id capable.
pub type TokenId = u64;

/// One operator grant: `operator` may move `owner`'s tokens of `token_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorKey {
    pub owner: Address,
    pub operator: Address,
    pub token_id: TokenId,
}

/// Per-account bookkeeping the contract maintains alongside the grant set:
/// when the account's operators last changed, and the flat set of grantees.
/// Kept in lockstep with `TokenStorage::operators` by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub updated: DateTime<Utc>,
    pub operators: IndexSet<Address>,
}

/// The admin handover state machine, read off the storage pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState<'a> {
    /// No handover staged.
    Stable { admin: &'a Address },
    /// A candidate is staged and may approve.
    Pending {
        admin: &'a Address,
        candidate: &'a Address,
    },
}

/// Full storage snapshot of a deployed token contract.
///
/// The client holds one as its confirmed mirror and replaces it wholesale
/// on every refresh; the authority mutates its own copy under the contract
/// rules. Absent ledger entries read as zero and are indistinguishable from
/// stored zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStorage {
    pub ledger: HashMap<Address, HashMap<TokenId, u64>>,
    pub operators: HashSet<OperatorKey>,
    pub account_info: HashMap<Address, AccountInfo>,
    /// Total supply per token id.
    pub token_info: HashMap<TokenId, u64>,
    pub token_metadata: HashMap<TokenId, TokenMetadata>,
    pub metadata: IndexMap<String, Bytes>,
    pub admin: Address,
    pub pending_admin: Option<Address>,
    pub token_count: u64,
    pub current_delegate: Option<KeyHash>,
}

impl TokenStorage {
    /// Fresh storage with a single defined token id 0 at zero supply.
    pub fn single_token(admin: Address, token_info: TokenInfo) -> Self {
        let mut supplies = HashMap::new();
        supplies.insert(0, 0);
        let mut token_metadata = HashMap::new();
        token_metadata.insert(0, TokenMetadata { token_id: 0, token_info });
        Self {
            ledger: HashMap::new(),
            operators: HashSet::new(),
            account_info: HashMap::new(),
            token_info: supplies,
            token_metadata,
            metadata: IndexMap::new(),
            admin,
            pending_admin: None,
            token_count: 1,
            current_delegate: None,
        }
    }

    /// The wrapped-tez instantiation used at origination.
    pub fn wrapped_tez(admin: Address) -> Self {
        let mut storage = Self::single_token(admin, wrapped_tez_token_info());
        storage.metadata = wrapped_tez_metadata();
        storage
    }

    /// Balance of `owner` for `token_id`; absence reads as zero.
    pub fn balance_of(&self, owner: &Address, token_id: TokenId) -> u64 {
        self.ledger
            .get(owner)
            .and_then(|balances| balances.get(&token_id))
            .copied()
            .unwrap_or(0)
    }

    /// Recorded total supply for `token_id`.
    pub fn total_supply(&self, token_id: TokenId) -> u64 {
        self.token_info.get(&token_id).copied().unwrap_or(0)
    }

    pub fn token_defined(&self, token_id: TokenId) -> bool {
        token_id < self.token_count
    }

    /// True iff `initiator` may move `owner`'s tokens of `token_id`: owners
    /// always may, anyone else needs the matching grant.
    pub fn is_authorized(&self, initiator: &Address, owner: &Address, token_id: TokenId) -> bool {
        initiator == owner
            || self.operators.contains(&OperatorKey {
                owner: owner.clone(),
                operator: initiator.clone(),
                token_id,
            })
    }

    /// The canonical read path for who can move an account's tokens.
    pub fn operators_of(&self, owner: &Address) -> impl Iterator<Item = &Address> {
        self.account_info
            .get(owner)
            .into_iter()
            .flat_map(|info| info.operators.iter())
    }

    pub fn admin_state(&self) -> AdminState<'_> {
        match &self.pending_admin {
            Some(candidate) => AdminState::Pending {
                admin: &self.admin,
                candidate,
            },
            None => AdminState::Stable { admin: &self.admin },
        }
    }

    fn ensure_defined(&self, token_id: TokenId) -> Result<(), TokenError> {
        if self.token_defined(token_id) {
            Ok(())
        } else {
            Err(TokenError::TokenUndefined)
        }
    }

    /// Predict a single debit: token defined, initiator authorized, balance
    /// sufficient. Read-only; the authority re-checks on submission, so a
    /// stale snapshot can only misjudge, never corrupt.
    pub fn check_debit(
        &self,
        initiator: &Address,
        owner: &Address,
        token_id: TokenId,
        amount: u64,
    ) -> Result<(), TokenError> {
        self.ensure_defined(token_id)?;
        if !self.is_authorized(initiator, owner, token_id) {
            return Err(TokenError::NotOperator);
        }
        let have = self.balance_of(owner, token_id);
        if have < amount {
            return Err(TokenError::insufficient(amount, have));
        }
        Ok(())
    }

    /// Predict a whole transfer batch the way the authority applies it:
    /// legs in order against a scratch ledger, so a later leg may spend
    /// what an earlier leg delivered. The first failing leg wins and the
    /// prediction for the batch is that nothing applies.
    pub fn check_transfer(
        &self,
        initiator: &Address,
        batch: &[TransferParam],
    ) -> Result<(), TokenError> {
        let mut scratch: HashMap<(&Address, TokenId), u64> = HashMap::new();
        for param in batch {
            for tx in &param.txs {
                self.ensure_defined(tx.token_id)?;
                if !self.is_authorized(initiator, &param.from_, tx.token_id) {
                    return Err(TokenError::NotOperator);
                }
                let from_balance = scratch
                    .entry((&param.from_, tx.token_id))
                    .or_insert_with(|| self.balance_of(&param.from_, tx.token_id));
                if *from_balance < tx.amount {
                    return Err(TokenError::insufficient(tx.amount, *from_balance));
                }
                *from_balance -= tx.amount;
                let to_balance = scratch
                    .entry((&tx.to_, tx.token_id))
                    .or_insert_with(|| self.balance_of(&tx.to_, tx.token_id));
                *to_balance = to_balance
                    .checked_add(tx.amount)
                    .ok_or_else(|| TokenError::Rejected("balance overflow".into()))?;
            }
        }
        Ok(())
    }

    /// Σ ledger == recorded supply for `token_id`. A boundary check on
    /// snapshots; the mirror never recomputes supply locally.
    pub fn conservation_holds(&self, token_id: TokenId) -> bool {
        let sum: u128 = self
            .ledger
            .values()
            .filter_map(|balances| balances.get(&token_id))
            .map(|amount| *amount as u128)
            .sum();
        sum == self.total_supply(token_id) as u128
    }
}
