pub mod node;

use serde::{Deserialize, Serialize};

use crate::crypto::{Address, KeyHash};
use crate::token::{TokenId, TokenInfo};

/// One delivery inside a transfer leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDestination {
    pub to_: Address,
    pub token_id: TokenId,
    pub amount: u64,
}

/// One transfer leg: a sender and its ordered deliveries. Trailing
/// underscores keep the contract's field spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParam {
    pub from_: Address,
    pub txs: Vec<TransferDestination>,
}

impl TransferParam {
    /// Leg with a single delivery.
    pub fn single(from: Address, to: Address, token_id: TokenId, amount: u64) -> Self {
        Self {
            from_: from,
            txs: vec![TransferDestination {
                to_: to,
                token_id,
                amount,
            }],
        }
    }
}

/// Subject of an operator update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorParam {
    pub owner: Address,
    pub operator: Address,
    pub token_id: TokenId,
}

/// One entry of an update_operators batch.
///
/// Externally tagged so the wire shape is `{"add_operator": {..}}` or
/// `{"remove_operator": {..}}`. Batch order is preserved and applied in
/// order; both directions are idempotent, so callers never pre-check
/// whether a grant exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorUpdate {
    AddOperator(OperatorParam),
    RemoveOperator(OperatorParam),
}

impl OperatorUpdate {
    pub fn add(owner: Address, operator: Address, token_id: TokenId) -> Self {
        OperatorUpdate::AddOperator(OperatorParam {
            owner,
            operator,
            token_id,
        })
    }

    pub fn remove(owner: Address, operator: Address, token_id: TokenId) -> Self {
        OperatorUpdate::RemoveOperator(OperatorParam {
            owner,
            operator,
            token_id,
        })
    }

    pub fn param(&self) -> &OperatorParam {
        match self {
            OperatorUpdate::AddOperator(param) | OperatorUpdate::RemoveOperator(param) => param,
        }
    }
}

/// Mint credits `receiver` with one elementary token unit per native unit
/// attached to the call; the amount never appears in the parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintParam {
    pub receiver: Address,
}

/// Burn debits `from_` and pays the equivalent native value to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnParam {
    pub from_: Address,
    pub amount: u64,
    pub receiver: Address,
}

/// Pays the contract's native balance in excess of total supply (what
/// delegation earned) to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimParam {
    pub receiver: Address,
}

/// Metadata for the next token id; the contract assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTokenParam {
    pub token_info: TokenInfo,
}

/// A contract call, serialized to the exact parameter shape the deployed
/// contract expects: `{"entrypoint": .., "value": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entrypoint", content = "value", rename_all = "snake_case")]
pub enum EntrypointCall {
    Transfer(Vec<TransferParam>),
    UpdateOperators(Vec<OperatorUpdate>),
    Mint(MintParam),
    Burn(BurnParam),
    SetDelegate(Option<KeyHash>),
    ClaimBakingRewards(ClaimParam),
    SetAdmin(Address),
    ApproveAdmin,
    CancelPendingAdmin,
    CreateToken(CreateTokenParam),
}

impl EntrypointCall {
    /// Entrypoint name as it appears on the wire.
    pub fn entrypoint(&self) -> &'static str {
        match self {
            EntrypointCall::Transfer(_) => "transfer",
            EntrypointCall::UpdateOperators(_) => "update_operators",
            EntrypointCall::Mint(_) => "mint",
            EntrypointCall::Burn(_) => "burn",
            EntrypointCall::SetDelegate(_) => "set_delegate",
            EntrypointCall::ClaimBakingRewards(_) => "claim_baking_rewards",
            EntrypointCall::SetAdmin(_) => "set_admin",
            EntrypointCall::ApproveAdmin => "approve_admin",
            EntrypointCall::CancelPendingAdmin => "cancel_pending_admin",
            EntrypointCall::CreateToken(_) => "create_token",
        }
    }
}

/// One balance query of a view batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub owner: Address,
    pub token_id: TokenId,
}

/// Answer to one balance query. `request` echoes the query so responses
/// can be matched positionally or by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub request: BalanceRequest,
    pub balance: u64,
}
