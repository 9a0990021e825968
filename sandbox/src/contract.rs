//! The contract rules themselves. The node applies calls through
//! [`TokenContract::apply`], which commits all-or-nothing; everything the
//! client predicts, this module decides.

use chrono::{DateTime, Utc};
use log::debug;

use wtez_common::api::{
    BalanceRequest, BalanceResponse, BurnParam, ClaimParam, CreateTokenParam, EntrypointCall,
    MintParam, OperatorUpdate, TransferParam,
};
use wtez_common::config::DEFAULT_TOKEN_ID;
use wtez_common::crypto::Address;
use wtez_common::error::TokenError;
use wtez_common::token::{AccountInfo, OperatorKey, TokenId, TokenMetadata, TokenStorage};

use indexmap::IndexSet;

/// What the chain shows a running entrypoint about its invocation.
#[derive(Debug, Clone)]
pub struct CallContext<'a> {
    pub sender: &'a Address,
    /// Native value attached to the call, already credited to the contract
    /// when the entrypoint runs.
    pub amount: u64,
    pub now: DateTime<Utc>,
}

/// Native payout a successful call instructs the chain to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: u64,
}

/// A deployed token contract.
#[derive(Debug, Clone)]
pub struct TokenContract {
    pub storage: TokenStorage,
}

impl TokenContract {
    pub fn originate(storage: TokenStorage) -> Self {
        Self { storage }
    }

    /// Run one call. `balance` is the contract's native balance with the
    /// attached value already in, as the chain presents it to a running
    /// entrypoint. The call runs against a scratch copy committed only on
    /// success, so a failing leg leaves nothing behind.
    pub fn apply(
        &mut self,
        ctx: &CallContext<'_>,
        balance: u64,
        call: &EntrypointCall,
    ) -> Result<Vec<Payout>, TokenError> {
        let mut scratch = self.storage.clone();
        let payouts = dispatch(&mut scratch, ctx, balance, call)?;
        self.storage = scratch;
        debug!("applied {} from {}", call.entrypoint(), ctx.sender);
        Ok(payouts)
    }
}

/// The read-only balance view. Response order mirrors request order; an
/// undefined token id fails the whole view.
pub fn run_balance_view(
    storage: &TokenStorage,
    requests: &[BalanceRequest],
) -> Result<Vec<BalanceResponse>, TokenError> {
    requests
        .iter()
        .map(|request| {
            if !storage.token_defined(request.token_id) {
                return Err(TokenError::TokenUndefined);
            }
            Ok(BalanceResponse {
                request: request.clone(),
                balance: storage.balance_of(&request.owner, request.token_id),
            })
        })
        .collect()
}

fn dispatch(
    storage: &mut TokenStorage,
    ctx: &CallContext<'_>,
    balance: u64,
    call: &EntrypointCall,
) -> Result<Vec<Payout>, TokenError> {
    match call {
        EntrypointCall::Transfer(batch) => {
            apply_transfer(storage, ctx.sender, batch)?;
            Ok(Vec::new())
        }
        EntrypointCall::UpdateOperators(batch) => {
            apply_update_operators(storage, ctx, batch)?;
            Ok(Vec::new())
        }
        EntrypointCall::Mint(param) => {
            apply_mint(storage, ctx, param)?;
            Ok(Vec::new())
        }
        EntrypointCall::Burn(param) => apply_burn(storage, ctx, balance, param),
        EntrypointCall::SetDelegate(delegate) => {
            ensure_admin(storage, ctx.sender)?;
            storage.current_delegate = delegate.clone();
            Ok(Vec::new())
        }
        EntrypointCall::ClaimBakingRewards(param) => apply_claim(storage, ctx, balance, param),
        EntrypointCall::SetAdmin(candidate) => {
            ensure_admin(storage, ctx.sender)?;
            // Re-issuing just replaces the staged candidate.
            storage.pending_admin = Some(candidate.clone());
            Ok(Vec::new())
        }
        EntrypointCall::ApproveAdmin => {
            apply_approve_admin(storage, ctx.sender)?;
            Ok(Vec::new())
        }
        EntrypointCall::CancelPendingAdmin => {
            ensure_admin(storage, ctx.sender)?;
            // No-op when nothing is staged.
            storage.pending_admin = None;
            Ok(Vec::new())
        }
        EntrypointCall::CreateToken(param) => {
            apply_create_token(storage, ctx.sender, param)?;
            Ok(Vec::new())
        }
    }
}

fn ensure_admin(storage: &TokenStorage, sender: &Address) -> Result<(), TokenError> {
    if storage.admin == *sender {
        Ok(())
    } else {
        Err(TokenError::NotAdmin)
    }
}

fn debit(
    storage: &mut TokenStorage,
    owner: &Address,
    token_id: TokenId,
    amount: u64,
) -> Result<(), TokenError> {
    let have = storage.balance_of(owner, token_id);
    if have < amount {
        return Err(TokenError::insufficient(amount, have));
    }
    if amount == 0 {
        return Ok(());
    }
    let remaining = have - amount;
    if remaining == 0 {
        // Spent-out entries are removed; absence reads as zero anyway.
        if let Some(balances) = storage.ledger.get_mut(owner) {
            balances.remove(&token_id);
            if balances.is_empty() {
                storage.ledger.remove(owner);
            }
        }
    } else {
        storage
            .ledger
            .entry(owner.clone())
            .or_default()
            .insert(token_id, remaining);
    }
    Ok(())
}

fn credit(
    storage: &mut TokenStorage,
    owner: &Address,
    token_id: TokenId,
    amount: u64,
) -> Result<(), TokenError> {
    if amount == 0 {
        return Ok(());
    }
    let balances = storage.ledger.entry(owner.clone()).or_default();
    let have = balances.get(&token_id).copied().unwrap_or(0);
    let total = have
        .checked_add(amount)
        .ok_or_else(|| TokenError::Rejected("balance overflow".into()))?;
    balances.insert(token_id, total);
    Ok(())
}

fn raise_supply(
    storage: &mut TokenStorage,
    token_id: TokenId,
    amount: u64,
) -> Result<(), TokenError> {
    let supply = storage.token_info.entry(token_id).or_insert(0);
    *supply = supply
        .checked_add(amount)
        .ok_or_else(|| TokenError::Rejected("supply overflow".into()))?;
    Ok(())
}

fn lower_supply(
    storage: &mut TokenStorage,
    token_id: TokenId,
    amount: u64,
) -> Result<(), TokenError> {
    let supply = storage.token_info.entry(token_id).or_insert(0);
    *supply = supply
        .checked_sub(amount)
        .ok_or_else(|| TokenError::Rejected("supply underflow".into()))?;
    Ok(())
}

/// Legs apply strictly in order, so a later leg may spend what an earlier
/// one delivered. Any failure aborts the dispatch and the scratch copy is
/// dropped, which is what makes the batch atomic.
fn apply_transfer(
    storage: &mut TokenStorage,
    sender: &Address,
    batch: &[TransferParam],
) -> Result<(), TokenError> {
    for param in batch {
        for tx in &param.txs {
            if !storage.token_defined(tx.token_id) {
                return Err(TokenError::TokenUndefined);
            }
            if !storage.is_authorized(sender, &param.from_, tx.token_id) {
                return Err(TokenError::NotOperator);
            }
            debit(storage, &param.from_, tx.token_id, tx.amount)?;
            credit(storage, &tx.to_, tx.token_id, tx.amount)?;
        }
    }
    Ok(())
}

/// Updates apply in batch order and only to the sender's own account. Adds
/// and removes are idempotent. The flat per-account operator set is kept in
/// lockstep with the grant table, `updated` stamped on every touch.
fn apply_update_operators(
    storage: &mut TokenStorage,
    ctx: &CallContext<'_>,
    batch: &[OperatorUpdate],
) -> Result<(), TokenError> {
    for update in batch {
        let param = update.param();
        if param.owner != *ctx.sender {
            return Err(TokenError::NotOwner);
        }
        if !storage.token_defined(param.token_id) {
            return Err(TokenError::TokenUndefined);
        }
        let key = OperatorKey {
            owner: param.owner.clone(),
            operator: param.operator.clone(),
            token_id: param.token_id,
        };
        match update {
            OperatorUpdate::AddOperator(_) => {
                storage.operators.insert(key);
                let info = storage
                    .account_info
                    .entry(param.owner.clone())
                    .or_insert_with(|| AccountInfo {
                        updated: ctx.now,
                        operators: IndexSet::new(),
                    });
                info.operators.insert(param.operator.clone());
                info.updated = ctx.now;
            }
            OperatorUpdate::RemoveOperator(_) => {
                storage.operators.remove(&key);
                let still_granted = storage
                    .operators
                    .iter()
                    .any(|grant| grant.owner == param.owner && grant.operator == param.operator);
                if let Some(info) = storage.account_info.get_mut(&param.owner) {
                    if !still_granted {
                        info.operators.shift_remove(&param.operator);
                    }
                    info.updated = ctx.now;
                }
            }
        }
    }
    Ok(())
}

/// Minting is open to anyone: the attached native value backs the credit
/// one to one, so the wrapped supply never exceeds what the contract holds.
fn apply_mint(
    storage: &mut TokenStorage,
    ctx: &CallContext<'_>,
    param: &MintParam,
) -> Result<(), TokenError> {
    credit(storage, &param.receiver, DEFAULT_TOKEN_ID, ctx.amount)?;
    raise_supply(storage, DEFAULT_TOKEN_ID, ctx.amount)
}

fn apply_burn(
    storage: &mut TokenStorage,
    ctx: &CallContext<'_>,
    balance: u64,
    param: &BurnParam,
) -> Result<Vec<Payout>, TokenError> {
    if !storage.is_authorized(ctx.sender, &param.from_, DEFAULT_TOKEN_ID) {
        return Err(TokenError::NotOperator);
    }
    debit(storage, &param.from_, DEFAULT_TOKEN_ID, param.amount)?;
    lower_supply(storage, DEFAULT_TOKEN_ID, param.amount)?;
    if balance < param.amount {
        return Err(TokenError::InsufficientValue);
    }
    Ok(vec![Payout {
        to: param.receiver.clone(),
        amount: param.amount,
    }])
}

/// Whatever the contract holds beyond the wrapped supply came from
/// delegation; only the admin may sweep it.
fn apply_claim(
    storage: &mut TokenStorage,
    ctx: &CallContext<'_>,
    balance: u64,
    param: &ClaimParam,
) -> Result<Vec<Payout>, TokenError> {
    ensure_admin(storage, ctx.sender)?;
    let backed = storage.total_supply(DEFAULT_TOKEN_ID);
    let rewards = balance.saturating_sub(backed);
    if rewards == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![Payout {
        to: param.receiver.clone(),
        amount: rewards,
    }])
}

fn apply_approve_admin(storage: &mut TokenStorage, sender: &Address) -> Result<(), TokenError> {
    match storage.pending_admin.clone() {
        Some(candidate) if candidate == *sender => {
            storage.admin = candidate;
            storage.pending_admin = None;
            Ok(())
        }
        // Wrong approver and no staged candidate fail alike.
        _ => Err(TokenError::NotAdmin),
    }
}

fn apply_create_token(
    storage: &mut TokenStorage,
    sender: &Address,
    param: &CreateTokenParam,
) -> Result<(), TokenError> {
    ensure_admin(storage, sender)?;
    let token_id = storage.token_count;
    storage.token_metadata.insert(
        token_id,
        TokenMetadata {
            token_id,
            token_info: param.token_info.clone(),
        },
    );
    storage.token_info.insert(token_id, 0);
    storage.token_count += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtez_common::crypto::{Curve, KeyHash};

    fn addr(seed: u8) -> Address {
        KeyHash::from_payload(Curve::Ed25519, &[seed; 20]).into()
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_650_000_000, 0).unwrap()
    }

    fn ctx<'a>(sender: &'a Address, amount: u64) -> CallContext<'a> {
        CallContext {
            sender,
            amount,
            now: fixed_now(),
        }
    }

    /// Contract with alice as admin, with `supply` minted to `user`.
    fn setup(supply: u64) -> (TokenContract, Address, Address, Address) {
        let admin = addr(1);
        let user = addr(2);
        let other = addr(3);
        let mut contract = TokenContract::originate(TokenStorage::wrapped_tez(admin.clone()));
        if supply > 0 {
            contract
                .apply(
                    &ctx(&user, supply),
                    supply,
                    &EntrypointCall::Mint(MintParam {
                        receiver: user.clone(),
                    }),
                )
                .unwrap();
        }
        (contract, admin, user, other)
    }

    fn transfer_call(from: &Address, to: &Address, amount: u64) -> EntrypointCall {
        EntrypointCall::Transfer(vec![TransferParam::single(
            from.clone(),
            to.clone(),
            0,
            amount,
        )])
    }

    #[test]
    fn test_mint_credits_attached_value() {
        let (contract, _, user, _) = setup(2_000_000);
        assert_eq!(contract.storage.balance_of(&user, 0), 2_000_000);
        assert_eq!(contract.storage.total_supply(0), 2_000_000);
        assert!(contract.storage.conservation_holds(0));
    }

    #[test]
    fn test_zero_value_mint_is_a_noop_credit() {
        let (mut contract, _, user, _) = setup(0);
        contract
            .apply(
                &ctx(&user, 0),
                0,
                &EntrypointCall::Mint(MintParam {
                    receiver: user.clone(),
                }),
            )
            .unwrap();
        assert_eq!(contract.storage.balance_of(&user, 0), 0);
        assert!(contract.storage.ledger.is_empty());
    }

    #[test]
    fn test_transfer_moves_own_tokens() {
        let (mut contract, _, user, other) = setup(2_000_000);
        contract
            .apply(&ctx(&user, 0), 0, &transfer_call(&user, &other, 100_000))
            .unwrap();
        assert_eq!(contract.storage.balance_of(&user, 0), 1_900_000);
        assert_eq!(contract.storage.balance_of(&other, 0), 100_000);
        assert!(contract.storage.conservation_holds(0));
    }

    #[test]
    fn test_transfer_without_grant_is_refused() {
        let (mut contract, _, user, other) = setup(2_000_000);
        let result = contract.apply(&ctx(&other, 0), 0, &transfer_call(&user, &other, 1));
        assert_eq!(result, Err(TokenError::NotOperator));
        assert_eq!(contract.storage.balance_of(&user, 0), 2_000_000);
    }

    #[test]
    fn test_transfer_over_balance_is_refused() {
        let (mut contract, _, user, other) = setup(100);
        let result = contract.apply(&ctx(&user, 0), 0, &transfer_call(&user, &other, 101));
        assert_eq!(result, Err(TokenError::insufficient(101, 100)));
    }

    #[test]
    fn test_transfer_of_undefined_token_is_refused() {
        let (mut contract, _, user, other) = setup(100);
        let call = EntrypointCall::Transfer(vec![TransferParam::single(
            user.clone(),
            other.clone(),
            5,
            1,
        )]);
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &call),
            Err(TokenError::TokenUndefined)
        );
    }

    #[test]
    fn test_batch_is_atomic() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let before = contract.storage.clone();
        // First leg would succeed on its own; the second overdraws.
        let call = EntrypointCall::Transfer(vec![
            TransferParam::single(user.clone(), other.clone(), 0, 400_000),
            TransferParam::single(user.clone(), other.clone(), 0, 700_000),
        ]);
        let result = contract.apply(&ctx(&user, 0), 0, &call);
        assert_eq!(result, Err(TokenError::insufficient(700_000, 600_000)));
        assert_eq!(contract.storage, before);
    }

    #[test]
    fn test_later_leg_spends_earlier_credit() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let grant = EntrypointCall::UpdateOperators(vec![OperatorUpdate::add(
            other.clone(),
            user.clone(),
            0,
        )]);
        contract.apply(&ctx(&other, 0), 0, &grant).unwrap();
        let call = EntrypointCall::Transfer(vec![
            TransferParam::single(user.clone(), other.clone(), 0, 1_000_000),
            TransferParam::single(other.clone(), user.clone(), 0, 250_000),
        ]);
        contract.apply(&ctx(&user, 0), 0, &call).unwrap();
        assert_eq!(contract.storage.balance_of(&user, 0), 250_000);
        assert_eq!(contract.storage.balance_of(&other, 0), 750_000);
    }

    #[test]
    fn test_spent_out_entries_are_removed() {
        let (mut contract, _, user, other) = setup(500);
        contract
            .apply(&ctx(&user, 0), 0, &transfer_call(&user, &other, 500))
            .unwrap();
        assert!(!contract.storage.ledger.contains_key(&user));
        assert_eq!(contract.storage.balance_of(&user, 0), 0);
    }

    #[test]
    fn test_operator_grant_and_revoke() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let add = EntrypointCall::UpdateOperators(vec![OperatorUpdate::add(
            user.clone(),
            other.clone(),
            0,
        )]);
        contract.apply(&ctx(&user, 0), 0, &add).unwrap();
        assert!(contract.storage.is_authorized(&other, &user, 0));
        assert_eq!(
            contract.storage.operators_of(&user).collect::<Vec<_>>(),
            vec![&other]
        );

        // Idempotent: repeating the add changes nothing further.
        let after_first = contract.storage.clone();
        contract.apply(&ctx(&user, 0), 0, &add).unwrap();
        assert_eq!(contract.storage, after_first);

        let remove = EntrypointCall::UpdateOperators(vec![OperatorUpdate::remove(
            user.clone(),
            other.clone(),
            0,
        )]);
        contract.apply(&ctx(&user, 0), 0, &remove).unwrap();
        assert!(!contract.storage.is_authorized(&other, &user, 0));
        assert_eq!(contract.storage.operators_of(&user).count(), 0);
        // Removing an absent grant succeeds too.
        contract.apply(&ctx(&user, 0), 0, &remove).unwrap();
    }

    #[test]
    fn test_operator_updates_apply_in_order() {
        let (mut contract, _, user, other) = setup(1_000_000);
        // Remove-then-add in one batch ends granted.
        let call = EntrypointCall::UpdateOperators(vec![
            OperatorUpdate::remove(user.clone(), other.clone(), 0),
            OperatorUpdate::add(user.clone(), other.clone(), 0),
        ]);
        contract.apply(&ctx(&user, 0), 0, &call).unwrap();
        assert!(contract.storage.is_authorized(&other, &user, 0));

        // Add-then-remove ends revoked.
        let call = EntrypointCall::UpdateOperators(vec![
            OperatorUpdate::add(user.clone(), other.clone(), 0),
            OperatorUpdate::remove(user.clone(), other.clone(), 0),
        ]);
        contract.apply(&ctx(&user, 0), 0, &call).unwrap();
        assert!(!contract.storage.is_authorized(&other, &user, 0));
    }

    #[test]
    fn test_operator_update_for_someone_else_is_refused() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let call = EntrypointCall::UpdateOperators(vec![OperatorUpdate::add(
            user.clone(),
            other.clone(),
            0,
        )]);
        assert_eq!(
            contract.apply(&ctx(&other, 0), 0, &call),
            Err(TokenError::NotOwner)
        );
    }

    #[test]
    fn test_operator_transfer_after_grant() {
        let (mut contract, _, user, other) = setup(2_000_000);
        let recipient = addr(4);
        let add = EntrypointCall::UpdateOperators(vec![OperatorUpdate::add(
            user.clone(),
            other.clone(),
            0,
        )]);
        contract.apply(&ctx(&user, 0), 0, &add).unwrap();
        contract
            .apply(&ctx(&other, 0), 0, &transfer_call(&user, &recipient, 100_000))
            .unwrap();
        assert_eq!(contract.storage.balance_of(&user, 0), 1_900_000);
        assert_eq!(contract.storage.balance_of(&recipient, 0), 100_000);
    }

    #[test]
    fn test_burn_pays_out_and_shrinks_supply() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let call = EntrypointCall::Burn(BurnParam {
            from_: user.clone(),
            amount: 400_000,
            receiver: other.clone(),
        });
        let payouts = contract.apply(&ctx(&user, 0), 1_000_000, &call).unwrap();
        assert_eq!(
            payouts,
            vec![Payout {
                to: other.clone(),
                amount: 400_000,
            }]
        );
        assert_eq!(contract.storage.balance_of(&user, 0), 600_000);
        assert_eq!(contract.storage.total_supply(0), 600_000);
        assert!(contract.storage.conservation_holds(0));
    }

    #[test]
    fn test_burn_needs_authorization() {
        let (mut contract, _, user, other) = setup(1_000_000);
        let call = EntrypointCall::Burn(BurnParam {
            from_: user.clone(),
            amount: 1,
            receiver: other.clone(),
        });
        assert_eq!(
            contract.apply(&ctx(&other, 0), 1_000_000, &call),
            Err(TokenError::NotOperator)
        );
    }

    #[test]
    fn test_burn_over_balance_is_refused() {
        let (mut contract, _, user, _) = setup(100);
        let call = EntrypointCall::Burn(BurnParam {
            from_: user.clone(),
            amount: 200,
            receiver: user.clone(),
        });
        assert_eq!(
            contract.apply(&ctx(&user, 0), 100, &call),
            Err(TokenError::insufficient(200, 100))
        );
    }

    #[test]
    fn test_admin_handover_two_phase() {
        let (mut contract, admin, user, other) = setup(0);
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::SetAdmin(user.clone()))
            .unwrap();
        // Staging alone changes nothing.
        assert_eq!(contract.storage.admin, admin);
        assert_eq!(contract.storage.pending_admin, Some(user.clone()));

        // Re-issuing replaces the candidate.
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::SetAdmin(other.clone()))
            .unwrap();
        assert_eq!(contract.storage.pending_admin, Some(other.clone()));

        // Only the staged candidate may approve.
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &EntrypointCall::ApproveAdmin),
            Err(TokenError::NotAdmin)
        );
        contract
            .apply(&ctx(&other, 0), 0, &EntrypointCall::ApproveAdmin)
            .unwrap();
        assert_eq!(contract.storage.admin, other);
        assert_eq!(contract.storage.pending_admin, None);

        // The old admin lost the seat.
        assert_eq!(
            contract.apply(&ctx(&admin, 0), 0, &EntrypointCall::SetAdmin(admin.clone())),
            Err(TokenError::NotAdmin)
        );
    }

    #[test]
    fn test_set_admin_requires_admin() {
        let (mut contract, _, user, _) = setup(0);
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &EntrypointCall::SetAdmin(user.clone())),
            Err(TokenError::NotAdmin)
        );
    }

    #[test]
    fn test_approve_admin_without_stage_is_refused() {
        let (mut contract, admin, _, _) = setup(0);
        assert_eq!(
            contract.apply(&ctx(&admin, 0), 0, &EntrypointCall::ApproveAdmin),
            Err(TokenError::NotAdmin)
        );
    }

    #[test]
    fn test_cancel_pending_admin() {
        let (mut contract, admin, user, _) = setup(0);
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::SetAdmin(user.clone()))
            .unwrap();
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::CancelPendingAdmin)
            .unwrap();
        assert_eq!(contract.storage.pending_admin, None);
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &EntrypointCall::ApproveAdmin),
            Err(TokenError::NotAdmin)
        );
        // Cancelling with nothing staged is a no-op.
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::CancelPendingAdmin)
            .unwrap();
        // And it stays admin-gated.
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &EntrypointCall::CancelPendingAdmin),
            Err(TokenError::NotAdmin)
        );
    }

    #[test]
    fn test_set_delegate_is_admin_gated() {
        let (mut contract, admin, user, _) = setup(0);
        let delegate = KeyHash::from_payload(Curve::Ed25519, &[9; 20]);
        assert_eq!(
            contract.apply(
                &ctx(&user, 0),
                0,
                &EntrypointCall::SetDelegate(Some(delegate.clone()))
            ),
            Err(TokenError::NotAdmin)
        );
        contract
            .apply(
                &ctx(&admin, 0),
                0,
                &EntrypointCall::SetDelegate(Some(delegate.clone())),
            )
            .unwrap();
        assert_eq!(contract.storage.current_delegate, Some(delegate));
        contract
            .apply(&ctx(&admin, 0), 0, &EntrypointCall::SetDelegate(None))
            .unwrap();
        assert_eq!(contract.storage.current_delegate, None);
    }

    #[test]
    fn test_claim_pays_only_the_excess() {
        let (mut contract, admin, user, _) = setup(1_000_000);
        // 1_000_000 backs the supply, 30_000 arrived through delegation.
        let call = EntrypointCall::ClaimBakingRewards(ClaimParam {
            receiver: user.clone(),
        });
        let payouts = contract.apply(&ctx(&admin, 0), 1_030_000, &call).unwrap();
        assert_eq!(
            payouts,
            vec![Payout {
                to: user.clone(),
                amount: 30_000,
            }]
        );
        // Nothing to sweep when the balance only backs the supply.
        let payouts = contract.apply(&ctx(&admin, 0), 1_000_000, &call).unwrap();
        assert!(payouts.is_empty());
        assert_eq!(
            contract.apply(&ctx(&user, 0), 1_030_000, &call),
            Err(TokenError::NotAdmin)
        );
    }

    #[test]
    fn test_create_token_assigns_next_id() {
        let (mut contract, admin, user, _) = setup(0);
        let mut info = wtez_common::token::TokenInfo::new();
        info.insert("symbol".into(), wtez_common::token::Bytes::from("XTZ2"));
        let call = EntrypointCall::CreateToken(CreateTokenParam { token_info: info });
        assert_eq!(
            contract.apply(&ctx(&user, 0), 0, &call),
            Err(TokenError::NotAdmin)
        );
        contract.apply(&ctx(&admin, 0), 0, &call).unwrap();
        assert_eq!(contract.storage.token_count, 2);
        assert!(contract.storage.token_defined(1));
        assert_eq!(contract.storage.total_supply(1), 0);
        assert_eq!(
            contract.storage.token_metadata[&1].token_info["symbol"].as_utf8(),
            Some("XTZ2")
        );
    }

    #[test]
    fn test_balance_view_preserves_order_and_rejects_undefined() {
        let (contract, _, user, other) = setup(750);
        let requests = vec![
            BalanceRequest {
                owner: other.clone(),
                token_id: 0,
            },
            BalanceRequest {
                owner: user.clone(),
                token_id: 0,
            },
        ];
        let responses = run_balance_view(&contract.storage, &requests).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].request.owner, other);
        assert_eq!(responses[0].balance, 0);
        assert_eq!(responses[1].balance, 750);

        let bad = vec![BalanceRequest {
            owner: user.clone(),
            token_id: 3,
        }];
        assert_eq!(
            run_balance_view(&contract.storage, &bad),
            Err(TokenError::TokenUndefined)
        );
    }

    mod conservation {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Mint { to: usize, amount: u64 },
            Transfer { from: usize, to: usize, amount: u64 },
            Burn { from: usize, amount: u64 },
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4usize, 0..5_000u64).prop_map(|(to, amount)| Op::Mint { to, amount }),
                (0..4usize, 0..4usize, 0..5_000u64)
                    .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
                (0..4usize, 0..5_000u64).prop_map(|(from, amount)| Op::Burn { from, amount }),
            ]
        }

        proptest! {
            /// For any operation sequence, the ledger sums to minted minus
            /// burned. Refused operations change nothing.
            #[test]
            fn ledger_sums_to_supply(ops in proptest::collection::vec(op_strategy(), 1..60)) {
                let accounts: Vec<Address> = (0..4).map(|i| addr(10 + i as u8)).collect();
                let admin = addr(1);
                let mut contract =
                    TokenContract::originate(TokenStorage::wrapped_tez(admin));
                let mut minted: u64 = 0;
                let mut burned: u64 = 0;
                for op in ops {
                    match op {
                        Op::Mint { to, amount } => {
                            let sender = &accounts[to];
                            let call = EntrypointCall::Mint(MintParam {
                                receiver: accounts[to].clone(),
                            });
                            if contract.apply(&ctx(sender, amount), u64::MAX / 2, &call).is_ok() {
                                minted += amount;
                            }
                        }
                        Op::Transfer { from, to, amount } => {
                            let call = transfer_call(&accounts[from], &accounts[to], amount);
                            let _ = contract.apply(&ctx(&accounts[from], 0), u64::MAX / 2, &call);
                        }
                        Op::Burn { from, amount } => {
                            let call = EntrypointCall::Burn(BurnParam {
                                from_: accounts[from].clone(),
                                amount,
                                receiver: accounts[from].clone(),
                            });
                            if contract.apply(&ctx(&accounts[from], 0), u64::MAX / 2, &call).is_ok() {
                                burned += amount;
                            }
                        }
                    }
                    prop_assert!(contract.storage.conservation_holds(0));
                }
                prop_assert_eq!(contract.storage.total_supply(0), minted - burned);
            }
        }
    }
}
