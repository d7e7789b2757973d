use anchor_lang::prelude::*;

use crate::errors::VaultError;
use crate::math::{claim_for_shares, mul_div_floor, shares_for_deposit, shares_for_withdrawal};
use crate::state::{DepositorAccount, Vault};

/// Credits `amount` to the depositor and the idle balance. `authorized` is the
/// amount the depositor has allowed the vault to pull.
///
/// Returns the shares minted.
pub fn deposit(
    vault: &mut Vault,
    account: &mut DepositorAccount,
    amount: u64,
    authorized: u64,
) -> Result<u64> {
    require!(amount > 0, VaultError::ZeroAmount);
    require!(authorized >= amount, VaultError::InsufficientAuthorization);

    if vault.total_shares > 0 && vault.total_assets()? == 0 {
        retire_worthless_shares(vault)?;
    }
    sync_share_epoch(vault, account);

    // First deposit gets 1:1, subsequent are proportional to pooled value
    let shares = shares_for_deposit(amount, vault.total_shares, vault.total_assets()?)?;
    require!(shares > 0, VaultError::DepositTooSmall);

    vault.idle_balance = vault
        .idle_balance
        .checked_add(amount)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_shares = vault
        .total_shares
        .checked_add(shares)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_principal = vault
        .total_principal
        .checked_add(amount)
        .ok_or(VaultError::MathOverflow)?;

    account.principal = account
        .principal
        .checked_add(amount)
        .ok_or(VaultError::MathOverflow)?;
    account.shares = account
        .shares
        .checked_add(shares)
        .ok_or(VaultError::MathOverflow)?;

    Ok(shares)
}

/// Losses wiped out every asset behind the outstanding shares. Those shares
/// are retired by starting a new share epoch; accounts from an older epoch
/// are zeroed the next time they are touched.
fn retire_worthless_shares(vault: &mut Vault) -> Result<()> {
    msg!(
        "Retiring {} worthless shares, share epoch {} -> {}",
        vault.total_shares,
        vault.share_epoch,
        vault.share_epoch.wrapping_add(1)
    );
    vault.share_epoch = vault
        .share_epoch
        .checked_add(1)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_shares = 0;
    vault.total_principal = 0;
    Ok(())
}

fn sync_share_epoch(vault: &Vault, account: &mut DepositorAccount) {
    if account.share_epoch != vault.share_epoch {
        account.shares = 0;
        account.principal = 0;
        account.share_epoch = vault.share_epoch;
    }
}

/// Shares the account holds in the current share epoch.
pub fn live_shares(vault: &Vault, account: &DepositorAccount) -> u64 {
    if account.share_epoch == vault.share_epoch {
        account.shares
    } else {
        0
    }
}

/// Current value of the depositor's shares: principal plus its pro-rata part
/// of pooled profit (or loss).
pub fn claim_of(vault: &Vault, account: &DepositorAccount) -> Result<u64> {
    claim_for_shares(
        live_shares(vault, account),
        vault.total_shares,
        vault.total_assets()?,
    )
}

/// Pays `amount` out of liquid funds: the idle balance first, then unswept
/// profit. Collateral is never unwound here; see
/// `SettlementEngine::recall_working_capital`.
///
/// Returns the shares burned.
pub fn withdraw(vault: &mut Vault, account: &mut DepositorAccount, amount: u64) -> Result<u64> {
    require!(amount > 0, VaultError::ZeroAmount);
    sync_share_epoch(vault, account);
    require!(
        claim_of(vault, account)? >= amount,
        VaultError::InsufficientShares
    );
    require!(
        vault.liquid_balance()? >= amount,
        VaultError::InsufficientFunds
    );

    let total_assets = vault.total_assets()?;
    let shares_to_burn =
        shares_for_withdrawal(amount, vault.total_shares, total_assets)?.min(account.shares);
    let principal_released = mul_div_floor(account.principal, shares_to_burn, account.shares)?;

    let from_idle = amount.min(vault.idle_balance);
    vault.idle_balance -= from_idle;
    vault.accumulated_profit = vault
        .accumulated_profit
        .checked_sub(amount - from_idle)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_shares = vault
        .total_shares
        .checked_sub(shares_to_burn)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_principal = vault
        .total_principal
        .checked_sub(principal_released)
        .ok_or(VaultError::MathOverflow)?;

    account.shares -= shares_to_burn;
    account.principal -= principal_released;

    Ok(shares_to_burn)
}

/// Adds realized profit to the pool. Nothing is credited per depositor: every
/// share's claim grows with `total_assets`.
pub fn accrue(vault: &mut Vault, profit: u64) -> Result<()> {
    vault.accumulated_profit = vault
        .accumulated_profit
        .checked_add(profit)
        .ok_or(VaultError::MathOverflow)?;
    vault.total_profit_accrued = vault
        .total_profit_accrued
        .checked_add(profit)
        .ok_or(VaultError::MathOverflow)?;
    Ok(())
}

/// Tokens in the vault token account that no balance accounts for (direct
/// transfers, pre-funding). Returns the surplus over the tracked liquid balance.
pub fn unaccounted_surplus(vault: &Vault, observed_liquid: u64) -> Result<u64> {
    Ok(observed_liquid.saturating_sub(vault.liquid_balance()?))
}
