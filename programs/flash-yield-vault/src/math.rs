use anchor_lang::prelude::*;

use crate::constants::BPS_DENOMINATOR;
use crate::errors::VaultError;

fn to_u64(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| error!(VaultError::MathOverflow))
}

/// `value * numerator / denominator`, rounded down, with a u128 intermediate.
pub fn mul_div_floor(value: u64, numerator: u64, denominator: u64) -> Result<u64> {
    let product = (value as u128)
        .checked_mul(numerator as u128)
        .ok_or(VaultError::MathOverflow)?;
    to_u64(
        product
            .checked_div(denominator as u128)
            .ok_or(VaultError::MathOverflow)?,
    )
}

/// `value * numerator / denominator`, rounded up.
pub fn mul_div_ceil(value: u64, numerator: u64, denominator: u64) -> Result<u64> {
    require!(denominator > 0, VaultError::MathOverflow);
    let product = (value as u128)
        .checked_mul(numerator as u128)
        .ok_or(VaultError::MathOverflow)?;
    let denominator = denominator as u128;
    to_u64(
        product
            .checked_add(denominator - 1)
            .ok_or(VaultError::MathOverflow)?
            / denominator,
    )
}

/// Shares minted for a deposit: 1:1 into an empty pool, proportional afterwards.
pub fn shares_for_deposit(amount: u64, total_shares: u64, total_assets: u64) -> Result<u64> {
    if total_shares == 0 {
        return Ok(amount);
    }
    mul_div_floor(amount, total_shares, total_assets)
}

/// Asset value of `shares`, rounded down so claims never exceed the pool.
pub fn claim_for_shares(shares: u64, total_shares: u64, total_assets: u64) -> Result<u64> {
    if total_shares == 0 {
        return Ok(0);
    }
    mul_div_floor(shares, total_assets, total_shares)
}

/// Shares burned to withdraw `amount`, rounded up so the pool never pays out
/// more than the burned shares are worth.
pub fn shares_for_withdrawal(amount: u64, total_shares: u64, total_assets: u64) -> Result<u64> {
    mul_div_ceil(amount, total_shares, total_assets)
}

pub fn apply_bps(amount: u64, bps: u16) -> Result<u64> {
    mul_div_floor(amount, bps as u64, BPS_DENOMINATOR)
}

/// Collateral that must stay supplied for `borrowed` to remain within `max_ltv_bps`.
pub fn min_collateral_for_debt(borrowed: u64, max_ltv_bps: u16) -> Result<u64> {
    if borrowed == 0 {
        return Ok(0);
    }
    require!(max_ltv_bps > 0, VaultError::InvalidStrategyParams);
    mul_div_ceil(borrowed, BPS_DENOMINATOR, max_ltv_bps as u64)
}
