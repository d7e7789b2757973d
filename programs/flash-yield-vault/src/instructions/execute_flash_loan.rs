use anchor_lang::prelude::*;
use anchor_spl::token::TokenAccount;

use crate::adapters::account_bridge::split_program;
use crate::adapters::{CpiLendingMarket, CpiLoanProvider};
use crate::constants::*;
use crate::errors::VaultError;
use crate::settlement::{SettlementEngine, VaultEntry};
use crate::state::Vault;

#[derive(Accounts)]
pub struct ExecuteFlashLoan<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault.asset_mint.as_ref()],
        bump = vault.bump,
        constraint = vault.is_active @ VaultError::VaultPaused,
    )]
    pub vault: Account<'info, Vault>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault.vault_token_account @ VaultError::InvalidVault,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// Anyone may trigger a cycle. Also passed in the provider accounts as
    /// the payer for the loan receipt.
    #[account(mut)]
    pub caller: Signer<'info>,
}

/// Runs one flash loan cycle.
///
/// remaining_accounts:
///   [0..provider_account_count]  = loan provider program, then its accounts
///   [provider_account_count..]   = secondary market program, then its accounts
pub fn handle_execute_flash_loan<'info>(
    ctx: Context<'_, '_, 'info, 'info, ExecuteFlashLoan<'info>>,
    amount: u64,
    provider_account_count: u8,
) -> Result<()> {
    let split = provider_account_count as usize;
    require!(
        split <= ctx.remaining_accounts.len(),
        VaultError::InvalidRemainingAccounts
    );
    let (provider_accounts, market_accounts) = ctx.remaining_accounts.split_at(split);
    let (provider_program, provider_accounts) = split_program(provider_accounts)?;
    let (market_program, market_accounts) = split_program(market_accounts)?;
    require_keys_eq!(
        *market_program.key,
        ctx.accounts.vault.secondary_market,
        VaultError::InvalidRemainingAccounts
    );

    let vault_key = ctx.accounts.vault.key();
    let mint_key = ctx.accounts.vault.asset_mint;
    let bump = [ctx.accounts.vault.bump];
    let vault_seeds: &[&[u8]] = &[VAULT_SEED, mint_key.as_ref(), &bump];
    let signer_seeds = &[vault_seeds];
    let observed = ctx.accounts.vault_token_account.amount;

    let mut provider =
        CpiLoanProvider::new(provider_program, provider_accounts, vault_key, signer_seeds)?;
    let mut market = CpiLendingMarket::new(market_program, market_accounts, vault_key, signer_seeds);
    let mut engine = SettlementEngine::new(vault_key, &mut ctx.accounts.vault, &mut market);

    engine.absorb_unaccounted(observed)?;
    let net_profit = engine.execute_flash_loan(&mut provider, amount)?;
    let events = engine.take_events();

    // Everything the vault tracks as liquid must be in the token account
    ctx.accounts.vault_token_account.reload()?;
    let liquid = ctx.accounts.vault.liquid_balance()?;
    require!(
        ctx.accounts.vault_token_account.amount >= liquid,
        VaultError::InvalidCycleState
    );

    msg!("Flash loan of {} settled, net profit {}", amount, net_profit);

    for event in events {
        event.emit();
    }

    Ok(())
}
