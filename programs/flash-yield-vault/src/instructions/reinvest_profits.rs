use anchor_lang::prelude::*;
use anchor_spl::token::TokenAccount;

use crate::adapters::account_bridge::split_program;
use crate::adapters::CpiLendingMarket;
use crate::constants::*;
use crate::errors::VaultError;
use crate::settlement::{SettlementEngine, VaultEntry};
use crate::state::Vault;

#[derive(Accounts)]
pub struct ReinvestProfits<'info> {
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

    pub caller: Signer<'info>,
}

/// remaining_accounts: [0] = secondary market program, [1..] = its accounts
pub fn handle_reinvest_profits<'info>(
    ctx: Context<'_, '_, 'info, 'info, ReinvestProfits<'info>>,
) -> Result<()> {
    let (market_program, market_accounts) = split_program(ctx.remaining_accounts)?;
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

    let mut market = CpiLendingMarket::new(market_program, market_accounts, vault_key, signer_seeds);
    let mut engine = SettlementEngine::new(vault_key, &mut ctx.accounts.vault, &mut market);

    engine.absorb_unaccounted(observed)?;
    let reinvested = engine.reinvest_profits()?;
    let events = engine.take_events();

    if reinvested > 0 {
        msg!("Swept {} of profit into the secondary market", reinvested);
    }

    for event in events {
        event.emit();
    }

    Ok(())
}
