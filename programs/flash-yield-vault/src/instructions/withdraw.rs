use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::adapters::account_bridge::split_program;
use crate::adapters::{CpiLendingMarket, DisconnectedMarket};
use crate::constants::*;
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::settlement::{SecondaryMarket, SettlementEngine, VaultEntry};
use crate::state::{DepositorAccount, Vault};

#[derive(Accounts)]
pub struct WithdrawUserFunds<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault.asset_mint.as_ref()],
        bump = vault.bump,
    )]
    pub vault: Account<'info, Vault>,

    #[account(
        mut,
        seeds = [DEPOSITOR_SEED, vault.key().as_ref(), depositor.key().as_ref()],
        bump = depositor_account.bump,
        constraint = depositor_account.depositor == depositor.key() @ VaultError::Unauthorized,
        constraint = depositor_account.vault == vault.key() @ VaultError::InvalidVault,
    )]
    pub depositor_account: Account<'info, DepositorAccount>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault.vault_token_account @ VaultError::InvalidVault,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = depositor_token_account.mint == vault.asset_mint @ VaultError::MintMismatch,
    )]
    pub depositor_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// remaining_accounts (optional): [0] = secondary market program, [1..] = its
/// accounts. When present, working capital is recalled to cover `amount`.
pub fn handle_withdraw<'info>(
    ctx: Context<'_, '_, 'info, 'info, WithdrawUserFunds<'info>>,
    amount: u64,
) -> Result<()> {
    let vault_key = ctx.accounts.vault.key();
    let mint_key = ctx.accounts.vault.asset_mint;
    let bump = [ctx.accounts.vault.bump];
    let vault_seeds: &[&[u8]] = &[VAULT_SEED, mint_key.as_ref(), &bump];
    let signer_seeds = &[vault_seeds];

    let (shares_burned, events) = if ctx.remaining_accounts.is_empty() {
        settle_withdraw(
            vault_key,
            &mut ctx.accounts.vault,
            &mut ctx.accounts.depositor_account,
            &mut DisconnectedMarket,
            amount,
            false,
        )?
    } else {
        let (market_program, market_accounts) = split_program(ctx.remaining_accounts)?;
        require_keys_eq!(
            *market_program.key,
            ctx.accounts.vault.secondary_market,
            VaultError::InvalidRemainingAccounts
        );
        let mut market =
            CpiLendingMarket::new(market_program, market_accounts, vault_key, signer_seeds);
        settle_withdraw(
            vault_key,
            &mut ctx.accounts.vault,
            &mut ctx.accounts.depositor_account,
            &mut market,
            amount,
            true,
        )?
    };

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault_token_account.to_account_info(),
                to: ctx.accounts.depositor_token_account.to_account_info(),
                authority: ctx.accounts.vault.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    msg!("Withdrew {} burning {} shares", amount, shares_burned);

    for event in events {
        event.emit();
    }

    Ok(())
}

fn settle_withdraw<M: SecondaryMarket + ?Sized>(
    vault_key: Pubkey,
    vault: &mut Vault,
    account: &mut DepositorAccount,
    market: &mut M,
    amount: u64,
    recall: bool,
) -> Result<(u64, Vec<VaultEvent>)> {
    let mut engine = SettlementEngine::new(vault_key, vault, market);
    if recall {
        engine.recall_working_capital(amount)?;
    }
    let shares_burned = engine.withdraw_user_funds(account, amount)?;
    Ok((shares_burned, engine.take_events()))
}
