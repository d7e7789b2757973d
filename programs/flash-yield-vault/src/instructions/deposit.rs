use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::adapters::DisconnectedMarket;
use crate::constants::*;
use crate::errors::VaultError;
use crate::settlement::{SettlementEngine, VaultEntry};
use crate::state::{DepositorAccount, Vault};

#[derive(Accounts)]
pub struct DepositUserFunds<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault.asset_mint.as_ref()],
        bump = vault.bump,
        constraint = vault.is_active @ VaultError::VaultPaused,
    )]
    pub vault: Account<'info, Vault>,

    #[account(
        init_if_needed,
        seeds = [DEPOSITOR_SEED, vault.key().as_ref(), depositor.key().as_ref()],
        bump,
        payer = depositor,
        space = DepositorAccount::SIZE,
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
        constraint = depositor_token_account.owner == depositor.key() @ VaultError::Unauthorized,
    )]
    pub depositor_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

/// Amount the depositor has approved the vault PDA to pull from `source`.
pub fn delegated_to(source: &TokenAccount, vault: &Pubkey) -> u64 {
    match Option::<Pubkey>::from(source.delegate) {
        Some(delegate) if delegate == *vault => source.delegated_amount,
        _ => 0,
    }
}

pub fn handle_deposit(ctx: Context<DepositUserFunds>, amount: u64) -> Result<()> {
    let vault_key = ctx.accounts.vault.key();
    let depositor_key = ctx.accounts.depositor.key();
    let authorized = delegated_to(&ctx.accounts.depositor_token_account, &vault_key);

    let depositor_account = &mut ctx.accounts.depositor_account;
    if depositor_account.vault == Pubkey::default() {
        // First deposit: initialize the account fields
        depositor_account.set_inner(DepositorAccount::new(
            vault_key,
            depositor_key,
            ctx.bumps.depositor_account,
        ));
    }

    let mut market = DisconnectedMarket;
    let observed = ctx.accounts.vault_token_account.amount;
    let mut engine = SettlementEngine::new(vault_key, &mut ctx.accounts.vault, &mut market);
    // Tokens sent outside a deposit belong to the existing shares
    engine.absorb_unaccounted(observed)?;
    let shares = engine.deposit_user_funds(&mut ctx.accounts.depositor_account, amount, authorized)?;
    let events = engine.take_events();

    // Pull the tokens under the depositor's delegation, signed by the vault PDA
    let vault = &ctx.accounts.vault;
    let mint_key = vault.asset_mint;
    let vault_seeds = &[VAULT_SEED, mint_key.as_ref(), &[vault.bump]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.depositor_token_account.to_account_info(),
                to: ctx.accounts.vault_token_account.to_account_info(),
                authority: ctx.accounts.vault.to_account_info(),
            },
            &[vault_seeds],
        ),
        amount,
    )?;

    ctx.accounts.depositor_account.last_deposit_ts = Clock::get()?.unix_timestamp;
    msg!("Deposited {} for {} shares", amount, shares);

    for event in events {
        event.emit();
    }

    Ok(())
}
