use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::constants::*;
use crate::events::VaultInitialized;
use crate::state::{StrategyParams, Vault};

#[derive(Accounts)]
pub struct InitializeVault<'info> {
    #[account(
        init,
        seeds = [VAULT_SEED, asset_mint.key().as_ref()],
        bump,
        payer = admin,
        space = Vault::SIZE,
    )]
    pub vault: Account<'info, Vault>,

    pub asset_mint: Account<'info, Mint>,

    #[account(
        init,
        seeds = [VAULT_TOKEN_SEED, vault.key().as_ref()],
        bump,
        payer = admin,
        token::mint = asset_mint,
        token::authority = vault,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

pub fn handle_initialize_vault(
    ctx: Context<InitializeVault>,
    loan_provider: Pubkey,
    secondary_market: Pubkey,
    address_provider: Pubkey,
    strategy: StrategyParams,
) -> Result<()> {
    strategy.validate()?;

    let vault = &mut ctx.accounts.vault;
    vault.set_inner(Vault::new(
        ctx.accounts.admin.key(),
        ctx.accounts.asset_mint.key(),
        ctx.accounts.vault_token_account.key(),
        loan_provider,
        secondary_market,
        address_provider,
        strategy,
        ctx.bumps.vault,
        ctx.bumps.vault_token_account,
    ));

    msg!(
        "Vault initialized: target LTV {} bps, max LTV {} bps",
        strategy.target_ltv_bps,
        strategy.max_ltv_bps
    );

    emit!(VaultInitialized {
        vault: vault.key(),
        admin: vault.admin,
        asset_mint: vault.asset_mint,
        loan_provider,
        secondary_market,
        address_provider,
    });

    Ok(())
}
