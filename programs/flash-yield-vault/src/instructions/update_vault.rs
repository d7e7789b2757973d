use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::VaultError;
use crate::events::LoanProviderUpdated;
use crate::state::{StrategyParams, Vault};

#[derive(Accounts)]
pub struct UpdateVaultConfig<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault.asset_mint.as_ref()],
        bump = vault.bump,
        constraint = vault.admin == admin.key() @ VaultError::Unauthorized,
    )]
    pub vault: Account<'info, Vault>,

    pub admin: Signer<'info>,
}

pub fn handle_update_vault(
    ctx: Context<UpdateVaultConfig>,
    target_ltv_bps: Option<u16>,
    is_active: Option<bool>,
) -> Result<()> {
    let vault = &mut ctx.accounts.vault;
    vault.ensure_no_cycle_in_flight()?;

    if let Some(target_ltv_bps) = target_ltv_bps {
        StrategyParams {
            target_ltv_bps,
            max_ltv_bps: vault.max_ltv_bps,
        }
        .validate()?;
        vault.target_ltv_bps = target_ltv_bps;
    }

    if let Some(active) = is_active {
        vault.is_active = active;
    }

    Ok(())
}

/// Re-points the vault at a new flash loan provider. Only the
/// address-resolution authority recorded at initialization may do this.
#[derive(Accounts)]
pub struct SetLoanProvider<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault.asset_mint.as_ref()],
        bump = vault.bump,
        constraint = vault.address_provider == authority.key() @ VaultError::Unauthorized,
    )]
    pub vault: Account<'info, Vault>,

    pub authority: Signer<'info>,
}

pub fn handle_set_loan_provider(ctx: Context<SetLoanProvider>, loan_provider: Pubkey) -> Result<()> {
    let vault = &mut ctx.accounts.vault;
    vault.ensure_no_cycle_in_flight()?;

    let previous = vault.loan_provider;
    vault.loan_provider = loan_provider;

    emit!(LoanProviderUpdated {
        vault: vault.key(),
        previous,
        current: loan_provider,
    });

    Ok(())
}
