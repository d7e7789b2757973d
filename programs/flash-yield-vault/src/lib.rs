use anchor_lang::prelude::*;

pub mod adapters;
pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod math;
pub mod settlement;
pub mod state;

use instructions::*;
use state::StrategyParams;

declare_id!("86HyjjHehZqFWdpSBV5MQh2EdXBofShQ9gQW399d3T55");

#[program]
pub mod flash_yield_vault {
    use super::*;

    pub fn initialize_vault(
        ctx: Context<InitializeVault>,
        loan_provider: Pubkey,
        secondary_market: Pubkey,
        address_provider: Pubkey,
        strategy: StrategyParams,
    ) -> Result<()> {
        instructions::initialize_vault::handle_initialize_vault(
            ctx,
            loan_provider,
            secondary_market,
            address_provider,
            strategy,
        )
    }

    pub fn deposit_user_funds(ctx: Context<DepositUserFunds>, amount: u64) -> Result<()> {
        instructions::deposit::handle_deposit(ctx, amount)
    }

    pub fn withdraw_user_funds<'info>(
        ctx: Context<'_, '_, 'info, 'info, WithdrawUserFunds<'info>>,
        amount: u64,
    ) -> Result<()> {
        instructions::withdraw::handle_withdraw(ctx, amount)
    }

    pub fn execute_flash_loan<'info>(
        ctx: Context<'_, '_, 'info, 'info, ExecuteFlashLoan<'info>>,
        amount: u64,
        provider_account_count: u8,
    ) -> Result<()> {
        instructions::execute_flash_loan::handle_execute_flash_loan(
            ctx,
            amount,
            provider_account_count,
        )
    }

    pub fn reinvest_profits<'info>(
        ctx: Context<'_, '_, 'info, 'info, ReinvestProfits<'info>>,
    ) -> Result<()> {
        instructions::reinvest_profits::handle_reinvest_profits(ctx)
    }

    pub fn update_vault_config(
        ctx: Context<UpdateVaultConfig>,
        target_ltv_bps: Option<u16>,
        is_active: Option<bool>,
    ) -> Result<()> {
        instructions::update_vault::handle_update_vault(ctx, target_ltv_bps, is_active)
    }

    pub fn set_loan_provider(ctx: Context<SetLoanProvider>, loan_provider: Pubkey) -> Result<()> {
        instructions::update_vault::handle_set_loan_provider(ctx, loan_provider)
    }
}
