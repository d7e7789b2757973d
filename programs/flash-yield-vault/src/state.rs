use anchor_lang::prelude::*;

use crate::constants::BPS_DENOMINATOR;
use crate::errors::VaultError;

/// Progress of a flash loan cycle. Persisted on the vault so every entry point
/// can reject calls that arrive while a cycle is in flight.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Borrowing,
    Deployed,
    Harvesting,
    Repaying,
    Settled,
    Aborted,
}

impl CycleState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CycleState::Borrowing
                | CycleState::Deployed
                | CycleState::Harvesting
                | CycleState::Repaying
        )
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrategyParams {
    /// Share of a deployed amount borrowed back against it, in basis points
    pub target_ltv_bps: u16,
    /// Market loan-to-value ceiling the strategy must stay under
    pub max_ltv_bps: u16,
}

impl StrategyParams {
    pub fn validate(&self) -> Result<()> {
        require!(
            (self.max_ltv_bps as u64) <= BPS_DENOMINATOR,
            VaultError::InvalidStrategyParams
        );
        require!(
            self.target_ltv_bps < self.max_ltv_bps,
            VaultError::InvalidStrategyParams
        );
        Ok(())
    }
}

/// The vault's single aggregate position in the secondary market.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollateralPosition {
    pub supplied: u64,
    pub borrowed: u64,
}

/// Pool state, one per asset mint.
#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct Vault {
    /// Admin authority who created the vault
    pub admin: Pubkey,
    /// The SPL token mint this vault pools
    pub asset_mint: Pubkey,
    /// The vault's token account (PDA-owned)
    pub vault_token_account: Pubkey,
    /// Flash loan provider program
    pub loan_provider: Pubkey,
    /// Secondary lending market program
    pub secondary_market: Pubkey,
    /// Authority allowed to re-point `loan_provider`
    pub address_provider: Pubkey,
    /// Uninvested asset held in the vault token account
    pub idle_balance: u64,
    /// Asset supplied as collateral in the secondary market
    pub working_balance: u64,
    /// Outstanding secondary market borrow
    pub borrowed_balance: u64,
    /// Realized profit held liquid, waiting for the next sweep
    pub accumulated_profit: u64,
    /// Total shares issued to depositors
    pub total_shares: u64,
    /// Sum of recorded depositor principal
    pub total_principal: u64,
    /// Lifetime profit accrued to the pool
    pub total_profit_accrued: u64,
    /// Lifetime premiums paid to the loan provider
    pub total_premiums_paid: u64,
    /// Number of settled cycles
    pub cycles_executed: u64,
    pub target_ltv_bps: u16,
    pub max_ltv_bps: u16,
    pub cycle_state: CycleState,
    /// PDA bump seed
    pub bump: u8,
    /// Vault token account bump seed
    pub token_bump: u8,
    /// Whether the vault accepts deposits and cycles
    pub is_active: bool,
    /// Bumped when losses leave shares with nothing behind them
    pub share_epoch: u32,
    /// Reserved for future upgrades
    pub _reserved: [u8; 60],
}

impl Vault {
    pub const SIZE: usize = 8  // discriminator
        + 32   // admin
        + 32   // asset_mint
        + 32   // vault_token_account
        + 32   // loan_provider
        + 32   // secondary_market
        + 32   // address_provider
        + 8    // idle_balance
        + 8    // working_balance
        + 8    // borrowed_balance
        + 8    // accumulated_profit
        + 8    // total_shares
        + 8    // total_principal
        + 8    // total_profit_accrued
        + 8    // total_premiums_paid
        + 8    // cycles_executed
        + 2    // target_ltv_bps
        + 2    // max_ltv_bps
        + 1    // cycle_state
        + 1    // bump
        + 1    // token_bump
        + 1    // is_active
        + 4    // share_epoch
        + 60;  // _reserved

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admin: Pubkey,
        asset_mint: Pubkey,
        vault_token_account: Pubkey,
        loan_provider: Pubkey,
        secondary_market: Pubkey,
        address_provider: Pubkey,
        strategy: StrategyParams,
        bump: u8,
        token_bump: u8,
    ) -> Self {
        Self {
            admin,
            asset_mint,
            vault_token_account,
            loan_provider,
            secondary_market,
            address_provider,
            idle_balance: 0,
            working_balance: 0,
            borrowed_balance: 0,
            accumulated_profit: 0,
            total_shares: 0,
            total_principal: 0,
            total_profit_accrued: 0,
            total_premiums_paid: 0,
            cycles_executed: 0,
            target_ltv_bps: strategy.target_ltv_bps,
            max_ltv_bps: strategy.max_ltv_bps,
            cycle_state: CycleState::Idle,
            bump,
            token_bump,
            is_active: true,
            share_epoch: 0,
            _reserved: [0u8; 60],
        }
    }

    /// Value attributable to shareholders.
    pub fn total_assets(&self) -> Result<u64> {
        self.idle_balance
            .checked_add(self.working_balance)
            .and_then(|v| v.checked_add(self.accumulated_profit))
            .and_then(|v| v.checked_sub(self.borrowed_balance))
            .ok_or_else(|| error!(VaultError::MathOverflow))
    }

    /// Tokens the vault token account must hold at rest.
    pub fn liquid_balance(&self) -> Result<u64> {
        self.idle_balance
            .checked_add(self.accumulated_profit)
            .ok_or_else(|| error!(VaultError::MathOverflow))
    }

    pub fn position(&self) -> CollateralPosition {
        CollateralPosition {
            supplied: self.working_balance,
            borrowed: self.borrowed_balance,
        }
    }

    pub fn strategy(&self) -> StrategyParams {
        StrategyParams {
            target_ltv_bps: self.target_ltv_bps,
            max_ltv_bps: self.max_ltv_bps,
        }
    }

    pub fn ensure_no_cycle_in_flight(&self) -> Result<()> {
        require!(
            !self.cycle_state.is_in_flight(),
            VaultError::ReentrancyBlocked
        );
        Ok(())
    }
}

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct DepositorAccount {
    /// The vault this account belongs to
    pub vault: Pubkey,
    /// The depositor's wallet
    pub depositor: Pubkey,
    /// Cumulative principal contributed, reduced pro rata on withdrawal
    pub principal: u64,
    /// Shares owned by this depositor
    pub shares: u64,
    /// Timestamp of last deposit
    pub last_deposit_ts: i64,
    /// Vault share epoch the shares were minted in
    pub share_epoch: u32,
    /// PDA bump
    pub bump: u8,
}

impl DepositorAccount {
    pub const SIZE: usize = 8  // discriminator
        + 32   // vault
        + 32   // depositor
        + 8    // principal
        + 8    // shares
        + 8    // last_deposit_ts
        + 4    // share_epoch
        + 1;   // bump

    pub fn new(vault: Pubkey, depositor: Pubkey, bump: u8) -> Self {
        Self {
            vault,
            depositor,
            principal: 0,
            shares: 0,
            last_deposit_ts: 0,
            share_epoch: 0,
            bump,
        }
    }
}

/// Loan receipt written by the flash loan provider when it lends. Only read by
/// the vault, to learn the premium owed for the loan in flight.
#[account]
#[derive(Debug)]
pub struct FlashLoanReceipt {
    /// The provider pool being borrowed from
    pub pool: Pubkey,
    /// The borrower
    pub borrower: Pubkey,
    /// Amount borrowed
    pub amount: u64,
    /// Fee owed
    pub fee: u64,
    /// PDA bump
    pub bump: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::mock::{assert_vault_error, test_vault};

    #[test]
    fn test_strategy_params_bounds() {
        let params = |target_ltv_bps, max_ltv_bps| StrategyParams {
            target_ltv_bps,
            max_ltv_bps,
        };
        assert!(params(5_000, 7_500).validate().is_ok());
        assert!(params(0, 10_000).validate().is_ok());
        assert_vault_error(
            &params(7_500, 7_500).validate().unwrap_err(),
            VaultError::InvalidStrategyParams,
        );
        assert_vault_error(
            &params(5_000, 10_001).validate().unwrap_err(),
            VaultError::InvalidStrategyParams,
        );
    }

    #[test]
    fn test_total_assets_nets_out_borrow() {
        let mut vault = test_vault();
        vault.idle_balance = 1_000;
        vault.working_balance = 500;
        vault.accumulated_profit = 20;
        vault.borrowed_balance = 250;

        assert_eq!(vault.total_assets().unwrap(), 1_270);
        assert_eq!(vault.liquid_balance().unwrap(), 1_020);
    }

    #[test]
    fn test_in_flight_states_block_entry() {
        let mut vault = test_vault();
        for state in [CycleState::Idle, CycleState::Settled, CycleState::Aborted] {
            vault.cycle_state = state;
            assert!(vault.ensure_no_cycle_in_flight().is_ok());
        }
        for state in [
            CycleState::Borrowing,
            CycleState::Deployed,
            CycleState::Harvesting,
            CycleState::Repaying,
        ] {
            vault.cycle_state = state;
            assert_vault_error(
                &vault.ensure_no_cycle_in_flight().unwrap_err(),
                VaultError::ReentrancyBlocked,
            );
        }
    }

    #[test]
    fn test_new_vault_starts_idle_and_active() {
        let vault = test_vault();
        assert_eq!(vault.cycle_state, CycleState::Idle);
        assert!(vault.is_active);
        assert_eq!(vault.total_assets().unwrap(), 0);
    }
}
