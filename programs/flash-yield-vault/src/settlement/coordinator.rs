use anchor_lang::prelude::*;

use crate::errors::VaultError;
use crate::events::{FlashLoanExecuted, VaultEvent};
use crate::settlement::interfaces::{FlashLoanReceiver, LoanProvider, SecondaryMarket};
use crate::settlement::position::PositionManager;
use crate::settlement::{reinvest, SettlementEngine};
use crate::state::{CycleState, Vault};

/// The loan in flight. Lives only for the duration of one `execute_flash_loan`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashLoanCycle {
    pub provider: Pubkey,
    pub amount: u64,
    pub premium: u64,
    /// Interest harvested from the position during the cycle
    pub surplus: u64,
    /// Repayment shortfall covered out of pooled liquidity or unwound collateral
    pub covered: u64,
    /// Liquidity left after repayment
    pub residual: u64,
    pub repaid: bool,
}

impl FlashLoanCycle {
    fn open(provider: Pubkey, amount: u64) -> Self {
        Self {
            provider,
            amount,
            premium: 0,
            surplus: 0,
            covered: 0,
            residual: 0,
            repaid: false,
        }
    }

    /// Surplus minus premium.
    pub fn net_profit(&self) -> Result<i64> {
        let net = self.surplus as i128 - self.premium as i128;
        i64::try_from(net).map_err(|_| error!(VaultError::MathOverflow))
    }
}

fn advance(vault: &mut Vault, next: CycleState) {
    msg!("Flash loan cycle: {:?} -> {:?}", vault.cycle_state, next);
    vault.cycle_state = next;
}

impl<M: SecondaryMarket + ?Sized> SettlementEngine<'_, M> {
    /// Idle -> Borrowing -> (callback) -> Settled. The caller owns the unit of
    /// work; any error here discards everything the cycle did.
    pub(crate) fn run_cycle(&mut self, provider: &mut dyn LoanProvider, amount: u64) -> Result<i64> {
        let provider_key = provider.key();
        require_keys_eq!(
            provider_key,
            self.vault.loan_provider,
            VaultError::Unauthorized
        );

        self.cycle = Some(FlashLoanCycle::open(provider_key, amount));
        advance(self.vault, CycleState::Borrowing);

        let asset = self.vault.asset_mint;
        let outcome = provider.request_loan(asset, amount, &mut *self);
        let cycle = self.cycle.take();
        if let Err(err) = outcome {
            advance(self.vault, CycleState::Aborted);
            msg!("Flash loan cycle aborted: {}", err);
            return Err(err);
        }

        // A provider that lends and returns without calling back never let
        // the cycle run.
        let cycle = match cycle {
            Some(cycle) if cycle.repaid && self.vault.cycle_state == CycleState::Repaying => cycle,
            _ => return err!(VaultError::InvalidCycleState),
        };

        reinvest::record_profit(self.vault, cycle.residual)?;
        self.vault.total_premiums_paid = self
            .vault
            .total_premiums_paid
            .checked_add(cycle.premium)
            .ok_or(VaultError::MathOverflow)?;
        self.vault.cycles_executed = self
            .vault
            .cycles_executed
            .checked_add(1)
            .ok_or(VaultError::MathOverflow)?;
        advance(self.vault, CycleState::Settled);

        let net_profit = cycle.net_profit()?;
        self.journal.record(VaultEvent::FlashLoanExecuted(FlashLoanExecuted {
            vault: self.vault_key,
            amount,
            premium: cycle.premium,
            net_profit,
        }));
        Ok(net_profit)
    }

    fn authorize_callback(
        &self,
        caller: Pubkey,
        amount: u64,
        initiator: Pubkey,
    ) -> Result<FlashLoanCycle> {
        match self.cycle {
            Some(cycle)
                if self.vault.cycle_state == CycleState::Borrowing
                    && caller == cycle.provider
                    && caller == self.vault.loan_provider
                    && initiator == self.vault_key
                    && amount == cycle.amount =>
            {
                Ok(cycle)
            }
            _ => err!(VaultError::UnauthorizedCallback),
        }
    }

    /// Raises `shortfall` from pooled liquidity: unswept profit first, then the
    /// idle balance, then forced withdrawal of working collateral.
    fn cover_shortfall(&mut self, shortfall: u64) -> Result<u64> {
        let vault = &mut *self.vault;

        let from_profit = shortfall.min(vault.accumulated_profit);
        vault.accumulated_profit -= from_profit;
        let mut covered = from_profit;

        let from_idle = (shortfall - covered).min(vault.idle_balance);
        vault.idle_balance -= from_idle;
        covered += from_idle;

        if covered < shortfall {
            let unwound = PositionManager::new(&mut *self.market, self.vault_key)
                .unwind(vault, shortfall - covered)?;
            covered += unwound;
        }

        msg!(
            "Covered repayment shortfall: {} profit, {} idle, {} unwound",
            from_profit,
            from_idle,
            covered - from_profit - from_idle
        );
        Ok(covered)
    }
}

impl<M: SecondaryMarket + ?Sized> FlashLoanReceiver for SettlementEngine<'_, M> {
    fn execute_operation(
        &mut self,
        caller: Pubkey,
        amount: u64,
        premium: u64,
        initiator: Pubkey,
    ) -> Result<u64> {
        let cycle = self.authorize_callback(caller, amount, initiator)?;
        let owed = amount
            .checked_add(premium)
            .ok_or(VaultError::MathOverflow)?;

        advance(self.vault, CycleState::Deployed);
        let mut positions = PositionManager::new(&mut *self.market, self.vault_key);
        let leg = positions.deploy(self.vault, amount)?;

        advance(self.vault, CycleState::Harvesting);
        let harvest = positions.harvest(self.vault, leg)?;

        advance(self.vault, CycleState::Repaying);
        let mut liquid = harvest.liquid()?;
        let mut covered = 0;
        if liquid < owed {
            covered = self.cover_shortfall(owed - liquid)?;
            liquid = liquid
                .checked_add(covered)
                .ok_or(VaultError::MathOverflow)?;
            require!(liquid >= owed, VaultError::InsufficientRepayment);
        }

        self.cycle = Some(FlashLoanCycle {
            premium,
            surplus: harvest.surplus,
            covered,
            residual: liquid - owed,
            repaid: true,
            ..cycle
        });
        Ok(owed)
    }
}
