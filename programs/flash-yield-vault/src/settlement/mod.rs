//! Settlement core: ledger, loan coordinator, position manager and
//! reinvestment controller, independent of account loading and CPI.
//!
//! Every public entry point runs as one unit of work against the vault state:
//! it either commits all of its mutations and events or none of them.

pub mod coordinator;
pub mod interfaces;
pub mod ledger;
pub mod position;
pub mod reinvest;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod mock;

use anchor_lang::prelude::*;

use crate::errors::VaultError;
use crate::events::{UserDeposited, UserWithdrew, VaultEvent};
use crate::settlement::position::PositionManager;
use crate::state::{DepositorAccount, Vault};

pub use coordinator::FlashLoanCycle;
pub use interfaces::{FlashLoanReceiver, LoanProvider, SecondaryMarket, VaultEntry};
use unit_of_work::{Checkpoint, Journal};

pub struct SettlementEngine<'a, M: SecondaryMarket + ?Sized> {
    vault_key: Pubkey,
    vault: &'a mut Vault,
    market: &'a mut M,
    journal: Journal,
    cycle: Option<FlashLoanCycle>,
}

impl<'a, M: SecondaryMarket + ?Sized> SettlementEngine<'a, M> {
    pub fn new(vault_key: Pubkey, vault: &'a mut Vault, market: &'a mut M) -> Self {
        Self {
            vault_key,
            vault,
            market,
            journal: Journal::default(),
            cycle: None,
        }
    }

    pub fn vault(&self) -> &Vault {
        &*self.vault
    }

    /// Events of committed units of work, in order.
    pub fn committed_events(&self) -> &[VaultEvent] {
        self.journal.committed()
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        self.journal.take_committed()
    }

    /// Accrues tokens found in the vault token account beyond the tracked
    /// liquid balance as pool profit. Returns the amount absorbed.
    pub fn absorb_unaccounted(&mut self, observed_liquid: u64) -> Result<u64> {
        self.vault.ensure_no_cycle_in_flight()?;
        let checkpoint = Checkpoint::capture(&*self.vault, None, &self.journal);
        let result = ledger::unaccounted_surplus(self.vault, observed_liquid).and_then(|surplus| {
            if surplus > 0 {
                ledger::accrue(self.vault, surplus)?;
                msg!("Absorbed {} unaccounted tokens as profit", surplus);
            }
            Ok(surplus)
        });
        self.finish(checkpoint, None, result)
    }

    /// Unwinds working collateral back into the idle balance until `amount`
    /// is liquid, bounded by the market's LTV ceiling. Returns the amount
    /// recalled, zero when liquid funds already cover `amount`.
    pub fn recall_working_capital(&mut self, amount: u64) -> Result<u64> {
        self.vault.ensure_no_cycle_in_flight()?;
        let checkpoint = Checkpoint::capture(&*self.vault, None, &self.journal);
        let result = self.recall_shortfall(amount);
        self.finish(checkpoint, None, result)
    }

    fn recall_shortfall(&mut self, amount: u64) -> Result<u64> {
        let liquid = self.vault.liquid_balance()?;
        if liquid >= amount {
            return Ok(0);
        }

        let recalled = PositionManager::new(&mut *self.market, self.vault_key)
            .unwind(self.vault, amount - liquid)?;
        self.vault.idle_balance = self
            .vault
            .idle_balance
            .checked_add(recalled)
            .ok_or(VaultError::MathOverflow)?;

        msg!("Recalled {} of working capital to idle", recalled);
        Ok(recalled)
    }

    fn finish<T>(
        &mut self,
        checkpoint: Checkpoint,
        account: Option<&mut DepositorAccount>,
        result: Result<T>,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                checkpoint.commit(&mut self.journal);
                Ok(value)
            }
            Err(err) => {
                checkpoint.rollback(self.vault, account, &mut self.journal);
                self.cycle = None;
                Err(err)
            }
        }
    }

    fn ensure_account_belongs(&self, account: &DepositorAccount) -> Result<()> {
        require_keys_eq!(account.vault, self.vault_key, VaultError::InvalidVault);
        Ok(())
    }
}

impl<M: SecondaryMarket + ?Sized> VaultEntry for SettlementEngine<'_, M> {
    fn deposit_user_funds(
        &mut self,
        account: &mut DepositorAccount,
        amount: u64,
        authorized: u64,
    ) -> Result<u64> {
        self.vault.ensure_no_cycle_in_flight()?;
        self.ensure_account_belongs(account)?;

        let checkpoint = Checkpoint::capture(&*self.vault, Some(&*account), &self.journal);
        let result = ledger::deposit(self.vault, account, amount, authorized);
        if let Ok(&shares_minted) = result.as_ref() {
            self.journal.record(VaultEvent::UserDeposited(UserDeposited {
                vault: self.vault_key,
                depositor: account.depositor,
                amount,
                shares_minted,
            }));
        }
        self.finish(checkpoint, Some(account), result)
    }

    fn withdraw_user_funds(&mut self, account: &mut DepositorAccount, amount: u64) -> Result<u64> {
        self.vault.ensure_no_cycle_in_flight()?;
        self.ensure_account_belongs(account)?;

        let checkpoint = Checkpoint::capture(&*self.vault, Some(&*account), &self.journal);
        let result = ledger::withdraw(self.vault, account, amount);
        if let Ok(&shares_burned) = result.as_ref() {
            self.journal.record(VaultEvent::UserWithdrew(UserWithdrew {
                vault: self.vault_key,
                depositor: account.depositor,
                amount,
                shares_burned,
            }));
        }
        self.finish(checkpoint, Some(account), result)
    }

    fn execute_flash_loan(&mut self, provider: &mut dyn LoanProvider, amount: u64) -> Result<i64> {
        self.vault.ensure_no_cycle_in_flight()?;
        require!(amount > 0, VaultError::ZeroAmount);

        let checkpoint = Checkpoint::capture(&*self.vault, None, &self.journal);
        let result = self.run_cycle(provider, amount);
        self.finish(checkpoint, None, result)
    }

    fn reinvest_profits(&mut self) -> Result<u64> {
        self.vault.ensure_no_cycle_in_flight()?;

        let checkpoint = Checkpoint::capture(&*self.vault, None, &self.journal);
        let result = self.sweep_profits();
        self.finish(checkpoint, None, result)
    }
}
