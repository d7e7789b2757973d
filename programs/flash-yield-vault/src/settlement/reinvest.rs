use anchor_lang::prelude::*;

use crate::errors::VaultError;
use crate::events::{ProfitsReinvested, VaultEvent};
use crate::settlement::interfaces::SecondaryMarket;
use crate::settlement::ledger;
use crate::settlement::position::PositionManager;
use crate::settlement::SettlementEngine;
use crate::state::Vault;

/// Hands the liquidity left after a cycle's repayment to the ledger as pooled
/// profit. A cycle that only broke even leaves nothing to record.
pub fn record_profit(vault: &mut Vault, residual: u64) -> Result<()> {
    if residual == 0 {
        return Ok(());
    }
    ledger::accrue(vault, residual)
}

impl<M: SecondaryMarket + ?Sized> SettlementEngine<'_, M> {
    /// Supplies all accumulated profit to the market as working capital.
    /// Zero profit is a no-op: no market call, no event.
    pub(crate) fn sweep_profits(&mut self) -> Result<u64> {
        let profit = self.vault.accumulated_profit;
        if profit == 0 {
            msg!("No profit to reinvest");
            return Ok(0);
        }

        PositionManager::new(&mut *self.market, self.vault_key).supply(self.vault, profit)?;
        self.vault.accumulated_profit = self
            .vault
            .accumulated_profit
            .checked_sub(profit)
            .ok_or(VaultError::MathOverflow)?;

        msg!("Reinvested {} of profit into working capital", profit);
        self.journal.record(VaultEvent::ProfitsReinvested(ProfitsReinvested {
            vault: self.vault_key,
            amount: profit,
        }));
        Ok(profit)
    }
}
