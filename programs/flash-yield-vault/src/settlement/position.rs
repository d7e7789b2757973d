use anchor_lang::prelude::*;

use crate::errors::VaultError;
use crate::math::{apply_bps, min_collateral_for_debt};
use crate::settlement::interfaces::SecondaryMarket;
use crate::state::Vault;

/// What a cycle put into the market, so harvest can take exactly that back out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedLeg {
    pub supplied: u64,
    pub borrowed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Harvest {
    /// Deployed principal withdrawn back to the vault
    pub recovered: u64,
    /// Accrued interest withdrawn on top of the principal
    pub surplus: u64,
}

impl Harvest {
    pub fn liquid(&self) -> Result<u64> {
        self.recovered
            .checked_add(self.surplus)
            .ok_or_else(|| error!(VaultError::MathOverflow))
    }
}

/// Wraps the secondary market. Keeps `working_balance` and `borrowed_balance`
/// on the vault in step with what the market holds for it.
pub struct PositionManager<'m, M: SecondaryMarket + ?Sized> {
    market: &'m mut M,
    owner: Pubkey,
}

impl<'m, M: SecondaryMarket + ?Sized> PositionManager<'m, M> {
    pub fn new(market: &'m mut M, owner: Pubkey) -> Self {
        Self { market, owner }
    }

    /// Supplies collateral without borrowing against it.
    pub fn supply(&mut self, vault: &mut Vault, amount: u64) -> Result<()> {
        self.market.supply(vault.asset_mint, amount)?;
        vault.working_balance = vault
            .working_balance
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Supplies `amount` as collateral and borrows the configured target
    /// fraction of it back. The borrowed funds stay liquid in the vault.
    pub fn deploy(&mut self, vault: &mut Vault, amount: u64) -> Result<DeployedLeg> {
        require!(amount > 0, VaultError::ZeroAmount);
        let strategy = vault.strategy();
        strategy.validate()?;

        self.supply(vault, amount)?;

        let borrowed = apply_bps(amount, strategy.target_ltv_bps)?;
        if borrowed > 0 {
            self.market.borrow(vault.asset_mint, borrowed)?;
            vault.borrowed_balance = vault
                .borrowed_balance
                .checked_add(borrowed)
                .ok_or(VaultError::MathOverflow)?;
        }

        msg!("Deployed {} as collateral, borrowed {}", amount, borrowed);
        Ok(DeployedLeg {
            supplied: amount,
            borrowed,
        })
    }

    /// Closes the leg opened by `deploy` and withdraws the interest accrued on
    /// the position, capped so any remaining borrow stays within the market
    /// maximum.
    pub fn harvest(&mut self, vault: &mut Vault, leg: DeployedLeg) -> Result<Harvest> {
        if leg.borrowed > 0 {
            self.market.repay(vault.asset_mint, leg.borrowed)?;
            vault.borrowed_balance = vault
                .borrowed_balance
                .checked_sub(leg.borrowed)
                .ok_or(VaultError::MathOverflow)?;
        }

        let balance = self.market.collateral_balance_of(self.owner)?;
        let accrued = balance.saturating_sub(vault.working_balance);
        let withdrawable = self.max_withdrawable(vault, balance)?;
        let recovered = leg.supplied.min(withdrawable);
        let surplus = accrued.min(withdrawable - recovered);

        let total = recovered
            .checked_add(surplus)
            .ok_or(VaultError::MathOverflow)?;
        if total > 0 {
            self.market.withdraw(vault.asset_mint, total)?;
        }
        vault.working_balance = vault
            .working_balance
            .checked_sub(recovered)
            .ok_or(VaultError::MathOverflow)?;

        msg!("Harvested {} surplus, recovered {}", surplus, recovered);
        Ok(Harvest { recovered, surplus })
    }

    /// Forced withdrawal of working collateral to raise `amount` of liquidity.
    /// Returns what could be raised without breaching the LTV ceiling, which
    /// may be less than asked.
    pub fn unwind(&mut self, vault: &mut Vault, amount: u64) -> Result<u64> {
        let balance = self.market.collateral_balance_of(self.owner)?;
        let raised = amount
            .min(self.max_withdrawable(vault, balance)?)
            .min(vault.working_balance);
        if raised == 0 {
            return Ok(0);
        }

        self.market.withdraw(vault.asset_mint, raised)?;
        vault.working_balance -= raised;

        msg!("Unwound {} of working collateral", raised);
        Ok(raised)
    }

    /// Collateral that can leave the market while the outstanding borrow
    /// stays within `max_ltv_bps` of what remains.
    fn max_withdrawable(&self, vault: &Vault, balance: u64) -> Result<u64> {
        let locked = min_collateral_for_debt(vault.borrowed_balance, vault.max_ltv_bps)?;
        Ok(balance.saturating_sub(locked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::mock::{assert_vault_error, test_vault, MockMarket};
    use crate::state::CollateralPosition;

    #[test]
    fn test_deploy_supplies_and_borrows_target_fraction() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);

        let leg = PositionManager::new(&mut market, owner)
            .deploy(&mut vault, 1_000)
            .unwrap();

        assert_eq!(leg, DeployedLeg { supplied: 1_000, borrowed: 500 });
        assert_eq!(
            vault.position(),
            CollateralPosition { supplied: 1_000, borrowed: 500 }
        );
        assert_eq!(market.collateral, 1_000);
        assert_eq!(market.debt, 500);
    }

    #[test]
    fn test_deploy_rejected_by_paused_market() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);
        market.paused = true;

        let err = PositionManager::new(&mut market, owner)
            .deploy(&mut vault, 1_000)
            .unwrap_err();
        assert_vault_error(&err, VaultError::MarketRejected);
    }

    #[test]
    fn test_harvest_closes_leg_and_withdraws_interest() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);
        let mut positions = PositionManager::new(&mut market, owner);
        positions.supply(&mut vault, 2_000).unwrap();
        let leg = positions.deploy(&mut vault, 1_000).unwrap();
        market.accrue_interest(30);

        let harvest = PositionManager::new(&mut market, owner)
            .harvest(&mut vault, leg)
            .unwrap();

        assert_eq!(harvest, Harvest { recovered: 1_000, surplus: 30 });
        assert_eq!(vault.working_balance, 2_000);
        assert_eq!(vault.borrowed_balance, 0);
        assert_eq!(market.collateral, 2_000);
        assert_eq!(market.debt, 0);
    }

    #[test]
    fn test_harvest_keeps_existing_debt_within_ltv() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);
        market.collateral = 1_100;
        market.debt = 750;
        vault.working_balance = 1_000;
        vault.borrowed_balance = 750;

        // 750 of debt at a 75% ceiling locks 1_000 of collateral
        let harvest = PositionManager::new(&mut market, owner)
            .harvest(&mut vault, DeployedLeg { supplied: 0, borrowed: 0 })
            .unwrap();

        assert_eq!(harvest, Harvest { recovered: 0, surplus: 100 });
        assert_eq!(market.collateral, 1_000);
    }

    #[test]
    fn test_unwind_is_capped_by_working_balance() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);
        PositionManager::new(&mut market, owner)
            .supply(&mut vault, 300)
            .unwrap();

        let raised = PositionManager::new(&mut market, owner)
            .unwind(&mut vault, 500)
            .unwrap();

        assert_eq!(raised, 300);
        assert_eq!(vault.working_balance, 0);
        assert_eq!(market.collateral, 0);
    }

    #[test]
    fn test_unwind_nothing_to_raise() {
        let mut vault = test_vault();
        let owner = Pubkey::new_unique();
        let mut market = MockMarket::new(owner);

        let raised = PositionManager::new(&mut market, owner)
            .unwind(&mut vault, 500)
            .unwrap();
        assert_eq!(raised, 0);
        assert_eq!(market.withdrawals, 0);
    }
}
