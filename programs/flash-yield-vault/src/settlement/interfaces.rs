use anchor_lang::prelude::*;

use crate::state::DepositorAccount;

/// Flash loan provider as seen by the vault.
///
/// `request_loan` lends `amount`, invokes `receiver.execute_operation` exactly
/// once and expects the returned approval to cover `amount + premium`.
/// Any error undoes the whole operation.
pub trait LoanProvider {
    fn key(&self) -> Pubkey;

    fn request_loan(
        &mut self,
        asset: Pubkey,
        amount: u64,
        receiver: &mut dyn FlashLoanReceiver,
    ) -> Result<()>;
}

/// Secondary lending market holding the vault's collateral position.
pub trait SecondaryMarket {
    fn supply(&mut self, asset: Pubkey, amount: u64) -> Result<()>;
    fn borrow(&mut self, asset: Pubkey, amount: u64) -> Result<()>;
    fn repay(&mut self, asset: Pubkey, amount: u64) -> Result<()>;
    fn withdraw(&mut self, asset: Pubkey, amount: u64) -> Result<()>;
    /// Collateral currently credited to `account`, interest included.
    fn collateral_balance_of(&self, account: Pubkey) -> Result<u64>;
}

/// Public surface of the vault. A provider holds this handle while the loan
/// callback runs, so every method must refuse to act mid-cycle.
pub trait VaultEntry {
    fn deposit_user_funds(
        &mut self,
        account: &mut DepositorAccount,
        amount: u64,
        authorized: u64,
    ) -> Result<u64>;

    fn withdraw_user_funds(&mut self, account: &mut DepositorAccount, amount: u64) -> Result<u64>;

    fn execute_flash_loan(&mut self, provider: &mut dyn LoanProvider, amount: u64) -> Result<i64>;

    fn reinvest_profits(&mut self) -> Result<u64>;
}

/// Callback invoked by the loan provider while the loan is outstanding.
/// Returns the amount approved for the provider to pull back.
pub trait FlashLoanReceiver: VaultEntry {
    fn execute_operation(
        &mut self,
        caller: Pubkey,
        amount: u64,
        premium: u64,
        initiator: Pubkey,
    ) -> Result<u64>;
}
