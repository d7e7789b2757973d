use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::adapters::account_bridge::{instruction_data, invoke_protocol_cpi_signed};
use crate::constants::*;
use crate::errors::VaultError;
use crate::settlement::{FlashLoanReceiver, LoanProvider};
use crate::state::FlashLoanReceipt;

/// Provider instruction accounts, in order:
/// `[pool, flash_loan_receipt, provider vault, borrower token account,
/// borrower, payer, system program, token program]`.
///
/// The receipt is created during the borrow. The vault PDA holds data and
/// cannot fund an account, so rent comes from a separate system-owned payer.
pub const RECEIPT_ACCOUNT_INDEX: usize = 1;
pub const PAYER_ACCOUNT_INDEX: usize = 5;

/// The receipt payer must sign and be a plain system account other than the
/// borrowing vault.
pub fn check_payer(accounts: &[AccountInfo<'_>], borrower: &Pubkey) -> Result<()> {
    let payer = accounts
        .get(PAYER_ACCOUNT_INDEX)
        .ok_or(VaultError::InvalidRemainingAccounts)?;
    require!(payer.is_signer, VaultError::InvalidRemainingAccounts);
    require!(payer.is_writable, VaultError::InvalidRemainingAccounts);
    require_keys_eq!(*payer.owner, system_program::ID, VaultError::InvalidRemainingAccounts);
    require_keys_neq!(*payer.key, *borrower, VaultError::InvalidRemainingAccounts);
    Ok(())
}

/// Flash loan provider reached through CPI, borrowing on behalf of the vault PDA.
///
/// The provider cannot call back into this program (no CPI reentrancy on
/// Solana), so the adapter drives the callback itself: borrow, run the
/// receiver, then repay. Both legs share one instruction, so a failed cycle
/// leaves no loan behind.
pub struct CpiLoanProvider<'a, 'info> {
    program: &'a AccountInfo<'info>,
    accounts: &'a [AccountInfo<'info>],
    borrower: Pubkey,
    signer_seeds: &'a [&'a [&'a [u8]]],
}

impl<'a, 'info> CpiLoanProvider<'a, 'info> {
    pub fn new(
        program: &'a AccountInfo<'info>,
        accounts: &'a [AccountInfo<'info>],
        borrower: Pubkey,
        signer_seeds: &'a [&'a [&'a [u8]]],
    ) -> Result<Self> {
        check_payer(accounts, &borrower)?;
        Ok(Self {
            program,
            accounts,
            borrower,
            signer_seeds,
        })
    }

    fn invoke(&self, discriminator: [u8; 8], payload: &[u8]) -> Result<()> {
        invoke_protocol_cpi_signed(
            self.program,
            self.accounts,
            instruction_data(discriminator, payload),
            &self.borrower,
            self.signer_seeds,
        )
    }

    /// Premium the provider recorded for the loan it just made.
    fn read_premium(&self, amount: u64) -> Result<u64> {
        let receipt_info = self
            .accounts
            .get(RECEIPT_ACCOUNT_INDEX)
            .ok_or(VaultError::InvalidRemainingAccounts)?;
        require_keys_eq!(
            *receipt_info.owner,
            *self.program.key,
            VaultError::InvalidRemainingAccounts
        );

        let data = receipt_info.try_borrow_data()?;
        let receipt = FlashLoanReceipt::try_deserialize(&mut &data[..])?;
        require_keys_eq!(receipt.borrower, self.borrower, VaultError::UnauthorizedCallback);
        require!(receipt.amount == amount, VaultError::UnauthorizedCallback);
        Ok(receipt.fee)
    }
}

impl LoanProvider for CpiLoanProvider<'_, '_> {
    fn key(&self) -> Pubkey {
        *self.program.key
    }

    fn request_loan(
        &mut self,
        _asset: Pubkey,
        amount: u64,
        receiver: &mut dyn FlashLoanReceiver,
    ) -> Result<()> {
        self.invoke(BORROW_FLASH_LOAN_IX, &amount.to_le_bytes())?;
        let premium = self.read_premium(amount)?;
        let owed = amount
            .checked_add(premium)
            .ok_or(VaultError::MathOverflow)?;
        msg!("Borrowed {} from provider, premium {}", amount, premium);

        let approved = receiver.execute_operation(*self.program.key, amount, premium, self.borrower)?;
        require!(approved >= owed, VaultError::InsufficientRepayment);

        self.invoke(REPAY_FLASH_LOAN_IX, &[])?;
        msg!("Repaid {} to provider", owed);
        Ok(())
    }
}
