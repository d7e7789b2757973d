use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::get_return_data;

use crate::adapters::account_bridge::{instruction_data, invoke_protocol_cpi_signed};
use crate::constants::*;
use crate::errors::VaultError;
use crate::settlement::SecondaryMarket;

/// Secondary lending market reached through CPI, acting for the vault PDA.
///
/// `accounts` are the market instruction accounts shared by every call
/// (reserve, vault token account, vault PDA, token program, ...). The asset is
/// fixed by those accounts, so the `asset` argument is not sent.
pub struct CpiLendingMarket<'a, 'info> {
    program: &'a AccountInfo<'info>,
    accounts: &'a [AccountInfo<'info>],
    owner: Pubkey,
    signer_seeds: &'a [&'a [&'a [u8]]],
}

impl<'a, 'info> CpiLendingMarket<'a, 'info> {
    pub fn new(
        program: &'a AccountInfo<'info>,
        accounts: &'a [AccountInfo<'info>],
        owner: Pubkey,
        signer_seeds: &'a [&'a [&'a [u8]]],
    ) -> Self {
        Self {
            program,
            accounts,
            owner,
            signer_seeds,
        }
    }

    fn invoke(&self, action: &str, discriminator: [u8; 8], payload: &[u8]) -> Result<()> {
        invoke_protocol_cpi_signed(
            self.program,
            self.accounts,
            instruction_data(discriminator, payload),
            &self.owner,
            self.signer_seeds,
        )
        .map_err(|err| {
            msg!("Secondary market rejected {}: {}", action, err);
            error!(VaultError::MarketRejected)
        })
    }
}

impl SecondaryMarket for CpiLendingMarket<'_, '_> {
    fn supply(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.invoke("supply", MARKET_SUPPLY_IX, &amount.to_le_bytes())
    }

    fn borrow(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.invoke("borrow", MARKET_BORROW_IX, &amount.to_le_bytes())
    }

    fn repay(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.invoke("repay", MARKET_REPAY_IX, &amount.to_le_bytes())
    }

    fn withdraw(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.invoke("withdraw", MARKET_WITHDRAW_IX, &amount.to_le_bytes())
    }

    fn collateral_balance_of(&self, account: Pubkey) -> Result<u64> {
        self.invoke(
            "collateral_balance_of",
            MARKET_COLLATERAL_BALANCE_IX,
            account.as_ref(),
        )?;
        let (program_id, data) = get_return_data().ok_or(VaultError::MarketRejected)?;
        require_keys_eq!(program_id, *self.program.key, VaultError::MarketRejected);
        decode_balance(&data)
    }
}

/// Market handle for instructions that carry no market accounts. Deposits
/// and withdrawals never reach the market, so every call is rejected.
pub struct DisconnectedMarket;

impl SecondaryMarket for DisconnectedMarket {
    fn supply(&mut self, _asset: Pubkey, _amount: u64) -> Result<()> {
        err!(VaultError::MarketRejected)
    }

    fn borrow(&mut self, _asset: Pubkey, _amount: u64) -> Result<()> {
        err!(VaultError::MarketRejected)
    }

    fn repay(&mut self, _asset: Pubkey, _amount: u64) -> Result<()> {
        err!(VaultError::MarketRejected)
    }

    fn withdraw(&mut self, _asset: Pubkey, _amount: u64) -> Result<()> {
        err!(VaultError::MarketRejected)
    }

    fn collateral_balance_of(&self, _account: Pubkey) -> Result<u64> {
        err!(VaultError::MarketRejected)
    }
}

/// Return data of `collateral_balance_of`: a little-endian u64.
fn decode_balance(data: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = data
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(VaultError::MarketRejected)?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::mock::assert_vault_error;

    #[test]
    fn test_decode_balance() {
        assert_eq!(decode_balance(&1_234u64.to_le_bytes()).unwrap(), 1_234);
    }

    #[test]
    fn test_disconnected_market_rejects_everything() {
        let mut market = DisconnectedMarket;
        let asset = Pubkey::new_unique();
        assert_vault_error(&market.supply(asset, 1).unwrap_err(), VaultError::MarketRejected);
        assert_vault_error(&market.withdraw(asset, 1).unwrap_err(), VaultError::MarketRejected);
        assert_vault_error(
            &market.collateral_balance_of(asset).unwrap_err(),
            VaultError::MarketRejected,
        );
    }

    #[test]
    fn test_decode_short_return_data() {
        let err = decode_balance(&[1, 2, 3]).unwrap_err();
        assert_vault_error(&err, VaultError::MarketRejected);
    }
}
