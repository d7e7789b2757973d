//! In-memory stand-ins for the loan provider and the secondary market, and a
//! harness that applies the platform's all-or-nothing rule to them.

use std::collections::BTreeMap;

use anchor_lang::error::Error;
use anchor_lang::prelude::*;

use crate::constants::{BPS_DENOMINATOR, DEFAULT_MAX_LTV_BPS, DEFAULT_TARGET_LTV_BPS};
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::settlement::{FlashLoanReceiver, LoanProvider, SecondaryMarket, SettlementEngine, VaultEntry};
use crate::state::{DepositorAccount, StrategyParams, Vault};

/// Flash loan fee charged by the mock provider: 9 basis points
pub const MOCK_FEE_BPS: u64 = 9;

pub fn assert_vault_error(err: &Error, expected: VaultError) {
    match err {
        Error::AnchorError(anchor_error) => assert_eq!(
            anchor_error.error_code_number,
            u32::from(expected),
            "expected {:?}, got {}",
            expected,
            anchor_error.error_name
        ),
        Error::ProgramError(program_error) => {
            panic!("expected {:?}, got {:?}", expected, program_error)
        }
    }
}

pub fn test_vault_for(loan_provider: Pubkey) -> Vault {
    Vault::new(
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        loan_provider,
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        StrategyParams {
            target_ltv_bps: DEFAULT_TARGET_LTV_BPS,
            max_ltv_bps: DEFAULT_MAX_LTV_BPS,
        },
        255,
        254,
    )
}

pub fn test_vault() -> Vault {
    test_vault_for(Pubkey::new_unique())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockMarket {
    pub owner: Pubkey,
    pub collateral: u64,
    pub debt: u64,
    pub max_ltv_bps: u16,
    /// Incentive credited as extra collateral on every supply
    pub supply_reward_bps: u16,
    pub paused: bool,
    pub withdrawals: u32,
}

impl MockMarket {
    pub fn new(owner: Pubkey) -> Self {
        Self {
            owner,
            collateral: 0,
            debt: 0,
            max_ltv_bps: DEFAULT_MAX_LTV_BPS,
            supply_reward_bps: 0,
            paused: false,
            withdrawals: 0,
        }
    }

    pub fn accrue_interest(&mut self, amount: u64) {
        self.collateral += amount;
    }

    fn within_ltv(&self, collateral: u64, debt: u64) -> bool {
        debt as u128 * BPS_DENOMINATOR as u128 <= collateral as u128 * self.max_ltv_bps as u128
    }

    fn ensure_open(&self) -> Result<()> {
        require!(!self.paused, VaultError::MarketRejected);
        Ok(())
    }
}

impl SecondaryMarket for MockMarket {
    fn supply(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.ensure_open()?;
        let reward = amount * self.supply_reward_bps as u64 / BPS_DENOMINATOR;
        self.collateral += amount + reward;
        Ok(())
    }

    fn borrow(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.ensure_open()?;
        require!(
            self.within_ltv(self.collateral, self.debt + amount),
            VaultError::MarketRejected
        );
        self.debt += amount;
        Ok(())
    }

    fn repay(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.ensure_open()?;
        require!(amount <= self.debt, VaultError::MarketRejected);
        self.debt -= amount;
        Ok(())
    }

    fn withdraw(&mut self, _asset: Pubkey, amount: u64) -> Result<()> {
        self.ensure_open()?;
        require!(amount <= self.collateral, VaultError::MarketRejected);
        require!(
            self.within_ltv(self.collateral - amount, self.debt),
            VaultError::MarketRejected
        );
        self.collateral -= amount;
        self.withdrawals += 1;
        Ok(())
    }

    fn collateral_balance_of(&self, account: Pubkey) -> Result<u64> {
        Ok(if account == self.owner { self.collateral } else { 0 })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reentry {
    Deposit,
    Withdraw,
    ExecuteFlashLoan,
    Reinvest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderBehavior {
    Honest,
    /// Calls back into a vault entry point before the callback
    Reentrant(Reentry),
    /// Lends and returns without invoking the callback
    SkipsCallback,
    /// Invokes the callback naming someone else as initiator
    WrongInitiator,
    /// Invokes the callback twice for one loan
    DoubleCallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockProvider {
    pub key: Pubkey,
    pub borrower: Pubkey,
    pub liquidity: u64,
    pub fee_bps: u64,
    pub fees_earned: u64,
    pub behavior: ProviderBehavior,
}

impl MockProvider {
    pub fn new(key: Pubkey, borrower: Pubkey, liquidity: u64) -> Self {
        Self {
            key,
            borrower,
            liquidity,
            fee_bps: MOCK_FEE_BPS,
            fees_earned: 0,
            behavior: ProviderBehavior::Honest,
        }
    }

    /// Ceiling division so no loan is free.
    pub fn premium_for(&self, amount: u64) -> u64 {
        (amount * self.fee_bps + BPS_DENOMINATOR - 1) / BPS_DENOMINATOR
    }

    fn reenter(&self, reentry: Reentry, receiver: &mut dyn FlashLoanReceiver) -> Result<()> {
        let mut account = DepositorAccount::new(self.borrower, self.key, 0);
        match reentry {
            Reentry::Deposit => receiver.deposit_user_funds(&mut account, 1_000, 1_000).map(|_| ()),
            Reentry::Withdraw => receiver.withdraw_user_funds(&mut account, 1_000).map(|_| ()),
            Reentry::ExecuteFlashLoan => {
                let mut nested = MockProvider::new(self.key, self.borrower, self.liquidity);
                receiver.execute_flash_loan(&mut nested, 1_000).map(|_| ())
            }
            Reentry::Reinvest => receiver.reinvest_profits().map(|_| ()),
        }
    }
}

impl LoanProvider for MockProvider {
    fn key(&self) -> Pubkey {
        self.key
    }

    fn request_loan(
        &mut self,
        _asset: Pubkey,
        amount: u64,
        receiver: &mut dyn FlashLoanReceiver,
    ) -> Result<()> {
        require!(amount > 0, VaultError::ZeroAmount);
        require!(amount <= self.liquidity, VaultError::InsufficientLiquidity);
        let premium = self.premium_for(amount);
        let owed = amount + premium;

        let approved = match self.behavior {
            ProviderBehavior::Honest => {
                receiver.execute_operation(self.key, amount, premium, self.borrower)?
            }
            ProviderBehavior::Reentrant(reentry) => {
                self.reenter(reentry, receiver)?;
                receiver.execute_operation(self.key, amount, premium, self.borrower)?
            }
            ProviderBehavior::SkipsCallback => return Ok(()),
            ProviderBehavior::WrongInitiator => {
                receiver.execute_operation(self.key, amount, premium, Pubkey::new_unique())?
            }
            ProviderBehavior::DoubleCallback => {
                receiver.execute_operation(self.key, amount, premium, self.borrower)?;
                receiver.execute_operation(self.key, amount, premium, self.borrower)?
            }
        };
        require!(approved >= owed, VaultError::InsufficientRepayment);

        self.liquidity += premium;
        self.fees_earned += premium;
        Ok(())
    }
}

/// One vault with its market, provider and depositor accounts. Each call runs
/// through a fresh engine as one instruction; when it fails, every account and
/// external mock is restored and no event is kept, as the runtime would.
pub struct Harness {
    pub vault_key: Pubkey,
    pub vault: Vault,
    pub market: MockMarket,
    pub provider: MockProvider,
    pub accounts: BTreeMap<Pubkey, DepositorAccount>,
    pub events: Vec<VaultEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let vault_key = Pubkey::new_unique();
        let provider = MockProvider::new(Pubkey::new_unique(), vault_key, 1_000_000_000_000);
        Self {
            vault_key,
            vault: test_vault_for(provider.key),
            market: MockMarket::new(vault_key),
            provider,
            accounts: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn depositor(&mut self) -> Pubkey {
        let depositor = Pubkey::new_unique();
        self.accounts
            .insert(depositor, DepositorAccount::new(self.vault_key, depositor, 255));
        depositor
    }

    pub fn account(&self, depositor: &Pubkey) -> &DepositorAccount {
        &self.accounts[depositor]
    }

    pub fn deposit(&mut self, depositor: Pubkey, amount: u64, authorized: u64) -> Result<u64> {
        self.transact(|engine, _, accounts| {
            let account = accounts.get_mut(&depositor).ok_or(VaultError::Unauthorized)?;
            engine.deposit_user_funds(account, amount, authorized)
        })
    }

    pub fn withdraw(&mut self, depositor: Pubkey, amount: u64) -> Result<u64> {
        self.transact(|engine, _, accounts| {
            let account = accounts.get_mut(&depositor).ok_or(VaultError::Unauthorized)?;
            engine.withdraw_user_funds(account, amount)
        })
    }

    /// Deposit as the instruction runs it: unaccounted tokens in the vault
    /// token account are absorbed before shares are priced.
    pub fn deposit_observing(
        &mut self,
        depositor: Pubkey,
        amount: u64,
        observed_liquid: u64,
    ) -> Result<u64> {
        self.transact(|engine, _, accounts| {
            let account = accounts.get_mut(&depositor).ok_or(VaultError::Unauthorized)?;
            engine.absorb_unaccounted(observed_liquid)?;
            engine.deposit_user_funds(account, amount, amount)
        })
    }

    /// Withdrawal with market accounts attached: working capital is recalled
    /// first when liquid funds fall short.
    pub fn withdraw_with_recall(&mut self, depositor: Pubkey, amount: u64) -> Result<u64> {
        self.transact(|engine, _, accounts| {
            let account = accounts.get_mut(&depositor).ok_or(VaultError::Unauthorized)?;
            engine.recall_working_capital(amount)?;
            engine.withdraw_user_funds(account, amount)
        })
    }

    pub fn execute(&mut self, amount: u64) -> Result<i64> {
        self.transact(|engine, provider, _| engine.execute_flash_loan(provider, amount))
    }

    pub fn reinvest(&mut self) -> Result<u64> {
        self.transact(|engine, _, _| engine.reinvest_profits())
    }

    pub fn absorb(&mut self, observed_liquid: u64) -> Result<u64> {
        self.transact(|engine, _, _| engine.absorb_unaccounted(observed_liquid))
    }

    /// Idle, working and unswept profit: everything the pool holds.
    pub fn pool_value(&self) -> u64 {
        self.vault.idle_balance + self.vault.working_balance + self.vault.accumulated_profit
    }

    fn transact<T>(
        &mut self,
        op: impl FnOnce(
            &mut SettlementEngine<'_, MockMarket>,
            &mut MockProvider,
            &mut BTreeMap<Pubkey, DepositorAccount>,
        ) -> Result<T>,
    ) -> Result<T> {
        let vault_before = self.vault.clone();
        let market_before = self.market.clone();
        let provider_before = self.provider.clone();
        let accounts_before = self.accounts.clone();

        let mut engine = SettlementEngine::new(self.vault_key, &mut self.vault, &mut self.market);
        let result = op(&mut engine, &mut self.provider, &mut self.accounts);
        let events = engine.take_events();

        if result.is_ok() {
            self.events.extend(events);
        } else {
            self.vault = vault_before;
            self.market = market_before;
            self.provider = provider_before;
            self.accounts = accounts_before;
        }
        result
    }
}
