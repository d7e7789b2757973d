use anchor_lang::prelude::*;

#[event]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub admin: Pubkey,
    pub asset_mint: Pubkey,
    pub loan_provider: Pubkey,
    pub secondary_market: Pubkey,
    pub address_provider: Pubkey,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeposited {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub amount: u64,
    pub shares_minted: u64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithdrew {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub amount: u64,
    pub shares_burned: u64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLoanExecuted {
    pub vault: Pubkey,
    pub amount: u64,
    pub premium: u64,
    /// Harvested surplus minus premium; negative when the cycle lost money
    pub net_profit: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitsReinvested {
    pub vault: Pubkey,
    pub amount: u64,
}

#[event]
pub struct LoanProviderUpdated {
    pub vault: Pubkey,
    pub previous: Pubkey,
    pub current: Pubkey,
}

/// Events produced by the settlement core, held until the unit of work commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    UserDeposited(UserDeposited),
    UserWithdrew(UserWithdrew),
    FlashLoanExecuted(FlashLoanExecuted),
    ProfitsReinvested(ProfitsReinvested),
}

impl VaultEvent {
    pub fn emit(self) {
        match self {
            VaultEvent::UserDeposited(event) => emit!(event),
            VaultEvent::UserWithdrew(event) => emit!(event),
            VaultEvent::FlashLoanExecuted(event) => emit!(event),
            VaultEvent::ProfitsReinvested(event) => emit!(event),
        }
    }
}
