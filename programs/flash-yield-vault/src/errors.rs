use anchor_lang::prelude::*;

#[error_code]
pub enum VaultError {
    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    #[msg("Token account has not delegated enough of the asset to the vault")]
    InsufficientAuthorization,

    #[msg("Idle balance cannot cover the requested amount")]
    InsufficientFunds,

    #[msg("Flash loan callback from an unexpected caller or with no loan outstanding")]
    UnauthorizedCallback,

    #[msg("Secondary market rejected the operation")]
    MarketRejected,

    #[msg("Cycle cannot repay the flash loan principal plus premium")]
    InsufficientRepayment,

    #[msg("Vault entry point called while a flash loan cycle is in flight")]
    ReentrancyBlocked,

    #[msg("Withdrawal exceeds the depositor's claim")]
    InsufficientShares,

    #[msg("Loan provider liquidity cannot cover the requested amount")]
    InsufficientLiquidity,

    #[msg("Flash loan cycle is not in the expected state")]
    InvalidCycleState,

    #[msg("Invalid strategy parameters: target LTV must be below the market maximum")]
    InvalidStrategyParams,

    #[msg("Vault is paused by admin")]
    VaultPaused,

    #[msg("Unauthorized: signer does not match expected authority")]
    Unauthorized,

    #[msg("Token mint does not match the vault's asset mint")]
    MintMismatch,

    #[msg("Token account does not match the vault's token account")]
    InvalidVault,

    #[msg("Remaining accounts do not match the expected layout")]
    InvalidRemainingAccounts,

    #[msg("Deposit too small to mint a share")]
    DepositTooSmall,

    #[msg("Math overflow")]
    MathOverflow,
}
