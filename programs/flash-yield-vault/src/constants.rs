pub const VAULT_SEED: &[u8] = b"vault";
pub const VAULT_TOKEN_SEED: &[u8] = b"vault_token";
pub const DEPOSITOR_SEED: &[u8] = b"depositor";

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default fraction of each deployed amount borrowed back against it: 50%
pub const DEFAULT_TARGET_LTV_BPS: u16 = 5_000;

/// Default market loan-to-value ceiling: 75%
pub const DEFAULT_MAX_LTV_BPS: u16 = 7_500;

// Anchor instruction discriminators of the external programs,
// sha256("global:<name>")[..8].
pub const BORROW_FLASH_LOAN_IX: [u8; 8] = [64, 203, 133, 3, 2, 181, 8, 180];
pub const REPAY_FLASH_LOAN_IX: [u8; 8] = [119, 239, 18, 45, 194, 107, 31, 238];
pub const MARKET_SUPPLY_IX: [u8; 8] = [81, 67, 116, 61, 250, 209, 5, 198];
pub const MARKET_BORROW_IX: [u8; 8] = [228, 253, 131, 202, 207, 116, 89, 18];
pub const MARKET_REPAY_IX: [u8; 8] = [234, 103, 67, 82, 208, 234, 219, 166];
pub const MARKET_WITHDRAW_IX: [u8; 8] = [183, 18, 70, 156, 148, 109, 161, 34];
pub const MARKET_COLLATERAL_BALANCE_IX: [u8; 8] = [245, 144, 10, 157, 93, 198, 189, 156];
