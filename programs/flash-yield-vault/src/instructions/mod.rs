pub mod initialize_vault;
pub mod deposit;
pub mod withdraw;
pub mod execute_flash_loan;
pub mod reinvest_profits;
pub mod update_vault;

pub use initialize_vault::*;
pub use deposit::*;
pub use withdraw::*;
pub use execute_flash_loan::*;
pub use reinvest_profits::*;
pub use update_vault::*;
