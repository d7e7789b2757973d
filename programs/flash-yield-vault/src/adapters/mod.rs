pub mod account_bridge;
pub mod lending_market;
pub mod loan_provider;

pub use lending_market::*;
pub use loan_provider::*;
