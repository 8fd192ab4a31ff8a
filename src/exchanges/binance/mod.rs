pub mod builder;
pub mod rest;
pub mod types;

// Re-export main types for easier importing
pub use builder::build_connector;
pub use rest::{BinanceRestClient, DEPOSIT_CREDIT_APPLY_PATH};
pub use types::{AppliedDeposit, DepositCreditRequest};
