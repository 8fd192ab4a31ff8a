pub mod core;
pub mod exchanges;

pub use crate::core::{config::ExchangeConfig, errors::ExchangeError};
pub use crate::exchanges::binance::{
    build_connector, AppliedDeposit, BinanceRestClient, DepositCreditRequest,
};
