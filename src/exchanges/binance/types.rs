use crate::core::errors::ExchangeError;
use crate::core::kernel::ParamMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input for `POST /sapi/v1/capital/deposit/credit-apply`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepositCreditRequest {
    /// Numeric string; sent as a number, omitted when blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_account_id: Option<String>,
    pub tx_id: String,
    pub deposit_id: u64,
}

impl DepositCreditRequest {
    pub fn new(tx_id: impl Into<String>, deposit_id: u64) -> Self {
        Self {
            sub_account_id: None,
            tx_id: tx_id.into(),
            deposit_id,
        }
    }

    #[must_use]
    pub fn with_sub_account_id(mut self, sub_account_id: impl Into<String>) -> Self {
        self.sub_account_id = Some(sub_account_id.into());
        self
    }

    /// Request parameters in wire order: `subAccountId`, `txId`, `depositId`
    pub fn to_params(&self) -> Result<ParamMap, ExchangeError> {
        let sub_account_id = match self.sub_account_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Value::from(id.parse::<u64>().map_err(|e| {
                ExchangeError::InvalidParameters(format!("subAccountId '{}': {}", id, e))
            })?),
            _ => Value::Null,
        };

        let mut params = ParamMap::new();
        params.insert("subAccountId".to_string(), sub_account_id);
        params.insert("txId".to_string(), Value::from(self.tx_id.clone()));
        params.insert("depositId".to_string(), Value::from(self.deposit_id));
        Ok(params)
    }
}

/// Response of the deposit credit application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedDeposit {
    pub success: bool,
    /// Any other fields the exchange returns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
