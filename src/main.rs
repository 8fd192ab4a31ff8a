use anyhow::{bail, Context};
use binance_capital::{build_connector, DepositCreditRequest, ExchangeConfig};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: binance-capital <txId> <depositId> [subAccountId]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (tx_id, deposit_id, sub_account_id) = match args.as_slice() {
        [tx_id, deposit_id] => (tx_id, deposit_id, None),
        [tx_id, deposit_id, sub_account_id] => (tx_id, deposit_id, Some(sub_account_id)),
        _ => bail!(USAGE),
    };

    let deposit_id = deposit_id
        .parse::<u64>()
        .with_context(|| format!("depositId must be an integer, got '{}'", deposit_id))?;

    let mut request = DepositCreditRequest::new(tx_id.clone(), deposit_id);
    if let Some(sub_account_id) = sub_account_id {
        request = request.with_sub_account_id(sub_account_id.clone());
    }

    #[cfg(feature = "env-file")]
    let config = ExchangeConfig::from_env_file("BINANCE")?;
    #[cfg(not(feature = "env-file"))]
    let config = ExchangeConfig::from_env("BINANCE")?;

    let client = build_connector(config)?;
    let applied = client.apply_deposit_credit(&request).await?;

    println!("{}", serde_json::to_string_pretty(&applied)?);
    Ok(())
}
