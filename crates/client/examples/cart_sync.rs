//! Fetch the cart, bump the first line, and print the reconciled state.
//!
//! Requires `STORE_BASE_URL` and `STORE_AUTH_TOKEN` in the environment or a
//! `.env` file.

use krispy_cottage_client::config::StoreConfig;
use krispy_cottage_client::{CartEngine, StoreClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = StoreConfig::from_env()?;
    let client = StoreClient::new(&config)?;
    let engine = CartEngine::new(client);

    let cart = engine.refresh().await?;
    println!("cart: {} line(s), total {}", cart.lines.len(), cart.total);
    for (i, line) in cart.lines.iter().enumerate() {
        println!(
            "  [{i}] {} x{} @ {}",
            line.name, line.quantity, line.unit_price
        );
    }

    if !cart.is_empty() {
        let updated = engine.increment(0).await?;
        println!("after increment: total {}", updated.total);
    }

    Ok(())
}
