//! Batch trader walkthrough: log in, pull accounts and instruments, open a
//! minimum-size market order on every instrument, flatten the positions a
//! few seconds later, and log out.
//!
//! Runs against the scripted sim gateway so it needs no live credentials,
//! but takes them on the command line the way a real gateway login would.

use fxgate::sim::SimGateway;
use fxgate::{ClientConfig, Credentials, GatewayClient, MarketOrder, Side};
use std::time::Duration;

#[tokio::main]
async fn main() -> fxgate::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxgate=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("USAGE: batch_trader <username> <password> <terminal>");
        std::process::exit(1);
    }

    let credentials = Credentials::builder()
        .username(&args[1])
        .password(&args[2])
        .terminal(&args[3])
        .host_url("https://gateway.example.com/hosts")
        .build()?;

    let mut client = GatewayClient::new(SimGateway::new(), ClientConfig::new(credentials));

    println!("Logging in");
    client.login().await?;

    let accounts = client.accounts().await?;
    println!("Count of accounts: {}", accounts.len());
    let account = &accounts[0];

    let instruments = client.instruments().await?;

    // Open a minimum-size position on every instrument.
    let side = Side::Sell;
    let mut opened = Vec::new();
    for instrument in &instruments {
        let order = MarketOrder::builder()
            .account_id(&account.account_id)
            .symbol(&instrument.symbol)
            .side(side)
            .quantity(instrument.min_contract_quantity())
            .text(&account.account_id)
            .build()?;
        let status = client.place_market_order(order).await?;
        if status.state.is_negative() {
            println!(
                "Unable to place order on {}: {}",
                instrument.symbol,
                status.detail.as_deref().unwrap_or("no detail")
            );
        } else {
            println!("  {} placed on {}", status.order_id, status.symbol);
            opened.push(status);
        }
    }
    println!("Total orders placed: {}", opened.len());

    println!("Waiting...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Flatten each position with an opposite-side market order.
    println!("Tracked tickets: {}", client.order_statuses().await.len());
    let mut closed = 0;
    for status in &opened {
        let close = MarketOrder::closing(&account.account_id, status, side);
        let result = client.place_market_order(close).await?;
        if !result.state.is_negative() {
            closed += 1;
        }
    }
    println!("Total closed positions: {closed}");

    println!("Logging out");
    client.logout().await?;
    println!("Done");
    Ok(())
}
