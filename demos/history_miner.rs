//! History miner walkthrough: log in, pull a day of hourly candles for one
//! symbol, and print the captured history in time order.

use chrono::{Duration as ChronoDuration, Utc};
use fxgate::sim::SimGateway;
use fxgate::{ClientConfig, Credentials, GatewayClient, HistoryRequest, Timeframe};

const SYMBOL: &str = "EUR/USD";

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
        eprintln!("USAGE: history_miner <username> <password> <terminal>");
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

    let to = Utc::now();
    let request = HistoryRequest::builder()
        .symbol(SYMBOL)
        .timeframe(Timeframe::Hour)
        .from(to - ChronoDuration::days(1))
        .to(to)
        .build()?;

    let captured = client.fetch_history(request).await?;
    println!("Captured {captured} candles for {SYMBOL}");

    for (timestamp, candle) in client.history_snapshot().await {
        println!(
            "{}  O:{:.5} H:{:.5} L:{:.5} C:{:.5}",
            timestamp.format("%m/%d/%Y %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        );
    }

    println!("Logging out");
    client.logout().await?;
    println!("Done");
    Ok(())
}
