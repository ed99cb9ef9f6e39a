//! Follow a few groups and pull only what is new
//!
//! ```text
//! cargo run --example subscribe -- news.example.com alt.test comp.lang.rust
//! ```

use std::time::Duration;

use nntp_reader::{EngineConfig, NewsClient, NewsModel, Origin};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nntp_reader=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "news.example.com".to_string());
    let groups: Vec<String> = args.collect();

    let client = NewsClient::new(EngineConfig::default());
    let mut model = NewsModel::from_client(&client);
    let alias = model.register_server(Origin::tls(host).with_alias("home"));

    for group in &groups {
        match model.subscribe(&alias, group).await {
            Ok(true) => println!("subscribed to {}", group),
            Ok(false) => println!("already subscribed to {}", group),
            Err(e) => eprintln!("{}: {}", group, e),
        }
    }

    // First pull shows the last ten of each group, later pulls only new ones
    let mut slice = Some(-10);
    for _ in 0..3 {
        for article in model.pull(slice).await? {
            println!(
                "{:<20} {:>8}  {}",
                article.group.name,
                article.number.unwrap_or_default(),
                article.subject
            );
        }
        slice = None;
        tokio::time::sleep(Duration::from_secs(60)).await;
    }

    client.stop().await;
    Ok(())
}
