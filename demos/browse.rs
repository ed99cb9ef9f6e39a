//! Browse a newsgroup: list the latest overviews and print one article
//!
//! ```text
//! RUST_LOG=nntp_reader=info cargo run --example browse -- news.example.com comp.lang.rust
//! ```
//!
//! Credentials are read from NNTP_USER / NNTP_PASS when set.

use nntp_reader::{EngineConfig, Group, NewsClient, Origin, Range, collate_attachments};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nntp_reader=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "news.example.com".to_string());
    let name = args.next().unwrap_or_else(|| "comp.lang.rust".to_string());

    let mut origin = Origin::tls(host);
    if let (Ok(user), Ok(pass)) = (std::env::var("NNTP_USER"), std::env::var("NNTP_PASS")) {
        origin = origin.with_credentials(user, pass);
    }

    let client = NewsClient::new(EngineConfig::default());
    let group = Group::new(origin.clone(), name);

    let latest = client.overview(&group, &Range::latest(20)).await;
    if let Some(err) = &latest.err {
        eprintln!("overview failed: {}", err);
    }
    for o in &latest.value {
        println!(
            "{:>8}  {:<24.24}  {}",
            o.number.unwrap_or_default(),
            o.from.display_name(),
            o.subject
        );
    }

    if let Some(newest) = latest.value.last() {
        let article = client.article(&origin, &group, &newest.id).await;
        match article.value {
            Some(article) => {
                println!("\n{}\n", article.subject);
                println!("{}", article.body);
                if let Some(sig) = &article.ext.sig {
                    println!("[signature]\n{}", sig);
                }
                let attachments: Vec<_> = article
                    .ext
                    .img
                    .iter()
                    .chain(&article.ext.attach)
                    .cloned()
                    .collect();
                for a in collate_attachments(&attachments) {
                    println!("[attachment] {} ({} bytes) {}", a.name, a.length, a.reason);
                }
            }
            None => eprintln!("article unavailable: {:?}", article.err),
        }
    }

    client.stop().await;
}
