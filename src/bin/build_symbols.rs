use std::env;
use std::process;

use stock_sentiment::registry;
use stock_sentiment::settings::settings;

fn print_usage() {
    eprintln!("Usage: build-symbols [output-path]");
    eprintln!();
    eprintln!("Fetches the exchange listing feeds, normalizes the symbols and");
    eprintln!("writes the sorted set as a CSV with a `symbol` header.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        process::exit(0);
    }

    let s = settings();
    let out_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| s.registry.output_path.clone());

    let client = reqwest::Client::new();
    if let Err(e) = registry::build(
        &client,
        &s.registry.feed_urls,
        &out_path,
        s.registry.fetch_retries,
        s.registry.fetch_timeout_secs,
    )
    .await
    {
        eprintln!("[ERROR] {e:#}");
        process::exit(1);
    }
}
