//! One synchronous and one streamed query.
//!
//! Run with: PPLX_API_KEY=... cargo run --example query
//! (a `.env` file in the working directory is honoured)

use perplexity_client::{chunk_text, Client};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;

    println!("Regular query response:");
    let response = client
        .query("How many stars are there in our galaxy?")
        .system("Be precise and concise.")
        .send()
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    println!("\nStreaming response:");
    let mut stream = client
        .stream_query("What is the distance to the moon?")
        .send()
        .await?;

    // Print only the assistant's delta text
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(text) = chunk_text(&chunk) {
            print!("{text}");
        }
    }
    println!();

    Ok(())
}
