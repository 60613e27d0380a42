//! Examples for using the Facegate Server API
//!
//! ```text
//! cargo run -p facegate-server --example api_client -- face.jpg [clip.webm]
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let image_path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: api_client <image> [video]"))?;
    let video_path = args.next();

    let server = std::env::var("FACEGATE_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let api_key = std::env::var("FACEGATE_API_KEY").ok();
    let client = Client::new();
    let authed = |builder: RequestBuilder| match &api_key {
        Some(key) => builder.header("X-API-Key", key),
        None => builder,
    };

    // Example 1: Health check
    println!("1. Health Check:");
    let resp = client.get(format!("{server}/health")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 2: Embed a face
    println!("2. Face Embedding:");
    let image = format!("data:image/jpeg;base64,{}", STANDARD.encode(std::fs::read(&image_path)?));
    let resp = authed(client.post(format!("{server}/face/embedding")))
        .json(&json!({ "image": image }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    println!("Model: {}, dimensions: {}", body["model"], body["dimensions"]);
    println!();

    // Example 3: Verify the same image against its own embedding
    println!("3. Face Verification:");
    let resp = authed(client.post(format!("{server}/face/verify")))
        .json(&json!({
            "image": image,
            "saved_embeddings": { "enrolled": body["embedding"] }
        }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 4: Count blinks
    if let Some(path) = video_path {
        println!("4. Blink Count:");
        let part = Part::bytes(std::fs::read(&path)?).file_name(path.clone());
        let resp = authed(client.post(format!("{server}/blink/count")))
            .multipart(Form::new().part("video", part))
            .send()
            .await?;
        println!("Status: {}", resp.status());
        println!("Body: {}", resp.text().await?);
        println!();
    }

    // Example 5: Readiness
    println!("5. Readiness:");
    let resp = client.get(format!("{server}/ready")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}
