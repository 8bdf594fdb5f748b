use anyhow::Context;
use chatrelay::{normalize_endpoint, ApiClient, ChatMessage, ChatRequest, ClientConfig, LlmProvider};
use chrono::Local;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join(format!("chatrelay-{}.log", ts)))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("chatrelay", log::LevelFilter::Info)
        .init();

    if dotenv::dotenv().is_err() {
        log::warn!("no .env file found, reading process environment only");
    }

    let config = ClientConfig::from_env()?;
    let client = ApiClient::new(&config)?;

    let api_url = ClientConfig::require_env("LLM_API_URL")?;
    let api_key = ClientConfig::require_env("LLM_API_KEY")?;

    let models = client
        .test_connection(&api_url, &api_key)
        .await
        .context("connection test failed")?;
    println!("{}", serde_json::to_string_pretty(&models)?);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if let (Ok(model), false) = (std::env::var("LLM_MODEL"), prompt.trim().is_empty()) {
        let req = ChatRequest::new(
            normalize_endpoint(&api_url),
            api_key,
            model,
            vec![ChatMessage::user(prompt)],
        );
        let resp = client.chat(req).await.context("chat request failed")?;
        println!("{}", resp.text);
    }

    Ok(())
}
