use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    exchange_cli::main_entry().await
}
