use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    racha_cli::main_entry().await
}
