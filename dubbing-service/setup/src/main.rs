use anyhow::Result;
use dubbing_configuration::{load_config, setup_logging};
use dubbing_setup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    setup_logging(&config.logging);
    let app = Application::new(config).await?;
    app.run().await?;
    Ok(())
}
