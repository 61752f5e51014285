use anyhow::Result;
use clap::Parser;
use fpga_webhook::app::ApplicationBuilder;
use fpga_webhook::config::Cli;
use fpga_webhook::config::Commands;
use fpga_webhook::config::ServeArgs;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(serve_args) => run_serve(*serve_args).await,
    }
}

async fn run_serve(serve_args: ServeArgs) -> Result<()> {
    let _guard = logging::init_from_env()?;

    tracing::info!("Starting FPGA admission webhook {}", &**version::VERSION);

    let app = ApplicationBuilder::new(serve_args).build().await?;

    app.run().await
}
