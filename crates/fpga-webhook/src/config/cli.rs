use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::serve::ServeArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pod mutating admission webhook
    Serve(Box<ServeArgs>),
}
