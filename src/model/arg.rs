use clap::Parser;

/// VSTS integration setup service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Integration store file path (overrides integrationStorePath)
    #[arg(long)]
    pub store: Option<String>,
}
