//! hy2ctl — provision and tear down a Hysteria 2 proxy endpoint.

use clap::Parser;

use hy2ctl::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
