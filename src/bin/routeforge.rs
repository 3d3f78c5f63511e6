use clap::Parser;
use routeforge::cli::{run_cli, Cli};
use routeforge::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_config())?;
    run_cli(cli)
}
