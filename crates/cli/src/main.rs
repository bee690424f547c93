use clap::Parser;

use ags_cli::cli::{self, Cli, Command, ConfigCommand};
use ags_cli::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Stream(args) => {
            let (config, _config_path) = cli::load_config(cli.config.as_deref())?;
            init_tracing(&config.logging);
            let ok = cli::stream::run(config, args).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config(cli.config.as_deref())?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _config_path) = cli::load_config(cli.config.as_deref())?;
            cli::config::show(&config)
        }
        Command::Version => {
            println!("agstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
