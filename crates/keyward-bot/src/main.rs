use clap::Parser;

use keyward_bot::commands::registration_payload;
use keyward_bot::config::Command;
use keyward_bot::{app, logging, BotConfig, Cli};

const EXIT_RUNTIME_ERROR: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.run.log_format);

    if let Some(Command::Commands) = cli.cmd {
        match serde_json::to_string_pretty(&registration_payload()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("fatal: {e}");
                std::process::exit(EXIT_RUNTIME_ERROR);
            }
        }
        return;
    }

    let config = match BotConfig::from_args(cli.run) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(e) = app::run(config).await {
        eprintln!("fatal: {e:?}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}
