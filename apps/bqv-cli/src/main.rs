#[macro_use]
mod cli;
pub mod framework;
pub mod infrastructure;
pub mod project;
pub mod utilities;

use std::process::ExitCode;

use clap::Parser;
use cli::display::{Message, MessageType};

// Entry point for the CLI application
fn main() -> ExitCode {
    let cli_result = cli::Cli::parse();

    if let Err(e) = cli::settings::setup_user_directory() {
        show_message!(
            MessageType::Error,
            Message {
                action: "Init".to_string(),
                details: format!("Failed to initialize ~/.bqv, please check your permissions: {e:?}"),
            }
        );
        return ExitCode::from(1);
    }

    if let Err(e) = cli::settings::init_config_file() {
        show_message!(
            MessageType::Error,
            Message {
                action: "Init".to_string(),
                details: format!("Failed to write the default config file: {e:?}"),
            }
        );
        return ExitCode::from(1);
    }

    let settings = match cli::settings::read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            show_message!(
                MessageType::Error,
                Message {
                    action: "Config".to_string(),
                    details: format!("Failed to read settings: {e}"),
                }
            );
            return ExitCode::from(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e:?}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(async {
        cli::logger::setup_logging(&settings.logger, cli_result.verbose);
        cli::top_command_handler(settings, &cli_result).await
    });

    match result {
        Ok(s) => {
            if !s.is_silent() {
                s.show();
            }
            ExitCode::from(0)
        }
        Err(e) => {
            show_message!(e.message_type, e.message);
            if let Some(err) = e.error {
                eprintln!("{err:?}");
            }
            ExitCode::from(1)
        }
    }
}
