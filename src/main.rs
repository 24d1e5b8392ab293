//! pb-sdk - Pebble SDK shell
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pbsdk_app::emulator::{self, EmulatorContext, Overrides, StartOptions};
use pbsdk_core::prelude::*;
use pbsdk_core::Platform;

/// pb-sdk - Build and run shell for the Pebble SDK
#[derive(Parser, Debug)]
#[command(name = "pb-sdk", version)]
#[command(about = "Build and run shell for the Pebble SDK", long_about = None)]
struct Args {
    /// Echo debug logs to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Pebble SDK root (overrides the config file and PEBBLE_SDK_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    sdk: Option<PathBuf>,

    /// Installed SDK version (overrides the config file and <sdk>/Pebble/VERSION)
    #[arg(long, global = true, value_name = "VERSION")]
    sdk_version: Option<String>,

    /// Project directory holding .pebble-sdk/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the Pebble emulator and phone simulator
    #[command(subcommand)]
    Emu(EmuCommand),
}

#[derive(Subcommand, Debug)]
enum EmuCommand {
    /// Start the emulator, or reuse the one already running
    Start {
        /// Platform to emulate; when omitted a running emulator is reused as is
        #[arg(long)]
        platform: Option<Platform>,

        /// Show emulator and phone simulator output
        #[arg(long)]
        debug_emulator: bool,

        /// Verbose phone simulator output
        #[arg(long)]
        debug_phonesim: bool,

        /// Pebble account token handed to the phone simulator
        #[arg(long, value_name = "TOKEN")]
        oauth_token: Option<String>,
    },

    /// Kill the emulator and phone simulator
    Kill,

    /// Show whether the emulator is running, and which platform
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete persisted emulator flash
    Wipe {
        /// Only wipe this platform (default: all)
        #[arg(long)]
        platform: Option<Platform>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    pbsdk_core::logging::init(args.debug)?;

    let project_path = args
        .project
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    info!("Project path: {}", project_path.display());

    let result = run(args, &project_path).await;
    if let Err(ref e) = result {
        error!("pb-sdk failed: {:?}", e);
    }

    info!("pb-sdk exiting");
    Ok(result?)
}

async fn run(args: Args, project_path: &Path) -> Result<()> {
    let overrides = Overrides {
        sdk: args.sdk,
        sdk_version: args.sdk_version,
    };
    let context = EmulatorContext::resolve(project_path, &overrides)
        .context("Failed to resolve the Pebble SDK")?;

    match args.command {
        Command::Emu(EmuCommand::Start {
            platform,
            debug_emulator,
            debug_phonesim,
            oauth_token,
        }) => {
            let options = StartOptions {
                platform,
                debug_emulator,
                debug_phonesim,
                oauth_token,
            };
            let report = emulator::start(&context.supervisor(&options)).await?;
            println!("{}", report.summary());
        }
        Command::Emu(EmuCommand::Kill) => {
            emulator::kill(&context.supervisor(&StartOptions::default()))?;
        }
        Command::Emu(EmuCommand::Status { json }) => {
            let status = emulator::status(&context.supervisor(&StartOptions::default()))?;
            if json {
                let rendered = serde_json::to_string_pretty(&status)
                    .map_err(|e| Error::config(format!("Failed to render status: {}", e)))?;
                println!("{}", rendered);
            } else {
                println!("{}", emulator::format_status(&status));
            }
        }
        Command::Emu(EmuCommand::Wipe { platform }) => {
            let removed = emulator::wipe(&context.supervisor(&StartOptions::default()), platform)?;
            if removed.is_empty() {
                println!("Nothing to wipe");
            }
            for path in removed {
                println!("Wiped {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_start_with_options() {
        let args = Args::try_parse_from([
            "pb-sdk",
            "--debug",
            "emu",
            "start",
            "--platform",
            "aplite",
            "--oauth-token",
            "abc",
        ])
        .unwrap();

        assert!(args.debug);
        match args.command {
            Command::Emu(EmuCommand::Start {
                platform,
                oauth_token,
                debug_emulator,
                ..
            }) => {
                assert_eq!(platform, Some(Platform::Aplite));
                assert_eq!(oauth_token.as_deref(), Some("abc"));
                assert!(!debug_emulator);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args =
            Args::try_parse_from(["pb-sdk", "emu", "status", "--json", "--sdk", "/opt/sdk"])
                .unwrap();

        assert_eq!(args.sdk, Some(PathBuf::from("/opt/sdk")));
        assert!(matches!(
            args.command,
            Command::Emu(EmuCommand::Status { json: true })
        ));
    }

    #[test]
    fn test_rejects_unknown_platform() {
        let result = Args::try_parse_from(["pb-sdk", "emu", "wipe", "--platform", "chalk"]);
        assert!(result.is_err());
    }
}
