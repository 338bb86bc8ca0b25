// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use lockyard::commands::exec::ExecCommand;
use lockyard::commands::status::StatusCommand;
use lockyard::config::LockyardConfig;
use lockyard::error::{LockyardError, Result, format_error_with_color, get_exit_code};
use lockyard::logging;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lockyard")]
#[command(author, version, about = "Named locks shared between processes", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to <config dir>/lockyard/lockyard.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command while holding a named lock
    #[command(long_about = "Run a command while holding a named lock

The lock is a file in the lock directory. Other lockyard processes asking for
the same name wait up to --wait seconds, then give up with exit code 75.

Examples:
  lockyard exec nightly-backup -- ./backup.sh
  lockyard exec --wait 30 deploy -- make deploy
  lockyard exec --wait infinite queue -- ./drain.sh")]
    Exec {
        /// Lock name
        name: String,

        /// Seconds to wait for the lock, or 'infinite'
        #[arg(short, long, value_name = "SECONDS")]
        wait: Option<String>,

        /// Lock directory
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Command and arguments to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Report whether a named lock is held
    Status {
        /// Lock name
        name: String,

        /// Lock directory
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<LockyardConfig> {
    match path {
        Some(path) if !path.exists() => Err(LockyardError::ConfigError(format!(
            "Config file {} does not exist",
            path.display()
        ))),
        Some(path) => LockyardConfig::load(path),
        None => match LockyardConfig::default_path() {
            Some(path) => LockyardConfig::load(&path),
            None => Ok(LockyardConfig::default()),
        },
    }
}

fn report_and_exit(error: &LockyardError) -> ! {
    let use_color = std::io::stderr().is_terminal();
    eprint!("{}", format_error_with_color(error, use_color));
    std::process::exit(get_exit_code(error));
}

fn main() {
    let cli = Cli::parse();

    logging::setup_logger(cli.verbose);

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => report_and_exit(&e),
    };

    let result: Result<i32> = (|| match cli.command {
        Commands::Exec {
            name,
            wait,
            dir,
            command,
        } => {
            let exec = ExecCommand::new(&config)?;
            exec.execute(&name, wait.as_deref(), dir, &command)
        }
        Commands::Status { name, dir, json } => {
            let status = StatusCommand::new(&config)?;
            status.execute(&name, dir, json)?;
            Ok(0)
        }
    })();

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => report_and_exit(&e),
    }
}
