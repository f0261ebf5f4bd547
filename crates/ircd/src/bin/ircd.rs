use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flexi_logger::Logger;
use log::error;

use ircd::config::Config;
use ircd::server::Server;

#[derive(Parser, Debug)]
#[command(name = "ircd", version, about = "A single-process RFC 1459 IRC server")]
struct Args {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Connection password required from every client; an empty string
    /// disables the PASS check
    password: String,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level specification
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    Logger::try_with_str(&args.log)
        .and_then(|logger| logger.log_to_stderr().start())
        .ok();

    let config = match args.config.as_ref().map(Config::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            error!("{err}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = Server::new(config, args.port, args.password).run().await {
        error!("{err}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
