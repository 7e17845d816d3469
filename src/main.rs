use std::process::ExitCode;

use clap::Parser;

use income_monitor::api::{self, Cli};
use income_monitor::common::log;
use income_monitor::AppCfg;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("income-monitor: {err}");
            return ExitCode::from(err.code as u8);
        }
    };
    log::init(&cfg.log_level, cfg.log_json);

    match api::run(cli, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code.as_str(), error = %err.msg, "command failed");
            ExitCode::from(err.code as u8)
        }
    }
}
