use clap::Parser;
use smoother::{Cli, app};
use std::panic;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Debug)
    } else {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("smoother"), my_code_level)
        .parse_default_env()
        .init();

    let args = Cli::parse();
    app::run(args).await
}
