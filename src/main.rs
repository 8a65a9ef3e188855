//! HostGuard - Main Entry Point

mod cli;

use clap::Parser;

use cli::Cli;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    log::info!("Starting {} v{}", hostguard::constants::APP_NAME, hostguard::constants::APP_VERSION);

    if let Err(e) = cli::run_command(cli) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
