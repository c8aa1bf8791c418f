use clap::Parser;
use intake_queue::cli::{self, Args};
use log::{error, info};

fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = Args::parse();
    info!("Running {:?}", args.command);

    let stdout = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut stdout.lock()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
