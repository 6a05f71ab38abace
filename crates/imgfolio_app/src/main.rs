mod app;
mod cli;
mod effects;
mod ui;

use clap::Parser;
use imgfolio_logging::folio_info;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    imgfolio_logging::initialize(args.log.into(), args.log_level(), &args.log_file);
    folio_info!("imgfolio {} starting", env!("CARGO_PKG_VERSION"));
    app::run(&args)
}
