use std::error::Error;

use clap::Parser;
use log::info;
use taxi_raw::{
    db::prod_db::ProdDb,
    interval::month::Month,
    utils::{
        lib_fetch::HttpFetcher,
        pacing::{minutes, SystemClock, TokioPacer},
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// First month to download, e.g. 2025-01
    #[arg(short, long, default_value = "2025-01")]
    start: Month,

    /// Minutes to wait after each month
    #[arg(short, long, default_value_t = 15)]
    pause_minutes: u64,
}

/// Land the monthly yellow taxi trip files, from the start month up to the
/// current month.  Months already landed are skipped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    ProdDb::load_env(&args.env);

    let mut archive = ProdDb::yellow_tripdata();
    archive.start = args.start;
    archive.pause = minutes(args.pause_minutes);

    let tree = ProdDb::landing_tree()?;
    let fetch = HttpFetcher::new()?;
    let report = archive
        .download_missing_months(&fetch, tree.as_ref(), &SystemClock, &TokioPacer)
        .await?;
    info!("yellow tripdata: {}", report);

    Ok(())
}
