use std::error::Error;

use clap::Parser;
use log::info;
use taxi_raw::{
    db::prod_db::ProdDb,
    utils::{
        lib_fetch::HttpFetcher,
        pacing::{SystemClock, TokioPacer},
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,
}

/// Land all the raw files: the taxi zone lookup table first, then the monthly
/// yellow taxi trip files.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    ProdDb::load_env(&args.env);

    let tree = ProdDb::landing_tree()?;
    let fetch = HttpFetcher::new()?;

    let outcome = ProdDb::taxi_zone_lookup()
        .download_file(&fetch, tree.as_ref())
        .await?;
    info!("taxi zone lookup: {}", outcome);

    let report = ProdDb::yellow_tripdata()
        .download_missing_months(&fetch, tree.as_ref(), &SystemClock, &TokioPacer)
        .await?;
    info!("yellow tripdata: {}", report);

    Ok(())
}
