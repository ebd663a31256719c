use std::error::Error;

use clap::Parser;
use log::info;
use taxi_raw::{db::prod_db::ProdDb, utils::lib_fetch::HttpFetcher};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,
}

/// Land the taxi zone lookup table, if it's not there already.
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

    Ok(())
}
