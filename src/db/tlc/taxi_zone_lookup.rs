use log::{error, info};

use crate::db::tlc::lib_tlc::{DownloadOutcome, TLC_BASE_URL};
use crate::utils::lib_dbfs::LandingTree;
use crate::utils::lib_fetch::{FetchError, RemoteFetch};

/// The taxi zone lookup table, a small CSV mapping `LocationID` to borough and zone.
#[derive(Clone, Debug)]
pub struct TaxiZoneLookupArchive {
    pub url: String,
    pub file_name: String,
}

impl Default for TaxiZoneLookupArchive {
    fn default() -> Self {
        TaxiZoneLookupArchive {
            url: format!("{}/misc/taxi_zone_lookup.csv", TLC_BASE_URL),
            file_name: "taxi_zone_lookup.csv".to_string(),
        }
    }
}

impl TaxiZoneLookupArchive {
    pub fn filename(&self) -> &str {
        &self.file_name
    }

    /// Download the file if it's not in the tree yet.  The payload is small so
    /// it is read in memory and written in one go, no staging file.
    ///
    /// A non-200 status is logged and leaves the destination unwritten.
    /// Network and decoding errors are returned to the caller.
    pub async fn download_file(
        &self,
        fetch: &dyn RemoteFetch,
        tree: &dyn LandingTree,
    ) -> Result<DownloadOutcome, FetchError> {
        let name = self.filename();
        if tree
            .probe(name)
            .await
            .treat_indeterminate_as_absent()
            .is_present()
        {
            info!("{} already exists in {}, skipping...", name, tree.uri(name));
            return Ok(DownloadOutcome::Skipped);
        }

        info!("Downloading {}...", name);
        let resp = fetch.get(&self.url).await?;
        if !resp.is_success() {
            error!("Failed to download {}. HTTP status {}", name, resp.status);
            return Ok(DownloadOutcome::HttpStatus(resp.status));
        }
        let content = resp.text().await?;
        match tree.put_text(name, &content).await {
            Ok(()) => {
                info!("Saved {} to {}", name, tree.uri(name));
                Ok(DownloadOutcome::Saved)
            }
            Err(e) => {
                error!("Failed to save {} to {}: {}", name, tree.uri(name), e);
                Ok(DownloadOutcome::Failed(e.to_string()))
            }
        }
    }
}
