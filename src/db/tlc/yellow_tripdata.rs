use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::db::tlc::lib_tlc::{BatchReport, DownloadOutcome, TLC_BASE_URL};
use crate::interval::month::{month, Month};
use crate::utils::lib_dbfs::{LandingError, LandingTree};
use crate::utils::lib_fetch::{read_block, FetchError, FetchResponse, RemoteFetch, CHUNK_SIZE};
use crate::utils::pacing::{describe, Clock, Pacer};

/// Name of the scratch directory created next to the working directory.
pub const STAGING_DIR_NAME: &str = ".tmp_downloads";

/// Monthly yellow taxi trip records, one parquet file per month.
#[derive(Clone, Debug)]
pub struct YellowTripdataArchive {
    pub base_url: String,
    /// First month to download.
    pub start: Month,
    /// Wait after every month, to go easy on the server.
    pub pause: Duration,
    /// Local scratch space.  Defaults to `.tmp_downloads` in the current directory.
    pub staging_dir: Option<PathBuf>,
}

impl Default for YellowTripdataArchive {
    fn default() -> Self {
        YellowTripdataArchive {
            base_url: format!("{}/trip-data", TLC_BASE_URL),
            start: month(2025, 1),
            pause: Duration::from_secs(15 * 60),
            staging_dir: None,
        }
    }
}

impl YellowTripdataArchive {
    /// Return the parquet filename for the month, e.g. `yellow_tripdata_2025-03.parquet`
    pub fn filename(&self, month: &Month) -> String {
        format!("yellow_tripdata_{}-{:02}.parquet", month.year(), month.month())
    }

    pub fn url(&self, month: &Month) -> String {
        format!("{}/{}", self.base_url, self.filename(month))
    }

    pub fn staging_dir(&self) -> io::Result<PathBuf> {
        match &self.staging_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()?.join(STAGING_DIR_NAME)),
        }
    }

    /// Download the file for one month if it's not in the tree yet.
    ///
    /// The body is streamed into a temporary file in the staging directory,
    /// then copied into the tree.  Staging and copy failures are logged and
    /// reported in the outcome, the temporary file is removed in all cases.
    /// Network errors are returned to the caller.
    pub async fn download_month(
        &self,
        month: Month,
        fetch: &dyn RemoteFetch,
        tree: &dyn LandingTree,
    ) -> Result<DownloadOutcome, FetchError> {
        let name = self.filename(&month);
        if tree
            .probe(&name)
            .await
            .treat_indeterminate_as_absent()
            .is_present()
        {
            info!("{} already exists in {}, skipping...", name, tree.uri(&name));
            return Ok(DownloadOutcome::Skipped);
        }

        let dir = match self.prepare_staging_dir().await {
            Ok(dir) => dir,
            Err(e) => {
                error!("Could not create a temporary directory for {}: {}", name, e);
                return Ok(DownloadOutcome::Failed(e.to_string()));
            }
        };

        info!("Downloading {}...", name);
        let resp = match fetch.get(&self.url(&month)).await {
            Ok(resp) => resp,
            Err(e) => {
                remove_dir_if_empty(&dir).await;
                return Err(e);
            }
        };
        if !resp.is_success() {
            error!("Failed to download {}. HTTP status {}", name, resp.status);
            remove_dir_if_empty(&dir).await;
            return Ok(DownloadOutcome::HttpStatus(resp.status));
        }

        let outcome = match stage_and_commit(resp, &dir, &name, tree).await {
            Ok(()) => {
                info!("Saved {} to {}", name, tree.uri(&name));
                DownloadOutcome::Saved
            }
            Err(e) => {
                error!("Failed to save file {} to {}: {}", name, tree.uri(&name), e);
                DownloadOutcome::Failed(e.to_string())
            }
        };
        remove_dir_if_empty(&dir).await;
        Ok(outcome)
    }

    /// Walk the months from `start` up to and including the current month and
    /// download the missing ones.  The current month is read once, before the
    /// first download.
    ///
    /// The loop pauses after every month, including months that were skipped
    /// and the last one.
    pub async fn download_missing_months(
        &self,
        fetch: &dyn RemoteFetch,
        tree: &dyn LandingTree,
        clock: &dyn Clock,
        pacer: &dyn Pacer,
    ) -> Result<BatchReport, FetchError> {
        let last = Month::containing(clock.today());
        let mut report = BatchReport::default();
        let mut current = self.start;
        while current <= last {
            let outcome = self.download_month(current, fetch, tree).await?;
            report.push(current, outcome);
            current = current.next();

            info!("Waiting {} before next download...", describe(self.pause));
            pacer.pause(self.pause).await;
        }
        Ok(report)
    }

    async fn prepare_staging_dir(&self) -> io::Result<PathBuf> {
        let dir = self.staging_dir()?;
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

/// Stream the response into a fresh temporary file, commit it to the tree,
/// then remove the temporary file whatever happened.
async fn stage_and_commit(
    resp: FetchResponse,
    dir: &Path,
    name: &str,
    tree: &dyn LandingTree,
) -> Result<(), LandingError> {
    let (file, path) = tempfile::Builder::new()
        .prefix(".yellow_tripdata_")
        .suffix(".parquet")
        .tempfile_in(dir)?
        .into_parts();

    let res = match stage(resp, file).await {
        Ok(n) => {
            debug!("staged {} bytes for {} in {}", n, name, path.display());
            tree.copy_from_local(&path, name).await
        }
        Err(e) => Err(e.into()),
    };
    remove_staged(path);
    res
}

/// Write the body to the temp file in full 1 MiB blocks, the last one may be short.
async fn stage(resp: FetchResponse, file: File) -> io::Result<u64> {
    let mut out = fs::File::from_std(file);
    let mut reader = resp.into_reader();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = read_block(&mut reader, &mut buf).await?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    out.flush().await?;
    Ok(total)
}

fn remove_staged(path: TempPath) {
    let display = path.display().to_string();
    if let Err(e) = path.close() {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("failed to remove temporary file {}: {}", display, e);
        }
    }
}

async fn remove_dir_if_empty(dir: &Path) {
    let empty = match fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => false,
    };
    if empty {
        let _ = fs::remove_dir(dir).await;
    }
}
