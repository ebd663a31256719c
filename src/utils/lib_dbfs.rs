use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncRead;

use crate::utils::lib_fetch::{read_block, CHUNK_SIZE};

#[derive(Error, Debug)]
pub enum LandingError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DBFS API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Result of asking the destination tree whether a name is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    /// The query itself failed, e.g. a network error or a permission problem.
    Indeterminate(String),
}

impl Presence {
    /// The existence check is a best-effort gate.  A failed query is logged
    /// and the file is fetched as if it were missing.
    pub fn treat_indeterminate_as_absent(self) -> Presence {
        match self {
            Presence::Indeterminate(reason) => {
                debug!("existence check failed ({}), treating as absent", reason);
                Presence::Absent
            }
            other => other,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// The managed destination folder files get landed into.  Names are plain
/// file names relative to the folder, e.g. `taxi_zone_lookup.csv`.
#[async_trait]
pub trait LandingTree: Send + Sync {
    async fn probe(&self, name: &str) -> Presence;

    /// Write a small text payload in one operation, replacing any existing entry.
    async fn put_text(&self, name: &str, contents: &str) -> Result<(), LandingError>;

    /// Commit a completed local file into the tree.
    async fn copy_from_local(&self, local: &Path, name: &str) -> Result<(), LandingError>;

    /// How the entry is shown in log messages.
    fn uri(&self, name: &str) -> String;
}

/// A destination folder reachable through the local filesystem, for example
/// the `/dbfs` FUSE mount on a Databricks cluster.
#[derive(Clone, Debug)]
pub struct MountedTree {
    pub root: PathBuf,
}

impl MountedTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MountedTree { root: root.into() }
    }

    fn partial_path(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{}.partial", name))
    }

    /// Rename a fully written partial file to its final name.  The partial is
    /// removed if writing or renaming failed.
    async fn commit(
        &self,
        partial: &Path,
        name: &str,
        written: io::Result<()>,
    ) -> Result<(), LandingError> {
        let res = match written {
            Ok(()) => fs::rename(partial, self.root.join(name)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            if let Err(e2) = fs::remove_file(partial).await {
                if e2.kind() != io::ErrorKind::NotFound {
                    warn!("failed to remove {}: {}", partial.display(), e2);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl LandingTree for MountedTree {
    async fn probe(&self, name: &str) -> Presence {
        match fs::try_exists(self.root.join(name)).await {
            Ok(true) => Presence::Present,
            Ok(false) => Presence::Absent,
            Err(e) => Presence::Indeterminate(e.to_string()),
        }
    }

    /// Both writes go to a hidden sibling first, then get renamed.  The final
    /// name only appears once the whole file is there.
    async fn put_text(&self, name: &str, contents: &str) -> Result<(), LandingError> {
        fs::create_dir_all(&self.root).await?;
        let partial = self.partial_path(name);
        let written = fs::write(&partial, contents).await;
        self.commit(&partial, name, written).await
    }

    async fn copy_from_local(&self, local: &Path, name: &str) -> Result<(), LandingError> {
        fs::create_dir_all(&self.root).await?;
        let partial = self.partial_path(name);
        let written = fs::copy(local, &partial).await.map(|_| ());
        self.commit(&partial, name, written).await
    }

    fn uri(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    handle: i64,
}

#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

/// A DBFS folder accessed through the Databricks REST API 2.0.
///
/// Payloads are sent base64 encoded, in blocks of at most 1 MiB, which is the
/// limit of the `add-block` endpoint.
#[derive(Clone)]
pub struct DbfsRestTree {
    /// Workspace url, e.g. `https://adb-1234567890123456.7.azuredatabricks.net`
    pub host: String,
    pub token: String,
    /// Absolute DBFS folder, e.g. `/raw_data_files`
    pub folder: String,
    client: reqwest::Client,
}

impl DbfsRestTree {
    pub fn new(host: &str, token: &str, folder: &str) -> Self {
        DbfsRestTree {
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            folder: format!("/{}", folder.trim_matches('/')),
            client: reqwest::Client::new(),
        }
    }

    fn dbfs_path(&self, name: &str) -> String {
        format!("{}/{}", self.folder.trim_end_matches('/'), name)
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/api/2.0/dbfs/{}", self.host, op)
    }

    async fn post(
        &self,
        op: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, LandingError> {
        let resp = self
            .client
            .post(self.endpoint(op))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check(resp).await
    }

    /// Stream a reader into `path` with the create/add-block/close protocol.
    ///
    /// When a block or the close fails, the handle is closed and the partially
    /// written file deleted, a truncated file would pass the existence check.
    async fn upload<R: AsyncRead + Unpin + Send>(
        &self,
        path: &str,
        mut reader: R,
    ) -> Result<(), LandingError> {
        let resp = self
            .post("create", json!({"path": path, "overwrite": true}))
            .await?;
        let handle = resp.json::<CreateResponse>().await?.handle;
        let res = match self.add_blocks(handle, &mut reader).await {
            Ok(()) => self.close(handle).await,
            Err(e) => {
                if let Err(e2) = self.close(handle).await {
                    debug!("failed to close handle {}: {}", handle, e2);
                }
                Err(e)
            }
        };
        if let Err(e) = res {
            if let Err(e2) = self.delete(path).await {
                warn!("failed to delete partial upload {}: {}", path, e2);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn add_blocks<R: AsyncRead + Unpin + Send>(
        &self,
        handle: i64,
        reader: &mut R,
    ) -> Result<(), LandingError> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = read_block(reader, &mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            let data = STANDARD.encode(&buf[..n]);
            self.post("add-block", json!({"handle": handle, "data": data}))
                .await?;
        }
    }

    async fn close(&self, handle: i64) -> Result<(), LandingError> {
        self.post("close", json!({"handle": handle})).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), LandingError> {
        self.post("delete", json!({"path": path, "recursive": false}))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LandingTree for DbfsRestTree {
    async fn probe(&self, name: &str) -> Presence {
        let resp = self
            .client
            .get(self.endpoint("get-status"))
            .bearer_auth(&self.token)
            .query(&[("path", self.dbfs_path(name))])
            .send()
            .await;
        match resp {
            Ok(r) if r.status() == StatusCode::OK => Presence::Present,
            Ok(r) if r.status() == StatusCode::NOT_FOUND => Presence::Absent,
            Ok(r) => Presence::Indeterminate(format!("get-status returned {}", r.status())),
            Err(e) => Presence::Indeterminate(e.to_string()),
        }
    }

    async fn put_text(&self, name: &str, contents: &str) -> Result<(), LandingError> {
        let path = self.dbfs_path(name);
        if contents.len() > CHUNK_SIZE {
            return self.upload(&path, contents.as_bytes()).await;
        }
        self.post(
            "put",
            json!({"path": path, "contents": STANDARD.encode(contents), "overwrite": true}),
        )
        .await?;
        Ok(())
    }

    async fn copy_from_local(&self, local: &Path, name: &str) -> Result<(), LandingError> {
        let path = self.dbfs_path(name);
        let file = fs::File::open(local).await?;
        self.upload(&path, file).await
    }

    fn uri(&self, name: &str) -> String {
        format!("dbfs:{}", self.dbfs_path(name))
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, LandingError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let err = resp.json::<ApiError>().await.unwrap_or_default();
    Err(LandingError::Api {
        status: status.as_u16(),
        message: format!("{} {}", err.error_code, err.message).trim().to_string(),
    })
}
