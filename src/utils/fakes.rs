//! In-memory stand-ins for the network, the destination tree and the pacer.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::utils::lib_dbfs::{LandingError, LandingTree, Presence};
use crate::utils::lib_fetch::{FetchError, FetchResponse, RemoteFetch};
use crate::utils::pacing::Pacer;

#[derive(Default)]
pub struct FakeFetch {
    responses: HashMap<String, (u16, Vec<u8>)>,
    broken: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), (status, body.to_vec()));
        self
    }

    /// The url fails at the connection level.
    pub fn broken(mut self, url: &str) -> Self {
        self.broken.push(url.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteFetch for FakeFetch {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.broken.iter().any(|u| u == url) {
            return Err(FetchError::Body(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let (status, body) = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or((404, b"Not Found".to_vec()));
        // hand the body out in small pieces, like a real socket would
        let chunks: Vec<Result<Bytes, io::Error>> = body
            .chunks(5)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(FetchResponse::new(status, stream::iter(chunks).boxed()))
    }
}

#[derive(Default)]
pub struct MemoryTree {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub writes: Mutex<Vec<String>>,
    pub fail_copy: bool,
    pub indeterminate: bool,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_copy() -> Self {
        MemoryTree {
            fail_copy: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        MemoryTree {
            indeterminate: true,
            ..Default::default()
        }
    }

    pub fn insert(&self, name: &str, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), contents.to_vec());
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl LandingTree for MemoryTree {
    async fn probe(&self, name: &str) -> Presence {
        if self.indeterminate {
            return Presence::Indeterminate("tree unreachable".to_string());
        }
        if self.files.lock().unwrap().contains_key(name) {
            Presence::Present
        } else {
            Presence::Absent
        }
    }

    async fn put_text(&self, name: &str, contents: &str) -> Result<(), LandingError> {
        self.writes.lock().unwrap().push(name.to_string());
        self.insert(name, contents.as_bytes());
        Ok(())
    }

    async fn copy_from_local(&self, local: &Path, name: &str) -> Result<(), LandingError> {
        self.writes.lock().unwrap().push(name.to_string());
        if self.fail_copy {
            return Err(LandingError::Api {
                status: 503,
                message: "TEMPORARILY_UNAVAILABLE".to_string(),
            });
        }
        let contents = tokio::fs::read(local).await?;
        self.insert(name, &contents);
        Ok(())
    }

    fn uri(&self, name: &str) -> String {
        format!("mem:/raw_data_files/{}", name)
    }
}

#[derive(Default)]
pub struct RecordingPacer {
    pub pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn count(&self) -> usize {
        self.pauses.lock().unwrap().len()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}
