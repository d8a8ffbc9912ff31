use std::fs::{self, File};
use std::io::{self, Read};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::Builder;
use tracing::info;

use crate::config::FeedSpec;
use crate::error::XrefError;

pub trait FeedFetcher: Send + Sync {
    /// Makes `spec` available as a local file and returns its path.
    fn fetch(&self, spec: &FeedSpec) -> Result<Utf8PathBuf, XrefError>;
}

#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    data_dir: Utf8PathBuf,
}

impl HttpFeedFetcher {
    pub fn new(data_dir: impl Into<Utf8PathBuf>) -> Result<Self, XrefError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rnac-xref/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| XrefError::FeedHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| XrefError::FeedHttp(err.to_string()))?;
        Ok(Self {
            client,
            data_dir: data_dir.into(),
        })
    }

    /// `data/20190301_refseq_mapping.gz` for a download made on 2019-03-01.
    pub fn local_path(data_dir: &Utf8Path, spec: &FeedSpec) -> Utf8PathBuf {
        let stamp = Local::now().format("%Y%m%d");
        data_dir.join(format!("{stamp}_{}.gz", spec.feed.file_stem()))
    }

    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), XrefError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| XrefError::FeedHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "feed request failed".to_string());
            return Err(XrefError::FeedStatus { status, message });
        }

        let parent = destination
            .parent()
            .ok_or_else(|| XrefError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("rnac-xref-feed")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;

        write_gzipped(&mut response, url.ends_with(".gz"), temp.as_file()).map_err(|err| {
            XrefError::FeedRead {
                feed: url.to_string(),
                message: err.to_string(),
            }
        })?;

        temp.persist(destination.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Copies `body` into `file` chunk by chunk, gzip-compressing it unless it is
/// already compressed.
fn write_gzipped(body: &mut impl Read, already_gzipped: bool, mut file: &File) -> io::Result<u64> {
    if already_gzipped {
        return io::copy(body, &mut file);
    }
    let mut encoder = GzEncoder::new(file, Compression::default());
    let copied = io::copy(body, &mut encoder)?;
    encoder.finish()?;
    Ok(copied)
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, spec: &FeedSpec) -> Result<Utf8PathBuf, XrefError> {
        if !spec.is_remote() {
            return Ok(Utf8PathBuf::from(spec.location.as_str()));
        }
        let destination = Self::local_path(&self.data_dir, spec);
        if destination.as_std_path().exists() {
            info!("   reusing {destination}");
            return Ok(destination);
        }
        info!("   downloading {} -> {destination}", spec.location);
        self.download(&spec.location, &destination)?;
        Ok(destination)
    }
}

/// Fetches every feed once and returns the specs rewritten to local paths.
pub fn materialize_feeds<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    feeds: &[FeedSpec],
) -> Result<Vec<FeedSpec>, XrefError> {
    feeds
        .iter()
        .map(|spec| {
            let path = fetcher.fetch(spec)?;
            Ok(FeedSpec {
                location: path.into_string(),
                ..spec.clone()
            })
        })
        .collect()
}
