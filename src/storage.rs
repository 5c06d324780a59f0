//! Object stores for converted CSV files.
//!
//! [`GcsStore`] speaks the Cloud Storage JSON API resumable protocol: one
//! session per object, then fixed-size `PUT` chunks until the service answers
//! `200`/`201`. A failed chunk aborts the object; sessions are not resumed
//! across runs.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::redirect::Policy;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::{LoaderConfig, normalize_chunk_size};
use crate::error::LoaderError;

pub const GCS_UPLOAD_BASE_URL: &str = "https://storage.googleapis.com/upload/storage/v1";
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const UPLOAD_CONTENT_TYPE: &str = "text/csv";

pub trait ObjectStore {
    /// Uploads `source` as `object_name` and returns the number of bytes stored.
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError> {
        (**self).put_file(object_name, source)
    }
}

/// Writes objects below a root directory, one file per object name.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn object_path(&self, object_name: &str) -> PathBuf {
        object_name
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ObjectStore for LocalStore {
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError> {
        let target = self.object_path(object_name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = fs::copy(source, &target)?;
        info!(object = object_name, path = %target.display(), bytes, "stored object locally");
        Ok(bytes)
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Returns the configured token, or asks the instance metadata server.
pub fn resolve_access_token(client: &Client, config: &LoaderConfig) -> Result<String, LoaderError> {
    if let Some(token) = &config.access_token {
        return Ok(token.clone());
    }

    let response = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()?;
    if !response.status().is_success() {
        return Err(LoaderError::Config(format!(
            "GCS_ACCESS_TOKEN is unset and the metadata server refused a token: status {}",
            response.status()
        )));
    }
    let token = response.json::<MetadataToken>()?;
    Ok(token.access_token)
}

/// What the chunk loop needs from a `308`/final response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResponse {
    pub status: u16,
    /// `Range` header of a `308`, if any.
    pub range: Option<String>,
}

/// The two requests of a resumable upload.
pub trait UploadTransport {
    /// Opens a session and returns its URL from the `Location` header.
    fn start_session(&self, url: &str, access_token: &str, total: u64) -> Result<String, LoaderError>;

    fn send_chunk(&self, session: &str, content_range: &str, body: Vec<u8>) -> Result<ChunkResponse, LoaderError>;
}

impl<T: UploadTransport + ?Sized> UploadTransport for &T {
    fn start_session(&self, url: &str, access_token: &str, total: u64) -> Result<String, LoaderError> {
        (**self).start_session(url, access_token, total)
    }

    fn send_chunk(&self, session: &str, content_range: &str, body: Vec<u8>) -> Result<ChunkResponse, LoaderError> {
        (**self).send_chunk(session, content_range, body)
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl UploadTransport for ReqwestTransport {
    fn start_session(&self, url: &str, access_token: &str, total: u64) -> Result<String, LoaderError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", UPLOAD_CONTENT_TYPE)
            .header("X-Upload-Content-Length", total.to_string())
            .header(CONTENT_LENGTH, "0")
            .send()?;
        if !response.status().is_success() {
            return Err(LoaderError::Upload(format!(
                "failed to start upload session: status {}",
                response.status()
            )));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| LoaderError::Upload("upload session has no Location header".to_string()))
    }

    fn send_chunk(&self, session: &str, content_range: &str, body: Vec<u8>) -> Result<ChunkResponse, LoaderError> {
        let response = self
            .client
            .put(session)
            .header(CONTENT_RANGE, content_range)
            .body(body)
            .send()?;
        Ok(ChunkResponse {
            status: response.status().as_u16(),
            range: response
                .headers()
                .get(RANGE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        })
    }
}

pub struct GcsStore<T = ReqwestTransport> {
    transport: T,
    bucket: String,
    upload_base_url: String,
    access_token: String,
    chunk_size: usize,
}

impl GcsStore<ReqwestTransport> {
    /// A resumable `308` must reach the chunk loop, so redirects stay off.
    pub fn build_client(timeout: Duration) -> Result<Client, LoaderError> {
        Ok(Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?)
    }

    pub fn new(client: Client, config: &LoaderConfig) -> Result<Self, LoaderError> {
        let access_token = resolve_access_token(&client, config)?;
        Ok(Self::with_transport(ReqwestTransport::new(client), config, access_token))
    }
}

impl<T: UploadTransport> GcsStore<T> {
    pub fn with_transport(transport: T, config: &LoaderConfig, access_token: impl Into<String>) -> Self {
        Self {
            transport,
            bucket: config.bucket.clone(),
            upload_base_url: GCS_UPLOAD_BASE_URL.to_string(),
            access_token: access_token.into(),
            chunk_size: normalize_chunk_size(config.chunk_size),
        }
    }

    #[must_use]
    pub fn with_upload_base_url(mut self, upload_base_url: impl Into<String>) -> Self {
        self.upload_base_url = upload_base_url.into();
        self
    }

    #[must_use]
    pub fn session_url(&self, object_name: &str) -> String {
        session_url(&self.upload_base_url, &self.bucket, object_name)
    }
}

impl<T: UploadTransport> ObjectStore for GcsStore<T> {
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError> {
        let total = fs::metadata(source)?.len();
        let session = self
            .transport
            .start_session(&self.session_url(object_name), &self.access_token, total)
            .map_err(|err| LoaderError::Upload(format!("'{object_name}': {}", err.message())))?;
        debug!(object = object_name, total, "upload session started");

        if total == 0 {
            let response = self.transport.send_chunk(&session, "bytes */0", Vec::new())?;
            return finish_status(object_name, response.status, 0);
        }

        let mut file = File::open(source)?;
        let mut offset = 0_u64;
        loop {
            file.seek(SeekFrom::Start(offset))?;
            let mut chunk = Vec::with_capacity(self.chunk_size);
            (&mut file).take(self.chunk_size as u64).read_to_end(&mut chunk)?;
            if chunk.is_empty() {
                return Err(LoaderError::Upload(format!(
                    "'{}' shrank to {offset} byte(s) during upload",
                    source.display()
                )));
            }
            let end = offset + chunk.len() as u64 - 1;

            let response = match self
                .transport
                .send_chunk(&session, &content_range(offset, end, total), chunk)
            {
                Ok(response) => response,
                Err(err) => {
                    error!(object = object_name, offset, error = %err, "chunk upload failed");
                    return Err(err);
                }
            };

            if response.status != 308 {
                return finish_status(object_name, response.status, total);
            }

            let persisted = next_offset(response.range.as_deref());
            if persisted <= offset {
                error!(object = object_name, offset, "upload made no progress");
                return Err(LoaderError::Upload(format!(
                    "upload of '{object_name}' stalled at byte {offset}"
                )));
            }
            debug!(object = object_name, persisted, total, "chunk accepted");
            offset = persisted;
        }
    }
}

fn finish_status(object_name: &str, status: u16, total: u64) -> Result<u64, LoaderError> {
    if status == 200 || status == 201 {
        info!(object = object_name, bytes = total, "upload complete");
        return Ok(total);
    }

    error!(object = object_name, %status, "upload rejected");
    Err(LoaderError::Upload(format!(
        "upload of '{object_name}' failed: status {status}"
    )))
}

#[must_use]
pub fn session_url(upload_base_url: &str, bucket: &str, object_name: &str) -> String {
    format!(
        "{}/b/{}/o?uploadType=resumable&name={}",
        upload_base_url.trim_end_matches('/'),
        urlencoding::encode(bucket),
        urlencoding::encode(object_name)
    )
}

#[must_use]
pub fn content_range(start: u64, end: u64, total: u64) -> String {
    format!("bytes {start}-{end}/{total}")
}

/// First byte the service has not persisted, from a `Range: bytes=0-N`
/// header on a `308` response. No header means nothing was persisted.
#[must_use]
pub fn next_offset(range_header: Option<&str>) -> u64 {
    range_header
        .and_then(|value| value.trim().strip_prefix("bytes="))
        .and_then(|range| range.split_once('-'))
        .and_then(|(_, last)| last.trim().parse::<u64>().ok())
        .map_or(0, |last| last + 1)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    use tempfile::{TempDir, tempdir};

    use super::{
        ChunkResponse, GcsStore, LocalStore, ObjectStore, UploadTransport, content_range, next_offset,
        session_url,
    };
    use crate::config::{CHUNK_GRANULARITY, LoaderConfig};
    use crate::error::LoaderError;

    const OBJECT: &str = "raw/dt=2026-10-11/zip_type=sed/file_type=sed/SED261011.csv";

    /// Answers chunks from a script and records each `Content-Range` sent.
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Result<ChunkResponse, LoaderError>>>,
        sent: RefCell<Vec<(String, usize)>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<ChunkResponse, LoaderError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                sent: RefCell::default(),
            }
        }

        fn ranges(&self) -> Vec<String> {
            self.sent.borrow().iter().map(|(range, _)| range.clone()).collect()
        }
    }

    impl UploadTransport for ScriptedTransport {
        fn start_session(&self, url: &str, access_token: &str, _total: u64) -> Result<String, LoaderError> {
            assert!(url.contains("uploadType=resumable"));
            assert_eq!(access_token, "token");
            Ok("https://upload.test/session/1".to_string())
        }

        fn send_chunk(&self, session: &str, content_range: &str, body: Vec<u8>) -> Result<ChunkResponse, LoaderError> {
            assert_eq!(session, "https://upload.test/session/1");
            self.sent.borrow_mut().push((content_range.to_string(), body.len()));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LoaderError::Internal("no scripted reply left".to_string())))
        }
    }

    fn resume(range: Option<&str>) -> Result<ChunkResponse, LoaderError> {
        Ok(ChunkResponse {
            status: 308,
            range: range.map(str::to_string),
        })
    }

    fn done(status: u16) -> Result<ChunkResponse, LoaderError> {
        Ok(ChunkResponse { status, range: None })
    }

    fn source_file(len: usize) -> (TempDir, PathBuf) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("SED261011.csv");
        std::fs::write(&path, vec![b'x'; len]).expect("write source");
        (dir, path)
    }

    fn store(transport: &ScriptedTransport) -> GcsStore<&ScriptedTransport> {
        let config = LoaderConfig {
            chunk_size: CHUNK_GRANULARITY,
            ..LoaderConfig::default()
        };
        GcsStore::with_transport(transport, &config, "token")
    }

    #[test]
    fn chunks_resume_from_the_persisted_range() {
        let (_dir, source) = source_file(600_000);
        let transport = ScriptedTransport::new(vec![
            resume(Some("bytes=0-99999")),
            resume(Some("bytes=0-362143")),
            done(200),
        ]);

        let bytes = store(&transport).put_file(OBJECT, &source).expect("upload");

        assert_eq!(bytes, 600_000);
        assert_eq!(
            transport.ranges(),
            vec![
                "bytes 0-262143/600000".to_string(),
                "bytes 100000-362143/600000".to_string(),
                "bytes 362144-599999/600000".to_string(),
            ]
        );
    }

    #[test]
    fn unexpected_status_aborts_the_object() {
        let (_dir, source) = source_file(600_000);
        let transport = ScriptedTransport::new(vec![done(503), done(200)]);

        let err = store(&transport).put_file(OBJECT, &source).expect_err("rejected");

        assert!(matches!(&err, LoaderError::Upload(message) if message.contains("503")));
        assert_eq!(transport.ranges().len(), 1);
    }

    #[test]
    fn chunk_transport_error_aborts_the_object() {
        let (_dir, source) = source_file(600_000);
        let transport = ScriptedTransport::new(vec![
            resume(Some("bytes=0-262143")),
            Err(LoaderError::Network("connection reset".to_string())),
            done(200),
        ]);

        let err = store(&transport).put_file(OBJECT, &source).expect_err("aborted");

        assert!(matches!(err, LoaderError::Network(_)));
        assert_eq!(transport.ranges().len(), 2);
    }

    #[test]
    fn resume_without_progress_is_a_stall() {
        let (_dir, source) = source_file(600_000);
        let transport = ScriptedTransport::new(vec![resume(None), done(200)]);

        let err = store(&transport).put_file(OBJECT, &source).expect_err("stalled");

        assert!(matches!(&err, LoaderError::Upload(message) if message.contains("stalled at byte 0")));
        assert_eq!(transport.ranges().len(), 1);
    }

    #[test]
    fn empty_file_is_finalised_in_one_request() {
        let (_dir, source) = source_file(0);
        let transport = ScriptedTransport::new(vec![done(201)]);

        let bytes = store(&transport).put_file(OBJECT, &source).expect("upload");

        assert_eq!(bytes, 0);
        assert_eq!(transport.ranges(), vec!["bytes */0".to_string()]);
    }

    #[test]
    fn session_url_encodes_object_name() {
        let url = session_url(
            "https://storage.googleapis.com/upload/storage/v1/",
            "ca5-jrdb",
            "raw/dt=2026-10-11/zip_type=sed/file_type=sed/SED261011.csv",
        );
        assert_eq!(
            url,
            "https://storage.googleapis.com/upload/storage/v1/b/ca5-jrdb/o?uploadType=resumable&name=raw%2Fdt%3D2026-10-11%2Fzip_type%3Dsed%2Ffile_type%3Dsed%2FSED261011.csv"
        );
    }

    #[test]
    fn range_headers_drive_the_next_chunk() {
        assert_eq!(next_offset(Some("bytes=0-262143")), 262_144);
        assert_eq!(next_offset(None), 0);
        assert_eq!(next_offset(Some("garbage")), 0);
        assert_eq!(content_range(0, 9, 10), "bytes 0-9/10");
    }

    #[test]
    fn local_store_writes_partitioned_paths() {
        let source_dir = tempdir().expect("tempdir");
        let source = source_dir.path().join("SED261011.csv");
        std::fs::write(&source, "\"a\"\r\n").expect("write source");

        let root = tempdir().expect("tempdir");
        let store = LocalStore::new(root.path());
        let bytes = store
            .put_file("raw/dt=2026-10-11/zip_type=sed/file_type=sed/SED261011.csv", &source)
            .expect("store");

        let stored = root
            .path()
            .join("raw/dt=2026-10-11/zip_type=sed/file_type=sed/SED261011.csv");
        assert_eq!(bytes, 5);
        assert_eq!(std::fs::read_to_string(stored).expect("read"), "\"a\"\r\n");
    }
}
