#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;

use jrdb_loader::error::LoaderError;
use jrdb_loader::http_client::{HttpClient, HttpResponse};
use jrdb_loader::models::Credentials;
use jrdb_loader::storage::ObjectStore;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const BASE_URL: &str = "http://jrdb.test/";

/// Serves canned responses by URL and records every request. Unknown URLs
/// answer `404`.
#[derive(Default)]
pub struct FakeHttp {
    responses: HashMap<String, HttpResponse>,
    requests: RefCell<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            format!("{BASE_URL}{path}"),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn with_event_index(self, keys: &[&str]) -> Self {
        let body = event_index_html(keys);
        self.with("member/datazip/Kab/index.html", 200, body)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl HttpClient for FakeHttp {
    fn get(&self, url: &str, _credentials: &Credentials) -> Result<HttpResponse, LoaderError> {
        self.requests.borrow_mut().push(url.to_string());
        Ok(self.responses.get(url).cloned().unwrap_or(HttpResponse {
            status: 404,
            body: Vec::new(),
        }))
    }
}

/// Keeps uploaded objects in memory as `(object name, contents)`.
#[derive(Default)]
pub struct RecordingStore {
    objects: RefCell<Vec<(String, String)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> Vec<(String, String)> {
        self.objects.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects().into_iter().map(|(name, _)| name).collect()
    }

    pub fn contents(&self, object_name: &str) -> Option<String> {
        self.objects()
            .into_iter()
            .find(|(name, _)| name == object_name)
            .map(|(_, contents)| contents)
    }
}

impl ObjectStore for RecordingStore {
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError> {
        let contents = std::fs::read_to_string(source)?;
        let bytes = contents.len() as u64;
        self.objects
            .borrow_mut()
            .push((object_name.to_string(), contents));
        Ok(bytes)
    }
}

pub fn event_index_html(keys: &[&str]) -> String {
    let anchors = keys
        .iter()
        .map(|key| format!(r#"<li><a href="KAB{key}.zip">KAB{key}.zip</a></li>"#))
        .collect::<String>();
    format!(
        "<html><body><ul><li><a href=\"../\">back</a></li></ul><ul>{anchors}</ul></body></html>"
    )
}

pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip member");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Rejects objects whose name contains `fail_on`; stores the rest.
pub struct FailingStore {
    fail_on: String,
    inner: RecordingStore,
}

impl FailingStore {
    pub fn new(fail_on: &str) -> Self {
        Self {
            fail_on: fail_on.to_string(),
            inner: RecordingStore::new(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

impl ObjectStore for FailingStore {
    fn put_file(&self, object_name: &str, source: &Path) -> Result<u64, LoaderError> {
        if object_name.contains(&self.fail_on) {
            return Err(LoaderError::Upload(format!(
                "upload of '{object_name}' failed: status 503"
            )));
        }
        self.inner.put_file(object_name, source)
    }
}
