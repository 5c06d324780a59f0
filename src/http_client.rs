use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::LoaderError;
use crate::models::Credentials;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated GET against the members site.
pub trait HttpClient {
    fn get(&self, url: &str, credentials: &Credentials) -> Result<HttpResponse, LoaderError>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str, credentials: &Credentials) -> Result<HttpResponse, LoaderError> {
        (**self).get(url, credentials)
    }
}

#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: Client,
}

impl BlockingHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, LoaderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for BlockingHttpClient {
    fn get(&self, url: &str, credentials: &Credentials) -> Result<HttpResponse, LoaderError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&credentials.account, Some(&credentials.password))
            .send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
