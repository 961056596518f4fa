use crate::models::{BookRecord, SearchQuery};
use serde_json::Value;
use std::time::Duration;
use url::form_urlencoded;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
pub const DEFAULT_USER_AGENT: &str = "openlibrary-sync/0.1";
const SEARCH_PATH: &str = "/search.json";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Open Library returned status {status}: {message}")]
    Status { status: u16, message: String },
}

/// Tagged result of a search: the normalized records, or why there are none.
pub type FetchOutcome = Result<Vec<BookRecord>, FetchError>;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam: issue a GET and hand back status and body.
pub trait HttpFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

impl<T: HttpFetcher + ?Sized> HttpFetcher for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        (**self).get(url)
    }
}

impl<T: HttpFetcher + ?Sized> HttpFetcher for Box<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        (**self).get(url)
    }
}

/// Blocking reqwest transport with an explicit request timeout.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

pub struct QueryClient<F> {
    base_url: String,
    fetcher: F,
}

impl<F: HttpFetcher> QueryClient<F> {
    pub fn new(base_url: &str, fetcher: F) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
        }
    }

    pub fn with_default_url(fetcher: F) -> Self {
        Self::new(DEFAULT_BASE_URL, fetcher)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Search URL for the given query; no `?` at all when the query is unfiltered
    pub fn build_url(&self, query: &SearchQuery) -> String {
        let mut url = format!("{}{}", self.base_url, SEARCH_PATH);
        if !query.is_unfiltered() {
            url.push('?');
            url.push_str(&encode_query(&query.params()));
        }
        url
    }

    pub fn fetch(&self, title: &str, author: &str) -> FetchOutcome {
        self.fetch_query(&SearchQuery::new(title, author))
    }

    pub fn fetch_query(&self, query: &SearchQuery) -> FetchOutcome {
        let url = self.build_url(query);
        tracing::debug!(target: "fetch", "GET {}", url);

        let response = self.fetcher.get(&url).map_err(|e| {
            tracing::warn!(target: "fetch", "Request to {} failed: {}", url, e);
            e
        })?;

        if !response.is_success() {
            tracing::warn!(target: "fetch", "{} answered with status {}", url, response.status);
            return Err(FetchError::Status {
                status: response.status,
                message: response.body,
            });
        }

        let books = normalize_response(&response.body);
        tracing::info!(target: "fetch", "Received {} book(s) from {}", books.len(), url);
        Ok(books)
    }
}

/// Form-encode params (space as `+`), then turn every `%2B` back into a literal `+`.
pub fn encode_query(params: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish().replace("%2B", "+")
}

/// Parse a search response body. A body that is not JSON, or has no `docs` array, yields no records.
pub fn normalize_response(body: &str) -> Vec<BookRecord> {
    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(target: "fetch", "Response body is not JSON: {}", e);
            return Vec::new();
        }
    };

    data.get("docs")
        .and_then(Value::as_array)
        .map(|docs| docs.iter().map(BookRecord::from_doc).collect())
        .unwrap_or_default()
}
