use crate::error::{ProcessingError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Somewhere files can be listed and downloaded from.
#[allow(async_fn_in_trait)]
pub trait FileSource {
    /// URLs matching `selector`, in listing order. Failures here are fatal
    /// for the run.
    async fn list_files(&self, selector: Option<&str>) -> Result<Vec<String>>;

    /// Download one file fully into memory.
    async fn fetch_one(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    data: Vec<CatalogResource>,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogResource {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

/// Keep URLs containing `selector`; no selector (or an empty one) keeps all.
pub fn select_urls(urls: Vec<String>, selector: Option<&str>) -> Vec<String> {
    match selector.map(str::trim) {
        Some(s) if !s.is_empty() => urls.into_iter().filter(|u| u.contains(s)).collect(),
        _ => urls,
    }
}

/// Client for the remote resource catalog and the files it lists.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    catalog_url: String,
    max_pages: usize,
}

impl CatalogClient {
    pub fn new(catalog_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            catalog_url: catalog_url.into(),
            max_pages: crate::utils::constants::DEFAULT_MAX_CATALOG_PAGES,
        })
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    /// Every resource URL in the catalog, following `next_page` links.
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let start = Instant::now();
        let mut urls = Vec::new();
        let mut next = Some(self.catalog_url.clone());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            if pages >= self.max_pages {
                warn!(
                    "Catalog listing stopped after {} pages, remaining pages ignored",
                    pages
                );
                break;
            }

            let page = self.fetch_page(&page_url).await?;
            pages += 1;
            debug!("Catalog page {} returned {} resources", pages, page.data.len());

            for resource in page.data {
                if let Some(title) = &resource.title {
                    debug!("Catalog resource: {} ({})", title, resource.url);
                }
                urls.push(resource.url);
            }
            next = page.next_page.filter(|u| !u.is_empty());
        }

        info!(
            "Catalog listed {} resources across {} pages in {:.2}s",
            urls.len(),
            pages,
            start.elapsed().as_secs_f64()
        );
        Ok(urls)
    }

    async fn fetch_page(&self, url: &str) -> Result<CatalogPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProcessingError::Catalog(format!("{} unreachable: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessingError::Catalog(format!(
                "Failed to fetch files from {} (HTTP {})",
                url,
                status.as_u16()
            )));
        }

        response
            .json::<CatalogPage>()
            .await
            .map_err(|e| ProcessingError::Catalog(format!("Malformed listing from {}: {}", url, e)))
    }
}

impl FileSource for CatalogClient {
    async fn list_files(&self, selector: Option<&str>) -> Result<Vec<String>> {
        let urls = self.list_all().await?;
        Ok(select_urls(urls, selector))
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => ProcessingError::Http {
                        url: url.to_string(),
                        status: status.as_u16(),
                    },
                    None => ProcessingError::Request(e),
                });
            }
        };

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
