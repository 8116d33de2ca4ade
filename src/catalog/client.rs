//! HTTP access to the catalog listing and administrative endpoints.

use super::types::{GeoPage, ListingBody, PhotoRecord};
use crate::config::{ClientConfig, PHOTOS_ENDPOINT};
use crate::error::PhotoTrailsError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Read access to the catalog plus the clear action.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full unpaged listing. Absent or malformed bodies give an empty list.
    async fn fetch_all(&self) -> Result<Vec<PhotoRecord>, PhotoTrailsError>;

    /// One page of geotagged records.
    async fn fetch_geo_page(&self, offset: u64, limit: u64) -> Result<GeoPage, PhotoTrailsError>;

    /// Wipe the catalog.
    async fn clear(&self) -> Result<(), PhotoTrailsError>;
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    photos_url: Url,
    clear_url: Url,
}

impl CatalogClient {
    pub fn new(client: Client, photos_url: Url, clear_url: Url) -> Self {
        Self {
            client,
            photos_url,
            clear_url,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, PhotoTrailsError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::new(
            client,
            config.endpoint(PHOTOS_ENDPOINT)?,
            config.endpoint(&config.clear_endpoint)?,
        ))
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> Result<String, PhotoTrailsError> {
        let response = request.send().await.map_err(PhotoTrailsError::from_send)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PhotoTrailsError::transfer(
                Some(status.as_u16()),
                format!("Catalog request failed with status {}", status),
            ));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_all(&self) -> Result<Vec<PhotoRecord>, PhotoTrailsError> {
        let body = self.get_text(self.client.get(self.photos_url.clone())).await?;

        match serde_json::from_str::<ListingBody>(&body) {
            Ok(listing) => Ok(listing.into_items()),
            Err(e) => {
                warn!(error = %e, "Catalog listing was not a record list, showing no rows");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_geo_page(&self, offset: u64, limit: u64) -> Result<GeoPage, PhotoTrailsError> {
        let request = self.client.get(self.photos_url.clone()).query(&[
            ("with_gps", "1".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);
        let body = self.get_text(request).await?;

        let listing: ListingBody = serde_json::from_str(&body)
            .map_err(|e| PhotoTrailsError::Parse(format!("geo page at offset {}: {}", offset, e)))?;
        let page = GeoPage::from(listing);
        debug!(offset, items = page.items.len(), has_more = page.has_more, "Fetched geo page");
        Ok(page)
    }

    async fn clear(&self) -> Result<(), PhotoTrailsError> {
        let response = self
            .client
            .post(self.clear_url.clone())
            .send()
            .await
            .map_err(PhotoTrailsError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhotoTrailsError::transfer(
                Some(status.as_u16()),
                format!("Clear request failed with status {}", status),
            ));
        }
        Ok(())
    }
}
