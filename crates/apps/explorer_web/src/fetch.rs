//! HTTP helpers over `gloo-net`, each mapping failures into the error type
//! of the component that owns the request.

use formats::countries::{CountryDataset, CountryDatasetError};
use gloo_net::http::Request;
use panels::sidebar::EventQueryError;
use streaming::cache::TextureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Parse(#[from] CountryDatasetError),
}

pub async fn fetch_dataset(url: &str) -> Result<CountryDataset, DatasetLoadError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| DatasetLoadError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(DatasetLoadError::Http {
            status: resp.status(),
        });
    }
    let text = resp
        .text()
        .await
        .map_err(|e| DatasetLoadError::Network(e.to_string()))?;
    Ok(CountryDataset::from_geojson_str(&text)?)
}

pub async fn fetch_texture_bytes(url: &str) -> Result<Vec<u8>, TextureError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| TextureError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(TextureError::Http {
            status: resp.status(),
        });
    }
    resp.binary()
        .await
        .map_err(|e| TextureError::Network(e.to_string()))
}

/// Body of an events query; parsing happens in the sidebar.
pub async fn fetch_events_body(url: &str) -> Result<String, EventQueryError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| EventQueryError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(EventQueryError::Http {
            status: resp.status(),
        });
    }
    resp.text()
        .await
        .map_err(|e| EventQueryError::Network(e.to_string()))
}
