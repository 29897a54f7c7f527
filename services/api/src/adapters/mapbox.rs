//! services/api/src/adapters/mapbox.rs
//!
//! This module contains the adapter for Mapbox forward geocoding.
//! It implements the `GeocodingService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use wanderlust_core::domain::Geometry;
use wanderlust_core::ports::{GeocodingService, PortError, PortResult};

const MAPBOX_PLACES_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `GeocodingService` port using the Mapbox API.
#[derive(Clone)]
pub struct MapboxGeocoder {
    client: Client,
    access_token: String,
    limit: u8,
}

impl MapboxGeocoder {
    /// Creates a new `MapboxGeocoder` that asks for the single best match.
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
            limit: 1,
        }
    }

    fn request_url(&self, query: &str) -> PortResult<Url> {
        let mut url =
            Url::parse(MAPBOX_PLACES_URL).map_err(|e| PortError::Unexpected(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("Mapbox URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&format!("{}.json", query));
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("limit", &self.limit.to_string());
        Ok(url)
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

//=========================================================================================
// `GeocodingService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GeocodingService for MapboxGeocoder {
    async fn forward_geocode(&self, query: &str) -> PortResult<Vec<Geometry>> {
        let url = self.request_url(query)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let body: FeatureCollection = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(body.features.into_iter().map(|f| f.geometry).collect())
    }
}
