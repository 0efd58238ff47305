//! Free-form place search against a Nominatim instance.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub osm_id: serde_json::Value,
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub lat: f64,
    pub lon: f64,
}

/// Splits a comma-separated display name into a short title and subtitle.
pub fn split_display_name(full_text: &str) -> (String, String) {
    let parts: Vec<&str> = full_text.split(", ").collect();
    match parts.as_slice() {
        [only] => (only.to_string(), String::new()),
        [title, subtitle] => (title.to_string(), subtitle.to_string()),
        [a, b, c, rest @ ..] => (
            format!("{a}, {b}"),
            format!("{c}, {}", rest.first().copied().unwrap_or_default()),
        ),
        [] => (String::new(), String::new()),
    }
}

/// Most important first, deduplicated on (title, subtitle), at most `take`.
pub fn rank_places(mut places: Vec<NominatimPlace>, take: usize) -> Vec<GeocodeResult> {
    places.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    let mut out: Vec<GeocodeResult> = Vec::with_capacity(take.min(places.len()));
    for place in places {
        if out.len() >= take {
            break;
        }
        let (title, subtitle) = split_display_name(&place.display_name);
        if out
            .iter()
            .any(|r| r.title == title && r.subtitle == subtitle)
        {
            continue;
        }
        let id = match &place.osm_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push(GeocodeResult {
            id,
            title,
            subtitle,
            lat: place.lat.parse().unwrap_or(f64::NAN),
            lon: place.lon.parse().unwrap_or(f64::NAN),
        });
    }
    out
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    base_url: String,
    http: reqwest::Client,
}

impl Geocoder {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn free_form_search(
        &self,
        query: &str,
        take: usize,
    ) -> Result<Vec<GeocodeResult>, ClientError> {
        let places: Vec<NominatimPlace> = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(query, results = places.len(), "geocoding results");
        Ok(rank_places(places, take))
    }
}
