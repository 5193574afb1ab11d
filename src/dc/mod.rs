//! HTTP client for the statistics API. One pooled connection set per
//! process; every request shares the builder timeout, so a hung upstream
//! surfaces as a per-call error instead of stalling the service.

pub mod types;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use types::{EventResponse, GeoJson, NlResponse, PointResponse, SeriesResponse};

#[derive(Error, Debug)]
pub enum DcError {
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("upstream returned status {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream unreachable")]
    Unreachable,
}

fn classify(err: reqwest::Error) -> DcError {
    if err.is_timeout() {
        DcError::Timeout
    } else if err.is_connect() {
        DcError::Unreachable
    } else {
        DcError::Request(err)
    }
}

pub struct DataCommonsClient {
    client: Client,
    api_root: String,
}

impl DataCommonsClient {
    pub fn new(api_root: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a free-text query to the fulfillment endpoint and returns the
    /// detected place with its chart configuration.
    pub async fn nl_data(&self, query: &str) -> Result<NlResponse, DcError> {
        let url = format!(
            "{}/api/nl/data?q={}",
            self.api_root,
            urlencoding::encode(query)
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(classify)?;
        decode("nl/data", response).await
    }

    /// Latest observed value for each variable at each entity.
    pub async fn observations_point(
        &self,
        entities: &[String],
        variables: &[String],
    ) -> Result<PointResponse, DcError> {
        let url = format!(
            "{}/api/observations/point?{}&{}",
            self.api_root,
            repeated("entities", entities),
            repeated("variables", variables)
        );
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("observations/point", response).await
    }

    /// Latest observed value for each variable at every child of `parent`
    /// with the given place type.
    pub async fn observations_point_within(
        &self,
        parent: &str,
        child_type: &str,
        variables: &[String],
    ) -> Result<PointResponse, DcError> {
        let url = format!(
            "{}/api/observations/point/within?parentEntity={}&childType={}&{}",
            self.api_root,
            urlencoding::encode(parent),
            urlencoding::encode(child_type),
            repeated("variables", variables)
        );
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("observations/point/within", response).await
    }

    /// Full observation series for each variable at each entity.
    pub async fn observation_series(
        &self,
        entities: &[String],
        variables: &[String],
    ) -> Result<SeriesResponse, DcError> {
        let url = format!(
            "{}/api/observations/series?{}&{}",
            self.api_root,
            repeated("entities", entities),
            repeated("variables", variables)
        );
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("observations/series", response).await
    }

    /// Boundary polygons for the children of `place`.
    pub async fn choropleth_geojson(
        &self,
        place: &str,
        place_type: &str,
    ) -> Result<GeoJson, DcError> {
        let url = format!(
            "{}/api/choropleth/geojson?placeDcid={}&placeType={}",
            self.api_root,
            urlencoding::encode(place),
            urlencoding::encode(place_type)
        );
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("choropleth/geojson", response).await
    }

    /// Display names for a batch of place dcids.
    pub async fn place_names(&self, dcids: &[String]) -> Result<HashMap<String, String>, DcError> {
        if dcids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/api/place/name?{}", self.api_root, repeated("dcids", dcids));
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("place/name", response).await
    }

    /// Events of one type observed at a place during `year`.
    pub async fn event_data(
        &self,
        event_type: &str,
        place: &str,
        year: i32,
    ) -> Result<EventResponse, DcError> {
        let url = format!(
            "{}/api/event/data?eventType={}&place={}&date={year}",
            self.api_root,
            urlencoding::encode(event_type),
            urlencoding::encode(place)
        );
        let response = self.client.get(&url).send().await.map_err(classify)?;
        decode("event/data", response).await
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, DcError> {
    if !response.status().is_success() {
        return Err(DcError::Status {
            endpoint,
            status: response.status().as_u16(),
        });
    }
    response.json::<T>().await.map_err(classify)
}

fn repeated(key: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_params_encode_each_value() {
        let query = repeated("variables", &["Count_Person".to_string(), "a b".to_string()]);
        assert_eq!(query, "variables=Count_Person&variables=a%20b");
    }

    #[test]
    fn api_root_trailing_slash_is_trimmed() {
        let client =
            DataCommonsClient::new("http://127.0.0.1:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.api_root, "http://127.0.0.1:8080");
    }

    #[test]
    fn status_errors_name_the_endpoint() {
        let err = DcError::Status {
            endpoint: "observations/point",
            status: 502,
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("observations/point"));
    }
}
