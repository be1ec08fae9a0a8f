//! Provider implementation for the Paris open data portal (records API 1.0).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use poubelle_core::{
    config::ApiConfig,
    ports::{AreaFilter, DatasetPort, DatasetResponse, PortError},
    registry::DatasetSource,
};

/// Dataset query backend for `opendata.paris.fr`.
pub struct ParisOpenDataPort {
    client: Client,
    base_url: String,
    refine_fields: Vec<String>,
}

impl ParisOpenDataPort {
    /// Create a port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, api: &ApiConfig) -> Self {
        Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_owned(),
            refine_fields: api.refine_fields.clone(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search/", self.base_url)
    }
}

#[async_trait]
impl DatasetPort for ParisOpenDataPort {
    async fn query(
        &self,
        source: &DatasetSource,
        filter: Option<&AreaFilter>,
        rows: u32,
    ) -> Result<DatasetResponse, PortError> {
        let params = query_params(source, filter, rows, &self.refine_fields);
        debug!(dataset = %source.id, ?params, "querying records API");

        let req = self.client.get(self.search_url()).query(&params);
        let body = fetch_value(req).await?;
        DatasetResponse::from_value(body)
    }
}

/// Build the HTTP client used by the port: configured timeout and user agent.
///
/// # Errors
///
/// Returns [`PortError::Network`] if the TLS backend cannot be initialised.
pub fn client(api: &ApiConfig) -> Result<Client, PortError> {
    Client::builder()
        .user_agent(api.user_agent.as_str())
        .timeout(Duration::from_secs(api.timeout_secs))
        .build()
        .map_err(PortError::from)
}

/// Build the port from configuration.
///
/// # Errors
///
/// Returns [`PortError::Network`] if the HTTP client cannot be built.
pub fn port(api: &ApiConfig) -> Result<ParisOpenDataPort, PortError> {
    Ok(ParisOpenDataPort::new(client(api)?, api))
}

/// Query string of a records search.
///
/// The portal's datasets name the area column differently, so the filter is sent
/// as `refine.{field}` for every candidate field.
#[must_use]
pub fn query_params(
    source: &DatasetSource,
    filter: Option<&AreaFilter>,
    rows: u32,
    refine_fields: &[String],
) -> Vec<(String, String)> {
    let mut params = vec![
        ("dataset".to_owned(), source.id.0.clone()),
        ("rows".to_owned(), rows.to_string()),
        ("format".to_owned(), "json".to_owned()),
    ];

    if let Some(area) = filter.filter(|area| !area.is_empty()) {
        params.extend(
            refine_fields
                .iter()
                .map(|field| (format!("refine.{field}"), area.code.clone())),
        );
    }

    params
}

// Send the request and decode the body as JSON, keeping timeouts and bad bodies apart.
async fn fetch_value(req: RequestBuilder) -> Result<Value, PortError> {
    let resp = req.send().await.map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::Status(status.as_u16()));
    }

    let body = resp.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&body)?)
}

fn transport_error(err: reqwest::Error) -> PortError {
    if err.is_timeout() {
        PortError::Timeout
    } else {
        PortError::Network(err)
    }
}
