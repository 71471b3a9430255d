//! HTTP client for the procedure gateway that fronts the central database.

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{GatewayError, RemoteGateway};
use crate::config::RemoteConfig;
use crate::models::{CountQuery, DeleteRecord, DeleteSummary, RemoteRecord, UpsertEpc};

#[derive(Deserialize)]
struct ProcedureResponse {
    return_value: i32,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct RecordsResponse {
    records: Vec<RemoteRecord>,
}

/// Gateway speaking JSON over HTTP.
///
/// Idle connections are not pooled, so each call opens its own connection
/// and drops it when the response has been read or the call failed.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    api_key: Option<String>,
    procedure: String,
    client: Client,
}

impl HttpGateway {
    pub fn from_config(config: &RemoteConfig) -> Result<Self, GatewayError> {
        let server_url = config
            .server_url
            .clone()
            .ok_or(GatewayError::NotConfigured)?;

        Self::new(
            server_url,
            config.api_key.clone(),
            config.procedure.clone(),
            config.request_timeout(),
        )
    }

    pub fn new(
        server_url: String,
        api_key: Option<String>,
        procedure: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let base_url = Url::parse(&server_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GatewayError::InvalidUrl(server_url.clone()))?;

        Ok(Self {
            base_url,
            api_key,
            procedure,
            client,
        })
    }

    pub fn server_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base URL, each one percent-encoded, so a
    /// key containing `/`, `?` or `&` stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Connection(e.to_string())
    }
}

impl RemoteGateway for HttpGateway {
    async fn upsert_epc(&self, request: &UpsertEpc) -> Result<i32, GatewayError> {
        let url = self.endpoint(&["procedures", self.procedure.as_str()]);
        let response: ProcedureResponse = self.send(self.client.post(url).json(request)).await?;
        Ok(response.return_value)
    }

    async fn count_today(&self, query: &CountQuery) -> Result<u64, GatewayError> {
        let request = self.client.get(self.endpoint(&["records", "count"])).query(&[
            ("factory_code", query.factory_code.as_str()),
            ("station_no", query.station_no.as_str()),
        ]);
        let response: CountResponse = self.send(request).await?;
        Ok(response.count)
    }

    async fn recent_records(
        &self,
        station_no: &str,
        limit: u32,
    ) -> Result<Vec<RemoteRecord>, GatewayError> {
        let limit = limit.to_string();
        let request = self
            .client
            .get(self.endpoint(&["records", "recent"]))
            .query(&[("station_no", station_no), ("limit", limit.as_str())]);
        let response: RecordsResponse = self.send(request).await?;
        Ok(response.records)
    }

    async fn delete_record(&self, request: &DeleteRecord) -> Result<DeleteSummary, GatewayError> {
        let url = self.endpoint(&["records", request.matchkeyid.as_str()]);
        let builder = self.client.delete(url).query(&[
            ("station_no", request.station_no.as_str()),
            ("epc", request.epc.as_str()),
        ]);
        self.send(builder).await
    }
}
