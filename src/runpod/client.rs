//! `RunPod` API client implementation.
//!
//! This module provides the HTTP client for the `RunPod` GraphQL API. Every
//! request authenticates with a bearer token; the client never retries, so
//! callers that poll decide what counts as transient.

use reqwest::{Client, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

use crate::config::ApiConfig;
use crate::error::{Result, RunPodError};

use super::types::Pod;

/// `RunPod` API client.
#[derive(Clone)]
pub struct RunPodClient {
    /// HTTP client.
    client: Client,
    /// API key.
    api_key: String,
    /// GraphQL endpoint.
    endpoint: String,
}

/// GraphQL request structure.
#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

impl std::fmt::Debug for RunPodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunPodClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RunPodClient {
    /// Creates a new `RunPod` API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: &str, config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunPodError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: config.endpoint.clone(),
        })
    }

    /// Returns the GraphQL endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Executes a GraphQL query or mutation and decodes its `data` field.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on a non-success HTTP status, `Remote` when the
    /// body carries an `errors` field, `InvalidResponse` when `data` is
    /// missing or does not match `T`, and `NetworkError` when the request
    /// never completes.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T> {
        let data = self.execute_raw(query, variables).await?;

        serde_json::from_value(data).map_err(|e| {
            RunPodError::invalid_response(format!("Unexpected response shape: {e}")).into()
        })
    }

    /// Executes a GraphQL request and returns the undecoded `data` field.
    ///
    /// # Errors
    ///
    /// Same as [`RunPodClient::execute`].
    pub async fn execute_raw(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request = GraphQLRequest {
            query,
            variables: variables.unwrap_or_else(|| serde_json::json!({})),
        };

        trace!("Executing GraphQL query: {}", request.query);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RunPodError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RunPodError::transport(status.as_u16(), body).into());
        }

        let mut body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunPodError::invalid_response(format!("Failed to parse response: {e}")))?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(RunPodError::Remote {
                errors: error_messages(errors),
            }
            .into());
        }

        let data = body.get_mut("data").map(serde_json::Value::take);
        match data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(RunPodError::invalid_response(format!("No data in response: {body}")).into()),
        }
    }

    /// Gets a pod snapshot by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the pod is not found or the API call fails.
    pub async fn get_pod(&self, pod_id: &str) -> Result<Pod> {
        #[derive(serde::Deserialize)]
        struct Response {
            pod: Option<Pod>,
        }

        let query = r"
            query Pod($input: PodFilter!) {
                pod(input: $input) {
                    id
                    name
                    desiredStatus
                    runtime {
                        uptimeInSeconds
                        ports {
                            ip
                            isIpPublic
                            privatePort
                            publicPort
                            type
                        }
                        gpus {
                            id
                            gpuUtilPercent
                            memoryUtilPercent
                        }
                    }
                }
            }
        ";

        let variables = serde_json::json!({ "input": { "podId": pod_id } });
        let response: Response = self.execute(query, Some(variables)).await?;

        response.pod.ok_or_else(|| {
            RunPodError::PodNotFound {
                pod_id: pod_id.to_string(),
            }
            .into()
        })
    }
}

/// Flattens a GraphQL `errors` value into readable messages.
fn error_messages(errors: &serde_json::Value) -> Vec<String> {
    match errors.as_array() {
        Some(list) => list
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| e.to_string(), str::to_string)
            })
            .collect(),
        None => vec![errors.to_string()],
    }
}
