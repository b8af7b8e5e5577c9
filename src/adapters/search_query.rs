//! Search-engine-query adapter
//!
//! Posts the connection's parameter map verbatim as the body of a
//! query/aggregation call and reads the relevance score of the first hit.
//! Sources that return no hits read as score 0 rather than failing, so an
//! empty result set is a data point, not an outage.

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::config::ConnectionConfig;
use crate::error::{FetchError, FetchResult};

use super::{Adapter, AdapterKind, ValidationReport, apply_auth, http_client, structural_checks};

/// JSON pointer to the relevance score of the first hit.
const FIRST_HIT_SCORE: &str = "/hits/hits/0/_score";

pub struct SearchQueryAdapter {
    client: reqwest::Client,
}

impl SearchQueryAdapter {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for SearchQueryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for SearchQueryAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::SearchQuery
    }

    fn validate(&self, config: &ConnectionConfig) -> ValidationReport {
        // The parameter map is free-form (it becomes the request body), so
        // only the shared structural checks apply.
        let mut errors = Vec::new();
        structural_checks(config, &mut errors);
        ValidationReport::from_errors(errors)
    }

    async fn fetch(&self, config: &ConnectionConfig) -> FetchResult<String> {
        trace!("posting query to {}", config.url);

        let body = Value::Object(config.parameters.clone());
        let response = apply_auth(self.client.post(&config.url), config)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        let score = body
            .pointer(FIRST_HIT_SCORE)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        Ok(score.to_string())
    }
}
