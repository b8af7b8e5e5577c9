//! Analytics-dashboard-view adapter
//!
//! Two-step session protocol: sign in with a token name/secret pair to obtain
//! a session token and site id, then download one view's data as delimited
//! tabular text and pick a single cell out of it.
//!
//! Cell selection: the `column` parameter is matched as a case-insensitive
//! substring of the header names (default: last column), the `row` parameter
//! is a zero-based data-row index (default: first data row).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;

use crate::config::ConnectionConfig;
use crate::error::{FetchError, FetchResult};

use super::{Adapter, AdapterKind, ValidationReport, http_client, structural_checks};

/// Header carrying the session token obtained from sign-in.
const SESSION_HEADER: &str = "X-Session-Token";

pub struct DashboardViewAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    token: String,
    site_id: String,
}

impl DashboardViewAdapter {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Exchange the credential pair for a session token and site id.
    async fn sign_in(&self, config: &ConnectionConfig) -> FetchResult<SignInResponse> {
        let (Some(username), Some(token)) = (&config.username, &config.auth_token) else {
            return Err(FetchError::Extraction(String::from(
                "dashboard view sign-in requires username and authToken",
            )));
        };

        let signin_url = format!("{}/auth/signin", config.url.trim_end_matches('/'));
        trace!("signing in at {signin_url}");

        let response = self
            .client
            .post(&signin_url)
            .json(&json!({ "name": username, "secret": token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse(format!("sign-in response: {e}")))
    }

    /// Download one view's data as delimited text.
    async fn view_data(
        &self,
        config: &ConnectionConfig,
        session: &SignInResponse,
        view: &str,
    ) -> FetchResult<String> {
        let data_url = format!(
            "{}/sites/{}/views/{}/data",
            config.url.trim_end_matches('/'),
            session.site_id,
            view
        );
        trace!("requesting view data from {data_url}");

        let response = self
            .client
            .get(&data_url)
            .header(SESSION_HEADER, &session.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }
}

impl Default for DashboardViewAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for DashboardViewAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::DashboardView
    }

    fn validate(&self, config: &ConnectionConfig) -> ValidationReport {
        let mut errors = Vec::new();
        structural_checks(config, &mut errors);

        if config.parameter_str("view").is_none() {
            errors.push(String::from("missing required parameter 'view'"));
        }

        // Sign-in cannot proceed with half a credential pair, so for this
        // adapter the pair is required outright.
        if config.username.is_none() || config.auth_token.is_none() {
            errors.push(String::from(
                "dashboard view sign-in requires both username and authToken",
            ));
        }

        ValidationReport::from_errors(errors)
    }

    async fn fetch(&self, config: &ConnectionConfig) -> FetchResult<String> {
        let view = config
            .parameter_str("view")
            .ok_or_else(|| FetchError::Extraction(String::from("missing 'view' parameter")))?;

        let session = self.sign_in(config).await?;
        let text = self.view_data(config, &session, view).await?;

        let records = parse_delimited(&text);
        select_cell(
            &records,
            config.parameter_str("column"),
            row_parameter(config),
        )
    }
}

fn row_parameter(config: &ConnectionConfig) -> usize {
    match config.parameter("row") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Parse comma-delimited text into records.
///
/// Quoted fields may contain the delimiter and line breaks; a doubled quote
/// inside a quoted field is an escaped quote. `\r\n` line endings are
/// accepted.
pub fn parse_delimited(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // An empty quoted field ("") is still a field, even at end of input
    let mut field_quoted = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_quoted = true;
                }
                ',' => {
                    record.push(std::mem::take(&mut field));
                    field_quoted = false;
                }
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                    field_quoted = false;
                }
                _ => field.push(c),
            }
        }
    }

    // Final record without a trailing newline
    if !field.is_empty() || !record.is_empty() || field_quoted {
        record.push(field);
        records.push(record);
    }

    records
}

/// Pick one cell out of parsed view data.
///
/// The first record is the header row; the rest are data rows.
fn select_cell(
    records: &[Vec<String>],
    column: Option<&str>,
    row_index: usize,
) -> FetchResult<String> {
    let Some((headers, rows)) = records.split_first() else {
        return Err(FetchError::Extraction(String::from("view data is empty")));
    };

    let column_index = match column {
        Some(name) => {
            let needle = name.to_lowercase();
            headers
                .iter()
                .position(|h| h.to_lowercase().contains(&needle))
                .ok_or_else(|| {
                    FetchError::Extraction(format!(
                        "no column matching '{name}' in view data (columns: {})",
                        headers.join(", ")
                    ))
                })?
        }
        None => headers.len().saturating_sub(1),
    };

    let row = rows.get(row_index).ok_or_else(|| {
        FetchError::Extraction(format!(
            "row index {row_index} out of range ({} data rows)",
            rows.len()
        ))
    })?;

    row.get(column_index).cloned().ok_or_else(|| {
        FetchError::Extraction(format!("row {row_index} has no column {column_index}"))
    })
}
