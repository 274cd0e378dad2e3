//! BigQuery implementation of [`EventStore`].
//!
//! Rows are streamed with `tabledata.insertAll`, one request per event. The
//! Pub/Sub message ID is the insert ID, so a redelivered message is
//! deduplicated by BigQuery on a best-effort basis.

use std::sync::Arc;

use async_trait::async_trait;
use events::{EventRow, EventStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::TokenSource;
use crate::client::GoogleApiClient;
use crate::error::GcloudError;

/// Production BigQuery endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";

/// Columns of type JSON. The streaming API takes them as JSON text.
const JSON_COLUMNS: [&str; 3] = ["event", "other_attributes", "backend_metadata"];

/// A fully qualified BigQuery table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    /// Parses `project.dataset.table`, or `dataset.table` in
    /// `default_project`.
    ///
    /// # Errors
    ///
    /// Returns [`GcloudError::Configuration`] for any other shape, or when the
    /// project is needed but `default_project` is `None`.
    pub fn parse(value: &str, default_project: Option<&str>) -> Result<Self, GcloudError> {
        let parts: Vec<&str> = value.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(invalid_table(value));
        }

        match parts.as_slice() {
            [project, dataset, table] => Ok(Self {
                project: (*project).to_string(),
                dataset: (*dataset).to_string(),
                table: (*table).to_string(),
            }),
            [dataset, table] => {
                let project = default_project.ok_or_else(|| {
                    GcloudError::configuration(format!(
                        "table '{value}' has no project and no default project is configured"
                    ))
                })?;
                Ok(Self {
                    project: project.to_string(),
                    dataset: (*dataset).to_string(),
                    table: (*table).to_string(),
                })
            }
            _ => Err(invalid_table(value)),
        }
    }

    fn insert_all_path(&self) -> String {
        format!(
            "/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.project, self.dataset, self.table
        )
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

fn invalid_table(value: &str) -> GcloudError {
    GcloudError::configuration(format!(
        "invalid BigQuery table '{value}': expected 'project.dataset.table' or 'dataset.table'"
    ))
}

/// Appends event rows to one BigQuery table.
#[derive(Debug, Clone)]
pub struct BigQueryEventStore {
    client: GoogleApiClient,
    table: TableId,
}

impl BigQueryEventStore {
    /// Creates a store writing to `table` via the production endpoint.
    pub fn new(table: TableId, tokens: Arc<dyn TokenSource>) -> Result<Self, GcloudError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, table, tokens)
    }

    /// Creates a store that sends requests to `endpoint` instead.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        table: TableId,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, GcloudError> {
        Ok(Self {
            client: GoogleApiClient::new(endpoint, tokens)?,
            table,
        })
    }

    pub fn table(&self) -> &TableId {
        &self.table
    }
}

#[async_trait]
impl EventStore for BigQueryEventStore {
    #[instrument(skip_all, fields(table = %self.table, message_id = %row.message_id()))]
    async fn insert_row(&self, row: &EventRow) -> Result<(), StoreError> {
        let request = InsertAllRequest {
            rows: vec![InsertRow {
                insert_id: row.message_id(),
                json: to_insert_json(row).map_err(unavailable)?,
            }],
        };

        let response: InsertAllResponse = self
            .client
            .post(&self.table.insert_all_path(), &request)
            .await
            .map_err(unavailable)?;

        if !response.insert_errors.is_empty() {
            let errors = response
                .insert_errors
                .into_iter()
                .flat_map(|row| row.errors)
                .map(|error| error.to_string())
                .collect();
            return Err(StoreError::Rejected { errors });
        }

        info!("Event row inserted.");
        Ok(())
    }
}

/// Serialises a row, turning JSON columns into JSON text.
fn to_insert_json(row: &EventRow) -> Result<Value, GcloudError> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(columns) = &mut value {
        for column in JSON_COLUMNS {
            if let Some(cell) = columns.get_mut(column) {
                *cell = Value::String(cell.to_string());
            }
        }
    }
    Ok(value)
}

fn unavailable(error: GcloudError) -> StoreError {
    StoreError::Unavailable {
        message: error.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow<'a> {
    insert_id: &'a str,
    json: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Deserialize)]
struct RowErrors {
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    message: String,
}

impl std::fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.reason.is_empty(), self.location.is_empty()) {
            (false, false) => write!(f, "{} at '{}': {}", self.reason, self.location, self.message),
            (false, true) => write!(f, "{}: {}", self.reason, self.message),
            _ => f.write_str(&self.message),
        }
    }
}
