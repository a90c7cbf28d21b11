//! HBase REST gateway client
//!
//! Talks to the HBase REST server (`hbase rest start`) using its JSON
//! representation, where row keys, column names and values are base64.

use super::{Auth, BatchAck, StoreClient, TableAdmin};
use crate::error::{AdminError, WriteError};
use crate::mutation::MutationSpec;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eyre::{Context, Result, eyre};
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Placeholder row used in the path of multi-row puts; the gateway takes the
/// real keys from the body.
const BATCH_ROW_PATH: &str = "batch-put";

#[derive(Serialize)]
struct CellModel {
    column: String,
    #[serde(rename = "$")]
    value: String,
}

#[derive(Serialize)]
struct RowModel {
    key: String,
    #[serde(rename = "Cell")]
    cells: Vec<CellModel>,
}

#[derive(Serialize)]
struct CellSetModel {
    #[serde(rename = "Row")]
    rows: Vec<RowModel>,
}

impl CellSetModel {
    fn from_mutations(mutations: &[MutationSpec]) -> Self {
        let rows = mutations
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| RowModel {
                key: STANDARD.encode(&m.row_key),
                cells: m
                    .cells
                    .iter()
                    .map(|c| CellModel {
                        column: STANDARD.encode(c.column()),
                        value: STANDARD.encode(&c.value),
                    })
                    .collect(),
            })
            .collect();
        Self { rows }
    }
}

#[derive(Serialize)]
struct ColumnSchemaModel<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct TableSchemaModel<'a> {
    name: &'a str,
    #[serde(rename = "ColumnSchema")]
    columns: Vec<ColumnSchemaModel<'a>>,
}

/// Client for an HBase REST gateway
///
/// # Example
/// ```no_run
/// use hbase_import::client::{Auth, RestStore, TableAdmin};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:8080")?;
/// let store = RestStore::try_new(url, Auth::None)?;
///
/// if !store.exists("inventory").await? {
///     store.create("inventory", &["cf".to_string()]).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RestStore {
    client: Client,
    url: Url,
}

impl RestStore {
    /// Create a client for the gateway at `url`
    ///
    /// # Errors
    /// Returns an error if the URL cannot hold path segments or the HTTP
    /// client cannot be built
    pub fn try_new(url: Url, auth: Auth) -> Result<Self> {
        if url.cannot_be_a_base() {
            eyre::bail!("HBase REST URL cannot be used as a base: {}", url);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, "application/json".parse()?);
        if let Some(value) = auth.header_value() {
            headers.insert(header::AUTHORIZATION, value.parse()?);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build a gateway URL from path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| eyre!("HBase REST URL cannot be used as a base: {}", self.url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Cluster version reported by the gateway
    pub async fn version(&self) -> Result<String> {
        let url = self.endpoint(&["version", "cluster"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach HBase REST gateway")?;

        if !response.status().is_success() {
            eyre::bail!("HBase REST gateway returned {}", response.status());
        }

        Ok(response.text().await?.trim().trim_matches('"').to_string())
    }
}

impl StoreClient for RestStore {
    async fn is_available(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                log::debug!("HBase REST gateway reports cluster version {}", version);
                true
            }
            Err(e) => {
                log::debug!("HBase REST gateway is not available: {:#}", e);
                false
            }
        }
    }

    async fn write_batch(
        &self,
        table: &str,
        mutations: &[MutationSpec],
    ) -> Result<BatchAck, WriteError> {
        let fail = |message: String| WriteError::new(table, mutations.len(), message);

        let body = CellSetModel::from_mutations(mutations);
        if body.rows.is_empty() {
            return Ok(BatchAck::for_batch(mutations));
        }

        let url = self
            .endpoint(&[table, BATCH_ROW_PATH])
            .map_err(|e| fail(e.to_string()))?;

        log::debug!("PUT {} ({} row(s))", url, body.rows.len());

        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(fail(format!("gateway returned {}: {}", status, text.trim())));
        }

        Ok(BatchAck::for_batch(mutations))
    }
}

impl TableAdmin for RestStore {
    async fn exists(&self, table: &str) -> Result<bool, AdminError> {
        let url = self
            .endpoint(&[table, "schema"])
            .map_err(|e| AdminError::new(table, e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdminError::new(table, e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AdminError::new(
                table,
                format!("schema lookup returned {}", status),
            )),
        }
    }

    async fn create(&self, table: &str, families: &[String]) -> Result<(), AdminError> {
        let url = self
            .endpoint(&[table, "schema"])
            .map_err(|e| AdminError::new(table, e.to_string()))?;

        let schema = TableSchemaModel {
            name: table,
            columns: families
                .iter()
                .map(|f| ColumnSchemaModel { name: f })
                .collect(),
        };

        log::debug!("Creating table '{}' with families {:?}", table, families);

        let response = self
            .client
            .put(url)
            .json(&schema)
            .send()
            .await
            .map_err(|e| AdminError::new(table, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminError::new(
                table,
                format!("create returned {}: {}", status, text.trim()),
            ));
        }

        Ok(())
    }
}
