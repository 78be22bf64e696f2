use crate::error::{RelgraphError, Result};
use crate::reader::types::{
    DataApiErrorBody, ExecuteStatementRequest, ExecuteStatementResponse, Record, SqlParameter,
};
use crate::reader::ConnectionInfo;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Executes catalog statements against a database.
///
/// This is the seam to the connectivity provider: readers only ever see records.
#[async_trait]
pub trait DataApiClient: Send + Sync {
    async fn execute_statement(&self, sql: &str, parameters: &[SqlParameter]) -> Result<Vec<Record>>;
}

/// Data API client speaking the `ExecuteStatement` JSON protocol over HTTP.
///
/// # Example
///
/// ```no_run
/// use relgraph::reader::{ConnectionInfo, DataApiClient, HttpDataApiClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connection = ConnectionInfo {
///     region: "us-east-1".to_string(),
///     resource_arn: "arn:aws:rds:us-east-1:123456789012:cluster:pets".to_string(),
///     secret_arn: "arn:aws:secretsmanager:us-east-1:123456789012:secret:pets".to_string(),
///     database: "pets".to_string(),
/// };
/// let client = HttpDataApiClient::new(
///     "https://rds-data.us-east-1.amazonaws.com".to_string(),
///     "token".to_string(),
///     connection,
/// )?;
///
/// let records = client.execute_statement("SELECT CURRENT_SCHEMA()", &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpDataApiClient {
    base_url: String,
    token: String,
    connection: ConnectionInfo,
    client: Client,
}

impl HttpDataApiClient {
    /// Create a new Data API client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Data API endpoint URL
    /// * `token` - Bearer token for the endpoint
    /// * `connection` - Cluster, secret and database the statements run against
    pub fn new(endpoint: String, token: String, connection: ConnectionInfo) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            token,
            connection,
            client,
        })
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// Map HTTP error responses onto crate errors
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RelgraphError::Unauthorized(
                "Invalid or expired Data API credentials".to_string(),
            )),
            StatusCode::BAD_REQUEST => {
                let body: DataApiErrorBody = response
                    .json()
                    .await
                    .unwrap_or(DataApiErrorBody { message: None });
                Err(RelgraphError::Query(
                    body.message.unwrap_or_else(|| "Statement rejected".to_string()),
                ))
            }
            status => Err(RelgraphError::DataApi(format!(
                "API request failed with status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl DataApiClient for HttpDataApiClient {
    /// `POST /Execute`
    async fn execute_statement(&self, sql: &str, parameters: &[SqlParameter]) -> Result<Vec<Record>> {
        let url = format!("{}/Execute", self.base_url);

        tracing::debug!("Executing statement: {}", sql);

        let request = ExecuteStatementRequest {
            resource_arn: &self.connection.resource_arn,
            secret_arn: &self.connection.secret_arn,
            database: &self.connection.database,
            sql,
            parameters,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let body: ExecuteStatementResponse = response
            .json()
            .await
            .map_err(|e| RelgraphError::DataApi(format!("Failed to parse response: {}", e)))?;

        Ok(body.records)
    }
}
