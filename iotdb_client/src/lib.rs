//! Client for an IoTDB server's REST API, shaped around the session contract used by the
//! native clients: open a [`Session`], insert [`Tablet`]s, run query statements and close.

pub mod dataset;
pub mod session;
pub mod tablet;
pub mod types;
pub mod zone;

pub use dataset::{Field, QueryResponse, RowRecord, SessionDataSet};
pub use session::{RestSession, Session, SessionConfig};
pub use tablet::{Column, Tablet, TabletValues};
pub use types::{TSDataType, Value};
pub use zone::ZoneId;

use std::num::NonZeroUsize;

use reqwest::{IntoUrl, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use url::Url;

/// The status code the store reports for a successful statement
pub const SUCCESS_STATUS: i64 = 200;

/// Primary error type for the [`Client`] and every [`Session`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base URL error: {0}")]
    BaseUrl(#[source] reqwest::Error),

    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    #[error("failed to parse JSON response: {0}")]
    Json(#[source] reqwest::Error),

    #[error("failed to parse plaintext response: {0}")]
    Text(#[source] reqwest::Error),

    #[error("failed to decode query result: {0}")]
    QueryResult(#[source] serde_json::Error),

    #[error("server responded with error [{code}]: {message}")]
    ApiError { code: StatusCode, message: String },

    #[error("statement failed with status {code}: {message}")]
    Server { code: i64, message: String },

    #[error("failed to send {method} {url} request: {source}")]
    RequestSend {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid tablet: {reason}")]
    InvalidTablet { reason: String },

    #[error("expected a field of type {expected} but got {actual}")]
    FieldType {
        expected: &'static str,
        actual: String,
    },

    #[error("invalid time zone '{0}', expected an offset such as 'UTC+8' or '+08:00'")]
    InvalidZoneId(String),

    #[error("the session is not open")]
    SessionClosed,
}

impl Error {
    fn request_send(method: Method, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RequestSend {
            method,
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The REST API client
///
/// For programmatic access to the REST service of a running IoTDB server. Most callers want a
/// [`RestSession`], which wraps this client in the session lifecycle.
#[derive(Debug, Clone)]
pub struct Client {
    /// The base URL for making requests to the REST service
    base_url: Url,
    /// The user name and password sent with each request using HTTP basic auth
    credentials: Option<(String, Secret<String>)>,
    /// A [`reqwest::Client`] for handling HTTP requests
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new [`Client`]
    pub fn new<U: IntoUrl>(base_url: U) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into_url().map_err(Error::BaseUrl)?,
            credentials: None,
            http_client: reqwest::Client::new(),
        })
    }

    /// Set the user name and password that will be sent with each request to the server
    ///
    /// # Example
    /// ```
    /// # use iotdb_client::Client;
    /// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("http://127.0.0.1:18080")?
    ///     .with_basic_auth("root", "root");
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), Secret::new(password.into())));
        self
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((username, password)) => req.basic_auth(username, Some(password.expose_secret())),
            None => req,
        }
    }

    /// Send a `/ping` request to check that the REST service is up
    pub async fn ping(&self) -> Result<ExecutionStatus> {
        let url = self.base_url.join("/ping")?;
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|src| Error::request_send(Method::GET, "/ping", src))?;
        ExecutionStatus::from_response(resp).await
    }

    /// Make a request to the `POST /rest/v2/insertTablet` API
    ///
    /// # Example
    /// ```no_run
    /// # use iotdb_client::{Client, Column, TSDataType, Tablet, TabletValues};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("http://127.0.0.1:18080")?.with_basic_auth("root", "root");
    /// let tablet = Tablet::try_new(
    ///     "root.sg0.0",
    ///     vec!["s0".to_string()],
    ///     vec![TSDataType::Float],
    ///     TabletValues::Columns(vec![Column::Float(vec![1.2, 1.2])]),
    ///     vec![0, 1],
    /// )?;
    /// client.api_rest_v2_insert_tablet(&tablet).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn api_rest_v2_insert_tablet(&self, tablet: &Tablet) -> Result<()> {
        let api_path = "/rest/v2/insertTablet";
        let url = self.base_url.join(api_path)?;
        let req = self.authorize(self.http_client.post(url).json(tablet));
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(Method::POST, api_path, src))?;
        ExecutionStatus::from_response(resp).await.map(|_| ())
    }

    /// Compose a request to the `POST /rest/v2/query` API
    ///
    /// # Example
    /// ```no_run
    /// # use iotdb_client::Client;
    /// # use std::num::NonZeroUsize;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("http://127.0.0.1:18080")?.with_basic_auth("root", "root");
    /// let response = client
    ///     .api_rest_v2_query("select count(*) from root.sg0.0")
    ///     .row_limit(NonZeroUsize::MIN)
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn api_rest_v2_query<Q: Into<String>>(&self, sql: Q) -> QueryRequestBuilder<'_> {
        QueryRequestBuilder {
            client: self,
            sql: sql.into(),
            row_limit: None,
        }
    }
}

/// The status body the store returns for pings, inserts and failed statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    code: i64,
    #[serde(default)]
    message: String,
}

impl ExecutionStatus {
    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    async fn from_response(resp: reqwest::Response) -> Result<Self> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::ApiError {
                code: status,
                message: resp.text().await.map_err(Error::Text)?,
            });
        }
        let body: Self = resp.json().await.map_err(Error::Json)?;
        if body.code == SUCCESS_STATUS {
            Ok(body)
        } else {
            Err(Error::Server {
                code: body.code,
                message: body.message,
            })
        }
    }
}

/// Used to compose a request to the `/rest/v2/query` API
///
/// Produced by [`Client::api_rest_v2_query`] method.
#[derive(Debug)]
pub struct QueryRequestBuilder<'c> {
    client: &'c Client,
    sql: String,
    row_limit: Option<NonZeroUsize>,
}

impl QueryRequestBuilder<'_> {
    /// Limit the number of rows the server will return for the statement
    pub fn row_limit(mut self, row_limit: NonZeroUsize) -> Self {
        self.row_limit = Some(row_limit);
        self
    }

    /// Send the request to `/rest/v2/query`
    pub async fn send(self) -> Result<QueryResponse> {
        let api_path = "/rest/v2/query";
        let url = self.client.base_url.join(api_path)?;
        let params = QueryParams {
            sql: &self.sql,
            row_limit: self.row_limit,
        };
        let req = self.client.authorize(self.client.http_client.post(url).json(&params));
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(Method::POST, api_path, src))?;
        let status = resp.status();
        match status {
            StatusCode::OK => {
                let body: serde_json::Value = resp.json().await.map_err(Error::Json)?;
                QueryResponse::from_body(body)
            }
            code => Err(Error::ApiError {
                code,
                message: resp.text().await.map_err(Error::Text)?,
            }),
        }
    }
}

/// Body of a request to the `/rest/v2/query` API
#[derive(Debug, Serialize)]
struct QueryParams<'a> {
    sql: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_limit: Option<NonZeroUsize>,
}
