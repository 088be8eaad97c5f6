//! The session contract and its REST implementation.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::Utc;
use observability_deps::tracing::{debug, info};
use secrecy::{ExposeSecret, Secret};
use url::Url;

use crate::{Client, Error, Result, SessionDataSet, Tablet, ZoneId};

/// Default number of rows a query may return per round trip
pub const DEFAULT_FETCH_SIZE: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default port of the store's REST service
pub const DEFAULT_REST_PORT: u16 = 18080;

/// Everything needed to open a session against a server
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    /// Client-side hint for how many result rows to buffer per round trip
    pub fetch_size: NonZeroUsize,
    pub zone_id: ZoneId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_REST_PORT,
            username: "root".to_string(),
            password: Secret::new("root".to_string()),
            fetch_size: DEFAULT_FETCH_SIZE,
            zone_id: ZoneId::default(),
        }
    }
}

impl SessionConfig {
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.port))?)
    }
}

/// A connection to the store
///
/// Every call blocks its caller until the server answers; failures are returned to the caller
/// as is, nothing is retried.
#[async_trait]
pub trait Session: Send {
    /// Establish the session
    async fn open(&mut self) -> Result<()>;

    /// Insert one tablet as a single atomic request
    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<()>;

    /// Run a query statement, letting the server return at most `fetch_size` rows
    async fn execute_query_statement_with_fetch_size(
        &mut self,
        sql: &str,
        fetch_size: NonZeroUsize,
    ) -> Result<SessionDataSet>;

    /// Run a query statement with the session's configured fetch size
    async fn execute_query_statement(&mut self, sql: &str) -> Result<SessionDataSet> {
        let fetch_size = self.fetch_size();
        self.execute_query_statement_with_fetch_size(sql, fetch_size)
            .await
    }

    /// Release the session; closing a session that is not open does nothing
    async fn close(&mut self) -> Result<()>;

    fn fetch_size(&self) -> NonZeroUsize;
}

#[async_trait]
impl<S: Session + ?Sized> Session for Box<S> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<()> {
        (**self).insert_tablet(tablet).await
    }

    async fn execute_query_statement_with_fetch_size(
        &mut self,
        sql: &str,
        fetch_size: NonZeroUsize,
    ) -> Result<SessionDataSet> {
        (**self)
            .execute_query_statement_with_fetch_size(sql, fetch_size)
            .await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn fetch_size(&self) -> NonZeroUsize {
        (**self).fetch_size()
    }
}

/// A [`Session`] over the store's REST service
#[derive(Debug)]
pub struct RestSession {
    config: SessionConfig,
    client: Option<Client>,
}

impl RestSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(Error::SessionClosed)
    }
}

#[async_trait]
impl Session for RestSession {
    async fn open(&mut self) -> Result<()> {
        let base_url = self.config.base_url()?;
        let client = Client::new(base_url.clone())?.with_basic_auth(
            self.config.username.clone(),
            self.config.password.expose_secret().clone(),
        );
        client.ping().await?;
        info!(
            %base_url,
            username = %self.config.username,
            zone_id = %self.config.zone_id,
            opened_at = %Utc::now().with_timezone(&self.config.zone_id.offset()),
            "session opened"
        );
        self.client = Some(client);
        Ok(())
    }

    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<()> {
        self.client()?.api_rest_v2_insert_tablet(tablet).await
    }

    async fn execute_query_statement_with_fetch_size(
        &mut self,
        sql: &str,
        fetch_size: NonZeroUsize,
    ) -> Result<SessionDataSet> {
        debug!(sql, %fetch_size, "executing query statement");
        let resp = self
            .client()?
            .api_rest_v2_query(sql)
            .row_limit(fetch_size)
            .send()
            .await?;
        Ok(resp.into())
    }

    async fn close(&mut self) -> Result<()> {
        if self.client.take().is_some() {
            info!("session closed");
        }
        Ok(())
    }

    fn fetch_size(&self) -> NonZeroUsize {
        self.config.fetch_size
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::{Column, TSDataType, TabletValues};

    fn config_for(server: &Server) -> SessionConfig {
        let addr = server.host_with_port();
        let (host, port) = addr.rsplit_once(':').expect("host:port");
        SessionConfig {
            host: host.to_string(),
            port: port.parse().expect("port"),
            fetch_size: NonZeroUsize::new(16).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:18080/");
        assert_eq!(config.fetch_size.get(), 1024);
        assert_eq!(config.zone_id.to_string(), "UTC+8");
    }

    #[tokio::test]
    async fn operations_require_an_open_session() {
        let mut session = RestSession::new(SessionConfig::default());
        let tablet = Tablet::try_new(
            "root.sg0.0",
            vec!["s0".into()],
            vec![TSDataType::Float],
            TabletValues::Columns(vec![Column::Float(vec![])]),
            vec![],
        )
        .unwrap();
        assert!(matches!(
            session.insert_tablet(&tablet).await,
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            session.execute_query_statement("select count(*) from root.sg0.0").await,
            Err(Error::SessionClosed)
        ));
        // closing a session that never opened is fine
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_query_close() {
        let mut mock_server = Server::new_async().await;
        let ping = mock_server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"code":200,"message":"SUCCESS_STATUS"}"#)
            .create_async()
            .await;
        let query = mock_server
            .mock("POST", "/rest/v2/query")
            .match_body(Matcher::Json(json!({
                "sql": "select count(*) from root.sg0.0",
                "row_limit": 16,
            })))
            .with_status(200)
            .with_body(r#"{"expressions":["count(root.sg0.0.s0)"],"values":[[3]]}"#)
            .create_async()
            .await;

        let mut session = RestSession::new(config_for(&mock_server));
        session.open().await.expect("open session");
        assert!(session.is_open());

        let mut data_set = session
            .execute_query_statement("select count(*) from root.sg0.0")
            .await
            .expect("query");
        let row = data_set.next().expect("one row");
        assert_eq!(row.fields()[0].long_value().unwrap(), 3);
        assert!(!data_set.has_next());

        session.close().await.unwrap();
        assert!(!session.is_open());

        ping.assert_async().await;
        query.assert_async().await;
    }

    #[tokio::test]
    async fn failing_statement_is_an_error_not_an_empty_result() {
        let mut mock_server = Server::new_async().await;
        let ping = mock_server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"code":200,"message":"SUCCESS_STATUS"}"#)
            .create_async()
            .await;
        let query = mock_server
            .mock("POST", "/rest/v2/query")
            .with_status(200)
            .with_body(
                r#"{"code":301,"message":"Dataset row size exceeded the given max row size (1)"}"#,
            )
            .create_async()
            .await;

        let mut session = RestSession::new(config_for(&mock_server));
        session.open().await.expect("open session");
        let err = session
            .execute_query_statement_with_fetch_size(
                "select * from root.sg0.0",
                NonZeroUsize::MIN,
            )
            .await
            .expect_err("row limit exceeded");
        assert!(matches!(err, Error::Server { code: 301, .. }), "{err}");

        ping.assert_async().await;
        query.assert_async().await;
    }

    #[tokio::test]
    async fn open_fails_when_server_is_down() {
        let mut mock_server = Server::new_async().await;
        let ping = mock_server
            .mock("GET", "/ping")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let mut session = RestSession::new(config_for(&mock_server));
        let err = session.open().await.expect_err("ping fails");
        assert!(matches!(err, Error::ApiError { .. }), "{err}");
        assert!(!session.is_open());

        ping.assert_async().await;
    }
}
