use std::{env, time::Duration};

use async_trait::async_trait;
use dotenv::dotenv;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;
pub const DEFAULT_WRITE_BACKOFF: Duration = Duration::from_millis(100);
/// Floor applied when the caller brings no deadline of its own.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ERROR_BODY_LIMIT: usize = 512;

pub struct ClickhouseConnection {
    pub url: String,
}

pub fn clickhouse_connection() -> Result<ClickhouseConnection, env::VarError> {
    dotenv().ok();

    Ok(ClickhouseConnection { url: env::var("CLICKHOUSE_URL")? })
}

#[derive(Error, Debug)]
pub enum ClickhouseConnectionError {
    #[error("The clickhouse env vars are wrong please check your environment: {0}")]
    ConfigWrong(#[from] env::VarError),
}

#[derive(Error, Debug)]
pub enum ClickhouseError {
    #[error("Failed to reach clickhouse: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Clickhouse returned http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not parse clickhouse response row: {0}")]
    InvalidRow(#[from] serde_json::Error),
}

/// The two operations the engine needs from the column store, kept narrow so
/// tests can substitute an in-process double.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn insert_json_each_row(
        &self,
        table: &str,
        rows: &[Value],
    ) -> Result<(), ClickhouseError>;

    async fn query_json_each_row(&self, sql: &str) -> Result<Vec<Value>, ClickhouseError>;
}

/// Table identifiers are limited to `[A-Za-z0-9_.]`; anything else becomes
/// an underscore before it reaches the query string.
fn sanitize_table(table: &str) -> String {
    table
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// HTTP client for ClickHouse's `?query=` interface. Inserts POST
/// newline-delimited JSON, queries GET it back. An empty or non-http(s)
/// endpoint disables the client: every operation becomes a successful no-op.
pub struct ClickhouseClient {
    http: reqwest::Client,
    endpoint: Option<Url>,
    credentials: Option<(String, String)>,
    max_attempts: u32,
    backoff_base: Duration,
    request_timeout: Duration,
}

impl ClickhouseClient {
    pub fn new(dsn: &str) -> Self {
        let parsed = match dsn.trim() {
            "" => None,
            trimmed => match Url::parse(trimmed) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    warn!(scheme = url.scheme(), "clickhouse endpoint has no http(s) scheme, writes are disabled");
                    None
                }
                Err(error) => {
                    warn!(%error, "clickhouse endpoint does not parse, writes are disabled");
                    None
                }
            },
        };

        // Userinfo moves out of the URL and into basic auth so it cannot
        // leak through request logging.
        let (endpoint, credentials) = match parsed {
            Some(mut url) => {
                let credentials = if url.username().is_empty() {
                    None
                } else {
                    Some((
                        url.username().to_string(),
                        url.password().unwrap_or_default().to_string(),
                    ))
                };
                if credentials.is_some() {
                    let _ = url.set_username("");
                    let _ = url.set_password(None);
                }
                (Some(url), credentials)
            }
            None => (None, None),
        };

        ClickhouseClient {
            http: reqwest::Client::new(),
            endpoint,
            credentials,
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
            backoff_base: DEFAULT_WRITE_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, ClickhouseConnectionError> {
        let connection = clickhouse_connection()?;
        Ok(ClickhouseClient::new(&connection.url))
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, ClickhouseError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<ClickhouseError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self.backoff_base * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            let mut request = build().timeout(self.request_timeout);
            if let Some((user, password)) = &self.credentials {
                request = request.basic_auth(user, Some(password));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retriable = status.as_u16() == 429 || status.is_server_error();
                    let mut body = response.text().await.unwrap_or_default();
                    body.truncate(ERROR_BODY_LIMIT);
                    let error = ClickhouseError::Status { status: status.as_u16(), body };

                    if retriable {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(error) => {
                    last_error = Some(ClickhouseError::Transport(error));
                }
            }
        }

        Err(last_error.unwrap_or(ClickhouseError::Status {
            status: 0,
            body: "no attempt was dispatched".to_string(),
        }))
    }
}

#[async_trait]
impl Sink for ClickhouseClient {
    async fn insert_json_each_row(
        &self,
        table: &str,
        rows: &[Value],
    ) -> Result<(), ClickhouseError> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let table = sanitize_table(table);
        let query = format!("INSERT INTO {table} FORMAT JSONEachRow");
        let body = rows.iter().map(Value::to_string).collect::<Vec<_>>().join("\n");

        self.send_with_retry(|| {
            self.http
                .post(endpoint.clone())
                .query(&[("query", query.as_str())])
                .body(body.clone())
        })
        .await?;

        Ok(())
    }

    async fn query_json_each_row(&self, sql: &str) -> Result<Vec<Value>, ClickhouseError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(Vec::new());
        };

        let response = self
            .send_with_retry(|| self.http.get(endpoint.clone()).query(&[("query", sql)]))
            .await?;

        let text = response.text().await.map_err(ClickhouseError::Transport)?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(ClickhouseError::InvalidRow))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn fast_client(url: &str) -> ClickhouseClient {
        ClickhouseClient::new(url).with_retry(3, Duration::from_millis(1))
    }

    #[test]
    fn table_sanitization_keeps_word_chars_only() {
        assert_eq!(sanitize_table("token_transfers"), "token_transfers");
        assert_eq!(sanitize_table("db.logs"), "db.logs");
        assert_eq!(sanitize_table("logs;drop table"), "logs_drop_table");
    }

    #[tokio::test]
    async fn insert_posts_newline_delimited_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_query(Matcher::UrlEncoded(
                "query".to_string(),
                "INSERT INTO logs FORMAT JSONEachRow".to_string(),
            ))
            .match_body("{\"a\":1}\n{\"a\":2}")
            .with_status(200)
            .create_async()
            .await;

        let client = fast_client(&server.url());
        client
            .insert_json_each_row("logs", &[json!({"a": 1}), json!({"a": 2})])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn insert_sanitizes_the_table_identifier() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_query(Matcher::UrlEncoded(
                "query".to_string(),
                "INSERT INTO logs_drop_x FORMAT JSONEachRow".to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let client = fast_client(&server.url());
        client.insert_json_each_row("logs;drop x", &[json!({"a": 1})]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retriable_statuses_are_bounded_by_the_attempt_budget() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(503).expect(3).create_async().await;

        let client = fast_client(&server.url());
        let result = client.insert_json_each_row("logs", &[json!({"a": 1})]).await;
        assert!(matches!(result, Err(ClickhouseError::Status { status: 503, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_terminal() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body("syntax error")
            .expect(1)
            .create_async()
            .await;

        let client = fast_client(&server.url());
        let result = client.insert_json_each_row("logs", &[json!({"a": 1})]).await;
        match result {
            Err(ClickhouseError::Status { status: 400, body }) => assert_eq!(body, "syntax error"),
            other => panic!("expected terminal 400, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn disabled_endpoints_no_op() {
        for dsn in ["", "ftp://columns.example.com", "not a url"] {
            let client = ClickhouseClient::new(dsn);
            assert!(!client.is_enabled());
            client.insert_json_each_row("logs", &[json!({"a": 1})]).await.unwrap();
            assert_eq!(client.query_json_each_row("SELECT 1").await.unwrap(), Vec::<Value>::new());
        }
    }

    #[tokio::test]
    async fn empty_row_batches_never_touch_the_network() {
        let client = ClickhouseClient::new("http://127.0.0.1:1");
        client.insert_json_each_row("logs", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn query_parses_json_each_row_lines() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("query".to_string(), "SELECT 1".to_string()))
            .with_status(200)
            .with_body("{\"n\":1}\n{\"n\":2}\n")
            .create_async()
            .await;

        let client = fast_client(&server.url());
        let rows = client.query_json_each_row("SELECT 1").await.unwrap();
        assert_eq!(rows, vec![json!({"n": 1}), json!({"n": 2})]);
    }

    #[tokio::test]
    async fn credentials_move_into_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        // user:pass base64 = dXNlcjpwYXNz
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .with_status(200)
            .create_async()
            .await;

        let url = server.url().replace("http://", "http://user:pass@");
        let client = fast_client(&url);
        client.insert_json_each_row("logs", &[json!({"a": 1})]).await.unwrap();
        mock.assert_async().await;
    }
}
