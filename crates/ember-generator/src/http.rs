use crate::CodeGenerator;
use async_trait::async_trait;
use ember_core::{GenerateError, ShortToken};
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://clck.ru/--";
pub const DEFAULT_QUERY_PARAM: &str = "url";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach the shortening service.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HttpGeneratorConfig {
    /// Base URL of the service; the destination is appended as a query parameter.
    #[builder(default = DEFAULT_ENDPOINT.to_string(), setter(into))]
    pub endpoint: String,
    /// Name of the query parameter carrying the destination.
    #[builder(default = DEFAULT_QUERY_PARAM.to_string(), setter(into))]
    pub query_param: String,
    /// Deadline for the whole request, including reading the body.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for HttpGeneratorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Client for a shortening service that answers
/// `GET <endpoint>?<query_param>=<url-encoded destination>` with the new
/// token as the plain-text body of a 2xx response.
#[derive(Debug, Clone)]
pub struct HttpCodeGenerator {
    client: reqwest::Client,
    endpoint: Url,
    query_param: String,
}

impl HttpCodeGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerateError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            GenerateError::Unreachable(format!("invalid endpoint '{}': {e}", config.endpoint))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerateError::Unreachable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            query_param: config.query_param,
        })
    }

    fn request_url(&self, destination: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(&self.query_param, destination);
        url
    }
}

fn classify(err: reqwest::Error) -> GenerateError {
    if err.is_timeout() {
        GenerateError::Timeout(err.to_string())
    } else if err.is_decode() {
        GenerateError::BadResponse(err.to_string())
    } else {
        GenerateError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl CodeGenerator for HttpCodeGenerator {
    async fn generate(&self, destination: &str) -> Result<ShortToken, GenerateError> {
        let url = self.request_url(destination);
        debug!(endpoint = %self.endpoint, "requesting short token");

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "shortening service rejected request");
            return Err(GenerateError::BadResponse(format!(
                "unexpected status {}",
                status
            )));
        }

        let body = response.text().await.map_err(classify)?;

        ShortToken::new(&body).map_err(|e| GenerateError::BadResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    async fn echo(Query(params): Query<HashMap<String, String>>) -> String {
        params.get("url").cloned().unwrap_or_default()
    }

    async fn padded() -> &'static str {
        "  abc123\r\n"
    }

    async fn empty() -> &'static str {
        ""
    }

    async fn unavailable() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(2)).await;
        "late"
    }

    async fn spawn_service() -> SocketAddr {
        let router = Router::new()
            .route("/echo", get(echo))
            .route("/padded", get(padded))
            .route("/empty", get(empty))
            .route("/unavailable", get(unavailable))
            .route("/slow", get(slow));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn generator(addr: SocketAddr, path: &str) -> HttpCodeGenerator {
        let config = HttpGeneratorConfig::builder()
            .endpoint(format!("http://{addr}{path}"))
            .timeout(Duration::from_millis(300))
            .build();
        HttpCodeGenerator::new(config).unwrap()
    }

    #[test]
    fn destination_is_url_encoded() {
        let generator = HttpCodeGenerator::new(HttpGeneratorConfig::default()).unwrap();

        let url = generator.request_url("https://example.com/a?b=c&d=e");

        assert_eq!(
            url.as_str(),
            "https://clck.ru/--?url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc%26d%3De"
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let config = HttpGeneratorConfig::builder().endpoint("not a url").build();

        assert!(HttpCodeGenerator::new(config).is_err());
    }

    #[tokio::test]
    async fn returns_body_as_token() {
        let addr = spawn_service().await;
        let destination = "https://example.com/a?b=c&d=e";

        let token = generator(addr, "/echo").generate(destination).await.unwrap();

        assert_eq!(token.as_str(), destination);
    }

    #[tokio::test]
    async fn trims_surrounding_whitespace() {
        let addr = spawn_service().await;

        let token = generator(addr, "/padded")
            .generate("https://example.com")
            .await
            .unwrap();

        assert_eq!(token.as_str(), "abc123");
    }

    #[tokio::test]
    async fn empty_body_is_a_bad_response() {
        let addr = spawn_service().await;

        let err = generator(addr, "/empty")
            .generate("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::BadResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_a_bad_response() {
        let addr = spawn_service().await;

        let err = generator(addr, "/unavailable")
            .generate("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::BadResponse(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let addr = spawn_service().await;

        let err = generator(addr, "/slow")
            .generate("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Timeout(_)));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = generator(addr, "/echo")
            .generate("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Unreachable(_)));
        assert!(err.is_transport());
    }
}
