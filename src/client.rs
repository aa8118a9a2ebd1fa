use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{Connector, MaybeTlsStream, connect_async_tls_with_config};
use url::Url;

use crate::chunk::ChunkSource;
use crate::config::TestConfig;
use crate::deadline::with_deadline;
use crate::emitter::Emitter;
use crate::error::{Result, SpeedError};
use crate::latency;
use crate::params;
use crate::protocol::{StatusReport, TestKind};
use crate::summary::{LatencyResult, SpeedTestResult, SubTestResult, ThroughputResult};
use crate::transfer::{self, Direction};

/// Type alias for the WebSocket stream
pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs measurements against one server.
pub struct Client {
    config: TestConfig,
    http: reqwest::Client,
    upload_source: ChunkSource,
}

impl Client {
    /// Create a client for an already validated configuration.
    pub fn new(config: TestConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .build()?;
        Ok(Client {
            config,
            http,
            upload_source: ChunkSource::new(params::UNIT_SIZE),
        })
    }

    /// The configuration this client runs with.
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Body of one upload unit.
    pub(crate) fn upload_body(&self) -> Bytes {
        self.upload_source.chunk()
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.config.server().clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{path}"));
        url.set_query(None);
        url
    }

    fn cache_busted(&self, path: &str) -> Url {
        let mut url = self.endpoint(path);
        url.query_pairs_mut().append_pair(
            params::CACHE_BUST_QUERY_KEY,
            &rand::random::<u64>().to_string(),
        );
        url
    }

    /// URL of the echo WebSocket (`ws` for `http`, `wss` for `https`).
    pub fn echo_url(&self) -> Result<Url> {
        let mut url = self.endpoint(params::ECHO_URL_PATH);
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(SpeedError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| SpeedError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// URL streaming `chunks` chunks, with a unique cache-busting parameter.
    pub fn download_url(&self, chunks: u64) -> Url {
        let mut url = self.cache_busted(params::DOWNLOAD_URL_PATH);
        url.query_pairs_mut()
            .append_pair(params::SIZE_QUERY_KEY, &chunks.to_string());
        url
    }

    /// Upload URL, with a unique cache-busting parameter.
    pub fn upload_url(&self) -> Url {
        self.cache_busted(params::UPLOAD_URL_PATH)
    }

    /// Establish the echo WebSocket connection.
    pub async fn connect(&self) -> Result<WsStream> {
        let request = self.echo_url()?.to_string().into_client_request()?;

        // Connect using rustls for TLS.
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        let connector = Connector::Rustls(Arc::new(tls_config));
        // Probes are tiny, so Nagle would only delay them.
        let (ws_stream, _response) =
            connect_async_tls_with_config(request, None, true, Some(connector)).await?;

        Ok(ws_stream)
    }

    /// Fetch the server's status report.
    pub async fn server_status(&self) -> Result<StatusReport> {
        let response = self
            .http
            .get(self.endpoint(params::STATUS_URL_PATH))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SpeedError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Run the latency subtest without a deadline.
    pub async fn run_latency(&self) -> Result<LatencyResult> {
        let ws = self.connect().await?;
        latency::run(ws, self.config.ping_count()).await
    }

    /// Run the download subtest without a deadline.
    pub async fn run_download(&self) -> Result<ThroughputResult> {
        transfer::run(self, Direction::Download, self.config.download_units()).await
    }

    /// Run the upload subtest without a deadline.
    pub async fn run_upload(&self) -> Result<ThroughputResult> {
        transfer::run(self, Direction::Upload, self.config.upload_units()).await
    }

    /// Run latency, download and upload one after another.
    ///
    /// Each subtest gets its own deadline and its own failure slot: an error
    /// in one never prevents the others from running.
    pub async fn run(&self, emitter: &mut dyn Emitter) -> SpeedTestResult {
        let latency = self
            .subtest(TestKind::Latency, emitter, self.run_latency())
            .await;
        let download = self
            .subtest(TestKind::Download, emitter, self.run_download())
            .await;
        let upload = self
            .subtest(TestKind::Upload, emitter, self.run_upload())
            .await;

        let result = SpeedTestResult {
            latency,
            download,
            upload,
        };
        if let Err(e) = emitter.on_summary(&result) {
            tracing::warn!("cannot emit summary: {e}");
        }
        result
    }

    async fn subtest<T, F>(
        &self,
        test: TestKind,
        emitter: &mut dyn Emitter,
        op: F,
    ) -> SubTestResult<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Err(e) = emitter.on_starting(test) {
            tracing::warn!("cannot emit start of {test:?}: {e}");
        }

        let outcome = with_deadline(self.config.deadline(), op).await;
        let emitted = match &outcome {
            Ok(_) => {
                tracing::info!("{test:?} subtest complete");
                emitter.on_complete(test)
            }
            Err(e) => {
                tracing::warn!("{test:?} subtest failed: {e}");
                emitter.on_error(test, &e.to_string())
            }
        };
        if let Err(e) = emitted {
            tracing::warn!("cannot emit result of {test:?}: {e}");
        }
        outcome.into()
    }
}

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawTestConfig;

    fn client_for(server: &str) -> Client {
        let raw = RawTestConfig {
            server: Some(server.into()),
            ..Default::default()
        };
        Client::new(TestConfig::try_from(raw).unwrap()).unwrap()
    }

    #[test]
    fn echo_url_switches_scheme() {
        let plain = client_for("http://test.local:8080");
        assert_eq!(plain.echo_url().unwrap().as_str(), "ws://test.local:8080/ws");

        let tls = client_for("https://test.local/speed/");
        assert_eq!(tls.echo_url().unwrap().as_str(), "wss://test.local/speed/ws");
    }

    #[test]
    fn transfer_urls_are_unique() {
        let client = client_for("http://test.local");
        let a = client.download_url(16);
        let b = client.download_url(16);

        assert_eq!(a.path(), "/download");
        assert_ne!(a, b);
        assert!(a.query_pairs().any(|(k, v)| k == "size" && v == "16"));
        assert!(a.query_pairs().any(|(k, _)| k == "t"));

        let up = client.upload_url();
        assert_eq!(up.path(), "/upload");
        assert_ne!(up, client.upload_url());
    }

    #[test]
    fn upload_body_is_one_unit() {
        let client = client_for("http://test.local");
        assert_eq!(client.upload_body().len(), params::UNIT_SIZE);
    }

    #[tokio::test]
    #[ignore]
    async fn test_status_real_server() {
        let client = client_for("http://127.0.0.1:8080");
        let status = client.server_status().await.unwrap();
        assert_eq!(status.status, "OK");
    }
}
