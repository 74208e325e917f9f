//! One-shot reader for the legacy `streams/{id}/updates` WebSocket.
//!
//! The gateway pushes a JSON array as soon as the subscription is live; the
//! first element carries the WebRTC media configuration.

use std::{sync::Arc, time::Duration};

use {
    futures::{SinkExt, StreamExt},
    rustls::{
        ClientConfig, DigitallySignedStruct, SignatureScheme,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature},
        pki_types::{CertificateDer, ServerName, UnixTime},
    },
    serde_json::Value,
    tokio::io::{AsyncRead, AsyncWrite},
    tokio_tungstenite::{
        Connector, WebSocketStream, connect_async_tls_with_config,
        tungstenite::{
            Message,
            client::IntoClientRequest,
            http::{HeaderValue, header},
        },
    },
    tracing::{debug, trace},
};

use crate::error::{FlowError, FlowResult};

/// Key inside the first pushed element that holds the media configuration.
pub const MEDIA_CONFIGURATION_KEY: &str = "webRtcMediaConfiguration";

/// Handle for a live stream subscription plus what the handshake needs.
#[derive(Debug, Clone)]
pub struct StreamSubscription {
    /// Server-assigned subscription id, as returned.
    pub id: Value,
    pub updates_url: String,
    /// Session cookies as `a=1;b=2`.
    pub cookie_header: String,
    /// Sent as `Sec-WebSocket-Protocol`.
    pub xsrf_token: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdatesOptions {
    pub receive_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for UpdatesOptions {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_secs(2),
            accept_invalid_certs: true,
        }
    }
}

/// Connect, read the first data frame and return the media configuration.
pub async fn receive_media_configuration(
    subscription: &StreamSubscription,
    options: UpdatesOptions,
) -> FlowResult<Value> {
    let frame = receive_first_update(
        &subscription.updates_url,
        &subscription.cookie_header,
        &subscription.xsrf_token,
        options,
    )
    .await?;
    extract_media_configuration(&frame)
}

/// Open the update stream, wait for one data frame and close the socket.
///
/// Ping and pong frames that arrive first are skipped; the timeout covers
/// the whole wait, not each frame.
pub async fn receive_first_update(
    url: &str,
    cookie_header: &str,
    protocol: &str,
    options: UpdatesOptions,
) -> FlowResult<String> {
    let mut request = url.into_client_request()?;
    let headers = request.headers_mut();
    if !cookie_header.is_empty() {
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header)?);
    }
    headers.insert(
        header::SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_str(protocol)?,
    );

    let connector = if !url.starts_with("wss://") {
        None
    } else if options.accept_invalid_certs {
        Some(Connector::Rustls(Arc::new(insecure_client_config()?)))
    } else {
        // The verifying connector is built by tungstenite from the process
        // default provider; more than one may be compiled in.
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            trace!("crypto provider already installed");
        }
        None
    };

    debug!(url, "opening update stream");
    let (mut ws, response) = connect_async_tls_with_config(request, None, false, connector).await?;
    debug!(status = %response.status(), "update stream open");

    let frame = tokio::time::timeout(options.receive_timeout, next_data_frame(&mut ws))
        .await
        .map_err(|_| FlowError::Timeout(options.receive_timeout))?;

    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "closing update stream failed");
    }
    frame
}

async fn next_data_frame<S>(ws: &mut WebSocketStream<S>) -> FlowResult<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => {
                trace!(frame = %text.as_str(), "update frame");
                return Ok(text.as_str().to_owned());
            },
            Message::Binary(data) => return Ok(String::from_utf8_lossy(&data).into_owned()),
            Message::Close(_) => return Err(FlowError::StreamClosed),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        }
    }
    Err(FlowError::StreamClosed)
}

/// Pull `[0].webRtcMediaConfiguration` out of a pushed frame.
pub fn extract_media_configuration(frame: &str) -> FlowResult<Value> {
    let missing = || FlowError::missing(MEDIA_CONFIGURATION_KEY, frame);
    let parsed: Value = serde_json::from_str(frame).map_err(|_| missing())?;
    parsed
        .get(0)
        .and_then(|first| first.get(MEDIA_CONFIGURATION_KEY))
        .cloned()
        .ok_or_else(missing)
}

/// Path of a subscription's update stream, relative to the gateway origin.
pub fn updates_path(id: &Value) -> String {
    let id = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("/api/v1/streams/{id}/updates")
}

/// Updates URL for a subscription: `wss://` for https origins, `ws://` for
/// plain http lab targets. A base path on the origin is kept.
pub fn updates_url(origin: &url::Url, id: &Value) -> String {
    let scheme = if origin.scheme() == "http" { "ws" } else { "wss" };
    let host = origin.host_str().unwrap_or_default();
    let authority = match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let base_path = origin.path().trim_end_matches('/');
    format!("{scheme}://{authority}{base_path}{}", updates_path(id))
}

// ── TLS ────────────────────────────────────────────────────────────────────

/// Accepts any certificate chain and server name. Handshake signatures are
/// still verified.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

fn insecure_client_config() -> FlowResult<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
        .with_no_client_auth();
    Ok(config)
}
