//! Legacy (`/api/v1`) guest negotiation.
//!
//! Session bootstrap, conference search, guest registration, login, stream
//! subscription and finally one pushed update on the subscription's
//! WebSocket. Each step feeds the next; any gap is a hard stop.

use std::time::Duration;

use {
    secrecy::SecretString,
    serde_json::Value,
    stunner_config::StunnerConfig,
    tracing::{debug, info},
};

use crate::{
    error::{FlowError, FlowResult},
    session::GatewaySession,
    types::{
        CreateStream, GuestCredentials, GuestRegister, Login, SearchGuestConference, XSRF_COOKIE,
    },
    updates::{self, StreamSubscription, UpdatesOptions},
};

const LOGIN_SUCCESS: &str = "success";

/// Drives the legacy negotiation for one dialed number.
#[derive(Debug)]
pub struct LegacyFlow {
    session: GatewaySession,
    numeric_id: String,
    display_name: String,
    updates: UpdatesOptions,
}

impl LegacyFlow {
    pub fn new(session: GatewaySession, numeric_id: impl Into<String>, config: &StunnerConfig) -> Self {
        Self {
            session,
            numeric_id: numeric_id.into(),
            display_name: config.guest.display_name.clone(),
            updates: UpdatesOptions {
                receive_timeout: Duration::from_secs(config.updates.receive_timeout_secs),
                accept_invalid_certs: config.gateway.accept_invalid_certs,
            },
        }
    }

    pub fn session(&self) -> &GatewaySession {
        &self.session
    }

    /// Run every step and return the pushed WebRTC media configuration.
    pub async fn run(mut self) -> FlowResult<Value> {
        let subscription = self.negotiate().await?;
        let media = updates::receive_media_configuration(&subscription, self.updates).await?;
        info!(id = %subscription.id, "received media configuration");
        Ok(media)
    }

    /// Steps up to and including stream creation.
    pub async fn negotiate(&mut self) -> FlowResult<StreamSubscription> {
        self.bootstrap().await?;
        let token = self.search_conference().await?;
        let credentials = self.register_guest(&token).await?;
        let login_status = self.login(&credentials).await?;
        self.open_stream(&login_status).await
    }

    /// `GET /` to pick up the initial session cookies.
    pub async fn bootstrap(&mut self) -> FlowResult<()> {
        self.session.get("/", &[], None).await?;
        Ok(())
    }

    /// Resolve the dialed number to a guest token.
    pub async fn search_conference(&mut self) -> FlowResult<Value> {
        let body = SearchGuestConference {
            numeric_id: &self.numeric_id,
            secret: None,
            passcode: None,
        };
        let resp = self
            .session
            .post_json("/api/v1/search-guest-conference", &body)
            .await?;
        let token = resp.require("token")?.clone();
        debug!(numeric_id = %self.numeric_id, "conference found");
        Ok(token)
    }

    /// Register the placeholder guest and collect its transient credentials.
    pub async fn register_guest(&mut self, token: &Value) -> FlowResult<GuestCredentials> {
        let body = GuestRegister {
            numeric_id: &self.numeric_id,
            secret: None,
            passcode: None,
            display_name: &self.display_name,
            token,
        };
        let resp = self.session.post_json("/api/v1/guest-register", &body).await?;
        let credentials = GuestCredentials {
            username: resp.require_str("username")?.to_string(),
            password: SecretString::new(resp.require_str("password")?.to_string()),
        };
        debug!(username = %credentials.username, "guest registered");
        Ok(credentials)
    }

    /// Log in and return the gateway's `result` value.
    pub async fn login(&mut self, credentials: &GuestCredentials) -> FlowResult<Value> {
        let resp = self
            .session
            .post_json("/api/v1/login", &Login::from_credentials(credentials))
            .await?;
        let status = resp.require("result")?.clone();
        ensure_login_succeeded(&status)?;
        debug!("guest logged in");
        Ok(status)
    }

    /// Prime the stream state, create a subscription and gather what the
    /// update handshake needs.
    ///
    /// `login_status` is the login step's `result`. It is checked again here
    /// in place of the stream response's own `result`, which is never read.
    pub async fn open_stream(&mut self, login_status: &Value) -> FlowResult<StreamSubscription> {
        self.session.get("/api/v1/streams", &[], None).await?;

        let resp = self
            .session
            .post_json("/api/v1/streams", &CreateStream::default())
            .await?;
        ensure_login_succeeded(login_status)?;
        let id = resp.require("id")?.clone();

        // Cookies as they apply to the updates path, which may be narrower
        // than the origin.
        let path = updates::updates_path(&id);
        let xsrf_token = self
            .session
            .cookie(&path, XSRF_COOKIE)
            .ok_or(FlowError::MissingCookie { name: XSRF_COOKIE })?;

        let subscription = StreamSubscription {
            updates_url: updates::updates_url(self.session.origin(), &id),
            cookie_header: self.session.cookie_header(&path),
            xsrf_token,
            id,
        };
        debug!(url = %subscription.updates_url, "stream subscription created");
        Ok(subscription)
    }
}

fn ensure_login_succeeded(status: &Value) -> FlowResult<()> {
    if status.as_str() == Some(LOGIN_SUCCESS) {
        Ok(())
    } else {
        Err(FlowError::LoginRejected {
            result: status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        mockito::{Matcher, Mock, ServerGuard},
        serde_json::json,
    };

    const NUMBER: &str = "5551234";

    fn flow(server: &ServerGuard) -> LegacyFlow {
        let config = StunnerConfig::default();
        let session = GatewaySession::new(&server.url(), &config.gateway).unwrap();
        LegacyFlow::new(session, NUMBER, &config)
    }

    async fn bootstrap_mock(server: &mut ServerGuard) -> Mock {
        server
            .mock("GET", "/")
            .with_header("set-cookie", "CMA-XSRF-TOKEN=abc; Path=/")
            .with_header("set-cookie", "JSESSIONID=j1; Path=/")
            .with_body("<html/>")
            .create_async()
            .await
    }

    async fn search_mock(server: &mut ServerGuard, body: &str) -> Mock {
        server
            .mock("POST", "/api/v1/search-guest-conference")
            .match_body(Matcher::Json(
                json!({"numericId": NUMBER, "secret": null, "passcode": null}),
            ))
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn register_mock(server: &mut ServerGuard) -> Mock {
        server
            .mock("POST", "/api/v1/guest-register")
            .match_body(Matcher::PartialJson(json!({
                "numericId": NUMBER,
                "secret": null,
                "passcode": null,
                "displayName": "⚠",
                "token": "T",
            })))
            .with_body(r#"{"username":"guest-77","password":"pw-77"}"#)
            .create_async()
            .await
    }

    async fn login_mock(server: &mut ServerGuard, result: &str) -> Mock {
        server
            .mock("POST", "/api/v1/login")
            .match_body(Matcher::Json(
                json!({"username": "guest-77", "password": "pw-77"}),
            ))
            .with_body(format!(r#"{{"result":"{result}"}}"#))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn negotiates_a_subscription() {
        let mut server = mockito::Server::new_async().await;
        let root = bootstrap_mock(&mut server).await;
        let search = search_mock(&mut server, r#"{"token":"T"}"#).await;
        let register = register_mock(&mut server).await;
        let login = login_mock(&mut server, "success").await;
        let prime = server
            .mock("GET", "/api/v1/streams")
            .match_header("csrf-token", "abc")
            .with_body("[]")
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v1/streams")
            .match_header("csrf-token", "abc")
            .match_body(Matcher::Json(json!({"subscriptions": []})))
            .with_body(r#"{"id":"sub-9"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        let sub = flow.negotiate().await.unwrap();

        for m in [root, search, register, login, prime, create] {
            m.assert_async().await;
        }
        assert_eq!(sub.id, json!("sub-9"));
        assert_eq!(sub.xsrf_token, "abc");
        let host = server.host_with_port();
        assert_eq!(
            sub.updates_url,
            format!("ws://{host}/api/v1/streams/sub-9/updates")
        );
        assert!(sub.cookie_header.contains("CMA-XSRF-TOKEN=abc"));
        assert!(sub.cookie_header.contains("JSESSIONID=j1"));
    }

    #[tokio::test]
    async fn search_token_is_forwarded_to_registration() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _search = search_mock(&mut server, r#"{"token":"T"}"#).await;
        let register = register_mock(&mut server).await;

        let mut flow = flow(&server);
        flow.bootstrap().await.unwrap();
        let token = flow.search_conference().await.unwrap();
        let creds = flow.register_guest(&token).await.unwrap();

        register.assert_async().await;
        assert_eq!(creds.username, "guest-77");
    }

    #[tokio::test]
    async fn missing_token_stops_before_registration() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _search = search_mock(&mut server, r#"{"error":"conference not found"}"#).await;
        let register = server
            .mock("POST", "/api/v1/guest-register")
            .expect(0)
            .create_async()
            .await;

        let err = flow(&server).negotiate().await.unwrap_err();

        register.assert_async().await;
        assert_eq!(err.exit_code(), 1);
        match err {
            FlowError::MissingField { field, response } => {
                assert_eq!(field, "token");
                assert_eq!(response, r#"{"error":"conference not found"}"#);
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_password_is_a_hard_stop() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _search = search_mock(&mut server, r#"{"token":"T"}"#).await;
        let _register = server
            .mock("POST", "/api/v1/guest-register")
            .with_body(r#"{"username":"guest-77"}"#)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api/v1/login")
            .expect(0)
            .create_async()
            .await;

        let err = flow(&server).negotiate().await.unwrap_err();
        login.assert_async().await;
        assert!(matches!(
            err,
            FlowError::MissingField {
                field: "password",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejected_login_stops_silently() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _search = search_mock(&mut server, r#"{"token":"T"}"#).await;
        let _register = register_mock(&mut server).await;
        let _login = login_mock(&mut server, "failure").await;
        let prime = server
            .mock("GET", "/api/v1/streams")
            .expect(0)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v1/streams")
            .expect(0)
            .create_async()
            .await;

        let err = flow(&server).negotiate().await.unwrap_err();

        prime.assert_async().await;
        create.assert_async().await;
        assert!(err.is_silent());
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err, FlowError::LoginRejected { ref result } if result == "failure"));
    }

    #[tokio::test]
    async fn login_result_must_be_exactly_success() {
        for result in ["Success", "success ", "ok"] {
            let mut server = mockito::Server::new_async().await;
            let _root = bootstrap_mock(&mut server).await;
            let _search = search_mock(&mut server, r#"{"token":"T"}"#).await;
            let _register = register_mock(&mut server).await;
            let _login = login_mock(&mut server, result).await;

            let err = flow(&server).negotiate().await.unwrap_err();
            assert!(err.is_silent(), "{result}: {err:?}");
        }
    }

    #[tokio::test]
    async fn stream_response_result_is_not_consulted() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _prime = server
            .mock("GET", "/api/v1/streams")
            .with_body("[]")
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/api/v1/streams")
            .with_body(r#"{"id":3,"result":"failure"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.bootstrap().await.unwrap();
        let sub = flow.open_stream(&json!("success")).await.unwrap();
        assert_eq!(sub.id, json!(3));
        assert!(sub.updates_url.ends_with("/api/v1/streams/3/updates"));
    }

    #[tokio::test]
    async fn stream_without_id_is_a_hard_stop() {
        let mut server = mockito::Server::new_async().await;
        let _root = bootstrap_mock(&mut server).await;
        let _prime = server
            .mock("GET", "/api/v1/streams")
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/api/v1/streams")
            .with_body(r#"{"result":"success"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.bootstrap().await.unwrap();
        let err = flow.open_stream(&json!("success")).await.unwrap_err();
        assert!(matches!(err, FlowError::MissingField { field: "id", .. }));
    }

    #[tokio::test]
    async fn missing_xsrf_cookie_is_a_hard_stop() {
        let mut server = mockito::Server::new_async().await;
        let _root = server.mock("GET", "/").create_async().await;
        let _prime = server
            .mock("GET", "/api/v1/streams")
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/api/v1/streams")
            .with_body(r#"{"id":"s"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.bootstrap().await.unwrap();
        let err = flow.open_stream(&json!("success")).await.unwrap_err();
        assert!(matches!(err, FlowError::MissingCookie { name: "CMA-XSRF-TOKEN" }));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn api_scoped_xsrf_cookie_reaches_the_subscription() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_header("set-cookie", "CMA-XSRF-TOKEN=abc; Path=/api")
            .with_header("set-cookie", "JSESSIONID=j1; Path=/")
            .create_async()
            .await;
        let prime = server
            .mock("GET", "/api/v1/streams")
            .match_header("csrf-token", "abc")
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v1/streams")
            .match_header("csrf-token", "abc")
            .with_body(r#"{"id":"s"}"#)
            .create_async()
            .await;

        let mut flow = flow(&server);
        flow.bootstrap().await.unwrap();
        let sub = flow.open_stream(&json!("success")).await.unwrap();

        prime.assert_async().await;
        create.assert_async().await;
        assert_eq!(sub.xsrf_token, "abc");
        assert!(sub.cookie_header.contains("CMA-XSRF-TOKEN=abc"));
        assert!(sub.cookie_header.contains("JSESSIONID=j1"));
    }

    #[tokio::test]
    async fn base_path_carries_into_the_updates_url() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/webapp/")
            .with_header("set-cookie", "CMA-XSRF-TOKEN=abc; Path=/webapp")
            .create_async()
            .await;
        let _prime = server
            .mock("GET", "/webapp/api/v1/streams")
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/webapp/api/v1/streams")
            .with_body(r#"{"id":"s"}"#)
            .create_async()
            .await;

        let config = StunnerConfig::default();
        let session =
            GatewaySession::new(&format!("{}/webapp", server.url()), &config.gateway).unwrap();
        let mut flow = LegacyFlow::new(session, NUMBER, &config);
        flow.bootstrap().await.unwrap();
        let sub = flow.open_stream(&json!("success")).await.unwrap();

        let host = server.host_with_port();
        assert_eq!(
            sub.updates_url,
            format!("ws://{host}/webapp/api/v1/streams/s/updates")
        );
        assert_eq!(sub.xsrf_token, "abc");
    }

    #[test]
    fn login_status_check_is_exact() {
        assert!(ensure_login_succeeded(&json!("success")).is_ok());
        assert!(ensure_login_succeeded(&json!(true)).is_err());
        assert!(ensure_login_succeeded(&Value::Null).is_err());
    }
}
