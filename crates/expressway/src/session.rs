//! Cookie-persisting HTTP session against one gateway origin.

use std::{sync::Arc, time::Duration};

use {
    reqwest::{
        Client, Method, RequestBuilder, StatusCode,
        cookie::{CookieStore, Jar},
        header::{HeaderMap, HeaderValue},
    },
    serde::Serialize,
    stunner_config::GatewayConfig,
    tracing::{debug, trace},
    url::Url,
};

use crate::{
    error::{FlowError, FlowResult},
    types::{CSRF_HEADER, ResponseBody, XSRF_COOKIE},
};

/// Status plus raw body of a response whose status matters to the caller.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub text: String,
}

impl GatewayResponse {
    pub fn body(&self) -> ResponseBody {
        ResponseBody::parse(self.text.clone())
    }
}

/// HTTP session state accumulated over one negotiation.
///
/// Every response's `Set-Cookie` lands in the jar. Once the gateway has set
/// [`XSRF_COOKIE`], its latest value is sent as [`CSRF_HEADER`] on every
/// following request.
pub struct GatewaySession {
    client: Client,
    jar: Arc<Jar>,
    origin: Url,
    base: String,
    csrf_token: Option<HeaderValue>,
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("origin", &self.base)
            .field("csrf_token", &self.csrf_token.is_some())
            .finish()
    }
}

impl GatewaySession {
    /// Build a session for `domain`, an absolute `http(s)://` origin.
    pub fn new(domain: &str, config: &GatewayConfig) -> FlowResult<Self> {
        let origin = parse_origin(domain)?;
        let jar = Arc::new(Jar::default());

        let mut builder = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|source| FlowError::InvalidProxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy_cfg);
        }
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = config.user_agent.as_deref() {
            builder = builder.user_agent(agent);
        }

        Ok(Self {
            client: builder.build()?,
            jar,
            base: domain.trim_end_matches('/').to_string(),
            origin,
            csrf_token: None,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL of `path` under the configured origin, base path included.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Value of cookie `name` as the jar would send it with a request to
    /// `path`. Cookies scoped to a sub-path are only visible below it.
    pub fn cookie(&self, path: &str, name: &str) -> Option<String> {
        self.cookie_pairs(path)
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Cookies for a request to `path` as `a=1;b=2`, the form the update
    /// stream handshake expects.
    pub fn cookie_header(&self, path: &str) -> String {
        self.cookie_pairs(path)
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn cookie_pairs(&self, path: &str) -> Vec<(String, String)> {
        let Ok(url) = Url::parse(&self.url_for(path)) else {
            return Vec::new();
        };
        let Some(header) = self.jar.cookies(&url) else {
            return Vec::new();
        };
        let Ok(raw) = header.to_str() else {
            return Vec::new();
        };
        raw.split(';')
            .filter_map(|pair| {
                let (k, v) = pair.trim().split_once('=')?;
                Some((k.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Pick up the XSRF cookie as it applies to `path`. The last value seen
    /// stays in effect for requests the cookie is not scoped to.
    fn refresh_csrf_token(&mut self, path: &str) {
        if let Some(value) = self.cookie(path, XSRF_COOKIE)
            && let Ok(header) = HeaderValue::from_str(&value)
        {
            self.csrf_token = Some(header);
        }
    }

    fn request(&mut self, method: Method, path: &str) -> RequestBuilder {
        self.refresh_csrf_token(path);
        let mut req = self.client.request(method, self.url_for(path));
        if let Some(token) = &self.csrf_token {
            req = req.header(CSRF_HEADER, token.clone());
        }
        req
    }

    /// GET `path` and return the body text whatever the status.
    pub async fn get(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
        headers: Option<HeaderMap>,
    ) -> FlowResult<String> {
        let mut req = self.request(Method::GET, path);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(headers) = headers {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        debug!(path, status = %resp.status(), "GET");
        let text = resp.text().await?;
        trace!(path, body = %text, "response body");
        Ok(text)
    }

    /// POST `data` form-encoded and return the body text whatever the status.
    pub async fn post_form(&mut self, path: &str, data: &[(&str, &str)]) -> FlowResult<String> {
        let resp = self.request(Method::POST, path).form(data).send().await?;
        debug!(path, status = %resp.status(), "POST form");
        let text = resp.text().await?;
        trace!(path, body = %text, "response body");
        Ok(text)
    }

    /// POST a JSON body; the response is JSON when it parses, text otherwise.
    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &T,
    ) -> FlowResult<ResponseBody> {
        Ok(self.post_json_with_status(path, body).await?.body())
    }

    /// POST a JSON body and keep the status alongside the raw body.
    pub async fn post_json_with_status<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &T,
    ) -> FlowResult<GatewayResponse> {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        let status = resp.status();
        debug!(path, %status, "POST json");
        let text = resp.text().await?;
        trace!(path, body = %text, "response body");
        Ok(GatewayResponse { status, text })
    }
}

fn parse_origin(domain: &str) -> FlowResult<Url> {
    let invalid = |reason: &str| FlowError::InvalidOrigin {
        origin: domain.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(domain).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
