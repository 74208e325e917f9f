//! Current (`/api`) guest join: a number lookup followed by a join that
//! returns the TURN servers directly.

use {
    reqwest::StatusCode,
    serde_json::Value,
    stunner_config::StunnerConfig,
    tracing::{debug, info},
};

use crate::{
    error::{FlowError, FlowResult},
    session::GatewaySession,
    types::{Join, Lookup},
};

/// Key of the TURN server list in the join response.
pub const TURN_SERVERS_KEY: &str = "turnServers";

/// Drives the two-call join for one dialed number.
#[derive(Debug)]
pub struct JoinFlow {
    session: GatewaySession,
    numeric_id: String,
    display_name: String,
    user_agent: String,
}

impl JoinFlow {
    pub fn new(session: GatewaySession, numeric_id: impl Into<String>, config: &StunnerConfig) -> Self {
        Self {
            session,
            numeric_id: numeric_id.into(),
            display_name: config.guest.display_name.clone(),
            user_agent: config.guest.join_user_agent.clone(),
        }
    }

    /// Bootstrap, look up the number and join; returns the TURN server
    /// descriptors in the order the gateway listed them.
    pub async fn run(mut self) -> FlowResult<Vec<Value>> {
        self.session.get("/", &[], None).await?;
        self.lookup().await?;
        let servers = self.join().await?;
        info!(count = servers.len(), "received TURN servers");
        Ok(servers)
    }

    /// Only an HTTP 400 counts as a rejection; any other answer lets the
    /// join go ahead.
    pub async fn lookup(&mut self) -> FlowResult<()> {
        let body = Lookup {
            numeric_id: &self.numeric_id,
            passcode: "",
        };
        let resp = self.session.post_json_with_status("/api/lookup", &body).await?;
        if resp.status == StatusCode::BAD_REQUEST {
            return Err(FlowError::InvalidNumber { body: resp.text });
        }
        debug!(status = %resp.status, "number accepted");
        Ok(())
    }

    pub async fn join(&mut self) -> FlowResult<Vec<Value>> {
        let body = Join {
            numeric_id: &self.numeric_id,
            passcode: "",
            trace: "false",
            display_name: &self.display_name,
            user_agent: &self.user_agent,
        };
        let resp = self.session.post_json("/api/join", &body).await?;
        resp.require(TURN_SERVERS_KEY)?
            .as_array()
            .cloned()
            .ok_or_else(|| FlowError::missing(TURN_SERVERS_KEY, &resp))
    }
}
