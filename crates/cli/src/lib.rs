//! Shared plumbing for the `expressway-get-creds` tools.

pub mod args;
pub mod telemetry;

use std::{
    io::{self, Write},
    process::ExitCode,
};

use {
    serde_json::Value,
    stunner_config::StunnerConfig,
    stunner_expressway::{FlowResult, GatewaySession, JoinFlow, LegacyFlow, output},
    tracing::{debug, error},
};

use crate::args::TargetArgs;

/// Legacy `/api/v1` negotiation; yields the WebRTC media configuration.
pub async fn legacy_credentials(target: &TargetArgs, config: &StunnerConfig) -> FlowResult<Value> {
    let session = GatewaySession::new(&target.domain, &config.gateway)?;
    LegacyFlow::new(session, target.telephonenumber.as_str(), config)
        .run()
        .await
}

/// `/api` lookup and join; yields the TURN server descriptors.
pub async fn join_credentials(
    target: &TargetArgs,
    config: &StunnerConfig,
) -> FlowResult<Vec<Value>> {
    let session = GatewaySession::new(&target.domain, &config.gateway)?;
    JoinFlow::new(session, target.telephonenumber.as_str(), config)
        .run()
        .await
}

/// Print the outcome of a run to `out` and return the process exit status.
///
/// Successful results go through `render`. Failures print whatever the
/// operator should see and are logged; a rejected login is only logged at
/// debug.
pub fn report<W, T>(
    out: &mut W,
    result: FlowResult<T>,
    render: impl FnOnce(&mut W, &T) -> io::Result<()>,
) -> u8
where
    W: Write,
{
    let (code, written) = match result {
        Ok(value) => (0, render(out, &value)),
        Err(err) => {
            if err.is_silent() {
                debug!(error = %err, "negotiation stopped");
            } else {
                error!(error = %err, "negotiation failed");
            }
            (err.exit_code(), output::write_failure(out, &err))
        },
    };
    match written.and_then(|()| out.flush()) {
        Ok(()) => code,
        Err(e) => {
            error!(error = %e, "failed to write output");
            1
        },
    }
}

/// [`report`] against stdout.
pub fn conclude<T>(
    result: FlowResult<T>,
    render: impl FnOnce(&mut io::StdoutLock<'static>, &T) -> io::Result<()>,
) -> ExitCode {
    let mut stdout = io::stdout().lock();
    ExitCode::from(report(&mut stdout, result, render))
}
