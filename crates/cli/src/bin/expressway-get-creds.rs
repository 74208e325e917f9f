use std::process::ExitCode;

use {
    clap::Parser,
    stunner::{
        args::{CommonArgs, TargetArgs},
        conclude, legacy_credentials,
        telemetry::init_telemetry,
    },
    stunner_expressway::{EXIT_CONFIG, output},
    tracing::{debug, error},
};

/// Fetch WebRTC media configuration (TURN credentials) through the legacy
/// Expressway guest API.
#[derive(Parser)]
#[command(name = "expressway-get-creds", version)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli.common);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        domain = %cli.target.domain,
        "expressway-get-creds starting"
    );

    let config = match cli.common.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let result = legacy_credentials(&cli.target, &config).await;
    conclude(result, |out, media| output::write_media_configuration(out, media))
}
