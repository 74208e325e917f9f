use std::process::ExitCode;

use {
    clap::Parser,
    stunner::{
        args::{CommonArgs, TargetArgs},
        conclude, join_credentials,
        telemetry::init_telemetry,
    },
    stunner_expressway::{EXIT_CONFIG, output},
    tracing::{debug, error},
};

/// Fetch TURN servers through the Expressway `/api` lookup and join
/// calls.
#[derive(Parser)]
#[command(name = "expressway-get-creds-new", version)]
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
        "expressway-get-creds-new starting"
    );

    let config = match cli.common.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let result = join_credentials(&cli.target, &config).await;
    conclude(result, |out, servers| output::write_turn_servers(out, servers))
}
