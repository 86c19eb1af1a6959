use std::sync::Arc;

use alicloud_telemetry::Tracing;
use alicloud_webhook::{WebhookError, WebhookServer};
use clap::Parser;
use snafu::{ResultExt, Snafu};
use validator_alicloud::{
    APP_NAME,
    cli::{Command, Opts, RunArguments},
    shoot_webhook,
    validator::ShootValidator,
    yaml,
};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize tracing"))]
    InitTracing {
        source: alicloud_telemetry::tracing::Error,
    },

    #[snafu(display("failed to print schemas"))]
    PrintSchemas { source: yaml::Error },

    #[snafu(display("failed to create webhook server"))]
    CreateWebhookServer { source: WebhookError },

    #[snafu(display("failed to run webhook server"))]
    RunWebhookServer { source: WebhookError },
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts = Opts::parse();

    match opts.command {
        Command::Schema => yaml::write_schemas(std::io::stdout()).context(PrintSchemasSnafu),
        Command::Run(arguments) => run(arguments).await,
    }
}

async fn run(arguments: RunArguments) -> Result<(), Error> {
    let webhook_options = arguments.webhook_options();
    let validator_options = arguments.validator_options();

    // Keep the guard alive until the end, dropping it flushes the file logs.
    let _tracing_guard = Tracing::pre_configured(APP_NAME, arguments.telemetry)
        .init()
        .context(InitTracingSnafu)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        socket_addr = %webhook_options.socket_addr,
        provider_type = validator_options.provider_type,
        "starting shoot validator"
    );

    let validator = Arc::new(ShootValidator::new(validator_options));
    let server = WebhookServer::new(webhook_options, vec![shoot_webhook(validator)])
        .await
        .context(CreateWebhookServerSnafu)?;

    server.run().await.context(RunWebhookServerSnafu)
}
