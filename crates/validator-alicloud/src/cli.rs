//! Command line interface of the validator.
use std::{net::IpAddr, path::PathBuf};

use alicloud_telemetry::TelemetryOptions;
use alicloud_webhook::{
    TlsOption, WebhookOptions,
    constants::{DEFAULT_HTTPS_PORT, DEFAULT_LISTEN_ADDRESS},
};
use clap::{Args, Parser, Subcommand};

use crate::validator::{DEFAULT_PROVIDER_TYPE, ValidatorOptions};

#[derive(Debug, Parser)]
#[command(
    name = "gardener-extension-validator-alicloud",
    author,
    version,
    about = "Validating admission webhook for Alicloud shoot clusters"
)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the JSON schemas of the provider config kinds as YAML.
    Schema,

    /// Run the validating webhook server.
    Run(RunArguments),
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct RunArguments {
    /// The IP address the webhook server listens on.
    #[arg(long, env, default_value_t = DEFAULT_LISTEN_ADDRESS)]
    pub webhook_bind_address: IpAddr,

    /// The port the webhook server listens on.
    #[arg(long, env, default_value_t = DEFAULT_HTTPS_PORT)]
    pub webhook_port: u16,

    /// DIRECTORY containing `tls.crt` and `tls.key` of the serving certificate.
    #[arg(long, env, value_name = "DIRECTORY")]
    pub webhook_cert_dir: Option<PathBuf>,

    /// PEM encoded serving certificate chain, takes precedence over the certificate directory.
    #[arg(long, env, value_name = "FILE", requires = "tls_key_file")]
    pub tls_cert_file: Option<PathBuf>,

    /// PEM encoded private key of the serving certificate.
    #[arg(long, env, value_name = "FILE", requires = "tls_cert_file")]
    pub tls_key_file: Option<PathBuf>,

    /// Only shoots with this provider type are validated.
    #[arg(long, env, default_value = DEFAULT_PROVIDER_TYPE)]
    pub provider_type: String,

    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

impl RunArguments {
    pub fn webhook_options(&self) -> WebhookOptions {
        let tls = TlsOption::from_parts(
            self.webhook_cert_dir.as_deref(),
            self.tls_cert_file.as_deref(),
            self.tls_key_file.as_deref(),
        );

        WebhookOptions {
            socket_addr: (self.webhook_bind_address, self.webhook_port).into(),
            tls,
        }
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        ValidatorOptions {
            provider_type: self.provider_type.clone(),
        }
    }
}
