//! This module contains functionality to initialise tracing Subscribers for
//! console output and rolling file output.
//!
//! To get started, see [`Tracing`].

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender},
};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt};

use crate::tracing::settings::*;

pub mod settings;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors which can be encountered when initialising [`Tracing`].
#[derive(Debug, Snafu)]
pub enum Error {
    /// Indicates that [`Tracing`] failed to install the rolling file appender.
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    /// Indicates that [`Tracing`] failed to set the global default subscriber.
    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// Easily initialize a set of pre-configured [`Subscriber`][1] layers.
///
/// # Usage
///
/// The configured subscribers are active as long as the guard returned by
/// [`Tracing::init`] is in scope. File logs are written by a background worker,
/// dropping the guard flushes outstanding log lines. Name the guard variable
/// appropriately, `let _ =` drops it immediately.
///
/// ```
/// use alicloud_telemetry::{TelemetryOptions, tracing::{Error, Tracing}};
///
/// fn main() -> Result<(), Error> {
///     let _tracing_guard = Tracing::pre_configured("test", TelemetryOptions::default()).init()?;
///
///     tracing::info!("log a message");
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables and CLI Arguments
///
/// ### Console logs
///
/// - `CONSOLE_LOG_DISABLED` (`--console-log-disabled`): Disables console logs when set to `true`.
/// - `CONSOLE_LOG_FORMAT` (`--console-log-format`): `plain` (default) or `json`.
/// - `CONSOLE_LOG_LEVEL`: Set the log level for the console logs.
///
/// ### File logs
///
/// - `FILE_LOG_DIRECTORY` (`--file-log-directory`): Enable the file logs and set the file log directory.
/// - `FILE_LOG_ROTATION_PERIOD` (`--file-log-rotation-period`): Set the rotation period of log files.
/// - `FILE_LOG_MAX_FILES` (`--file-log-max-files`): Maximum number of log files to keep.
/// - `FILE_LOG_LEVEL`: Set the log level for file logs.
///
/// [1]: tracing::Subscriber
pub struct Tracing {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,

    file_log_guard: Option<WorkerGuard>,
}

impl Tracing {
    /// The environment variable used to set the console log level filter.
    pub const CONSOLE_LOG_LEVEL: &str = "CONSOLE_LOG_LEVEL";
    /// The environment variable used to set the rolling file log level filter.
    pub const FILE_LOG_LEVEL: &str = "FILE_LOG_LEVEL";
    /// The filename used for the rolling file logs.
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";

    /// Creates and returns a [`TracingBuilder`] for the service `service_name`.
    ///
    /// The service name is used as the prefix of rolling log files.
    pub fn builder(service_name: &'static str) -> TracingBuilder {
        TracingBuilder {
            service_name,
            console_log_settings: ConsoleLogSettings::default(),
            file_log_settings: FileLogSettings::default(),
        }
    }

    /// Creates an returns a pre-configured [`Tracing`] instance which can be initialized by
    /// calling [`Tracing::init()`].
    ///
    /// ### Default Levels
    ///
    /// - Console logs: INFO
    /// - File logs: INFO
    ///
    /// ### Default Values
    ///
    /// - If `file_log_rotation_period` is [`None`], this function will use a default value of
    ///   [`RotationPeriod::Never`].
    pub fn pre_configured(service_name: &'static str, options: TelemetryOptions) -> Self {
        let TelemetryOptions {
            console_log_disabled,
            console_log_format,
            file_log_directory,
            file_log_rotation_period,
            file_log_max_files,
        } = options;

        let file_log_rotation_period = file_log_rotation_period.unwrap_or_default();

        Self::builder(service_name)
            .with_console_output((!console_log_disabled).then(|| {
                Settings::builder()
                    .with_environment_variable(Self::CONSOLE_LOG_LEVEL)
                    .with_default_level(LevelFilter::INFO)
                    .console_log_settings_builder()
                    .with_log_format(console_log_format)
                    .build()
            }))
            .with_file_output(file_log_directory.map(|log_directory| {
                Settings::builder()
                    .with_environment_variable(Self::FILE_LOG_LEVEL)
                    .with_default_level(LevelFilter::INFO)
                    .file_log_settings_builder(log_directory, Self::FILE_LOG_SUFFIX)
                    .with_rotation_period(file_log_rotation_period)
                    .with_max_files(file_log_max_files)
                    .build()
            }))
            .build()
    }

    /// Initialize the configured tracing subscribers, returning a guard that
    /// will flush the file logs when dropped.
    ///
    /// <div class="warning">
    /// Name the guard variable appropriately, do not just use <code>let _ =</code>, as that will drop
    /// immediately.
    /// </div>
    pub fn init(mut self) -> Result<Tracing> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = Vec::new();

        if let ConsoleLogSettings::Enabled {
            common_settings,
            log_format,
        } = &self.console_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );

            let console_output_layer = match log_format {
                Format::Plain => tracing_subscriber::fmt::layer()
                    .with_filter(env_filter_layer)
                    .boxed(),
                Format::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(env_filter_layer)
                    .boxed(),
            };
            layers.push(console_output_layer);
        }

        if let FileLogSettings::Enabled {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
            max_log_files,
        } = &self.file_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );

            let file_appender = RollingFileAppender::builder()
                .rotation(rotation_period.clone())
                .filename_prefix(self.service_name.to_string())
                .filename_suffix(filename_suffix);

            let file_appender = if let Some(max_log_files) = max_log_files {
                file_appender.max_log_files(*max_log_files)
            } else {
                file_appender
            };

            let file_appender = file_appender
                .build(file_log_dir)
                .context(InitRollingFileAppenderSnafu)?;
            let (file_writer, file_log_guard) = tracing_appender::non_blocking(file_appender);

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_filter(env_filter_layer)
                    .boxed(),
            );
            self.file_log_guard = Some(file_log_guard);
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        // We must return self, dropping the worker guard stops the file writer
        Ok(self)
    }
}

impl Drop for Tracing {
    fn drop(&mut self) {
        if self.file_log_guard.is_some() {
            tracing::debug!("flushing file logs");
        }
    }
}

/// Makes it easy to build a valid [`Tracing`] instance.
pub struct TracingBuilder {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,
}

impl TracingBuilder {
    /// Enable the console output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_console_output(mut self, console_log_settings: impl Into<ConsoleLogSettings>) -> Self {
        self.console_log_settings = console_log_settings.into();
        self
    }

    /// Enable the file output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_file_output(mut self, file_log_settings: impl Into<FileLogSettings>) -> Self {
        self.file_log_settings = file_log_settings.into();
        self
    }

    /// Consumes self and returns a valid [`Tracing`] instance.
    ///
    /// Once built, you can call [`Tracing::init`] to enable the configured
    /// tracing subscribers.
    pub fn build(self) -> Tracing {
        Tracing {
            service_name: self.service_name,
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
            file_log_guard: None,
        }
    }
}

/// Create an [`EnvFilter`] configured with the given environment variable and default [`Directive`].
fn env_filter_builder(env_var: &str, default_directive: impl Into<Directive>) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env_var)
        .with_default_directive(default_directive.into())
        .from_env_lossy()
}

/// Contains options which can be passed to [`Tracing::pre_configured()`].
///
/// Additionally, this struct can be flattened into CLI arguments:
///
/// ```
/// use alicloud_telemetry::TelemetryOptions;
/// use clap::Parser;
///
/// #[derive(Parser)]
/// struct Cli {
///     #[arg(long)]
///     provider_type: String,
///
///     #[clap(flatten)]
///     telemetry_arguments: TelemetryOptions,
/// }
/// ```
#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[arg(long, env)]
    pub console_log_disabled: bool,

    /// Output FORMAT of console logs.
    #[arg(long, env, value_name = "FORMAT", default_value_t)]
    pub console_log_format: Format,

    /// Enable logging to files located in the specified DIRECTORY.
    #[arg(long, env, value_name = "DIRECTORY", group = "file_log")]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[arg(long, env, value_name = "PERIOD", requires = "file_log")]
    pub file_log_rotation_period: Option<RotationPeriod>,

    /// Maximum number of log files to keep.
    #[arg(long, env, requires = "file_log")]
    pub file_log_max_files: Option<usize>,
}

/// Supported periods when the log file is rolled over.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "PascalCase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use clap::Parser;
    use rstest::rstest;
    use tracing::level_filters::LevelFilter;
    use tracing_appender::rolling::Rotation;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[clap(flatten)]
        telemetry: TelemetryOptions,
    }

    #[test]
    fn builder_basic_construction() {
        let trace_guard = Tracing::builder("test").build();

        assert_eq!(trace_guard.service_name, "test");
        assert!(trace_guard.console_log_settings.is_disabled());
        assert!(trace_guard.file_log_settings.is_disabled());
    }

    #[test]
    fn builder_with_console_output() {
        let trace_guard = Tracing::builder("test")
            .with_console_output(("ABC_A", LevelFilter::TRACE))
            .with_console_output(
                Settings::builder()
                    .with_environment_variable("ABC_B")
                    .with_default_level(LevelFilter::DEBUG)
                    .build(),
            )
            .build();

        assert_eq!(
            trace_guard.console_log_settings,
            ConsoleLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: "ABC_B",
                    default_level: LevelFilter::DEBUG
                },
                log_format: Format::Plain
            }
        );
        assert!(trace_guard.file_log_settings.is_disabled());
    }

    #[test]
    fn pre_configured_defaults() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions::default());

        assert_eq!(
            tracing.console_log_settings,
            ConsoleLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: Tracing::CONSOLE_LOG_LEVEL,
                    default_level: LevelFilter::INFO,
                },
                log_format: Format::Plain,
            }
        );
        assert!(tracing.file_log_settings.is_disabled());
    }

    #[test]
    fn pre_configured_with_file_output() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: true,
            console_log_format: Format::Json,
            file_log_directory: Some(PathBuf::from("/logs")),
            file_log_rotation_period: Some(RotationPeriod::Daily),
            file_log_max_files: Some(7),
        });

        assert!(tracing.console_log_settings.is_disabled());
        assert_eq!(tracing.file_log_settings, FileLogSettings::Enabled {
            common_settings: Settings {
                environment_variable: Tracing::FILE_LOG_LEVEL,
                default_level: LevelFilter::INFO,
            },
            file_log_dir: PathBuf::from("/logs"),
            rotation_period: Rotation::DAILY,
            filename_suffix: Tracing::FILE_LOG_SUFFIX.to_owned(),
            max_log_files: Some(7),
        });
    }

    #[test]
    fn parses_cli_arguments() {
        let cli = Cli::try_parse_from([
            "test",
            "--console-log-format",
            "json",
            "--file-log-directory",
            "/logs",
            "--file-log-rotation-period",
            "hourly",
        ])
        .unwrap();

        assert_eq!(cli.telemetry, TelemetryOptions {
            console_log_disabled: false,
            console_log_format: Format::Json,
            file_log_directory: Some(PathBuf::from("/logs")),
            file_log_rotation_period: Some(RotationPeriod::Hourly),
            file_log_max_files: None,
        });
    }

    #[test]
    fn rotation_requires_file_log_directory() {
        assert!(Cli::try_parse_from(["test", "--file-log-rotation-period", "daily"]).is_err());
    }

    #[rstest]
    #[case(RotationPeriod::Minutely, Rotation::MINUTELY)]
    #[case(RotationPeriod::Hourly, Rotation::HOURLY)]
    #[case(RotationPeriod::Daily, Rotation::DAILY)]
    #[case(RotationPeriod::Never, Rotation::NEVER)]
    fn rotation_periods(#[case] period: RotationPeriod, #[case] expected: Rotation) {
        assert_eq!(Rotation::from(period), expected);
    }

    #[test]
    fn env_filter_falls_back_to_default_level() {
        let filter = env_filter_builder("ALICLOUD_TELEMETRY_TEST_UNSET_LEVEL", LevelFilter::WARN);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
