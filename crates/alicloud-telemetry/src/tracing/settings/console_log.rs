//! Console Log Subscriber Settings.

use tracing::level_filters::LevelFilter;

use super::{Settings, SettingsToggle};

/// Configure specific settings for the Console Log subscriber.
#[derive(Debug, Default, PartialEq)]
pub enum ConsoleLogSettings {
    /// Console Log subscriber disabled.
    #[default]
    Disabled,

    /// Console Log subscriber enabled.
    Enabled {
        /// Common subscriber settings that apply to the Console Log Subscriber.
        common_settings: Settings,

        /// Console Subscriber log event output format.
        log_format: Format,
    },
}

/// Console Subscriber log event output formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    /// Use the plain unstructured log output.
    ///
    /// ANSI color output is enabled by default, but can be disabled at runtime by
    /// setting `NO_COLOR` to a non-empty value.
    ///
    /// See: [`Layer::with_ansi`][tracing_subscriber::fmt::Layer::with_ansi].
    #[default]
    Plain,

    /// One JSON object per log event, useful when logs are collected by a
    /// log shipper.
    Json,
}

impl SettingsToggle for ConsoleLogSettings {
    fn is_enabled(&self) -> bool {
        match self {
            ConsoleLogSettings::Disabled => false,
            ConsoleLogSettings::Enabled { .. } => true,
        }
    }
}

/// For building [`ConsoleLogSettings`].
///
/// <div class="warning">
/// Do not use directly, instead use the [`Settings::builder`] associated function.
/// </div>
pub struct ConsoleLogSettingsBuilder {
    pub(crate) common_settings: Settings,
    pub(crate) log_format: Format,
}

impl ConsoleLogSettingsBuilder {
    pub fn with_log_format(mut self, format: Format) -> Self {
        self.log_format = format;
        self
    }

    pub fn build(self) -> ConsoleLogSettings {
        ConsoleLogSettings::Enabled {
            common_settings: self.common_settings,
            log_format: self.log_format,
        }
    }
}

impl From<Settings> for ConsoleLogSettings {
    fn from(common_settings: Settings) -> Self {
        ConsoleLogSettings::Enabled {
            common_settings,
            log_format: Format::default(),
        }
    }
}

impl From<(&'static str, LevelFilter)> for ConsoleLogSettings {
    fn from((environment_variable, default_level): (&'static str, LevelFilter)) -> Self {
        Settings {
            environment_variable,
            default_level,
        }
        .into()
    }
}

impl From<(&'static str, LevelFilter, bool)> for ConsoleLogSettings {
    fn from(
        (environment_variable, default_level, enabled): (&'static str, LevelFilter, bool),
    ) -> Self {
        if enabled {
            (environment_variable, default_level).into()
        } else {
            ConsoleLogSettings::Disabled
        }
    }
}

impl<T> From<Option<T>> for ConsoleLogSettings
where
    T: Into<ConsoleLogSettings>,
{
    fn from(settings: Option<T>) -> Self {
        match settings {
            Some(settings) => settings.into(),
            None => ConsoleLogSettings::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[test]
    fn builds_settings() {
        let expected = ConsoleLogSettings::Enabled {
            common_settings: Settings {
                environment_variable: "hello",
                default_level: LevelFilter::DEBUG,
            },
            log_format: Format::Json,
        };
        let result = Settings::builder()
            .with_environment_variable("hello")
            .with_default_level(LevelFilter::DEBUG)
            .console_log_settings_builder()
            .with_log_format(Format::Json)
            .build();

        assert_eq!(expected, result);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn toggles_from_tuple(#[case] enabled: bool) {
        let settings: ConsoleLogSettings = ("CONSOLE", LevelFilter::INFO, enabled).into();
        assert_eq!(settings.is_enabled(), enabled);
    }

    #[test]
    fn none_is_disabled() {
        let settings: ConsoleLogSettings = None::<Settings>.into();
        assert!(settings.is_disabled());
    }
}
