//! The config for the smoke-mini rescheduler
use std::path::Path;

/// Helps serde default a value to false
fn default_false() -> bool {
    false
}

/// Helps serde default the probe namespace
fn default_namespace() -> String {
    "d8-upmeter".to_owned()
}

/// Helps serde default the probe label selector
fn default_selector() -> String {
    "app=smoke-mini".to_owned()
}

/// Helps serde default our field manager
fn default_field_manager() -> String {
    "smoke-mini-rescheduler".to_owned()
}

/// The log level to set
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy, Default)]
pub enum LogLevel {
    /// Do not log any info
    Off,
    /// Log at the error level
    Error,
    /// Log at the warning level
    Warn,
    /// Log at the info level
    #[default]
    Info,
    /// Log at the debug level
    Debug,
    /// Log at the tracing level
    Trace,
}

impl LogLevel {
    #[cfg(feature = "trace")]
    /// Cast this log level to a tracing filter
    #[must_use]
    pub fn to_filter(&self) -> tracing::metadata::LevelFilter {
        match self {
            LogLevel::Off => tracing_subscriber::filter::LevelFilter::OFF,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
        }
    }
}

impl std::fmt::Display for LogLevel {
    /// Allow the log level to be displayed
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LogLevel::Off => write!(f, "Off"),
            LogLevel::Error => write!(f, "Error"),
            LogLevel::Warn => write!(f, "Warn"),
            LogLevel::Info => write!(f, "Info"),
            LogLevel::Debug => write!(f, "Debug"),
            LogLevel::Trace => write!(f, "Trace"),
        }
    }
}

/// The settings for sending traces to stdout/stderr
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TracingLocal {
    /// The log level to use for stdout/stderr
    #[serde(default)]
    pub level: LogLevel,
}

/// The tracing settings to use
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Tracing {
    /// The settings for sending traces to stdout/stderr
    #[serde(default)]
    pub local: TracingLocal,
}

/// Helps serde default the reschedule cadence to once a minute
fn default_reschedule() -> u32 {
    60
}

/// Helps serde default the stale volume collector cadence to once a minute
fn default_collect_volumes() -> u32 {
    60
}

/// Helps serde default how long to coalesce watch events for
fn default_event_debounce() -> u32 {
    5
}

/// How often the rescheduler should run its different tasks in seconds
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskSettings {
    /// How often to make a placement decision
    #[serde(default = "default_reschedule")]
    pub reschedule: u32,
    /// How often to collect stale probe volumes
    #[serde(default = "default_collect_volumes")]
    pub collect_volumes: u32,
    /// How long to coalesce watch events before acting on them
    #[serde(default = "default_event_debounce")]
    pub event_debounce: u32,
}

impl Default for TaskSettings {
    fn default() -> Self {
        TaskSettings {
            reschedule: default_reschedule(),
            collect_volumes: default_collect_volumes(),
            event_debounce: default_event_debounce(),
        }
    }
}

/// Helps serde default the max number of volumes to collect in one pass
fn default_collector_batch() -> usize {
    33
}

/// Settings for the stale probe volume collector
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Collector {
    /// The max number of persistent volumes to delete per pass
    #[serde(default = "default_collector_batch")]
    pub batch: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Collector {
            batch: default_collector_batch(),
        }
    }
}

/// Helps serde default the name of the values config map
fn default_values_config_map() -> String {
    "upmeter-smoke-mini-values".to_owned()
}

/// Helps serde default the key our values are stored under
fn default_values_key() -> String {
    "values.yaml".to_owned()
}

/// Where the values container is persisted
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValuesLocation {
    /// The config map in the probe namespace holding our values
    #[serde(default = "default_values_config_map")]
    pub config_map: String,
    /// The data key in that config map
    #[serde(default = "default_values_key")]
    pub key: String,
}

impl Default for ValuesLocation {
    fn default() -> Self {
        ValuesLocation {
            config_map: default_values_config_map(),
            key: default_values_key(),
        }
    }
}

/// One shot migrations to run at boot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Migrations {
    /// Drop any configured smoke-mini storage class override
    #[serde(default = "default_false")]
    pub force_no_storage_class: bool,
}

/// configs for the smoke-mini rescheduler
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conf {
    /// The namespace our probes live in
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// The label selector matching our probe objects
    #[serde(default = "default_selector")]
    pub selector: String,
    /// The field manager to use when writing to k8s
    #[serde(default = "default_field_manager")]
    pub field_manager: String,
    /// Where our values are persisted
    #[serde(default)]
    pub values: ValuesLocation,
    /// The cadence of our tasks
    #[serde(default)]
    pub tasks: TaskSettings,
    /// The stale volume collector settings
    #[serde(default)]
    pub collector: Collector,
    /// The migrations to run at boot
    #[serde(default)]
    pub migrations: Migrations,
    /// The tracing settings to use
    #[serde(default)]
    pub tracing: Tracing,
}

impl Default for Conf {
    fn default() -> Self {
        Conf {
            namespace: default_namespace(),
            selector: default_selector(),
            field_manager: default_field_manager(),
            values: ValuesLocation::default(),
            tasks: TaskSettings::default(),
            collector: Collector::default(),
            migrations: Migrations::default(),
            tracing: Tracing::default(),
        }
    }
}

impl Conf {
    /// Creates a new [Conf] object
    ///
    /// A missing config file is not an error; every setting has a default.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to use when reading the config file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // load from a file first
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            // then overlay any environment args ontop
            .add_source(
                config::Environment::with_prefix("smokemini")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Change the namespace for this config
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace for this config
    #[must_use]
    pub fn namespace<T: Into<String>>(mut self, namespace: T) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let conf = Conf::new("/nonexistent/rescheduler.yml").unwrap();
        assert_eq!(conf.namespace, "d8-upmeter");
        assert_eq!(conf.tasks.reschedule, 60);
        assert_eq!(conf.collector.batch, 33);
        assert!(!conf.migrations.force_no_storage_class);
        assert_eq!(conf.tracing.local.level, LogLevel::Info);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let raw = "namespace: probes\ntasks:\n  reschedule: 30\n";
        let conf: Conf = serde_yaml::from_str(raw).unwrap();
        assert_eq!(conf.namespace, "probes");
        assert_eq!(conf.tasks.reschedule, 30);
        assert_eq!(conf.tasks.collect_volumes, 60);
        assert_eq!(conf.values.key, "values.yaml");
    }

    #[test]
    fn log_levels() {
        let level: LogLevel = serde_yaml::from_str("Warn").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_yaml::from_str::<LogLevel>("Setup").is_err());
    }
}
