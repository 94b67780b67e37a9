//! An error from the smoke-mini rescheduler

/// An error from the smoke-mini rescheduler
#[derive(Debug)]
pub enum Error {
    /// A generic error with a message
    Generic(String),
    /// The persisted fleet state could not be parsed or violates its invariants
    InvalidState(String),
    /// A raw cluster object could not be interpreted
    SnapshotParse {
        /// The kind of object we failed to parse
        kind: &'static str,
        /// The name of the object if it had one
        name: Option<String>,
        /// Why this object could not be parsed
        msg: String,
    },
    /// An IO Error
    IO(std::io::Error),
    /// An error from parsing a timestamp/date
    ChronoParse(chrono::ParseError),
    /// An error from loading a config
    Config(config::ConfigError),
    /// An error from converting a value with serde
    Serde(serde_json::Error),
    /// An error from converting a value with serde to YAML
    SerdeYaml(serde_yaml::Error),
    /// An error from the k8s client
    #[cfg(feature = "k8s")]
    K8s(kube::Error),
    /// An error from getting a k8s config
    #[cfg(feature = "k8s")]
    K8sConfig(kube::config::KubeconfigError),
}

impl Error {
    /// Create a new generic error
    ///
    /// # Arguments
    ///
    /// * `msg` - The error message to set
    pub fn new<T: Into<String>>(msg: T) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a new invalid state error
    ///
    /// # Arguments
    ///
    /// * `msg` - Why the state is invalid
    pub fn invalid_state<T: Into<String>>(msg: T) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a new snapshot parse error
    ///
    /// # Arguments
    ///
    /// * `kind` - The kind of object that failed to parse
    /// * `name` - The name of the object if it has one
    /// * `msg` - Why this object could not be parsed
    pub fn snapshot<T: Into<String>>(kind: &'static str, name: Option<&String>, msg: T) -> Self {
        Error::SnapshotParse {
            kind,
            name: name.cloned(),
            msg: msg.into(),
        }
    }

    /// Get the status code from this error if one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            #[cfg(feature = "k8s")]
            Error::K8s(kube::Error::Api(resp)) => Some(resp.code),
            _ => None,
        }
    }

    /// Whether this error means the target object does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Get the error message for this error if one exists
    pub fn msg(&self) -> Option<String> {
        // get the msg from any error types that support it
        match self {
            Error::Generic(msg) => Some(msg.clone()),
            Error::InvalidState(msg) => Some(msg.clone()),
            Error::SnapshotParse { kind, name, msg } => match name {
                Some(name) => Some(format!("{kind} {name}: {msg}")),
                None => Some(format!("{kind}: {msg}")),
            },
            Error::IO(err) => Some(err.to_string()),
            Error::ChronoParse(err) => Some(err.to_string()),
            Error::Config(err) => Some(err.to_string()),
            Error::Serde(err) => Some(err.to_string()),
            Error::SerdeYaml(err) => Some(err.to_string()),
            #[cfg(feature = "k8s")]
            Error::K8s(err) => Some(err.to_string()),
            #[cfg(feature = "k8s")]
            Error::K8sConfig(err) => Some(err.to_string()),
        }
    }

    /// get the kind of error as a str
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Generic(_) => "Generic",
            Error::InvalidState(_) => "InvalidState",
            Error::SnapshotParse { .. } => "SnapshotParse",
            Error::IO(_) => "IO",
            Error::ChronoParse(_) => "ChronoParse",
            Error::Config(_) => "Config",
            Error::Serde(_) => "Serde",
            Error::SerdeYaml(_) => "SerdeYaml",
            #[cfg(feature = "k8s")]
            Error::K8s(_) => "K8s",
            #[cfg(feature = "k8s")]
            Error::K8sConfig(_) => "K8sConf",
        }
    }
}

impl std::fmt::Display for Error {
    /// display this error in a easy readble format
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (self.status(), self.msg()) {
            (Some(code), Some(msg)) => write!(f, "Code: {} Error: {}", code, msg),
            (None, Some(msg)) => write!(f, "Error: {}", msg),
            (Some(code), None) => write!(f, "Code: {}", code),
            (None, None) => write!(f, "Kind: {}", self.kind()),
        }
    }
}

// mark that this is an error struct
impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Error::ChronoParse(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serde(error)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerdeYaml(error)
    }
}

#[cfg(feature = "k8s")]
impl From<kube::Error> for Error {
    fn from(error: kube::Error) -> Self {
        Error::K8s(error)
    }
}

#[cfg(feature = "k8s")]
impl From<kube::config::KubeconfigError> for Error {
    fn from(error: kube::config::KubeconfigError) -> Self {
        Error::K8sConfig(error)
    }
}
