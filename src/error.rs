use miette::Diagnostic;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(conductor::config::error))]
    Config(String),

    #[error("Parse error: {0}")]
    #[diagnostic(
        code(conductor::config::parse),
        help("Run `conductor validate` for detailed validation errors")
    )]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Filesystem error: {0}")]
    #[diagnostic(code(conductor::filesystem::error))]
    Filesystem(String),

    #[error("Service '{0}' is already registered")]
    #[diagnostic(
        code(conductor::service::duplicate),
        help("Each service name may be registered exactly once per supervisor instance")
    )]
    DuplicateService(String),

    #[error("Service not registered: {0}")]
    #[diagnostic(
        code(conductor::service::not_registered),
        help("Register the service before starting or stopping it")
    )]
    ServiceNotRegistered(String),

    #[error("Service '{service}' requires dependency '{dependency}' which is missing or disabled")]
    #[diagnostic(
        code(conductor::service::dependency),
        help("Enable the dependency in the services config or remove it from the dependency list")
    )]
    Dependency { service: String, dependency: String },

    #[error("Service '{service}' transition timed out after {}ms", .after.as_millis())]
    #[diagnostic(
        code(conductor::service::timeout),
        help("The service may be slow. Increase startup_timeout/shutdown_timeout in the config")
    )]
    Timeout { service: String, after: Duration },

    #[error("Service '{0}' failed to start: {1}")]
    #[diagnostic(
        code(conductor::service::start_failed),
        help("Check the supervisor logs for the underlying cause")
    )]
    ServiceStartFailed(String, String),

    #[error("Service '{0}' failed to stop: {1}")]
    #[diagnostic(code(conductor::service::stop_failed))]
    ServiceStopFailed(String, String),

    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::ServiceNotRegistered(name) => Some(format!(
                "Register '{}' with the supervisor before referencing it.",
                name
            )),
            Error::DuplicateService(name) => Some(format!(
                "'{}' is already registered; registration is one-shot for the process lifetime.",
                name
            )),
            Error::Dependency { dependency, .. } => Some(format!(
                "Set 'enabled: true' for '{}' in the services config, or mark the dependency as optional with 'required: false'.",
                dependency
            )),
            Error::Timeout { service, .. } => Some(format!(
                "Increase the timeout for '{}' in the config, or check why it is stuck.",
                service
            )),
            Error::Config(_) | Error::Parse(_) | Error::Yaml(_) => {
                Some("Validate your config with: conductor validate".to_string())
            }
            _ => None,
        }
    }

    /// Names of services that failed inside a batch error, in pass order.
    ///
    /// For non-batch errors this returns the single affected service, if the
    /// variant carries one.
    pub fn failed_services(&self) -> Vec<&str> {
        match self {
            Error::Multiple(errors) => errors.iter().flat_map(|e| e.failed_services()).collect(),
            Error::ServiceStartFailed(name, _)
            | Error::ServiceStopFailed(name, _)
            | Error::ServiceNotRegistered(name)
            | Error::DuplicateService(name) => vec![name.as_str()],
            Error::Timeout { service, .. } | Error::Dependency { service, .. } => {
                vec![service.as_str()]
            }
            _ => Vec::new(),
        }
    }
}
