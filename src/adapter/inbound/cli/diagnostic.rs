//! Miette-based error diagnostics for CLI error presentation.
//!
//! Fatal errors are turned into diagnostics with a remediation hint. A
//! rejected or under-scoped token is the most common failure, and GitHub
//! reports the latter as a misleading 404, so both get explicit guidance.

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::config::TOKEN_ENV;
use crate::error::{ApiError, ConfigError, Error, REQUIRED_SCOPE};

/// Configuration file error pointing at the offending span.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(followgraph::config))]
pub struct ConfigFileError {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

/// Missing, invalid or under-scoped credential.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(followgraph::credential))]
pub struct CredentialError {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

/// Any other fatal command failure.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(followgraph::command))]
pub struct CommandError {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl CommandError {
    fn new(message: impl Into<String>, help: Option<String>) -> Self {
        Self {
            message: message.into(),
            help,
        }
    }
}

fn scope_help() -> String {
    format!("create a token with the `{REQUIRED_SCOPE}` scope and export it as {TOKEN_ENV}")
}

/// Build the diagnostic shown for a fatal error.
pub fn render(err: &anyhow::Error, config_path: &Path) -> miette::Report {
    let Some(error) = err.downcast_ref::<Error>() else {
        return miette::Report::new(CommandError::new(format!("{err:#}"), None));
    };

    match error {
        Error::Config(ConfigError::MissingField { field }) if *field == TOKEN_ENV => {
            miette::Report::new(CredentialError {
                message: format!("{TOKEN_ENV} is not set"),
                help: Some(format!(
                    "{}; a .env file in the working directory is also read",
                    scope_help()
                )),
            })
        }
        Error::Config(ConfigError::Parse(parse)) => config_file_error(parse, config_path),
        Error::Config(other) => miette::Report::new(CommandError::new(
            other.to_string(),
            Some(format!("check {}", config_path.display())),
        )),
        Error::PageLimitExceeded { .. } => miette::Report::new(CommandError::new(
            error.to_string(),
            Some("raise github.max_pages if the account really is that large".into()),
        )),
        _ => match error.api_error() {
            Some(ApiError::Auth { .. }) => miette::Report::new(CredentialError {
                message: error.to_string(),
                help: Some(scope_help()),
            }),
            Some(ApiError::NotFound { .. }) => miette::Report::new(CredentialError {
                message: error.to_string(),
                help: Some(format!(
                    "GitHub answers 404 when the token lacks `{REQUIRED_SCOPE}`; {}",
                    scope_help()
                )),
            }),
            Some(ApiError::RateLimited { .. }) => miette::Report::new(CommandError::new(
                error.to_string(),
                Some("wait for the rate-limit window to reset and run the command again".into()),
            )),
            Some(ApiError::Transient(_)) => miette::Report::new(CommandError::new(
                error.to_string(),
                Some("check your network connection and try again".into()),
            )),
            _ => miette::Report::new(CommandError::new(format!("{err:#}"), None)),
        },
    }
}

fn config_file_error(parse: &toml::de::Error, path: &Path) -> miette::Report {
    let message = format!("invalid configuration: {}", parse.message());
    let help = Some("fix the value or remove the file to use defaults".to_string());

    match (std::fs::read_to_string(path), parse.span()) {
        (Ok(content), Some(span)) => miette::Report::new(ConfigFileError {
            message,
            src: NamedSource::new(path.display().to_string(), content),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            help,
        }),
        _ => miette::Report::new(CommandError::new(message, help)),
    }
}
