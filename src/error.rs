//! Error types for the container operator.
//!
//! Every variant carries enough context (resource kind, identity, cause) to
//! tell the four reconciliation failure classes apart: benign absence,
//! optimistic-concurrency conflicts, transient store failures and fatal
//! construction problems.

use std::fmt;

use thiserror::Error;

use crate::managed::ObjectKey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: String, key: ObjectKey },

    #[error("conflict writing {kind} {key}: {message}")]
    Conflict {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    #[error("store error for {kind} {key}: {message}")]
    Transient {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    #[error("type {api_version}/{kind} is not registered in the scheme")]
    Scheme { api_version: String, kind: String },

    #[error("cannot construct {kind} for {owner}: {message}")]
    Construction {
        kind: String,
        owner: ObjectKey,
        message: String,
    },

    #[error("reconciliation of {key} cancelled")]
    Cancelled { key: ObjectKey },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// 4xx other than throttling.
fn is_client_error(code: u16) -> bool {
    (400..500).contains(&code) && code != 429
}

/// Coarse classification used to decide between requeueing and giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    Transient,
    Fatal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::NotFound => write!(f, "NotFound"),
            ErrorClass::Conflict => write!(f, "Conflict"),
            ErrorClass::Transient => write!(f, "Transient"),
            ErrorClass::Fatal => write!(f, "Fatal"),
        }
    }
}

impl Error {
    /// Map a kube-rs failure on `kind`/`key` to a classified error.
    ///
    /// 404 becomes `NotFound`, 409 becomes `AlreadyExists` or `Conflict`
    /// depending on the API reason. Other client errors (except 429) stay
    /// as `Kube` and classify as fatal; everything else is transient.
    pub fn from_kube(err: kube::Error, kind: &str, key: &ObjectKey) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Error::NotFound {
                kind: kind.to_string(),
                key: key.clone(),
            },
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Error::AlreadyExists {
                    kind: kind.to_string(),
                    key: key.clone(),
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => Error::Conflict {
                kind: kind.to_string(),
                key: key.clone(),
                message: ae.message,
            },
            kube::Error::Api(ae) if is_client_error(ae.code) => Error::Kube(kube::Error::Api(ae)),
            other => Error::Transient {
                kind: kind.to_string(),
                key: key.clone(),
                message: other.to_string(),
            },
        }
    }

    pub fn construction(kind: impl Into<String>, owner: &ObjectKey, msg: impl Into<String>) -> Self {
        Error::Construction {
            kind: kind.into(),
            owner: owner.clone(),
            message: msg.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NotFound { .. } => ErrorClass::NotFound,
            // A create racing another writer is resolved the same way as a
            // stale update: refetch and recompute.
            Error::AlreadyExists { .. } | Error::Conflict { .. } => ErrorClass::Conflict,
            Error::Transient { .. } | Error::Cancelled { .. } => ErrorClass::Transient,
            Error::Kube(kube::Error::Api(ae)) if ae.code == 409 => ErrorClass::Conflict,
            Error::Kube(kube::Error::Api(ae)) if is_client_error(ae.code) => ErrorClass::Fatal,
            Error::Kube(_) => ErrorClass::Transient,
            Error::Scheme { .. }
            | Error::Construction { .. }
            | Error::Serialization(_)
            | Error::InvalidConfig(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self.class(), ErrorClass::Fatal)
    }
}
