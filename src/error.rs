use thiserror::Error;

/// Failure kinds surfaced by the deployment pipeline.
///
/// `MalformedGraph`, `MalformedForm` and `StructuralViolation` are raised before any
/// collaborator is touched. `DeployFailed` means the engine rejected the submission and
/// nothing was persisted. `StoreFailed` is a metadata read that failed before anything
/// was submitted. `PartialCommit` is the one state where the engine changed but
/// the metadata store did not.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Malformed process graph: {0}")]
    MalformedGraph(String),

    #[error("Malformed form schema for '{form_key}': {message}")]
    MalformedForm { form_key: String, message: String },

    #[error("Gateway {gateway_id} must be preceded by a User Task.")]
    StructuralViolation { gateway_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Deployment failed during '{step}': {source}")]
    DeployFailed {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Metadata store failed during '{step}', nothing was changed: {source}")]
    StoreFailed {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Deployment '{deployment_id}' succeeded but '{step}' failed, metadata is stale: {source}")]
    PartialCommit {
        deployment_id: String,
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl FlowError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        FlowError::NotFound { kind, id: id.into() }
    }

    pub fn deploy_failed(step: &'static str, source: anyhow::Error) -> Self {
        FlowError::DeployFailed { step, source }
    }

    pub fn store_failed(step: &'static str, source: anyhow::Error) -> Self {
        FlowError::StoreFailed { step, source }
    }

    /// True when the engine or the metadata store may have been changed by the failed call.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, FlowError::PartialCommit { .. })
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;
