use runpad_package::PackageError;
use runpad_primitives::{Language, SerializableDiagnostic};
use runpad_worker::{BudgetExceeded, LockError};

use crate::BackendError;

/// Failures of a workspace request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// No server is registered for the workspace language.
	#[error("unsupported workspace language {language}")]
	UnsupportedLanguage {
		/// Requested language.
		language: Language,
	},
	/// Region extraction or buffer inlining failed.
	#[error(transparent)]
	Workspace(#[from] runpad_workspace::Error),
	/// The package is missing or could not be built.
	#[error(transparent)]
	Package(#[from] PackageError),
	/// The request ran past its budget.
	#[error(transparent)]
	Budget(#[from] BudgetExceeded),
	/// The compiler backend failed.
	#[error(transparent)]
	Backend(#[from] BackendError),
	/// No run slot could be obtained.
	#[error("run slots unavailable: {0}")]
	Unavailable(String),
}

impl From<LockError> for ServerError {
	fn from(err: LockError) -> Self {
		match err {
			LockError::Budget(exceeded) => Self::Budget(exceeded),
			other => Self::Unavailable(other.to_string()),
		}
	}
}

impl ServerError {
	/// Stable id reported in the diagnostic of a failed result.
	pub fn diagnostic_id(&self) -> &'static str {
		match self {
			Self::UnsupportedLanguage { .. } => "UnsupportedLanguage",
			Self::Workspace(runpad_workspace::Error::DuplicateRegion { .. }) => "DuplicateRegion",
			Self::Workspace(runpad_workspace::Error::UnknownBuffer { .. }) => "UnknownBuffer",
			Self::Workspace(runpad_workspace::Error::Budget(_)) | Self::Budget(_) => "BudgetExceeded",
			Self::Package(PackageError::NotFound { .. }) => "PackageNotFound",
			Self::Package(PackageError::Budget(_)) => "BudgetExceeded",
			Self::Package(_) => "PackageBuildFailed",
			Self::Backend(_) => "BackendError",
			Self::Unavailable(_) => "RunUnavailable",
		}
	}

	/// Returns true when the failure is a budget overrun.
	pub fn is_budget_exceeded(&self) -> bool {
		matches!(
			self,
			Self::Budget(_)
				| Self::Workspace(runpad_workspace::Error::Budget(_))
				| Self::Package(PackageError::Budget(_))
		)
	}

	/// Error diagnostic describing this failure.
	pub fn to_diagnostic(&self) -> SerializableDiagnostic {
		SerializableDiagnostic::error(self.diagnostic_id(), self.to_string())
	}
}
