//! Package build mechanics.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Lines of builder output kept in a failure message.
const OUTPUT_TAIL_LINES: usize = 20;

/// Result of a successful build or restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
	/// Absolute path of the built entry point.
	pub entry_point: PathBuf,
	/// When the build finished.
	pub built_at: SystemTime,
	/// True when the artifact came from a build marker instead of a build.
	pub restored: bool,
}

/// Failure reported by a [`PackageBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BuildError {
	message: String,
}

impl BuildError {
	/// Creates a build error with a human-readable message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	/// Failure description.
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Builds a package directory, returning the absolute entry point path.
#[async_trait]
pub trait PackageBuilder: Send + Sync {
	/// Runs the build inside `directory`.
	async fn build(&self, directory: &Path) -> Result<PathBuf, BuildError>;
}

/// Builder running an external command inside the package directory.
///
/// The child is killed if the build future is dropped, so a build abandoned by
/// its timeout does not linger.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
	program: String,
	args: Vec<String>,
	entry_point: PathBuf,
}

impl CommandBuilder {
	/// Creates a builder from `command` (program followed by arguments) and the
	/// entry point path relative to the package directory.
	///
	/// # Errors
	///
	/// Returns [`BuildError`] when `command` is empty.
	pub fn new(command: &[String], entry_point: impl Into<PathBuf>) -> Result<Self, BuildError> {
		let (program, args) = command
			.split_first()
			.ok_or_else(|| BuildError::new("build command is empty"))?;
		Ok(Self {
			program: program.clone(),
			args: args.to_vec(),
			entry_point: entry_point.into(),
		})
	}

	/// Entry point relative to the package directory.
	pub fn entry_point(&self) -> &Path {
		&self.entry_point
	}
}

#[async_trait]
impl PackageBuilder for CommandBuilder {
	async fn build(&self, directory: &Path) -> Result<PathBuf, BuildError> {
		debug!(program = %self.program, args = ?self.args, dir = %directory.display(), "builder.command");
		let output = Command::new(&self.program)
			.args(&self.args)
			.current_dir(directory)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|err| BuildError::new(format!("failed to run {}: {err}", self.program)))?;

		if !output.status.success() {
			let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
			report.push_str(&String::from_utf8_lossy(&output.stderr));
			return Err(BuildError::new(format!(
				"{} exited with {}\n{}",
				self.program,
				output.status,
				tail(&report, OUTPUT_TAIL_LINES)
			)));
		}

		let entry_point = directory.join(&self.entry_point);
		match tokio::fs::try_exists(&entry_point).await {
			Ok(true) => Ok(entry_point),
			Ok(false) => Err(BuildError::new(format!(
				"entry point {} was not produced",
				entry_point.display()
			))),
			Err(err) => Err(BuildError::new(format!(
				"failed to check entry point {}: {err}",
				entry_point.display()
			))),
		}
	}
}

fn tail(text: &str, lines: usize) -> String {
	let all: Vec<&str> = text.lines().collect();
	all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	fn shell(script: &str) -> Vec<String> {
		vec!["sh".into(), "-c".into(), script.into()]
	}

	#[tokio::test]
	async fn successful_command_yields_entry_point() {
		let dir = tempfile::tempdir().unwrap();
		let builder = CommandBuilder::new(&shell("mkdir -p bin && echo built > bin/app.dll"), "bin/app.dll").unwrap();

		let entry = builder.build(dir.path()).await.unwrap();
		assert_eq!(entry, dir.path().join("bin/app.dll"));
		assert!(entry.exists());
	}

	#[tokio::test]
	async fn failing_command_reports_output_tail() {
		let dir = tempfile::tempdir().unwrap();
		let builder = CommandBuilder::new(&shell("echo 'error CS1002: ; expected' >&2; exit 3"), "app.dll").unwrap();

		let err = builder.build(dir.path()).await.unwrap_err();
		assert!(err.message().contains("error CS1002"), "{err}");
	}

	#[tokio::test]
	async fn missing_entry_point_fails() {
		let dir = tempfile::tempdir().unwrap();
		let builder = CommandBuilder::new(&shell("true"), "bin/app.dll").unwrap();

		let err = builder.build(dir.path()).await.unwrap_err();
		assert!(err.message().contains("was not produced"));
	}

	#[test]
	fn empty_command_is_rejected() {
		assert!(CommandBuilder::new(&[], "app.dll").is_err());
	}

	#[test]
	fn tail_keeps_last_lines() {
		assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
		assert_eq!(tail("a", 5), "a");
	}
}
