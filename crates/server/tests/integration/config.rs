#![cfg(unix)]

use std::sync::Arc;

use runpad_package::{MARKER_FILE, PackageState};
use runpad_primitives::Language;
use runpad_server::{LanguageWorkspaceServer, ServerConfig, WorkspaceServer};

use crate::common::{FakeBackend, PACKAGE, alpha_request, init_tracing};

fn write_config(dir: &std::path::Path, build_script: &str) -> std::path::PathBuf {
	let package_dir = dir.join(PACKAGE);
	std::fs::create_dir(&package_dir).unwrap();
	let path = dir.join("runpad.toml");
	std::fs::write(
		&path,
		format!(
			r#"
default_timeout_ms = 30000
max_concurrent_runs = 1

[[packages]]
name = "{PACKAGE}"
directory = "{}"
build_command = ["sh", "-c", "{build_script}"]
entry_point = "bin/console.dll"
build_timeout_secs = 30
rebuild = "never"
"#,
			package_dir.display()
		),
	)
	.unwrap();
	path
}

#[tokio::test]
async fn configured_command_package_serves_requests() {
	init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = ServerConfig::load(&write_config(
		dir.path(),
		"mkdir -p bin && printf il > bin/console.dll",
	))
	.unwrap();
	let packages = Arc::new(config.package_registry().unwrap());
	let server = LanguageWorkspaceServer::new(
		Language::csharp(),
		FakeBackend::new(Language::csharp()),
		Arc::clone(&packages),
		config.max_concurrent_runs,
	);

	let result = server
		.compile(&alpha_request("var a = 10;"), &mut config.request_budget())
		.await
		.unwrap();

	assert!(result.succeeded, "{:?}", result.diagnostics);
	let package = packages.find(PACKAGE).unwrap();
	assert_eq!(package.state(), PackageState::Ready);
	assert!(package.directory().join(MARKER_FILE).is_file());
	assert!(!package.invalidate());
}

#[tokio::test]
async fn failing_build_is_reported_and_cached() {
	init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = ServerConfig::load(&write_config(dir.path(), "echo restore failed >&2; exit 1")).unwrap();
	let packages = Arc::new(config.package_registry().unwrap());
	let server = LanguageWorkspaceServer::new(
		Language::csharp(),
		FakeBackend::new(Language::csharp()),
		packages,
		config.max_concurrent_runs,
	);

	for _ in 0..2 {
		let result = server
			.compile(&alpha_request("var a = 10;"), &mut config.request_budget())
			.await
			.unwrap();
		assert!(!result.succeeded);
		assert_eq!(result.diagnostics[0].id, "PackageBuildFailed");
		assert!(result.diagnostics[0].message.contains("restore failed"));
	}
}
