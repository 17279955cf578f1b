use std::sync::Arc;
use std::time::Duration;

use runpad_primitives::{File, Language, WorkspaceRequest};
use runpad_server::WorkspaceServer;
use runpad_worker::Budget;
use tokio::time::Instant;

use crate::common::{ASSEMBLY, FakeBackend, Fixture, alpha, alpha_request};

#[tokio::test]
async fn run_returns_program_output() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let request = alpha_request("var a = 10;").with_run_args("--verbose");

	let result = server.run(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(result.succeeded);
	assert_eq!(
		result.output,
		[
			format!("csharp ran {} bytes", ASSEMBLY.len()),
			"args: --verbose".to_string()
		]
	);
	assert_eq!(result.exception, None);
	assert_eq!(result.request_id, "req-1");
}

#[tokio::test]
async fn compile_errors_skip_execution() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());

	let result = server
		.run(&alpha_request("var a = 10;\nstring s = a;"), &mut Budget::unbounded())
		.await
		.unwrap();

	assert!(!result.succeeded);
	assert!(result.output.is_empty());
	assert_eq!(result.exception, None);
	assert_eq!(result.diagnostics.len(), 1);
	assert_eq!(result.diagnostics[0].id, "CS0029");
}

#[tokio::test]
async fn errors_outside_the_active_region_fill_the_output() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let request = alpha_request("var a = 10;");
	let workspace = request
		.workspace
		.with_file(File::new("Helper.cs", "class Helper { int a = 1; string s = a; }\n"));
	let request = WorkspaceRequest::new(workspace, alpha()).with_request_id("req-2");

	let result = server.run(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(!result.succeeded);
	assert_eq!(
		result.output,
		["Helper.cs: error CS0029: Cannot implicitly convert type 'int' to 'string'"]
	);
	assert!(result.diagnostics.is_empty());
	assert_eq!(result.exception, None);
	assert_eq!(result.request_id, "req-2");
}

#[tokio::test(start_paused = true)]
async fn budget_exhausted_while_running_yields_no_output() {
	let fixture = Fixture::new();
	let server = fixture.server_with(
		FakeBackend::new(Language::csharp()).with_run_delay(Duration::from_secs(10)),
		4,
	);

	let mut budget = Budget::with_timeout(Duration::from_secs(1));
	let result = server.run(&alpha_request("var a = 10;"), &mut budget).await.unwrap();

	assert!(!result.succeeded);
	assert!(result.output.is_empty());
	assert_eq!(result.diagnostics[0].id, "BudgetExceeded");
	assert!(result.exception.unwrap().contains("server.run"));
	assert_eq!(budget.entries().last().unwrap().name, "server.run:exceeded");
}

#[tokio::test(start_paused = true)]
async fn run_slots_serialize_execution() {
	let fixture = Fixture::new();
	let server = Arc::new(fixture.server_with(
		FakeBackend::new(Language::csharp()).with_run_delay(Duration::from_secs(1)),
		1,
	));

	let started = Instant::now();
	let runs: Vec<_> = (0..2)
		.map(|_| {
			let server = Arc::clone(&server);
			tokio::spawn(async move {
				server
					.run(&alpha_request("var a = 10;"), &mut Budget::with_timeout(Duration::from_secs(30)))
					.await
					.unwrap()
			})
		})
		.collect();
	for run in runs {
		assert!(run.await.unwrap().succeeded);
	}

	assert!(started.elapsed() >= Duration::from_secs(2));
}
