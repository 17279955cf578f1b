use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use runpad_primitives::{BufferId, File, Language, Severity, Workspace, WorkspaceRequest};
use runpad_server::WorkspaceServer;
use runpad_worker::Budget;

use crate::common::{ASSEMBLY, Fixture, PACKAGE, PROGRAM, alpha, alpha_request};

#[tokio::test]
async fn type_error_is_reported_inside_the_region() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let buffer = "var a = 10;\nstring s = a;";

	let result = server
		.compile(&alpha_request(buffer), &mut Budget::with_timeout(Duration::from_secs(30)))
		.await
		.unwrap();

	assert!(!result.succeeded);
	assert_eq!(result.assembly_base64, None);
	assert_eq!(result.request_id, "req-1");
	assert_eq!(result.diagnostics.len(), 1);

	let diagnostic = &result.diagnostics[0];
	assert_eq!(diagnostic.severity, Severity::Error);
	assert_eq!(diagnostic.buffer_id, Some(alpha()));
	assert!(diagnostic.end <= buffer.len());
	assert_eq!(&buffer[diagnostic.start..diagnostic.end], "a");
	assert_eq!(
		diagnostic.message,
		"(2,12): error CS0029: Cannot implicitly convert type 'int' to 'string'"
	);
}

#[tokio::test]
async fn clean_region_compiles_to_an_assembly() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());

	let mut budget = Budget::unbounded();
	let result = server.compile(&alpha_request("var a = 10;"), &mut budget).await.unwrap();

	assert!(result.succeeded, "{:?}", result.diagnostics);
	let assembly = STANDARD.decode(result.assembly_base64.unwrap()).unwrap();
	assert_eq!(assembly, ASSEMBLY);

	let checkpoints: Vec<&str> = budget.entries().iter().map(|entry| entry.name.as_str()).collect();
	assert_eq!(
		checkpoints,
		["server.inline", "server.package_ready", "server.compile", "diagnostics.map"]
	);
}

#[tokio::test]
async fn concurrent_requests_build_the_package_once() {
	let fixture = Fixture::new();
	let server = Arc::new(fixture.server(Language::csharp()));

	let requests = (0..6).map(|_| {
		let server = Arc::clone(&server);
		tokio::spawn(async move {
			server
				.compile(&alpha_request("var a = 10;"), &mut Budget::unbounded())
				.await
				.unwrap()
		})
	});
	let results = join_all(requests).await;

	assert!(results.into_iter().all(|result| result.unwrap().succeeded));
	assert_eq!(fixture.builder.builds(), 1);
}

#[tokio::test]
async fn unknown_package_fails_without_creating_directories() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let workspace = Workspace::new("nonexistent").with_file(File::new("Program.cs", PROGRAM));
	let request = WorkspaceRequest::new(workspace, alpha());

	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(!result.succeeded);
	assert_eq!(result.diagnostics[0].id, "PackageNotFound");
	assert!(result.diagnostics[0].message.contains("nonexistent"));
	let entries: Vec<_> = std::fs::read_dir(fixture.dir.path())
		.unwrap()
		.map(|entry| entry.unwrap().file_name())
		.collect();
	assert_eq!(entries, [PACKAGE]);
}

#[tokio::test]
async fn malformed_workspaces_fail_with_their_error_id() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());

	let duplicate = Workspace::new(PACKAGE).with_file(File::new(
		"Program.cs",
		"#region alpha\n#endregion\n#region alpha\n#endregion\n",
	));
	let result = server
		.compile(&WorkspaceRequest::new(duplicate, alpha()), &mut Budget::unbounded())
		.await
		.unwrap();
	assert_eq!(result.diagnostics[0].id, "DuplicateRegion");

	let missing = Workspace::new(PACKAGE).with_file(File::new("Program.cs", PROGRAM));
	let request = WorkspaceRequest::new(missing, BufferId::region("Program.cs", "gamma"));
	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();
	assert!(!result.succeeded);
	assert_eq!(result.diagnostics[0].id, "UnknownBuffer");
	assert_eq!(fixture.builder.builds(), 0);
}

#[tokio::test]
async fn warnings_elsewhere_are_dropped_but_errors_kept() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let workspace = Workspace::new(PACKAGE)
		.with_file(File::new("Program.cs", "class Program { static void Main() { } }\n"))
		.with_file(File::new("Helper.cs", "class Helper { int unused; string s = a; }\n"));
	let request = WorkspaceRequest::new(workspace, BufferId::file("Program.cs"));

	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(!result.succeeded);
	let ids: Vec<(&str, Option<String>)> = result
		.diagnostics
		.iter()
		.map(|d| (d.id.as_str(), d.buffer_id.as_ref().map(ToString::to_string)))
		.collect();
	assert_eq!(ids, [("CS0029", Some("Helper.cs".to_string()))]);
}

#[tokio::test]
async fn errors_outside_the_active_region_are_still_reported() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let request = alpha_request("var a = 10;");
	let workspace = request
		.workspace
		.with_file(File::new("Helper.cs", "class Helper { int a = 1; string s = a; }\n"));
	let request = WorkspaceRequest::new(workspace, alpha());

	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(!result.succeeded);
	assert_eq!(result.assembly_base64, None);
	assert_eq!(result.diagnostics.len(), 1);
	assert_eq!(result.diagnostics[0].id, "CS0029");
	assert_eq!(result.diagnostics[0].buffer_id, Some(BufferId::file("Helper.cs")));
	assert_eq!(
		result.diagnostics[0].message,
		"Cannot implicitly convert type 'int' to 'string'"
	);

	let diagnosed = server.diagnostics(&request, &mut Budget::unbounded()).await.unwrap();
	assert_eq!(diagnosed.diagnostics, result.diagnostics);
}

#[tokio::test]
async fn whole_file_compile_sees_code_inside_regions() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let workspace = Workspace::new(PACKAGE).with_file(File::new(
		"Program.cs",
		"class P {\n#region alpha\nstring s = a;\n#endregion\n}\n",
	));
	let request = WorkspaceRequest::new(workspace, BufferId::file("Program.cs"));

	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(!result.succeeded);
	assert_eq!(result.diagnostics.len(), 1);
	assert_eq!(result.diagnostics[0].id, "CS0029");
	assert_eq!(result.diagnostics[0].buffer_id, Some(BufferId::file("Program.cs")));
}

#[tokio::test]
async fn exhausted_budget_fails_the_compile() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());

	let result = server
		.compile(&alpha_request("var a = 10;"), &mut Budget::with_timeout(Duration::ZERO))
		.await
		.unwrap();

	assert!(!result.succeeded);
	assert_eq!(result.diagnostics[0].id, "BudgetExceeded");
	assert_eq!(fixture.builder.builds(), 0);
}

#[tokio::test]
async fn diagnostics_match_compile() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let request = alpha_request("var a = 10;\nstring s = a;");

	let compiled = server.compile(&request, &mut Budget::unbounded()).await.unwrap();
	let diagnosed = server.diagnostics(&request, &mut Budget::unbounded()).await.unwrap();
	assert_eq!(diagnosed.diagnostics, compiled.diagnostics);
	assert_eq!(diagnosed.request_id, "req-1");
}

#[tokio::test]
async fn wire_request_round_trips_through_the_server() {
	let fixture = Fixture::new();
	let server = fixture.server(Language::csharp());
	let request: WorkspaceRequest = serde_json::from_value(serde_json::json!({
		"workspace": {
			"workspaceType": PACKAGE,
			"language": "CSharp",
			"files": [{ "name": "Program.cs", "text": PROGRAM }],
			"buffers": [{ "id": "Program.cs@alpha", "content": "var a = 10;\nstring s = a;", "position": 0 }]
		},
		"activeBufferId": "Program.cs@alpha",
		"requestId": "wire-7"
	}))
	.unwrap();

	let result = server.compile(&request, &mut Budget::unbounded()).await.unwrap();
	let json = serde_json::to_value(&result).unwrap();

	assert_eq!(json["succeeded"], false);
	assert_eq!(json["requestId"], "wire-7");
	assert_eq!(json["diagnostics"][0]["bufferId"], "Program.cs@alpha");
	assert!(json.get("assemblyBase64").is_none());
}
