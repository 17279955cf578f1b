use std::sync::Arc;

use runpad_primitives::{Buffer, BufferId, File, Language, Workspace, WorkspaceRequest};
use runpad_server::{ServerError, WorkspaceServer, WorkspaceServerMultiplexer};
use runpad_worker::Budget;

use crate::common::{Fixture, PACKAGE, PROGRAM, alpha, alpha_request};

fn multiplexer(fixture: &Fixture) -> WorkspaceServerMultiplexer {
	WorkspaceServerMultiplexer::new()
		.with_server(Language::csharp(), Arc::new(fixture.server(Language::csharp())))
		.with_server(Language::fsharp(), Arc::new(fixture.server(Language::fsharp())))
}

fn fsharp_request() -> WorkspaceRequest {
	let workspace = Workspace::new(PACKAGE)
		.with_language(Language::fsharp())
		.with_file(File::new("Program.fs", "[<EntryPoint>]\n//#region body\nlet main _ = 0\n//#endregion\n"));
	WorkspaceRequest::new(workspace, BufferId::region("Program.fs", "body"))
}

#[tokio::test]
async fn requests_route_by_language() {
	let fixture = Fixture::new();
	let multiplexer = multiplexer(&fixture);

	let csharp = multiplexer.run(&alpha_request("var a = 10;"), &mut Budget::unbounded()).await.unwrap();
	let fsharp = multiplexer.run(&fsharp_request(), &mut Budget::unbounded()).await.unwrap();

	assert!(csharp.output[0].starts_with("csharp ran"));
	assert!(fsharp.output[0].starts_with("fsharp ran"));
	assert_eq!(multiplexer.languages(), [Language::csharp(), Language::fsharp()]);
	// both languages share the package cache
	assert_eq!(fixture.builder.builds(), 1);
}

#[tokio::test]
async fn unregistered_language_fails_fast() {
	let fixture = Fixture::new();
	let multiplexer = multiplexer(&fixture);
	let workspace = Workspace::new(PACKAGE).with_language(Language::new("vb"));
	let request = WorkspaceRequest::new(workspace, BufferId::file("Program.vb"));

	let err = multiplexer.compile(&request, &mut Budget::unbounded()).await.unwrap_err();

	assert!(matches!(&err, ServerError::UnsupportedLanguage { language } if language.as_str() == "vb"));
	assert_eq!(err.diagnostic_id(), "UnsupportedLanguage");
	assert_eq!(fixture.builder.builds(), 0);
}

#[tokio::test]
async fn completion_position_is_translated_into_the_inlined_document() {
	let fixture = Fixture::new();
	let multiplexer = multiplexer(&fixture);
	let workspace = Workspace::new(PACKAGE)
		.with_file(File::new("Program.cs", PROGRAM))
		.with_buffer(Buffer::new(alpha(), "Console.WriteLine").at(8));
	let request = WorkspaceRequest::new(workspace, alpha()).with_request_id("complete-1");

	let result = multiplexer.completions(&request, &mut Budget::unbounded()).await.unwrap();

	assert!(result.diagnostics.is_empty());
	assert_eq!(result.items[0].display_text, "WriteLine");
	assert_eq!(result.request_id, "complete-1");
}

#[tokio::test]
async fn signature_help_reports_the_inlined_offset() {
	let fixture = Fixture::new();
	let multiplexer = multiplexer(&fixture);
	let workspace = Workspace::new(PACKAGE)
		.with_file(File::new("Program.cs", PROGRAM))
		.with_buffer(Buffer::new(alpha(), "Math.Max(1, ").at(9));
	let request = WorkspaceRequest::new(workspace, alpha());

	let result = multiplexer.signature_help(&request, &mut Budget::unbounded()).await.unwrap();

	let region_start = PROGRAM.find("#region alpha\n").unwrap() + "#region alpha\n".len();
	let expected = format!("Program.cs:{}", region_start + 1 + 9);
	assert_eq!(result.signatures[0].label, expected);
}

#[tokio::test]
async fn position_requests_report_failures_as_diagnostics() {
	let fixture = Fixture::new();
	let multiplexer = multiplexer(&fixture);
	let workspace = Workspace::new("nonexistent").with_file(File::new("Program.cs", PROGRAM));
	let request = WorkspaceRequest::new(workspace, alpha());

	let result = multiplexer.completions(&request, &mut Budget::unbounded()).await.unwrap();
	assert!(result.items.is_empty());
	assert_eq!(result.diagnostics[0].id, "PackageNotFound");
}
