//! Fakes shared by the server integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use runpad_package::{BuildError, Package, PackageBuilder, PackageOptions, PackageRegistry};
use runpad_primitives::{
	Buffer, BufferId, CompletionItem, File, Language, RawDiagnostic, Severity, SignatureHelpItem, Workspace,
	WorkspaceRequest,
};
use runpad_server::{
	BackendError, CompileInput, CompileOutput, CompilerBackend, LanguageWorkspaceServer, PositionInput, RunInput,
	RunOutput, SignatureHelp,
};

pub const PACKAGE: &str = "console";

pub const PROGRAM: &str = concat!(
	"using System;\n",
	"class Program\n",
	"{\n",
	"    static void Main()\n",
	"    {\n",
	"#region alpha\n",
	"        var a = 10;\n",
	"#endregion\n",
	"    }\n",
	"}\n",
);

/// Assembly bytes emitted by [`FakeBackend`] for a clean compile.
pub const ASSEMBLY: &[u8] = b"MZ-fake-assembly";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

#[derive(Default)]
pub struct FakeBuilder {
	pub builds: AtomicUsize,
}

impl FakeBuilder {
	pub fn builds(&self) -> usize {
		self.builds.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl PackageBuilder for FakeBuilder {
	async fn build(&self, directory: &Path) -> Result<PathBuf, BuildError> {
		self.builds.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(Duration::from_millis(10)).await;
		let entry = directory.join("bin/console.dll");
		std::fs::create_dir_all(directory.join("bin")).map_err(|err| BuildError::new(err.to_string()))?;
		std::fs::write(&entry, ASSEMBLY).map_err(|err| BuildError::new(err.to_string()))?;
		Ok(entry)
	}
}

/// Compiler stand-in.
///
/// Reports `CS0029` on the `a` of every `= a;` and a `CS0168` warning on every
/// `unused`, with absolute paths inside the package directory the way a real
/// compiler does.
pub struct FakeBackend {
	pub language: Language,
	pub run_delay: Duration,
}

impl FakeBackend {
	pub fn new(language: Language) -> Self {
		Self {
			language,
			run_delay: Duration::ZERO,
		}
	}

	pub fn with_run_delay(mut self, delay: Duration) -> Self {
		self.run_delay = delay;
		self
	}
}

#[async_trait]
impl CompilerBackend for FakeBackend {
	async fn compile(&self, input: CompileInput) -> Result<CompileOutput, BackendError> {
		let mut diagnostics = Vec::new();
		for file in &input.files {
			let path = input.package_directory.join(&file.name).display().to_string();
			for (index, _) in file.text.match_indices("= a;") {
				let start = index + 2;
				diagnostics.push(RawDiagnostic::new(
					&path,
					start,
					start + 1,
					Severity::Error,
					"CS0029",
					"Cannot implicitly convert type 'int' to 'string'",
				));
			}
			for (index, _) in file.text.match_indices("unused") {
				diagnostics.push(RawDiagnostic::new(
					&path,
					index,
					index + 6,
					Severity::Warning,
					"CS0168",
					format!("{path}: The variable 'unused' is declared but never used"),
				));
			}
		}
		let failed = diagnostics.iter().any(|d| d.severity.is_error());
		Ok(CompileOutput {
			diagnostics,
			assembly: (!failed).then(|| ASSEMBLY.to_vec()),
		})
	}

	async fn run(&self, input: RunInput) -> Result<RunOutput, BackendError> {
		if !self.run_delay.is_zero() {
			tokio::time::sleep(self.run_delay).await;
		}
		Ok(RunOutput {
			stdout: format!(
				"{} ran {} bytes\nargs: {}\n",
				self.language,
				input.assembly.len(),
				input.args.unwrap_or_default()
			),
			stderr: String::new(),
			exception: None,
		})
	}

	async fn completions(&self, input: PositionInput) -> Result<Vec<CompletionItem>, BackendError> {
		let text = word_at(&input)?;
		Ok(vec![CompletionItem {
			display_text: text,
			kind: "Method".into(),
			insert_text: None,
			documentation: None,
		}])
	}

	async fn signature_help(&self, input: PositionInput) -> Result<SignatureHelp, BackendError> {
		Ok(SignatureHelp {
			signatures: vec![SignatureHelpItem {
				label: format!("{}:{}", input.file_name, input.offset),
				documentation: None,
				parameters: Vec::new(),
			}],
			..SignatureHelp::default()
		})
	}
}

/// The identifier characters starting at the cursor.
fn word_at(input: &PositionInput) -> Result<String, BackendError> {
	let file = input
		.files
		.iter()
		.find(|file| file.name == input.file_name)
		.ok_or_else(|| BackendError::new(format!("no file {}", input.file_name)))?;
	Ok(file.text[input.offset..]
		.chars()
		.take_while(|ch| ch.is_alphanumeric())
		.collect())
}

pub struct Fixture {
	pub dir: tempfile::TempDir,
	pub builder: Arc<FakeBuilder>,
	pub packages: Arc<PackageRegistry>,
}

impl Fixture {
	pub fn new() -> Self {
		init_tracing();
		let dir = tempfile::tempdir().unwrap();
		let package_dir = dir.path().join(PACKAGE);
		std::fs::create_dir(&package_dir).unwrap();

		let builder = Arc::new(FakeBuilder::default());
		let packages = Arc::new(PackageRegistry::new());
		packages.register(Package::new(
			PACKAGE,
			package_dir,
			builder.clone(),
			PackageOptions::default(),
		));
		Self { dir, builder, packages }
	}

	pub fn server(&self, language: Language) -> LanguageWorkspaceServer<FakeBackend> {
		self.server_with(FakeBackend::new(language), 4)
	}

	pub fn server_with(&self, backend: FakeBackend, max_concurrent_runs: usize) -> LanguageWorkspaceServer<FakeBackend> {
		LanguageWorkspaceServer::new(
			backend.language.clone(),
			backend,
			Arc::clone(&self.packages),
			max_concurrent_runs,
		)
	}
}

pub fn alpha() -> BufferId {
	BufferId::region("Program.cs", "alpha")
}

/// Request editing region `alpha` of [`PROGRAM`] with `buffer`.
pub fn alpha_request(buffer: &str) -> WorkspaceRequest {
	let workspace = Workspace::new(PACKAGE)
		.with_file(File::new("Program.cs", PROGRAM))
		.with_buffer(Buffer::new(alpha(), buffer));
	WorkspaceRequest::new(workspace, alpha()).with_request_id("req-1")
}
