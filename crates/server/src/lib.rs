//! Language workspace servers.
//!
//! A [`LanguageWorkspaceServer`] runs the request pipeline for one language
//! on top of a [`CompilerBackend`]:
//!
//! 1. inline the active buffer into the workspace,
//! 2. find the package named by the workspace type and wait until it is built,
//! 3. compile (and optionally run) through the backend, bounded by the budget,
//! 4. map diagnostics back onto the active buffer.
//!
//! [`WorkspaceServerMultiplexer`] picks the server by workspace language.

mod backend;
mod config;
mod error;
mod multiplexer;
mod server;

pub use backend::{
	BackendError, CompileInput, CompileOutput, CompilerBackend, PositionInput, RunInput, RunOutput, SignatureHelp,
};
pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use multiplexer::WorkspaceServerMultiplexer;
pub use server::{LanguageWorkspaceServer, WorkspaceServer};
