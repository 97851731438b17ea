//! MCP server exposing repository ingestion and retrieval over stdio or
//! streamable HTTP.

pub mod error;
pub mod server;
pub mod tools;

pub use error::ToolError;
pub use server::{MCP_PATH, RepoContextServer, http_router, serve_http, serve_stdio};
pub use tools::{RAG_TO_CONTEXT, REPO_TO_RAG, RepoContextTools, dispatch};
