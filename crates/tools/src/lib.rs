//! Built-in tool implementations for Codewright.
//!
//! File tools resolve relative paths against a [`Workspace`] root; code tools
//! are pattern heuristics over the source text they are handed.
//!
//! Every tool follows one contract: `Ok({"success": true, ..})` on success,
//! `Ok({"success": false, "error": ..})` for problems with the request's
//! subject (missing file, bad pattern), and `Err(..)` only for malformed
//! arguments.

pub mod analysis;
pub mod code_tools;
pub mod create_dir;
pub mod file_list;
pub mod file_read;
pub mod file_write;
pub mod workspace;

use std::path::PathBuf;

use codewright_core::tool::{ToolRegistry, ToolRegistryBuilder};

pub use workspace::Workspace;

/// Register all built-in tools on `builder`, in their canonical order.
pub fn register_defaults(builder: ToolRegistryBuilder, workspace: &Workspace) -> ToolRegistryBuilder {
    builder
        .register(file_read::FileReadTool::new(workspace.clone()))
        .register(file_write::FileWriteTool::new(workspace.clone()))
        .register(file_list::ListFilesTool::new(workspace.clone()))
        .register(file_list::SearchFilesTool::new(workspace.clone()))
        .register(create_dir::CreateDirectoryTool::new(workspace.clone()))
        .register(code_tools::AnalyzeCodeTool)
        .register(code_tools::GenerateCodeTool)
        .register(code_tools::RefactorCodeTool)
        .register(code_tools::DebugCodeTool)
        .register(code_tools::TestCodeTool)
}

/// Create a registry with every built-in tool rooted at `working_dir`.
pub fn default_registry(working_dir: impl Into<PathBuf>) -> ToolRegistry {
    let workspace = Workspace::new(working_dir);
    register_defaults(ToolRegistry::builder(), &workspace).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_lists_all_tools_in_order() {
        let registry = default_registry(".");
        assert_eq!(
            registry.names(),
            vec![
                "read_file",
                "write_file",
                "list_files",
                "search_files",
                "create_directory",
                "analyze_code",
                "generate_code",
                "refactor_code",
                "debug_code",
                "test_code",
            ]
        );
        for spec in registry.specs() {
            assert_eq!(spec.parameters["type"], "object", "{}", spec.name);
        }
    }

    #[tokio::test]
    async fn registry_dispatch_reaches_file_tools() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(dir.path());

        registry
            .dispatch(
                "write_file",
                serde_json::json!({ "path": "hello.txt", "content": "hi" }),
            )
            .await
            .unwrap();
        let out = registry
            .dispatch("read_file", serde_json::json!({ "path": "hello.txt" }))
            .await
            .unwrap();
        assert_eq!(out["content"], "hi");
    }
}
