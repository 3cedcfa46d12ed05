//! Heuristic code tools: analyze, generate, refactor, debug, test.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::Tool;

use crate::analysis::{complexity, extract_functions, find_issues, function_name};
use crate::workspace::required_str;

fn code_schema(extra: serde_json::Value) -> serde_json::Value {
    let mut properties = serde_json::json!({
        "code": { "type": "string", "description": "Source code" }
    });
    if let (Some(base), Some(more)) = (properties.as_object_mut(), extra.as_object()) {
        base.extend(more.clone());
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": ["code"]
    })
}

fn severity(issues: &[crate::analysis::Issue]) -> &'static str {
    if issues.is_empty() { "clean" } else { "warning" }
}

pub struct AnalyzeCodeTool;

#[async_trait]
impl Tool for AnalyzeCodeTool {
    fn name(&self) -> &str {
        "analyze_code"
    }

    fn description(&self) -> &str {
        "Analyze code for issues, complexity, and quality"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        code_schema(serde_json::json!({
            "language": { "type": "string", "description": "Programming language" }
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let code = required_str(&arguments, "code")?;
        let language = arguments["language"].as_str().unwrap_or("javascript");

        let functions = extract_functions(code);
        let issues = find_issues(code);
        let suggestions: Vec<&str> = issues.iter().map(|i| i.suggestion).collect();

        Ok(serde_json::json!({
            "success": true,
            "language": language,
            "lines": code.lines().count(),
            "functions": functions.len(),
            "function_names": functions,
            "complexity": complexity(code),
            "severity": severity(&issues),
            "issues": issues,
            "suggestions": suggestions,
        }))
    }
}

pub struct GenerateCodeTool;

impl GenerateCodeTool {
    fn template(description: &str, language: &str) -> String {
        let name = function_name(description);
        match language {
            "python" => format!(
                "def {name}(*args, **kwargs):\n    \"\"\"{description}\"\"\"\n    raise NotImplementedError(\"{name}\")\n"
            ),
            "rust" => format!(
                "/// {description}\npub fn {name}() {{\n    unimplemented!(\"{name}\")\n}}\n"
            ),
            "typescript" => format!(
                "/**\n * {description}\n */\nexport function {name}(...args: unknown[]): unknown {{\n  throw new Error('Not implemented: {name}');\n}}\n"
            ),
            _ => format!(
                "/**\n * {description}\n */\nfunction {name}(params) {{\n  // Implement: {description}\n  throw new Error('Not implemented');\n}}\n\nmodule.exports = {name};\n"
            ),
        }
    }
}

#[async_trait]
impl Tool for GenerateCodeTool {
    fn name(&self) -> &str {
        "generate_code"
    }

    fn description(&self) -> &str {
        "Generate code from description"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "description": { "type": "string", "description": "What code to generate" },
                "language": { "type": "string", "description": "Programming language" },
                "framework": { "type": "string", "description": "Framework or library to use" }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let description = required_str(&arguments, "description")?;
        let language = arguments["language"]
            .as_str()
            .unwrap_or("javascript")
            .to_lowercase();

        Ok(serde_json::json!({
            "success": true,
            "description": description,
            "language": language,
            "framework": arguments.get("framework").cloned().unwrap_or(serde_json::Value::Null),
            "code": Self::template(description, &language),
        }))
    }
}

pub struct RefactorCodeTool;

#[async_trait]
impl Tool for RefactorCodeTool {
    fn name(&self) -> &str {
        "refactor_code"
    }

    fn description(&self) -> &str {
        "Refactor code to improve quality"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        code_schema(serde_json::json!({
            "refactor_type": {
                "type": "string",
                "description": "Type of refactoring: modernize or trim_whitespace"
            }
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let code = required_str(&arguments, "code")?;
        let refactor_type = arguments["refactor_type"].as_str().unwrap_or("modernize");

        let (refactored, changes) = match refactor_type {
            "modernize" => match regex_lite::Regex::new(r"\bvar\s+") {
                Ok(re) => (
                    re.replace_all(code, "const ").into_owned(),
                    re.find_iter(code).count(),
                ),
                Err(e) => return Err(ToolError::execution("refactor_code", e)),
            },
            "trim_whitespace" => {
                let trimmed: Vec<&str> = code.lines().map(str::trim_end).collect();
                let changes = code
                    .lines()
                    .zip(&trimmed)
                    .filter(|(a, b)| a.len() != b.len())
                    .count();
                (trimmed.join("\n"), changes)
            }
            other => {
                return Ok(serde_json::json!({
                    "success": false,
                    "error": format!("unknown refactor_type '{other}'"),
                }));
            }
        };

        Ok(serde_json::json!({
            "success": true,
            "refactor_type": refactor_type,
            "original_lines": code.lines().count(),
            "refactored_lines": refactored.lines().count(),
            "changes": changes,
            "code": refactored,
        }))
    }
}

pub struct DebugCodeTool;

#[async_trait]
impl Tool for DebugCodeTool {
    fn name(&self) -> &str {
        "debug_code"
    }

    fn description(&self) -> &str {
        "Debug code and find issues"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        code_schema(serde_json::json!({
            "error": { "type": "string", "description": "Error message if any" }
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let code = required_str(&arguments, "code")?;
        let issues = find_issues(code);
        let suggestions: Vec<serde_json::Value> = issues
            .iter()
            .map(|i| serde_json::json!({ "suggestion": i.suggestion }))
            .collect();

        Ok(serde_json::json!({
            "success": true,
            "reported_error": arguments.get("error").cloned().unwrap_or(serde_json::Value::Null),
            "severity": severity(&issues),
            "issues": issues,
            "suggestions": suggestions,
        }))
    }
}

pub struct TestCodeTool;

impl TestCodeTool {
    fn render(functions: &[String], framework: &str) -> String {
        match framework {
            "jest" | "mocha" | "vitest" => {
                let cases: Vec<String> = functions
                    .iter()
                    .map(|f| {
                        format!("  it('should test {f}', () => {{\n    expect({f}).toBeDefined();\n  }});")
                    })
                    .collect();
                format!("describe('Tests', () => {{\n{}\n}});\n", cases.join("\n"))
            }
            "pytest" => functions
                .iter()
                .map(|f| format!("def test_{f}():\n    assert callable({f})\n"))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => format!("// Tests for {}\n", functions.join(", ")),
        }
    }
}

#[async_trait]
impl Tool for TestCodeTool {
    fn name(&self) -> &str {
        "test_code"
    }

    fn description(&self) -> &str {
        "Generate tests for code"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        code_schema(serde_json::json!({
            "framework": { "type": "string", "description": "Test framework" }
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let code = required_str(&arguments, "code")?;
        let framework = arguments["framework"].as_str().unwrap_or("jest");
        let functions = extract_functions(code);

        Ok(serde_json::json!({
            "success": true,
            "framework": framework,
            "functions": functions.len(),
            "tests": Self::render(&functions, framework),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn analyze_reports_metrics() {
        let out = AnalyzeCodeTool
            .execute(serde_json::json!({
                "code": "var a = 1;\nfunction f() {\n  if (a = 2) { return 1; }\n}"
            }))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["lines"], 4);
        assert_eq!(out["functions"], 1);
        assert_eq!(out["complexity"]["level"], "low");
        assert_eq!(out["issues"].as_array().unwrap().len(), 2);
        assert_eq!(out["severity"], "warning");
    }

    #[tokio::test]
    async fn analyze_requires_code() {
        let err = AnalyzeCodeTool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn generate_defaults_to_javascript() {
        let out = GenerateCodeTool
            .execute(serde_json::json!({ "description": "a palindrome checker" }))
            .await
            .unwrap();
        assert_eq!(out["language"], "javascript");
        let code = out["code"].as_str().unwrap();
        assert!(code.contains("function palindromeChecker(params)"));
        assert!(code.contains("module.exports = palindromeChecker;"));
    }

    #[tokio::test]
    async fn generate_python() {
        let out = GenerateCodeTool
            .execute(serde_json::json!({ "description": "fibonacci sequence", "language": "Python" }))
            .await
            .unwrap();
        assert!(out["code"].as_str().unwrap().starts_with("def fibonacciSequence("));
    }

    #[tokio::test]
    async fn refactor_modernizes_var() {
        let out = RefactorCodeTool
            .execute(serde_json::json!({ "code": "var a = 1;\nvar b = 2;", "refactor_type": "modernize" }))
            .await
            .unwrap();
        assert_eq!(out["code"], "const a = 1;\nconst b = 2;");
        assert_eq!(out["changes"], 2);
    }

    #[tokio::test]
    async fn refactor_unknown_type_is_domain_failure() {
        let out = RefactorCodeTool
            .execute(serde_json::json!({ "code": "x", "refactor_type": "rewrite-in-rust" }))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
    }

    #[tokio::test]
    async fn debug_lists_suggestions() {
        let out = DebugCodeTool
            .execute(serde_json::json!({ "code": "if (x = 1) {}", "error": "always true" }))
            .await
            .unwrap();
        assert_eq!(out["issues"][0]["type"], "error");
        assert_eq!(out["suggestions"][0]["suggestion"], "Use === for comparison");
        assert_eq!(out["reported_error"], "always true");
    }

    #[tokio::test]
    async fn test_code_renders_jest_cases() {
        let out = TestCodeTool
            .execute(serde_json::json!({ "code": "function add(a, b) { return a + b; }" }))
            .await
            .unwrap();
        assert_eq!(out["framework"], "jest");
        let tests = out["tests"].as_str().unwrap();
        assert!(tests.contains("describe('Tests'"));
        assert!(tests.contains("expect(add).toBeDefined();"));
    }
}
