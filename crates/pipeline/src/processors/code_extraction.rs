//! Fenced code block extraction, with optional saving to disk.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use codewright_core::error::PipelineError;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::PipelineContext;
use crate::processor::{Processor, ProcessorOutput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub language: String,
    /// Characters written.
    pub size: usize,
}

/// A response text with the code blocks found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
    pub files: Vec<SavedFile>,
}

impl Extraction {
    pub fn has_code(&self) -> bool {
        !self.code_blocks.is_empty()
    }
}

/// Every ```` ```lang ```` fenced block in `text`, in order.
/// A fence without a language tag is reported as `text`. Filenames are
/// unique within one reply: repeats become `name_2.ext`, `name_3.ext`, ...
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let Ok(re) = Regex::new(r"(?s)```(\w+)?\r?\n(.*?)```") else {
        return Vec::new();
    };
    let mut taken = HashSet::new();
    re.captures_iter(text)
        .map(|caps| {
            let language = caps.get(1).map_or("text", |m| m.as_str()).to_string();
            let raw = caps.get(2).map_or("", |m| m.as_str());
            CodeBlock {
                filename: unique_filename(suggest_filename(&language, raw), &mut taken),
                code: raw.trim().to_string(),
                language,
            }
        })
        .collect()
}

fn unique_filename(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));
    let mut n = 2;
    loop {
        let candidate = if ext.is_empty() {
            format!("{stem}_{n}")
        } else {
            format!("{stem}_{n}.{ext}")
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `<name>.<ext>`, where the name comes from the first class, then the first
/// function or binding, declared in `code`.
pub fn suggest_filename(language: &str, code: &str) -> String {
    let first = |pattern: &str| {
        Regex::new(pattern)
            .ok()
            .and_then(|re| re.captures(code))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };
    let name = first(r"\bclass\s+(\w+)")
        .or_else(|| first(r"\b(?:function|const|let|var|fn|def)\s+(\w+)"))
        .unwrap_or_else(|| "code".into());
    format!("{name}.{}", extension(language))
}

fn extension(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "javascript" | "js" => "js",
        "typescript" | "ts" => "ts",
        "python" | "py" => "py",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "go" => "go",
        "rust" | "rs" => "rs",
        "ruby" => "rb",
        "php" => "php",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" => "yml",
        "markdown" => "md",
        "bash" | "shell" | "sh" => "sh",
        _ => "txt",
    }
}

/// Pulls fenced code out of model replies. With auto-save enabled every
/// block is written to the output directory under its suggested filename.
pub struct CodeExtractionProcessor {
    output_dir: Option<PathBuf>,
}

impl CodeExtractionProcessor {
    pub fn new() -> Self {
        Self { output_dir: None }
    }

    pub fn with_auto_save(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub async fn extract(&self, text: &str) -> Result<Extraction, PipelineError> {
        let code_blocks = extract_code_blocks(text);
        let mut files = Vec::new();

        if let Some(dir) = &self.output_dir
            && !code_blocks.is_empty()
        {
            let failed = |e: std::io::Error, path: &std::path::Path| PipelineError::Processor {
                name: "code_extraction".into(),
                message: format!("{}: {e}", path.display()),
            };

            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| failed(e, dir.as_path()))?;
            for block in &code_blocks {
                let path = dir.join(&block.filename);
                tokio::fs::write(&path, &block.code)
                    .await
                    .map_err(|e| failed(e, path.as_path()))?;
                info!(path = %path.display(), language = %block.language, "Saved code block");
                files.push(SavedFile {
                    path,
                    language: block.language.clone(),
                    size: block.code.chars().count(),
                });
            }
        }

        debug!(blocks = code_blocks.len(), saved = files.len(), "Code extracted");
        Ok(Extraction {
            text: text.to_string(),
            code_blocks,
            files,
        })
    }
}

impl Default for CodeExtractionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for CodeExtractionProcessor {
    fn name(&self) -> &str {
        "code_extraction"
    }

    fn can_handle(&self, input: &str, _ctx: &PipelineContext) -> bool {
        input.contains("```")
    }

    async fn process(
        &self,
        input: &str,
        _ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError> {
        let extraction = self.extract(input).await?;
        if !extraction.has_code() {
            return Ok(None);
        }
        let data = serde_json::to_value(&extraction).map_err(|e| PipelineError::Processor {
            name: self.name().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(
            ProcessorOutput::text(self.name(), input).with_data(data),
        ))
    }
}
