//! Terminal formatting for model replies.

use async_trait::async_trait;
use codewright_core::error::PipelineError;
use regex_lite::Regex;

use crate::context::PipelineContext;
use crate::processor::{Processor, ProcessorOutput};
use crate::processors::code_extraction::Extraction;

#[derive(Debug, Clone, Copy)]
enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Cyan => "\x1b[36m",
        }
    }
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Highlights fences, headers and bullets, and summarizes extracted code.
pub struct ResponseFormattingProcessor {
    colors: bool,
    show_metadata: bool,
}

impl ResponseFormattingProcessor {
    pub fn new() -> Self {
        Self {
            colors: true,
            show_metadata: true,
        }
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_metadata(mut self, show: bool) -> Self {
        self.show_metadata = show;
        self
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.colors {
            return text.to_string();
        }
        let bold = if bold { BOLD } else { "" };
        format!("{bold}{}{text}{RESET}", color.code())
    }

    /// Line-by-line highlighting of plain reply text.
    pub fn format_text(&self, text: &str) -> String {
        let bullet = Regex::new(r"^(\s*)[-*]\s(.*)$").ok();
        text.split('\n')
            .map(|line| {
                if line.starts_with("```") {
                    return self.paint(line, Color::Cyan, false);
                }
                if line.starts_with('#') {
                    return self.paint(line, Color::Yellow, true);
                }
                if let Some(caps) = bullet.as_ref().and_then(|re| re.captures(line)) {
                    let indent = caps.get(1).map_or("", |m| m.as_str());
                    let rest = caps.get(2).map_or("", |m| m.as_str());
                    return format!("{indent}{} {rest}", self.paint("•", Color::Green, false));
                }
                line.to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Plain text gets [`format_text`](Self::format_text); a reply with code
    /// is kept verbatim and followed by a block summary.
    pub fn format(&self, extraction: &Extraction) -> String {
        if !extraction.has_code() {
            return self.format_text(&extraction.text);
        }

        let mut out = extraction.text.clone();
        if !self.show_metadata {
            return out;
        }

        out.push_str("\n\n");
        out.push_str(&self.paint(&"━".repeat(50), Color::Blue, false));
        out.push('\n');
        out.push_str(&self.paint(
            &format!("📝 Found {} code block(s)", extraction.code_blocks.len()),
            Color::Blue,
            true,
        ));
        for (i, block) in extraction.code_blocks.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} ({} chars) → {}",
                i + 1,
                block.language,
                block.code.chars().count(),
                block.filename
            ));
        }

        if !extraction.files.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.paint("✅ Saved files:", Color::Green, true));
            for file in &extraction.files {
                out.push_str(&format!("\n  📄 {}", file.path.display()));
            }
        }
        out
    }
}

impl Default for ResponseFormattingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for ResponseFormattingProcessor {
    fn name(&self) -> &str {
        "response_formatting"
    }

    async fn process(
        &self,
        input: &str,
        _ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError> {
        Ok(Some(ProcessorOutput::text(self.name(), self.format_text(input))))
    }
}
