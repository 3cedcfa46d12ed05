//! Prompt templates with `{{param}}` placeholders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use codewright_core::error::SessionError;
use serde::Serialize;

/// A registered prompt template.
#[derive(Debug, Clone, Serialize)]
pub struct PromptTemplate {
    pub name: String,
    pub template: String,
    /// Parameter names the template expects
    pub parameters: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Name and parameters of a template, as listed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSummary {
    pub name: String,
    pub parameters: Vec<String>,
}

/// A named set of prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    prompts: Vec<PromptTemplate>,
    index: HashMap<String, usize>,
}

impl PromptLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// A library preloaded with the built-in coding templates.
    pub fn with_defaults() -> Self {
        let mut library = Self::new();
        library.register(
            "code_review",
            "Review the following {{language}} code and provide feedback:\n\n```{{language}}\n{{code}}\n```\n\nProvide feedback on:\n- Code quality\n- Potential bugs\n- Performance issues\n- Best practices",
            &["code", "language"],
        );
        library.register(
            "implement_feature",
            "Implement the following feature:\n\n{{description}}\n\nRequirements:\n{{requirements}}\n\nProvide a complete implementation.",
            &["description", "requirements"],
        );
        library.register(
            "fix_bug",
            "Fix the bug in the following code:\n\n```{{language}}\n{{code}}\n```\n\nError: {{error}}\n\nProvide the corrected code and explanation.",
            &["code", "language", "error"],
        );
        library.register(
            "explain_code",
            "Explain the following {{language}} code:\n\n```{{language}}\n{{code}}\n```\n\nProvide a detailed explanation of what it does.",
            &["code", "language"],
        );
        library.register(
            "optimize_code",
            "Optimize the following {{language}} code for {{optimization_goal}}:\n\n```{{language}}\n{{code}}\n```\n\nProvide optimized version and explain improvements.",
            &["code", "language", "optimization_goal"],
        );
        library
    }

    /// Register (or replace) a template.
    pub fn register(&mut self, name: &str, template: &str, parameters: &[&str]) {
        let prompt = PromptTemplate {
            name: name.to_string(),
            template: template.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            created_at: Utc::now(),
        };
        match self.index.get(name) {
            Some(&i) => self.prompts[i] = prompt,
            None => {
                self.index.insert(name.to_string(), self.prompts.len());
                self.prompts.push(prompt);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.index.get(name).map(|&i| &self.prompts[i])
    }

    /// Render a template. Placeholders without a value stay as written.
    pub fn render(&self, name: &str, values: &HashMap<&str, &str>) -> Result<String, SessionError> {
        let prompt = self
            .get(name)
            .ok_or_else(|| SessionError::PromptNotFound(name.to_string()))?;

        let mut rendered = prompt.template.clone();
        for (key, value) in values {
            rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
        }
        Ok(rendered)
    }

    /// Registered templates, in registration order.
    pub fn list(&self) -> Vec<PromptSummary> {
        self.prompts
            .iter()
            .map(|p| PromptSummary {
                name: p.name.clone(),
                parameters: p.parameters.clone(),
            })
            .collect()
    }
}
