//! Lightweight source heuristics shared by the code tools.
//!
//! These are pattern counts, not parsers. They give the planner something
//! cheap to report (function names, branch complexity, common smells).

use regex_lite::Regex;
use serde::Serialize;

/// A detected code smell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: &'static str,
    pub suggestion: &'static str,
}

/// Branch-count complexity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Complexity {
    pub score: usize,
    pub level: &'static str,
}

fn captures(pattern: &str, code: &str) -> Vec<String> {
    Regex::new(pattern)
        .map(|re| {
            re.captures_iter(code)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn count(pattern: &str, code: &str) -> usize {
    Regex::new(pattern)
        .map(|re| re.find_iter(code).count())
        .unwrap_or(0)
}

/// Names of declared functions: JS `function f(..)` and `const f = (..) =>`,
/// Rust `fn f`, Python `def f`.
pub fn extract_functions(code: &str) -> Vec<String> {
    let mut names = captures(r"(?:async\s+)?function\s+(\w+)\s*\([^)]*\)", code);
    names.extend(captures(
        r"(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?\([^)]*\)\s*=>",
        code,
    ));
    names.extend(captures(r"\bfn\s+(\w+)\s*[<(]", code));
    names.extend(captures(r"\bdef\s+(\w+)\s*\(", code));
    names
}

/// One plus the number of branch points.
pub fn complexity(code: &str) -> Complexity {
    let patterns = [
        r"\bif\b",
        r"\bfor\b",
        r"\bwhile\b",
        r"\bcase\b",
        r"\bcatch\b",
        r"&&",
        r"\|\|",
    ];
    let score = 1 + patterns.iter().map(|p| count(p, code)).sum::<usize>();
    let level = match score {
        0..10 => "low",
        10..20 => "medium",
        _ => "high",
    };
    Complexity { score, level }
}

/// Known smells: `var` declarations and assignment inside an `if` condition.
pub fn find_issues(code: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    if count(r"\bvar\s", code) > 0 {
        issues.push(Issue {
            kind: "best-practice",
            message: "Use const/let instead of var",
            suggestion: "Replace var with const or let",
        });
    }

    let conditions = captures(r"\bif\s*\(([^)]*)\)", code);
    if conditions.iter().any(|c| has_bare_assignment(c)) {
        issues.push(Issue {
            kind: "error",
            message: "Assignment in condition",
            suggestion: "Use === for comparison",
        });
    }

    issues
}

/// True when `expr` contains a lone `=` (not part of `==`, `!=`, `<=`, `>=`, `=>`).
fn has_bare_assignment(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b'=' {
            return false;
        }
        let prev = i.checked_sub(1).map(|j| bytes[j]);
        let next = bytes.get(i + 1).copied();
        !matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) && !matches!(next, Some(b'=' | b'>'))
    })
}

/// camelCase function name derived from a free-text description.
pub fn function_name(description: &str) -> String {
    const STOP_WORDS: &[&str] = &[
        "the", "and", "for", "with", "that", "this", "function", "code", "javascript",
        "typescript", "python", "rust", "java", "golang", "using",
    ];
    const LEADING: &[&str] = &["a", "an", "the", "create", "generate", "make", "write"];

    let lower = description.to_lowercase();
    let mut words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    while words.first().is_some_and(|w| LEADING.contains(w)) {
        words.remove(0);
    }

    let words: Vec<&str> = words
        .into_iter()
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .collect();
    if words.is_empty() {
        return "generatedFunction".into();
    }

    let mut name = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            name.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                name.push(first.to_ascii_uppercase());
                name.push_str(chars.as_str());
            }
        }
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
