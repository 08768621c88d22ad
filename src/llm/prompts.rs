//! Prompt templates for report queries

use std::collections::HashMap;

/// Template with `{name}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = placeholders(&template)
            .into_iter()
            .fold(Vec::new(), |mut acc, (_, name)| {
                if !acc.iter().any(|v| v == name) {
                    acc.push(name.to_string());
                }
                acc
            });
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template in a single pass.
    ///
    /// Substituted values are copied verbatim and never scanned for further
    /// placeholders. Placeholders without a value are left as written.
    #[must_use]
    pub fn render(&self, values: &HashMap<&str, &str>) -> String {
        let mut result = String::with_capacity(
            self.template.len() + values.values().map(|v| v.len()).sum::<usize>(),
        );
        let mut cursor = 0;
        for (start, name) in placeholders(&self.template) {
            let end = start + name.len() + 2;
            if let Some(value) = values.get(name) {
                result.push_str(&self.template[cursor..start]);
                result.push_str(value);
                cursor = end;
            }
        }
        result.push_str(&self.template[cursor..]);
        result
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Byte offset and name of every `{identifier}` in `template`
fn placeholders(template: &str) -> Vec<(usize, &str)> {
    let mut found = Vec::new();
    let mut search_from = 0;
    while let Some(open) = template[search_from..].find('{').map(|i| i + search_from) {
        let rest = &template[open + 1..];
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if name_len > 0 && rest[name_len..].starts_with('}') {
            found.push((open, &rest[..name_len]));
            search_from = open + name_len + 2;
        } else {
            search_from = open + 1;
        }
    }
    found
}

/// Standard prompts for answering questions over report excerpts
pub struct ReportPrompts;

impl ReportPrompts {
    /// System message sent ahead of every question
    pub const SYSTEM: &'static str =
        "You are a financial research assistant. Analyze the historical report excerpts you are given.";

    /// Context-based QA prompt with `{context}` and `{query}` placeholders
    #[must_use]
    pub fn report_qa() -> PromptTemplate {
        PromptTemplate::new(
            r"Answer the question using the following excerpts from historical quarterly reports.

Context:
{context}

Question: {query}

Instructions:
1. Base the answer only on the context above
2. Quote figures exactly as they appear, including units and periods
3. If the context does not contain the answer, say so
4. Be concise but informative

Answer:",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_variables() {
        let template = PromptTemplate::new("Hello {name}, you are {age} years old, {name}.");
        assert_eq!(template.variables(), &["name", "age"]);
    }

    #[test]
    fn test_template_render() {
        let template = PromptTemplate::new("Hello {name}!");
        let values = HashMap::from([("name", "Alice")]);
        assert_eq!(template.render(&values), "Hello Alice!");
    }

    #[test]
    fn test_render_is_single_pass() {
        let template = PromptTemplate::new("C: {context}\nQ: {query}");
        let values = HashMap::from([("context", "literal {query} in a chunk"), ("query", "why?")]);
        assert_eq!(
            template.render(&values),
            "C: literal {query} in a chunk\nQ: why?"
        );
    }

    #[test]
    fn test_non_placeholder_braces_are_kept() {
        let template = PromptTemplate::new("json: {\"a\": 1} {} {x y} {q}");
        assert_eq!(template.variables(), &["q"]);
        let values = HashMap::from([("q", "ok")]);
        assert_eq!(template.render(&values), "json: {\"a\": 1} {} {x y} ok");
    }

    #[test]
    fn test_missing_value_leaves_placeholder() {
        let template = PromptTemplate::new("{a}-{b}");
        let values = HashMap::from([("a", "1")]);
        assert_eq!(template.render(&values), "1-{b}");
    }

    #[test]
    fn test_report_qa_placeholders() {
        assert_eq!(ReportPrompts::report_qa().variables(), &["context", "query"]);
    }
}
