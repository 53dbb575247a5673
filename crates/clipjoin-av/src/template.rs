//! Variable substitution for output-name templates.

use std::collections::HashMap;

/// Variable substitution context for `{varname}` templates.
///
/// # Example
///
/// ```
/// use clipjoin_av::TemplateContext;
///
/// let ctx = TemplateContext::new()
///     .with_var("key", "DJI_0001")
///     .with_var("count", "3");
///
/// assert_eq!(ctx.substitute("{key}"), "DJI_0001");
/// assert_eq!(ctx.substitute("trip-{key}-{count}parts"), "trip-DJI_0001-3parts");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty template context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_var(mut self, key: &str, value: impl ToString) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Get a variable value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Substitute variables in a string.
    ///
    /// Unknown `{names}` are left untouched. Substitution is single-pass, so
    /// braces inside values are never expanded again.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match self.vars.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push('{');
                            result.push_str(name);
                            result.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Names of `{variables}` in a template that this context cannot fill.
    pub fn unknown_vars<'a>(&self, template: &'a str) -> Vec<&'a str> {
        let mut unknown = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else { break };
            let name = &after[..close];
            if !self.vars.contains_key(name) {
                unknown.push(name);
            }
            rest = &after[close + 1..];
        }
        unknown
    }
}
