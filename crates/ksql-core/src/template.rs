use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Variable values scoped to one request, keyed by variable name
pub type ScopedVars = HashMap<String, String>;

/// Rewrites template variable placeholders in query text
pub trait TemplateSrv: Send + Sync {
    fn replace(&self, text: &str, scoped_vars: &ScopedVars) -> String;
}

fn variable_regex() -> &'static Regex {
    static VARIABLE_RE: OnceLock<Regex> = OnceLock::new();
    VARIABLE_RE.get_or_init(|| {
        Regex::new(r"\$(\w+)|\$\{(\w+)\}|\[\[(\w+)\]\]").expect("Invalid Regex")
    })
}

/// Template service backed by a fixed set of global variables.
///
/// Understands `$name`, `${name}` and `[[name]]`. Scoped values win over
/// globals; unknown variables are left as written.
#[derive(Debug, Clone, Default)]
pub struct VariableTemplateSrv {
    variables: HashMap<String, String>,
}

impl VariableTemplateSrv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }
}

impl TemplateSrv for VariableTemplateSrv {
    fn replace(&self, text: &str, scoped_vars: &ScopedVars) -> String {
        variable_regex()
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                scoped_vars
                    .get(name)
                    .or_else(|| self.variables.get(name))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(pairs: &[(&str, &str)]) -> ScopedVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_placeholder_syntaxes() {
        let srv = VariableTemplateSrv::new().with_variable("stream", "PAGEVIEWS");
        let vars = ScopedVars::new();

        assert_eq!(srv.replace("SELECT * FROM $stream;", &vars), "SELECT * FROM PAGEVIEWS;");
        assert_eq!(srv.replace("SELECT * FROM ${stream};", &vars), "SELECT * FROM PAGEVIEWS;");
        assert_eq!(srv.replace("SELECT * FROM [[stream]];", &vars), "SELECT * FROM PAGEVIEWS;");
    }

    #[test]
    fn test_scoped_vars_override_globals() {
        let srv = VariableTemplateSrv::new().with_variable("user", "global");
        let vars = scoped(&[("user", "scoped")]);
        assert_eq!(srv.replace("WHERE USERID = '$user'", &vars), "WHERE USERID = 'scoped'");
    }

    #[test]
    fn test_unknown_variables_are_kept() {
        let srv = VariableTemplateSrv::new();
        let text = "SELECT * FROM ${missing} WHERE X = $other;";
        assert_eq!(srv.replace(text, &ScopedVars::new()), text);
    }
}
