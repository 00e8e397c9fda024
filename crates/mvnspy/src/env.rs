//! Build environment variables

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment of a build step
///
/// Expansion follows the shell forms `${VAR}` and `$VAR`. References to
/// variables that are not set are kept verbatim.
///
/// ```
/// use mvnspy::env::EnvVars;
///
/// let env = EnvVars::default().with("WORKSPACE", "/ws");
/// assert_eq!(env.expand("${WORKSPACE}/target/$MISSING"), "/ws/target/$MISSING");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    /// Snapshot of the current process environment
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Add a variable
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Set a variable, replacing any previous value
    pub fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    /// Get a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Expand variable references in `input`
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(dollar) = rest.find('$') {
            out.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];

            if let Some(braced) = after.strip_prefix('{')
                && let Some(close) = braced.find('}')
            {
                let name = &braced[..close];
                match self.lookup(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[dollar..dollar + close + 3]),
                }
                rest = &braced[close + 1..];
                continue;
            }

            let name_len = after
                .char_indices()
                .take_while(|&(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()))
                .count();
            let name = &after[..name_len];
            match self.lookup(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }

        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        if is_variable_name(name) {
            self.get(name)
        } else {
            None
        }
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl FromIterator<(String, String)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
