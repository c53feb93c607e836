use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::env;
use tracing::{debug, warn};

const ENV_VAR_PATTERN: &str = r"\$\{(\w+)\}|\$(\w+)";

fn env_var_regex() -> Result<Regex> {
    Regex::new(ENV_VAR_PATTERN).context("Invalid environment variable pattern")
}

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
///
/// Unset variables keep their placeholder so validation can report them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = env_var_regex()?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &Captures| {
        let placeholder = caps[0].to_string();
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            return placeholder;
        };

        match env::var(name.as_str()) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", name.as_str());
                value
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", name.as_str());
                missing_vars.push(name.as_str().to_string());
                placeholder
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(?missing_vars, "Environment variables left unresolved");
    }

    Ok(result.into_owned())
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    env_var_regex().map(|re| re.is_match(content)).unwrap_or(false)
}
