//! Keeping secret values out of exported documents.

use isolator_store::FullProject;
use isolator_vault::DECRYPTION_PLACEHOLDER;

/// Token written in place of a redacted value. Imports skip it.
pub const SECRET_PLACEHOLDER: &str = "$$PLACEHOLDER$$";

/// Substrings that mark a variable name as sensitive.
const SECRET_KEY_PATTERNS: &[&str] = &[
    "secret",
    "password",
    "key",
    "token",
    "api_key",
    "auth",
    "private",
    "credential",
    "pass",
    "pwd",
];

/// Heuristic: does this variable name look like it holds a secret?
pub fn looks_like_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEY_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Replace every sensitive environment value in `project` with [`SECRET_PLACEHOLDER`].
///
/// A value is sensitive when it is flagged secret in the store, when it could
/// not be decrypted, or when its key matches [`looks_like_secret_key`].
/// Returns how many values were replaced.
pub fn redact_secrets(project: &mut FullProject) -> usize {
    let mut redacted = 0;

    for service in &mut project.services {
        for (key, value) in service.environment.iter_mut() {
            let sensitive = service.secret_keys.contains(key)
                || value == DECRYPTION_PLACEHOLDER
                || looks_like_secret_key(key);

            if sensitive && value != SECRET_PLACEHOLDER {
                *value = SECRET_PLACEHOLDER.to_string();
                redacted += 1;
            }
        }
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_heuristic() {
        for key in ["DB_PASSWORD", "api_key", "GITHUB_TOKEN", "AuthHeader", "PRIVATE_PEM", "PWD_HASH"] {
            assert!(looks_like_secret_key(key), "{} should be secret", key);
        }
        for key in ["NODE_ENV", "PORT", "DATABASE_URL", "LOG_LEVEL"] {
            assert!(!looks_like_secret_key(key), "{} should not be secret", key);
        }
    }
}
