// Settings validation. All problems are collected so one run reports them all.

use std::collections::HashSet;

use crate::error::{ConfigError, Result};
use crate::settings::{Settings, KNOWN_ROLES};

impl Settings {
    /// Check cross-field constraints that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing every violated constraint.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.server.host.trim().is_empty() {
            problems.push("server.host must not be empty".to_string());
        }
        if self.server.port == 0 {
            problems.push("server.port must be non-zero".to_string());
        }
        if self.server.request_timeout_secs == 0 {
            problems.push("server.request_timeout_secs must be non-zero".to_string());
        }

        if self.audit.max_page_size == 0 {
            problems.push("audit.max_page_size must be non-zero".to_string());
        }
        if self.audit.default_page_size == 0 || self.audit.default_page_size > self.audit.max_page_size {
            problems.push("audit.default_page_size must be between 1 and audit.max_page_size".to_string());
        }
        if self.audit.max_export_rows == 0 {
            problems.push("audit.max_export_rows must be non-zero".to_string());
        }
        if self.audit.database_url.trim().is_empty() {
            problems.push("audit.database_url must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for (index, token) in self.auth.tokens.iter().enumerate() {
            if token.token.trim().is_empty() {
                problems.push(format!("auth.tokens[{index}].token must not be empty"));
            } else if !seen.insert(token.token.as_str()) {
                problems.push(format!("auth.tokens[{index}].token duplicates an earlier token"));
            }
            if token.actor_id.trim().is_empty() {
                problems.push(format!("auth.tokens[{index}].actor_id must not be empty"));
            }
            if !KNOWN_ROLES.contains(&token.role.as_str()) {
                problems.push(format!(
                    "auth.tokens[{index}].role '{}' is not one of {}",
                    token.role,
                    KNOWN_ROLES.join(", ")
                ));
            } else if token.role != "super_admin" && token.account_ids.is_empty() {
                problems.push(format!(
                    "auth.tokens[{index}] with role '{}' needs at least one account id",
                    token.role
                ));
            }
        }

        let mut seeded = HashSet::new();
        for (index, account) in self.accounts.iter().enumerate() {
            if account.id <= 0 {
                problems.push(format!("accounts[{index}].id must be positive"));
            } else if !seeded.insert(account.id) {
                problems.push(format!("accounts[{index}].id {} is listed twice", account.id));
            }
            if account.name.trim().is_empty() {
                problems.push(format!("accounts[{index}].name must not be empty"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::{AccountSeed, ApiTokenSettings};

    use super::*;

    fn token(token: &str, role: &str, accounts: Vec<i64>) -> ApiTokenSettings {
        ApiTokenSettings {
            token: token.to_string(),
            actor_id: "user-1".to_string(),
            name: None,
            role: role.to_string(),
            account_ids: accounts,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        settings.audit.max_export_rows = 0;
        settings.auth.tokens = vec![token("abc", "owner", vec![1])];

        match settings.validate() {
            Err(ConfigError::Validation(problems)) => {
                assert_eq!(problems.len(), 3);
                assert!(problems.iter().any(|p| p.contains("server.port")));
                assert!(problems.iter().any(|p| p.contains("'owner'")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let mut settings = Settings::default();
        settings.auth.tokens = vec![
            token("same", "super_admin", vec![]),
            token("same", "administrator", vec![2]),
        ];
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn test_tenant_roles_need_accounts() {
        let mut settings = Settings::default();
        settings.auth.tokens = vec![token("t1", "agent", vec![])];
        assert!(settings.validate().is_err());

        settings.auth.tokens = vec![token("t1", "agent", vec![7])];
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_page_size_within_max() {
        let mut settings = Settings::default();
        settings.audit.default_page_size = 500;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_account_seeds_checked() {
        let mut settings = Settings::default();
        settings.accounts = vec![
            AccountSeed { id: 1, name: "Acme".to_string() },
            AccountSeed { id: 1, name: "Globex".to_string() },
            AccountSeed { id: 0, name: " ".to_string() },
        ];
        match settings.validate() {
            Err(ConfigError::Validation(problems)) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
