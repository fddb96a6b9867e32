//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Every problem is collected so
//! the operator sees the full list on one failed start.

use thiserror::Error;

use crate::config::schema::TriggerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no shared secret configured (set TOKEN or auth.token)")]
    MissingToken,

    #[error("shared secret must not be empty")]
    EmptyToken,

    #[error("trigger path must be a literal path starting with '/' (no '{{', '}}', '*' or ':segment'): {0:?}")]
    InvalidTriggerPath(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimit(&'static str),

    #[error("audit.queue_capacity must be greater than zero")]
    ZeroAuditQueue,

    #[error("action.timeout_secs must be greater than zero")]
    ZeroActionTimeout,

    #[error("action.command must name a program")]
    EmptyCommand,

    #[error("invalid metrics address: {0:?}")]
    InvalidMetricsAddress(String),
}

/// Validate a fully resolved configuration (env overrides already applied).
pub fn validate_config(config: &TriggerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.auth.token.as_deref() {
        None => errors.push(ValidationError::MissingToken),
        Some(token) if token.is_empty() => errors.push(ValidationError::EmptyToken),
        Some(_) => {}
    }

    if !is_literal_path(&config.route.trigger_path) {
        errors.push(ValidationError::InvalidTriggerPath(
            config.route.trigger_path.clone(),
        ));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateLimit("window_secs"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimit("max_requests"));
    }

    if config.audit.queue_capacity == 0 {
        errors.push(ValidationError::ZeroAuditQueue);
    }

    if config.action.timeout_secs == 0 {
        errors.push(ValidationError::ZeroActionTimeout);
    }
    if let Some(command) = &config.action.command {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            errors.push(ValidationError::EmptyCommand);
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A path the router matches byte for byte: no captures or wildcards.
fn is_literal_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}', '*'])
        && !path.split('/').any(|segment| segment.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TriggerConfig {
        let mut config = TriggerConfig::default();
        config.auth.token = Some("s3cret".to_string());
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_missing_token_refused() {
        let config = TriggerConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingToken]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.auth.token = Some(String::new());
        config.route.trigger_path = "sys/hook".to_string();
        config.rate_limit.max_requests = 0;
        config.action.timeout_secs = 0;
        config.action.command = Some(vec![]);
        config.observability.metrics_address = Some("nope".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::EmptyToken));
        assert!(errors.contains(&ValidationError::ZeroRateLimit("max_requests")));
        assert!(errors.contains(&ValidationError::EmptyCommand));
    }

    #[test]
    fn test_trigger_path_must_be_literal() {
        for path in ["/hook/{", "/hook/{id}/", "/hook/}", "/hook/*rest", "/hook/:id/"] {
            let mut config = valid();
            config.route.trigger_path = path.to_string();
            assert_eq!(
                validate_config(&config).unwrap_err(),
                vec![ValidationError::InvalidTriggerPath(path.to_string())],
                "{path}"
            );
        }

        let mut config = valid();
        config.route.trigger_path = "/ops/reboot-a1b2/".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_audit_queue_refused() {
        let mut config = valid();
        config.audit.queue_capacity = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroAuditQueue]
        );
    }
}
