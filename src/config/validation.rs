//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and referential
//! integrity. Every problem is collected instead of stopping at the first.

use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue, StatusCode};

use crate::config::schema::{InterceptorConfig, PlaceholderConfig, TargetConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &InterceptorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_ms", timeouts.connect_ms),
        ("timeouts.response_header_ms", timeouts.response_header_ms),
        ("timeouts.workload_replicas_ms", timeouts.workload_replicas_ms),
        ("probe.interval_ms", config.probe.interval_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let backoff = &config.dial_backoff;
    if backoff.steps == 0 {
        errors.push(ValidationError::new("dial_backoff.steps", "must be at least 1"));
    }
    if !(backoff.factor >= 1.0) {
        errors.push(ValidationError::new("dial_backoff.factor", "must be >= 1.0"));
    }
    if !(0.0..=1.0).contains(&backoff.jitter) {
        errors.push(ValidationError::new("dial_backoff.jitter", "must be within [0, 1]"));
    }

    let mut keys = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let prefix = format!("routes[{i}]");
        validate_route(&prefix, route, &mut errors);

        let key = format!("{}/{}", route.namespace, route.name);
        if !keys.insert(key.clone()) {
            errors.push(ValidationError::new(
                prefix,
                format!("duplicate routing key {key}"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(prefix: &str, route: &TargetConfig, errors: &mut Vec<ValidationError>) {
    if route.name.is_empty() {
        errors.push(ValidationError::new(format!("{prefix}.name"), "must not be empty"));
    }
    if route.hosts.is_empty() {
        errors.push(ValidationError::new(
            format!("{prefix}.hosts"),
            "at least one host is required",
        ));
    }
    if route.service.is_empty() {
        errors.push(ValidationError::new(format!("{prefix}.service"), "must not be empty"));
    }
    if route.port == 0 {
        errors.push(ValidationError::new(format!("{prefix}.port"), "must not be zero"));
    }
    for (name, value) in &route.headers {
        if HeaderName::try_from(name.as_str()).is_err() || HeaderValue::try_from(value.as_str()).is_err() {
            errors.push(ValidationError::new(
                format!("{prefix}.headers"),
                format!("invalid header {name}"),
            ));
        }
    }
    if let Some(failover) = &route.failover {
        if failover.port == 0 || failover.service.is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.failover"),
                "service and port are required",
            ));
        }
    }
    if let Some(placeholder) = &route.placeholder {
        validate_placeholder(&format!("{prefix}.placeholder"), placeholder, errors);
    }
}

fn validate_placeholder(prefix: &str, placeholder: &PlaceholderConfig, errors: &mut Vec<ValidationError>) {
    if StatusCode::from_u16(placeholder.status_code).is_err() {
        errors.push(ValidationError::new(
            format!("{prefix}.status_code"),
            format!("{} is not a valid status code", placeholder.status_code),
        ));
    }
    for (name, value) in &placeholder.headers {
        if HeaderName::try_from(name.as_str()).is_err() || HeaderValue::try_from(value.as_str()).is_err() {
            errors.push(ValidationError::new(
                format!("{prefix}.headers"),
                format!("invalid header {name}"),
            ));
        }
    }
    if placeholder.content_config_map_key.is_some() && placeholder.content_config_map.is_none() {
        errors.push(ValidationError::new(
            format!("{prefix}.content_config_map_key"),
            "set without content_config_map",
        ));
    }
}
