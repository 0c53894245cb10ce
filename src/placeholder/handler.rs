//! Cold-start placeholder responses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::config::PlaceholderConfig;
use crate::http::response::Static;
use crate::placeholder::cache::{config_map_key, inline_key, CacheEntry, TemplateCache};
use crate::placeholder::source::{ConfigSource, ConfigSourceError};
use crate::placeholder::template::{minimal_page, Template, TemplateData, TemplateError, DEFAULT_TEMPLATE};
use crate::routing::Target;

pub const PLACEHOLDER_SERVED_HEADER: HeaderName = HeaderName::from_static("x-keda-http-placeholder-served");

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Why a placeholder template could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("placeholder template: {0}")]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Source(#[from] ConfigSourceError),
    #[error("config map {config_map} has no key {key}")]
    MissingKey { config_map: String, key: String },
}

/// Serves placeholder pages from cached templates.
pub struct PlaceholderHandler {
    cache: TemplateCache,
    source: Arc<dyn ConfigSource>,
    default_template: Arc<Template>,
}

impl PlaceholderHandler {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        let default_template = Template::parse(DEFAULT_TEMPLATE).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Built-in placeholder template failed to parse");
            Template::literal(&minimal_page(5))
        });

        Self {
            cache: TemplateCache::new(),
            source,
            default_template: Arc::new(default_template),
        }
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Resolve the compiled template for a target.
    ///
    /// A config map takes precedence over inline content; with neither the
    /// built-in template is used.
    pub async fn template_for(&self, target: &Target, config: &PlaceholderConfig) -> Result<Arc<Template>, PlaceholderError> {
        if let Some(config_map) = config.content_config_map.as_deref() {
            let data = self.source.get(&target.namespace, config_map).await?;
            let key = config_map_key(&target.namespace, &target.name, config_map);

            if let Some(template) = self.cache.get(&key, target.generation, Some(&data.resource_version)) {
                return Ok(template);
            }

            let content = data.data.get(config.config_map_key()).ok_or_else(|| PlaceholderError::MissingKey {
                config_map: config_map.to_string(),
                key: config.config_map_key().to_string(),
            })?;
            let template = Arc::new(Template::parse(content)?);
            tracing::debug!(cache_key = %key, generation = target.generation, version = %data.resource_version, "Compiled placeholder template");

            self.cache.insert(
                key,
                CacheEntry {
                    template: template.clone(),
                    generation: target.generation,
                    config_version: Some(data.resource_version),
                },
            );
            return Ok(template);
        }

        if let Some(content) = config.content.as_deref() {
            let key = inline_key(&target.namespace, &target.name);
            if let Some(template) = self.cache.get(&key, target.generation, None) {
                return Ok(template);
            }

            let template = Arc::new(Template::parse(content)?);
            tracing::debug!(cache_key = %key, generation = target.generation, "Compiled placeholder template");

            self.cache.insert(
                key,
                CacheEntry {
                    template: template.clone(),
                    generation: target.generation,
                    config_version: None,
                },
            );
            return Ok(template);
        }

        Ok(self.default_template.clone())
    }

    /// Placeholder response for a cold target.
    ///
    /// Without an enabled placeholder config this is a plain 503. Template
    /// failures never reach the client: a minimal refreshing page is served
    /// with the configured status instead.
    pub async fn serve(&self, target: &Target, request_id: &str) -> Response<Body> {
        let Some(config) = target.placeholder.as_ref().filter(|p| p.enabled) else {
            return Static::new(StatusCode::SERVICE_UNAVAILABLE).into_response();
        };

        let status = StatusCode::from_u16(config.status_code).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        let data = TemplateData {
            service_name: target.service.clone(),
            namespace: target.namespace.clone(),
            refresh_interval: config.refresh_interval_secs,
            request_id: request_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let page = match self.template_for(target, config).await {
            Ok(template) => template.render(&data),
            Err(e) => {
                tracing::warn!(routing_key = %target.routing_key(), error = %e, "Placeholder template unavailable, serving fallback page");
                minimal_page(config.refresh_interval_secs)
            }
        };

        let mut response = Response::new(Body::from(page));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        for (name, value) in &config.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid placeholder header"),
            }
        }
        headers.insert(PLACEHOLDER_SERVED_HEADER, HeaderValue::from_static("true"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));

        response
    }
}
