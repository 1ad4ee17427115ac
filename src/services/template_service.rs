use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::template::{MessageTemplate, TemplateComponent};
use crate::services::meta_service::{TemplateComponentPayload, WhatsappApi};
use crate::utils::time::Clock;

/// Catalog entries rarely change; five minutes keeps the console snappy
/// without hammering the provider.
pub const CACHE_TTL_SECS: i64 = 5 * 60;

struct CacheState {
    templates: Arc<Vec<MessageTemplate>>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TemplateListing {
    pub templates: Arc<Vec<MessageTemplate>>,
    pub cached: bool,
    pub last_sync: DateTime<Utc>,
}

/// Shared approved-template cache. A refresh replaces the whole snapshot
/// under the write lock, so readers only ever observe complete catalogs.
#[derive(Clone)]
pub struct TemplateService {
    provider: Arc<dyn WhatsappApi>,
    clock: Arc<dyn Clock>,
    waba_id: Option<String>,
    cache: Arc<RwLock<Option<CacheState>>>,
}

impl TemplateService {
    pub fn new(
        provider: Arc<dyn WhatsappApi>,
        clock: Arc<dyn Clock>,
        waba_id: Option<String>,
    ) -> Self {
        Self {
            provider,
            clock,
            waba_id,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    fn is_fresh(&self, state: &CacheState) -> bool {
        self.clock.now() - state.fetched_at < Duration::seconds(CACHE_TTL_SECS)
    }

    pub async fn list(&self, force_refresh: bool) -> Result<TemplateListing> {
        if !force_refresh {
            let guard = self.cache.read().await;
            if let Some(state) = guard.as_ref() {
                if self.is_fresh(state) {
                    return Ok(TemplateListing {
                        templates: state.templates.clone(),
                        cached: true,
                        last_sync: state.fetched_at,
                    });
                }
            }
        }

        let (templates, fetched_at) = self.refresh().await?;
        Ok(TemplateListing {
            templates,
            cached: false,
            last_sync: fetched_at,
        })
    }

    /// Looks up one template by name and language. A stale cache or a miss
    /// triggers at most one refetch; provider failures degrade to `None` so
    /// sends can still go out without display rendering.
    pub async fn find(&self, name: &str, language: &str) -> Option<MessageTemplate> {
        {
            let guard = self.cache.read().await;
            if let Some(state) = guard.as_ref() {
                if self.is_fresh(state) {
                    if let Some(found) = find_in(&state.templates, name, language) {
                        return Some(found);
                    }
                }
            }
        }

        match self.refresh().await {
            Ok((templates, _)) => find_in(&templates, name, language),
            Err(err) => {
                tracing::warn!("Template lookup for '{}' degraded to no match: {}", name, err);
                None
            }
        }
    }

    async fn refresh(&self) -> Result<(Arc<Vec<MessageTemplate>>, DateTime<Utc>)> {
        if self.waba_id.is_none() {
            return Err(Error::Config(
                "META_WABA_ID environment variable is required for fetching templates".to_string(),
            ));
        }

        let raw = self
            .provider
            .fetch_templates()
            .await
            .map_err(Error::TemplateCatalog)?;
        let approved: Vec<MessageTemplate> = raw
            .into_iter()
            .filter(|template| template.status == "APPROVED")
            .collect();

        let templates = Arc::new(approved);
        let fetched_at = self.clock.now();
        let mut guard = self.cache.write().await;
        *guard = Some(CacheState {
            templates: templates.clone(),
            fetched_at,
        });
        Ok((templates, fetched_at))
    }
}

fn find_in(templates: &[MessageTemplate], name: &str, language: &str) -> Option<MessageTemplate> {
    templates
        .iter()
        .find(|t| t.name == name && t.language == language)
        .cloned()
}

pub fn template_body_text(components: Option<&[TemplateComponent]>) -> Option<String> {
    components?
        .iter()
        .find(|c| c.component_type.eq_ignore_ascii_case("body"))
        .and_then(|c| c.text.clone())
        .filter(|text| !text.is_empty())
}

/// Header text participates in display rendering only for TEXT headers
/// (or headers with no declared format); media headers render nothing.
pub fn template_header_text(components: Option<&[TemplateComponent]>) -> Option<String> {
    let header = components?
        .iter()
        .find(|c| c.component_type.eq_ignore_ascii_case("header"))?;
    match header.format.as_deref() {
        Some("TEXT") | None => header.text.clone().filter(|text| !text.is_empty()),
        Some(_) => None,
    }
}

/// Replaces every `{{n}}` placeholder with the matching positional
/// parameter's text. A missing or text-less parameter leaves a visible
/// `[n]` marker instead of silently dropping the placeholder.
pub fn substitute_parameters(text: &str, parameters: &[JsonValue]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let inner = rest[start + 2..start + 2 + end].trim();

        match inner.parse::<usize>() {
            Ok(index) if index >= 1 => {
                out.push_str(&rest[..start]);
                let value = parameters
                    .get(index - 1)
                    .and_then(|param| param.get("text"))
                    .and_then(|text| text.as_str())
                    .filter(|text| !text.is_empty());
                match value {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('[');
                        out.push_str(inner);
                        out.push(']');
                    }
                }
                rest = &rest[start + 2 + end + 2..];
            }
            _ => {
                out.push_str(&rest[..start + 2]);
                rest = &rest[start + 2..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Human-readable rendering of an outbound template message: header and
/// body with parameters substituted, joined by a blank line. Templates
/// with no renderable text fall back to naming the template.
pub fn build_display_text(
    template: &MessageTemplate,
    header_params: &[JsonValue],
    body_params: &[JsonValue],
) -> String {
    let components = template.components.as_deref();
    let mut parts = Vec::new();

    if let Some(header) = template_header_text(components) {
        parts.push(substitute_parameters(&header, header_params));
    }
    if let Some(body) = template_body_text(components) {
        parts.push(substitute_parameters(&body, body_params));
    }

    if parts.is_empty() {
        return format!("Template: {}", template.name);
    }
    parts.join("\n\n")
}

/// Parameters of the first request component of the given kind.
pub fn component_parameters(components: &[TemplateComponentPayload], kind: &str) -> Vec<JsonValue> {
    components
        .iter()
        .find(|c| c.component_type.eq_ignore_ascii_case(kind))
        .and_then(|c| c.parameters.clone())
        .unwrap_or_default()
}
