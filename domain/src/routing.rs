//! Pure routing-resolution logic for the LLM routing fabric. The config
//! shape and the precedence rule are value objects/pure functions here;
//! the file loader (YAML/JSON-by-extension) and the provider client cache
//! live in `infrastructure::llm` since they touch the filesystem and hold
//! live client handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed provider set. Unknown provider names never parse
/// into this type directly — callers go through [`ProviderKind::parse`],
/// which folds anything unrecognized into [`ProviderKind::Dummy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Dummy,
    OpenRouter,
    OpenAi,
}

impl ProviderKind {
    /// Parses a provider name case-insensitively. Returns `None` (rather
    /// than silently defaulting) so the caller can log the fallback-to-dummy
    /// warning with the offending name still in hand.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "dummy" => Some(ProviderKind::Dummy),
            "openrouter" => Some(ProviderKind::OpenRouter),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Dummy => "dummy",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One level's worth of optional overrides (domain- or tenant-scoped).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingOverride {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub fallback_chain: Option<Vec<String>>,
}

/// The routing config file shape: global defaults plus
/// per-domain and per-tenant overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub default_fallback_chain: Option<Vec<String>>,
    #[serde(default)]
    pub domains: BTreeMap<String, RoutingOverride>,
    #[serde(default)]
    pub tenants: BTreeMap<String, RoutingOverride>,
}

/// The resolved outcome of routing precedence: which provider/model/chain
/// to use for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    /// `true` if the raw provider name in config/env did not parse into
    /// the closed [`ProviderKind`] set and was folded into `Dummy`.
    pub provider_name_was_unknown: Option<String>,
    pub model: String,
    pub fallback_chain: Vec<ProviderKind>,
}

/// Inputs to [`resolve_provider_selection`], named to make the precedence
/// order legible at call sites rather than a long positional tuple.
#[derive(Debug, Clone, Default)]
pub struct ResolutionInputs<'a> {
    pub tenant_id: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub explicit_provider: Option<&'a str>,
    pub explicit_model: Option<&'a str>,
    pub env_provider: Option<&'a str>,
    pub env_model: Option<&'a str>,
}

const DEFAULT_MODEL: &str = "dummy-model";

/// Resolution precedence (highest first):
/// tenant override in routing config → domain override in routing config
/// → explicit call argument → environment default → `"dummy"`.
///
/// The same precedence order applies independently to provider, model, and
/// fallback chain — a tenant entry that only sets `model` still lets
/// `provider` fall through to the domain/explicit/env/default chain.
pub fn resolve_provider_selection(config: &RoutingConfig, inputs: &ResolutionInputs) -> ProviderSelection {
    let tenant_override = inputs.tenant_id.and_then(|t| config.tenants.get(t));
    let domain_override = inputs.domain.and_then(|d| config.domains.get(d));

    let provider_name = tenant_override
        .and_then(|o| o.provider.as_deref())
        .or_else(|| domain_override.and_then(|o| o.provider.as_deref()))
        .or(inputs.explicit_provider)
        .or(inputs.env_provider)
        .or(config.default_provider.as_deref())
        .unwrap_or("dummy");

    let (provider, provider_name_was_unknown) = match ProviderKind::parse(provider_name) {
        Some(p) => (p, None),
        None => (ProviderKind::Dummy, Some(provider_name.to_string())),
    };

    let model = tenant_override
        .and_then(|o| o.model.as_deref())
        .or_else(|| domain_override.and_then(|o| o.model.as_deref()))
        .or(inputs.explicit_model)
        .or(inputs.env_model)
        .or(config.default_model.as_deref())
        .unwrap_or(DEFAULT_MODEL)
        .to_string();

    let chain_names = tenant_override
        .and_then(|o| o.fallback_chain.as_ref())
        .or_else(|| domain_override.and_then(|o| o.fallback_chain.as_ref()))
        .or(config.default_fallback_chain.as_ref());

    let fallback_chain = match chain_names {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|n| ProviderKind::parse(n).unwrap_or(ProviderKind::Dummy))
            .collect(),
        _ => vec![provider],
    };

    ProviderSelection {
        provider,
        provider_name_was_unknown,
        model,
        fallback_chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_tenant_and_domain() -> RoutingConfig {
        let mut domains = BTreeMap::new();
        domains.insert(
            "Finance".to_string(),
            RoutingOverride {
                provider: Some("openai".into()),
                model: Some("gpt-4.1-mini".into()),
                fallback_chain: None,
            },
        );
        let mut tenants = BTreeMap::new();
        tenants.insert(
            "TENANT_A".to_string(),
            RoutingOverride {
                provider: Some("openrouter".into()),
                model: None,
                fallback_chain: Some(vec!["openrouter".into(), "openai".into(), "dummy".into()]),
            },
        );
        RoutingConfig {
            default_provider: Some("dummy".into()),
            default_model: Some("default-model".into()),
            default_fallback_chain: None,
            domains,
            tenants,
        }
    }

    #[test]
    fn tenant_override_wins_over_domain_and_default() {
        let config = config_with_tenant_and_domain();
        let selection = resolve_provider_selection(
            &config,
            &ResolutionInputs {
                tenant_id: Some("TENANT_A"),
                domain: Some("Finance"),
                ..Default::default()
            },
        );
        assert_eq!(selection.provider, ProviderKind::OpenRouter);
        // Model falls through to the domain override since tenant didn't set one.
        assert_eq!(selection.model, "gpt-4.1-mini");
        assert_eq!(
            selection.fallback_chain,
            vec![ProviderKind::OpenRouter, ProviderKind::OpenAi, ProviderKind::Dummy]
        );
    }

    #[test]
    fn domain_override_used_when_no_tenant_entry() {
        let config = config_with_tenant_and_domain();
        let selection = resolve_provider_selection(
            &config,
            &ResolutionInputs {
                tenant_id: Some("TENANT_UNKNOWN"),
                domain: Some("Finance"),
                ..Default::default()
            },
        );
        assert_eq!(selection.provider, ProviderKind::OpenAi);
        assert_eq!(selection.model, "gpt-4.1-mini");
    }

    #[test]
    fn explicit_argument_used_when_no_config_entries() {
        let config = RoutingConfig::default();
        let selection = resolve_provider_selection(
            &config,
            &ResolutionInputs {
                explicit_provider: Some("openai"),
                explicit_model: Some("gpt-4.1"),
                ..Default::default()
            },
        );
        assert_eq!(selection.provider, ProviderKind::OpenAi);
        assert_eq!(selection.model, "gpt-4.1");
    }

    #[test]
    fn env_default_used_when_nothing_else_set() {
        let config = RoutingConfig::default();
        let selection = resolve_provider_selection(
            &config,
            &ResolutionInputs {
                env_provider: Some("openrouter"),
                env_model: Some("env-model"),
                ..Default::default()
            },
        );
        assert_eq!(selection.provider, ProviderKind::OpenRouter);
        assert_eq!(selection.model, "env-model");
    }

    #[test]
    fn falls_back_to_dummy_when_nothing_configured() {
        let config = RoutingConfig::default();
        let selection = resolve_provider_selection(&config, &ResolutionInputs::default());
        assert_eq!(selection.provider, ProviderKind::Dummy);
        assert_eq!(selection.model, DEFAULT_MODEL);
        assert_eq!(selection.fallback_chain, vec![ProviderKind::Dummy]);
    }

    #[test]
    fn unknown_provider_name_falls_back_to_dummy_with_warning_name_recorded() {
        let config = RoutingConfig {
            default_provider: Some("anthropic".into()),
            ..Default::default()
        };
        let selection = resolve_provider_selection(&config, &ResolutionInputs::default());
        assert_eq!(selection.provider, ProviderKind::Dummy);
        assert_eq!(selection.provider_name_was_unknown.as_deref(), Some("anthropic"));
    }

    #[test]
    fn fallback_chain_defaults_to_single_resolved_provider_when_absent() {
        let config = RoutingConfig {
            default_provider: Some("openai".into()),
            ..Default::default()
        };
        let selection = resolve_provider_selection(&config, &ResolutionInputs::default());
        assert_eq!(selection.fallback_chain, vec![ProviderKind::OpenAi]);
    }
}
