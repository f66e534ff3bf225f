//! Ambient process configuration and the LLM routing config
//! loader — kept as two independent modules since their
//! schemas, sources, and reload semantics differ: `AppConfig` is read
//! once at startup via `figment`, while the routing config is re-read on
//! demand by the provider cache and must never fail process startup.

mod app_config;
mod routing_loader;

pub use app_config::{AppConfig, ConfigLoader};
pub use routing_loader::{
    load_routing_config, load_routing_config_or_default, resolve_routing_config_path, RoutingLoadError,
    ROUTING_CONFIG_PATH_ENV,
};
