//! In-memory pack registry: holds immutable versioned
//! Domain Packs and Tenant Policy Packs behind a read-mostly lock. The
//! version counter the LLM routing fabric's provider cache watches for
//! invalidation is bumped on every register/activate, matching the
//! routing gateway's own cache-versioning idiom.
//!
//! Tenant isolation is structural, not a runtime check: every tenant
//! policy key carries the tenant id, so there is no code path that can
//! return one tenant's policy pack for another tenant's lookup.

use exception_platform_application::ports::PackRepository;
use exception_platform_domain::pack::validate_domain_pack;
use exception_platform_domain::{DomainName, DomainPack, PackValidationReport, TenantId, TenantPolicyPack};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct InMemoryPackRegistry {
    domain_packs: RwLock<HashMap<(DomainName, String), Arc<DomainPack>>>,
    active_domain_versions: RwLock<HashMap<DomainName, String>>,
    tenant_policies: RwLock<HashMap<(TenantId, DomainName, String), Arc<TenantPolicyPack>>>,
    active_tenant_versions: RwLock<HashMap<(TenantId, DomainName), String>>,
    version: AtomicU64,
}

impl InMemoryPackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

impl PackRepository for InMemoryPackRegistry {
    fn register_domain_pack(&self, pack: DomainPack) -> PackValidationReport {
        let report = validate_domain_pack(&pack);
        if report.is_valid() {
            let key = (pack.domain_name.clone(), pack.version.clone());
            self.domain_packs.write().unwrap().insert(key, Arc::new(pack));
            self.bump();
        }
        report
    }

    fn activate_domain_pack(&self, domain: &DomainName, version: &str) -> bool {
        let exists = self
            .domain_packs
            .read()
            .unwrap()
            .contains_key(&(domain.clone(), version.to_string()));
        if exists {
            self.active_domain_versions.write().unwrap().insert(domain.clone(), version.to_string());
            self.bump();
        }
        exists
    }

    fn get_domain_pack(&self, domain: &DomainName, version: &str) -> Option<Arc<DomainPack>> {
        self.domain_packs.read().unwrap().get(&(domain.clone(), version.to_string())).cloned()
    }

    fn get_active_domain_pack(&self, domain: &DomainName) -> Option<Arc<DomainPack>> {
        let version = self.active_domain_versions.read().unwrap().get(domain).cloned()?;
        self.get_domain_pack(domain, &version)
    }

    fn register_tenant_policy(&self, policy: TenantPolicyPack, version: &str) -> PackValidationReport {
        let report = PackValidationReport::default();
        let key = (policy.tenant_id.clone(), policy.domain_name.clone(), version.to_string());
        self.tenant_policies.write().unwrap().insert(key, Arc::new(policy));
        self.bump();
        report
    }

    fn activate_tenant_policy(&self, tenant: &TenantId, domain: &DomainName, version: &str) -> bool {
        let exists = self
            .tenant_policies
            .read()
            .unwrap()
            .contains_key(&(tenant.clone(), domain.clone(), version.to_string()));
        if exists {
            self.active_tenant_versions
                .write()
                .unwrap()
                .insert((tenant.clone(), domain.clone()), version.to_string());
            self.bump();
        }
        exists
    }

    fn get_tenant_policy(&self, tenant: &TenantId, domain: &DomainName, version: &str) -> Option<Arc<TenantPolicyPack>> {
        self.tenant_policies
            .read()
            .unwrap()
            .get(&(tenant.clone(), domain.clone(), version.to_string()))
            .cloned()
    }

    fn get_active_tenant_policy(&self, tenant: &TenantId, domain: &DomainName) -> Option<Arc<TenantPolicyPack>> {
        let version = self
            .active_tenant_versions
            .read()
            .unwrap()
            .get(&(tenant.clone(), domain.clone()))
            .cloned()?;
        self.get_tenant_policy(tenant, domain, &version)
    }

    fn version_counter(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exception_platform_domain::Guardrails;
    use std::collections::BTreeMap;

    fn pack(domain: &str, version: &str) -> DomainPack {
        DomainPack {
            domain_name: domain.into(),
            version: version.into(),
            exception_types: BTreeMap::new(),
            tools: BTreeMap::new(),
            playbooks: vec![],
            guardrails: Guardrails::default(),
        }
    }

    fn tenant_policy(tenant: &str, domain: &str) -> TenantPolicyPack {
        TenantPolicyPack {
            tenant_id: tenant.into(),
            domain_name: domain.into(),
            custom_guardrails: None,
            approved_tools: vec![],
            human_approval_rules: vec![],
            custom_severity_overrides: None,
            custom_playbooks: vec![],
        }
    }

    #[test]
    fn register_then_activate_then_get_active_round_trips() {
        let registry = InMemoryPackRegistry::new();
        let domain: DomainName = "Finance".into();

        let report = registry.register_domain_pack(pack("Finance", "1"));
        assert!(report.is_valid());
        assert!(registry.get_active_domain_pack(&domain).is_none());

        assert!(registry.activate_domain_pack(&domain, "1"));
        let active = registry.get_active_domain_pack(&domain).expect("active pack");
        assert_eq!(active.version, "1");
    }

    #[test]
    fn activating_an_unregistered_version_fails_without_side_effects() {
        let registry = InMemoryPackRegistry::new();
        let domain: DomainName = "Finance".into();
        assert!(!registry.activate_domain_pack(&domain, "nope"));
        assert!(registry.get_active_domain_pack(&domain).is_none());
    }

    #[test]
    fn tenant_policy_lookups_never_cross_tenants() {
        let registry = InMemoryPackRegistry::new();
        let domain: DomainName = "Finance".into();

        registry.register_tenant_policy(tenant_policy("TENANT_A", "Finance"), "1");
        registry.register_tenant_policy(tenant_policy("TENANT_B", "Finance"), "1");
        registry.activate_tenant_policy(&"TENANT_A".into(), &domain, "1");

        assert!(registry.get_active_tenant_policy(&"TENANT_A".into(), &domain).is_some());
        assert!(registry.get_active_tenant_policy(&"TENANT_B".into(), &domain).is_none());
    }

    #[test]
    fn version_counter_bumps_on_every_mutation() {
        let registry = InMemoryPackRegistry::new();
        let before = registry.version_counter();
        registry.register_domain_pack(pack("Finance", "1"));
        assert!(registry.version_counter() > before);
    }
}
