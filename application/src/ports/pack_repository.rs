//! Pack registry port.

use exception_platform_domain::{DomainName, DomainPack, PackValidationReport, TenantId, TenantPolicyPack};
use std::sync::Arc;

/// Holds immutable versioned Domain Packs and Tenant Policy Packs and
/// resolves effective config per `(tenant, domain)`. Enforces tenant
/// isolation by construction: no lookup can return another tenant's pack.
pub trait PackRepository: Send + Sync {
    fn register_domain_pack(&self, pack: DomainPack) -> PackValidationReport;
    fn activate_domain_pack(&self, domain: &DomainName, version: &str) -> bool;
    fn get_domain_pack(&self, domain: &DomainName, version: &str) -> Option<Arc<DomainPack>>;
    fn get_active_domain_pack(&self, domain: &DomainName) -> Option<Arc<DomainPack>>;

    fn register_tenant_policy(&self, policy: TenantPolicyPack, version: &str) -> PackValidationReport;
    fn activate_tenant_policy(&self, tenant: &TenantId, domain: &DomainName, version: &str) -> bool;
    fn get_tenant_policy(
        &self,
        tenant: &TenantId,
        domain: &DomainName,
        version: &str,
    ) -> Option<Arc<TenantPolicyPack>>;
    fn get_active_tenant_policy(&self, tenant: &TenantId, domain: &DomainName) -> Option<Arc<TenantPolicyPack>>;

    /// Bumped on every register/activate; consumed by the LLM routing
    /// fabric's provider cache to invalidate itself on hot-reload.
    fn version_counter(&self) -> u64;
}
