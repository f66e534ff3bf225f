//! Playbook manager + matcher: pure domain rules over
//! already-loaded packs. No I/O — loading packs is the Pack registry's job
//! (C1); this module only selects and composes.

use exception_platform_domain::{DomainPack, Playbook, TenantPolicyPack};

/// Whether an exception type has a playbook that can run unattended, one
/// that exists but lacks approval, or none at all — the input to Policy's
/// actionability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actionability {
    ActionableApprovedProcess,
    ActionableNonApprovedProcess,
    NonActionableInfoOnly,
}

/// Classifies actionability without composing or cloning the playbook —
/// Policy only needs to know which of the three buckets applies; Resolution
/// calls [`select_playbook`] separately once it actually needs the steps.
pub fn classify_actionability(
    exception_type: &str,
    tenant_policy: &TenantPolicyPack,
    domain_pack: &DomainPack,
) -> Actionability {
    if tenant_policy.custom_playbook_for(exception_type).is_some() {
        return Actionability::ActionableApprovedProcess;
    }
    match domain_pack.playbook_for(exception_type) {
        None => Actionability::NonActionableInfoOnly,
        Some(candidate) => {
            if is_approved(candidate, tenant_policy) {
                Actionability::ActionableApprovedProcess
            } else {
                Actionability::ActionableNonApprovedProcess
            }
        }
    }
}

/// Selection precedence:
/// 1. Any playbook in `tenant_policy.custom_playbooks` matching the
///    exception type → selected, no composition.
/// 2. Otherwise the first playbook in `domain.playbooks` matching that
///    type, subject to approval.
/// 3. Otherwise `None`.
pub fn select_playbook(
    exception_type: &str,
    tenant_policy: &TenantPolicyPack,
    domain_pack: &DomainPack,
) -> Option<Playbook> {
    if let Some(custom) = tenant_policy.custom_playbook_for(exception_type) {
        return Some(custom.clone());
    }

    let candidate = domain_pack.playbook_for(exception_type)?;
    if !is_approved(candidate, tenant_policy) {
        return None;
    }
    Some(compose(candidate, domain_pack))
}

/// A custom playbook is always approved. A domain-pack playbook is
/// approved iff for each step either (a) the step declares no tool, or
/// (b) the referenced tool is in `tenant_policy.approved_tools`. This is
/// strictly narrower than the "approve by default when no explicit tool
/// reference is found" MVP behavior from the upstream reference
/// implementation — see DESIGN.md.
fn is_approved(playbook: &Playbook, tenant_policy: &TenantPolicyPack) -> bool {
    playbook.steps.iter().all(|step| match step.extract_tool_name() {
        None => true,
        Some(tool) => tenant_policy.approves(tool),
    })
}

/// If the exception type has a parent type and a matching parent playbook
/// exists in the domain pack, the composed playbook's steps are
/// `[parent.steps…, self.steps…]`, carrying the child's exception type
///.
fn compose(playbook: &Playbook, domain_pack: &DomainPack) -> Playbook {
    let Some(def) = domain_pack.exception_type(&playbook.exception_type) else {
        return playbook.clone();
    };
    let Some(parent_type) = def.parent_type.as_deref() else {
        return playbook.clone();
    };
    let Some(parent) = domain_pack.playbook_for(parent_type) else {
        return playbook.clone();
    };

    let mut steps = parent.steps.clone();
    steps.extend(playbook.steps.clone());
    Playbook {
        exception_type: playbook.exception_type.clone(),
        steps,
    }
}
