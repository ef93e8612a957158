//! Change preview between a synthesized resource set and the applied state

use crate::action::{Action, ActionType, Plan};
use crate::state::AppliedState;
use crate::synth::ResourceSet;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Compare `desired` against `applied`
///
/// Creates, replacements and no-ops follow the creation order of `desired`.
/// Deletions come last, dependents before the resources they depend on.
pub fn plan(desired: &ResourceSet, applied: &AppliedState) -> Plan {
    let mut actions = Vec::new();

    for resource in desired.iter() {
        let key = resource.key();
        let action = match applied.get_resource(&key) {
            None => Action::new(ActionType::Create, &resource.resource_type, &resource.id)
                .with_detail("provider_type", json!(resource.provider_type))
                .with_detail("depends_on", json!(resource.depends_on)),
            Some(recorded) if recorded.config == resource.config => {
                Action::new(ActionType::NoOp, &resource.resource_type, &resource.id)
            }
            Some(recorded) => {
                let changed = changed_keys(&recorded.config, &resource.config);
                Action::new(ActionType::Update, &resource.resource_type, &resource.id)
                    .with_description(format!(
                        "replace {} {}",
                        resource.resource_type, resource.id
                    ))
                    .with_detail("replace", json!(true))
                    .with_detail("changed", json!(changed))
            }
        };
        actions.push(action);
    }

    let mut deletions: Vec<_> = applied
        .resources
        .iter()
        .filter(|(key, _)| !desired.resources.contains_key(key.as_str()))
        .map(|(_, recorded)| recorded)
        .collect();
    deletions.sort_by_key(|r| (deletion_rank(&r.resource_type), r.key()));
    actions.extend(
        deletions
            .into_iter()
            .map(|r| Action::new(ActionType::Delete, &r.resource_type, &r.id)),
    );

    let plan = Plan::new(actions);
    tracing::debug!("Planned changes: {}", plan.summary());
    plan
}

fn deletion_rank(resource_type: &str) -> u8 {
    match resource_type {
        "instance" => 0,
        "firewall-policy" => 1,
        "nat-gateway" => 2,
        "subnet" => 3,
        "internet-gateway" => 4,
        "network" => 5,
        _ => 6,
    }
}

/// Top-level configuration keys whose values differ
fn changed_keys(recorded: &Value, desired: &Value) -> Vec<String> {
    match (recorded.as_object(), desired.as_object()) {
        (Some(old), Some(new)) => {
            let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
            keys.into_iter()
                .filter(|k| old.get(k.as_str()) != new.get(k.as_str()))
                .cloned()
                .collect()
        }
        _ => vec!["*".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;
    use crate::synth::synthesize;
    use vpcstack_core::{KeyPairName, StackContext, build_topology};

    fn desired(key: Option<&str>) -> ResourceSet {
        let key = key.map(|k| KeyPairName::new(k).unwrap());
        synthesize(&build_topology(StackContext::default(), key).unwrap().graph)
    }

    #[test]
    fn test_empty_state_creates_everything() {
        let set = desired(Some("my-key"));
        let plan = plan(&set, &AppliedState::new());

        assert_eq!(plan.summary().create, set.len());
        let order: Vec<&str> = plan.actions.iter().map(|a| a.resource_id.as_str()).collect();
        let expected: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_applied_state_is_noop() {
        let set = desired(Some("my-key"));
        let plan = plan(&set, &AppliedState::from_resource_set(&set));
        assert!(!plan.has_changes);
        assert_eq!(plan.summary().no_change, set.len());
    }

    #[test]
    fn test_key_change_replaces_instances() {
        let applied = AppliedState::from_resource_set(&desired(Some("old-key")));
        let plan = plan(&desired(Some("new-key")), &applied);

        let updates = plan.actions_by_type(ActionType::Update);
        let ids: Vec<&str> = updates.iter().map(|a| a.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["PublicInstance", "PrivateInstance"]);
        assert_eq!(updates[0].description, "replace instance PublicInstance");
        assert_eq!(updates[0].details["changed"], json!(["key_name"]));
    }

    #[test]
    fn test_stale_resources_deleted_last() {
        let set = desired(None);
        let mut applied = AppliedState::from_resource_set(&set);
        applied.set_resource(
            "network:old-vpc".to_string(),
            ResourceState::new("old-vpc", "network"),
        );
        applied.set_resource(
            "instance:Bastion".to_string(),
            ResourceState::new("Bastion", "instance"),
        );

        let plan = plan(&set, &applied);
        let tail: Vec<(ActionType, &str)> = plan
            .actions
            .iter()
            .rev()
            .take(2)
            .map(|a| (a.action_type, a.resource_id.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (ActionType::Delete, "old-vpc"),
                (ActionType::Delete, "Bastion")
            ]
        );
        assert_eq!(plan.summary().delete, 2);
    }

    #[test]
    fn test_changed_keys_on_non_object() {
        assert_eq!(changed_keys(&Value::Null, &json!({})), vec!["*"]);
    }
}
