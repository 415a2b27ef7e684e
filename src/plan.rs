//! Schema-driven planning.
//!
//! The planner merges the proposed configuration with prior state and
//! reports what applying it would change:
//!
//! - configured values win;
//! - unset optional+computed attributes keep their prior value;
//! - computed-only attributes carry their prior value, and become unknown
//!   (null) when the object changes unless they are marked
//!   `use_state_for_unknown`;
//! - changing a `force_new` attribute of an existing object requires
//!   replacement, which resets every computed-only attribute.
//!
//! Changes are reported per leaf attribute as dotted paths. Sensitive values
//! never appear in change records.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Shown in place of a sensitive value in change records.
pub const SENSITIVE_MARKER: &str = "(sensitive)";

#[derive(Default)]
struct Planner {
    changes: Vec<AttributeChange>,
    requires_replace: bool,
}

/// Plan `proposed` against `prior` for a resource described by `schema`.
///
/// A null `proposed` plans a destroy: the planned state is null and every
/// prior attribute is reported as removed.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|v| !v.is_null());
    let mut planner = Planner::default();

    if proposed.is_null() {
        if let Some(prior) = prior {
            planner.block(&schema.block, "", prior.as_object(), None);
        }
        return PlanResult::with_changes(Value::Null, planner.changes, false);
    }

    let mut planned = planner.block(
        &schema.block,
        "",
        prior.and_then(Value::as_object),
        proposed.as_object(),
    );

    let is_create = prior.is_none();
    if planner.requires_replace || is_create {
        reset_computed(&schema.block, &mut planned, true);
    } else if !planner.changes.is_empty() {
        reset_computed(&schema.block, &mut planned, false);
    }

    let planned = Value::Object(planned);
    if planner.changes.is_empty() && !planner.requires_replace {
        PlanResult::no_change(planned)
    } else {
        PlanResult::with_changes(planned, planner.changes, planner.requires_replace)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn present<'a>(object: Option<&'a Map<String, Value>>, name: &str) -> Option<&'a Value> {
    object.and_then(|o| o.get(name)).filter(|v| !v.is_null())
}

fn sorted<'a, T>(entries: impl Iterator<Item = (&'a String, &'a T)>) -> Vec<(&'a String, &'a T)>
where
    T: 'a,
{
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

impl Planner {
    fn block(
        &mut self,
        block: &Block,
        prefix: &str,
        prior: Option<&Map<String, Value>>,
        proposed: Option<&Map<String, Value>>,
    ) -> Map<String, Value> {
        let mut planned = Map::new();

        for (name, attr) in sorted(block.attributes.iter()) {
            let prior_value = present(prior, name);
            let proposed_value = present(proposed, name);

            let value = if attr.flags.is_computed_only() {
                prior_value.cloned()
            } else if let Some(value) = proposed_value {
                Some(value.clone())
            } else if attr.flags.computed && proposed.is_some() {
                prior_value.cloned()
            } else {
                None
            };

            if !attr.flags.is_computed_only() && value.as_ref() != prior_value {
                self.record(&join(prefix, name), attr, prior_value, value.as_ref(), prior.is_some());
            }
            if proposed.is_some() {
                planned.insert(name.clone(), value.unwrap_or(Value::Null));
            }
        }

        for (name, nested) in sorted(block.blocks.iter()) {
            let path = join(prefix, name);
            let prior_value = present(prior, name);
            let proposed_value = present(proposed, name);

            match nested.nesting_mode {
                BlockNestingMode::Single => {
                    let inner = self.block(
                        &nested.block,
                        &path,
                        prior_value.and_then(Value::as_object),
                        proposed_value.and_then(Value::as_object),
                    );
                    if proposed_value.is_some() {
                        planned.insert(name.clone(), Value::Object(inner));
                    } else if proposed.is_some() {
                        planned.insert(name.clone(), Value::Null);
                    }
                },
                BlockNestingMode::List => {
                    if proposed_value != prior_value {
                        self.changes.push(AttributeChange::new(
                            path,
                            prior_value.cloned(),
                            proposed_value.cloned(),
                        ));
                    }
                    if proposed.is_some() {
                        planned.insert(
                            name.clone(),
                            proposed_value.cloned().unwrap_or(Value::Null),
                        );
                    }
                },
            }
        }

        planned
    }

    fn record(
        &mut self,
        path: &str,
        attr: &Attribute,
        before: Option<&Value>,
        after: Option<&Value>,
        exists: bool,
    ) {
        let mask = |v: Option<&Value>| {
            v.map(|v| {
                if attr.flags.sensitive {
                    Value::String(SENSITIVE_MARKER.to_owned())
                } else {
                    v.clone()
                }
            })
        };

        if attr.force_new && exists && after.is_some() {
            self.requires_replace = true;
        }
        self.changes
            .push(AttributeChange::new(path, mask(before), mask(after)));
    }
}

/// Null out computed-only attributes whose value will only be known after
/// apply. `all` also resets those marked `use_state_for_unknown`.
fn reset_computed(block: &Block, planned: &mut Map<String, Value>, all: bool) {
    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() && (all || !attr.use_state_for_unknown) {
            if let Some(value) = planned.get_mut(name) {
                *value = Value::Null;
            }
        }
    }
    for (name, nested) in &block.blocks {
        if nested.nesting_mode != BlockNestingMode::Single {
            continue;
        }
        if let Some(Value::Object(inner)) = planned.get_mut(name) {
            reset_computed(&nested.block, inner, all);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NestedBlock;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0().with_block(
            "webhooks_merchant",
            NestedBlock::single(
                Block::new()
                    .with_attribute("id", Attribute::computed_string().use_state_for_unknown())
                    .with_attribute("type", Attribute::required_string().with_force_new())
                    .with_attribute("url", Attribute::required_string())
                    .with_attribute("password", Attribute::optional_string().sensitive())
                    .with_attribute("description", Attribute::optional_computed_string())
                    .with_attribute("has_error", Attribute::computed_bool()),
            )
            .with_min_items(1),
        )
    }

    fn prior() -> Value {
        json!({
            "webhooks_merchant": {
                "id": "WBHK1",
                "type": "standard",
                "url": "https://a.example",
                "password": "old",
                "description": "from api",
                "has_error": false
            }
        })
    }

    fn paths(result: &PlanResult) -> Vec<&str> {
        result.changes.iter().map(|c| c.path.as_str()).collect()
    }

    #[test]
    fn create_plans_every_configured_attribute() {
        let proposed = json!({
            "webhooks_merchant": {"type": "standard", "url": "https://a.example"}
        });

        let result = plan_resource(&schema(), None, &proposed);
        assert!(!result.requires_replace);
        assert_eq!(
            paths(&result),
            vec!["webhooks_merchant.type", "webhooks_merchant.url"]
        );
        assert_eq!(result.planned_state["webhooks_merchant"]["id"], Value::Null);
        assert_eq!(
            result.planned_state["webhooks_merchant"]["url"],
            "https://a.example"
        );
    }

    #[test]
    fn unchanged_config_keeps_prior_state() {
        let proposed = json!({
            "webhooks_merchant": {"type": "standard", "url": "https://a.example", "password": "old"}
        });

        let result = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(!result.has_changes());
        assert_eq!(result.planned_state, prior());
    }

    #[test]
    fn update_keeps_id_and_resets_other_computed() {
        let proposed = json!({
            "webhooks_merchant": {"type": "standard", "url": "https://b.example", "password": "old"}
        });

        let result = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(!result.requires_replace);
        assert_eq!(paths(&result), vec!["webhooks_merchant.url"]);

        let planned = &result.planned_state["webhooks_merchant"];
        assert_eq!(planned["id"], "WBHK1");
        assert_eq!(planned["description"], "from api");
        assert_eq!(planned["has_error"], Value::Null);
    }

    #[test]
    fn force_new_change_requires_replace() {
        let proposed = json!({
            "webhooks_merchant": {"type": "report-notification", "url": "https://a.example", "password": "old"}
        });

        let result = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(result.requires_replace);
        assert_eq!(result.planned_state["webhooks_merchant"]["id"], Value::Null);
    }

    #[test]
    fn sensitive_values_are_masked() {
        let proposed = json!({
            "webhooks_merchant": {"type": "standard", "url": "https://a.example", "password": "new"}
        });

        let result = plan_resource(&schema(), Some(&prior()), &proposed);
        let change = &result.changes[0];
        assert_eq!(change.path, "webhooks_merchant.password");
        assert_eq!(change.before, Some(json!(SENSITIVE_MARKER)));
        assert_eq!(change.after, Some(json!(SENSITIVE_MARKER)));
    }

    #[test]
    fn null_proposed_plans_destroy() {
        let result = plan_resource(&schema(), Some(&prior()), &Value::Null);
        assert!(result.planned_state.is_null());
        assert!(!result.requires_replace);
        assert!(paths(&result).contains(&"webhooks_merchant.url"));
        assert!(result.changes.iter().all(|c| c.after.is_none()));
    }
}
