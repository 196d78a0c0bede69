//! Entity invalidation rules.
//!
//! When an entity changes, every cache entry derived from it has to go. Each
//! rule lists the tags and key patterns to clear for one entity type; `{id}`
//! in a template is replaced with the entity id.

use crate::keys::escape_glob;

/// Placeholder substituted with the entity id.
const ID_PLACEHOLDER: &str = "{id}";

/// Tags and key patterns to clear when an entity of `entity_type` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRule {
    /// Entity type, e.g. `user`.
    pub entity_type: &'static str,
    /// Tag templates.
    pub tags: &'static [&'static str],
    /// Key pattern templates, relative to the namespace.
    pub patterns: &'static [&'static str],
}

impl EntityRule {
    /// Tags for a concrete entity id.
    pub fn render_tags(&self, entity_id: &str) -> Vec<String> {
        self.tags.iter().map(|t| render(t, entity_id)).collect()
    }

    /// Key patterns for a concrete entity id. Glob characters in the id are
    /// escaped so an id cannot widen the pattern.
    pub fn render_patterns(&self, entity_id: &str) -> Vec<String> {
        let escaped = escape_glob(entity_id);
        self.patterns.iter().map(|p| render(p, &escaped)).collect()
    }
}

/// Rules for the entities the booking platform caches.
pub static ENTITY_RULES: &[EntityRule] = &[
    // Tagging with "user:profile" here would wipe every user's profile.
    EntityRule {
        entity_type: "user",
        tags: &["user:{id}"],
        patterns: &["user:{id}:*", "profile:{id}"],
    },
    EntityRule {
        entity_type: "booking",
        tags: &["booking:{id}", "bookings"],
        patterns: &["booking:{id}:*", "availability:*"],
    },
    EntityRule {
        entity_type: "device",
        tags: &["device:{id}", "device:categories"],
        patterns: &["device:{id}:*", "search:devices:*"],
    },
    EntityRule {
        entity_type: "pricing",
        tags: &["pricing:{id}", "pricing:rules"],
        patterns: &["pricing:quote:*"],
    },
];

/// Finds the rule for an entity type in `rules`.
pub fn rule_for<'a>(rules: &'a [EntityRule], entity_type: &str) -> Option<&'a EntityRule> {
    rules.iter().find(|rule| rule.entity_type == entity_type)
}

/// Substitutes `{id}` in a template.
pub fn render(template: &str, entity_id: &str) -> String {
    template.replace(ID_PLACEHOLDER, entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render("user:{id}:*", "42"), "user:42:*");
        assert_eq!(render("availability:*", "42"), "availability:*");
    }

    #[test]
    fn test_user_rule() {
        let rule = rule_for(ENTITY_RULES, "user").unwrap();
        assert_eq!(rule.render_tags("42"), vec!["user:42".to_string()]);
        assert_eq!(
            rule.render_patterns("42"),
            vec!["user:42:*".to_string(), "profile:42".to_string()]
        );
        assert!(!rule.tags.contains(&"user:profile"));
    }

    #[test]
    fn test_all_entity_types_present() {
        for entity in ["user", "booking", "device", "pricing"] {
            assert!(rule_for(ENTITY_RULES, entity).is_some(), "missing rule for {entity}");
        }
        assert!(rule_for(ENTITY_RULES, "invoice").is_none());
    }

    #[test]
    fn test_id_cannot_widen_pattern() {
        let rule = rule_for(ENTITY_RULES, "user").unwrap();
        assert_eq!(rule.render_patterns("*")[0], "user:\\*:*");
        assert_eq!(rule.render_tags("*"), vec!["user:*".to_string()]);
    }

    #[test]
    fn test_rule_order_is_preserved() {
        let rule = rule_for(ENTITY_RULES, "booking").unwrap();
        assert_eq!(rule.render_tags("7"), vec!["booking:7".to_string(), "bookings".to_string()]);
    }
}
