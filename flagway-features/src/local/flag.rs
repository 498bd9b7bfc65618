//! Datafile model and per-subject evaluation.

use crate::subject::Attributes;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A full set of flags for one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datafile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    pub features: Vec<FeatureFlag>,
}

impl Datafile {
    pub fn new(features: Vec<FeatureFlag>) -> Self {
        Self {
            revision: None,
            features,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Parse a datafile document. It must be an object with a `features` array.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn feature(&self, key: &str) -> Option<&FeatureFlag> {
        self.features.iter().find(|flag| flag.key == key)
    }

    /// Compile every `matches` pattern up front so evaluation never does.
    pub fn compile_patterns(&self) {
        self.features
            .iter()
            .flat_map(|flag| &flag.targeting)
            .flat_map(|rule| &rule.conditions)
            .filter(|condition| condition.operator == Operator::Matches)
            .for_each(|condition| {
                condition.patterns();
            });
    }
}

/// One flag as stored in the datafile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Off flags always serve their first variation
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    #[serde(default)]
    pub targeting: Vec<TargetingRule>,

    pub default_variation: Variation,

    #[serde(default)]
    pub variations: Vec<Variation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<Rollout>,

    /// Variable values served by `feature_variable`
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

fn enabled_by_default() -> bool {
    true
}

impl FeatureFlag {
    /// An on/off flag serving `default_value` when no rule matches.
    ///
    /// ```
    /// use flagway_features::local::{EvaluationContext, FeatureFlag};
    ///
    /// let flag = FeatureFlag::boolean("BE_checkout", true);
    /// let context = EvaluationContext::new().with_user_id("u-1");
    /// assert_eq!(flag.evaluate(&context).as_bool(), Some(true));
    /// ```
    pub fn boolean(key: impl Into<String>, default_value: bool) -> Self {
        Self {
            key: key.into(),
            description: None,
            enabled: true,
            targeting: Vec::new(),
            default_variation: Variation::Boolean(default_value),
            variations: vec![Variation::Boolean(false), Variation::Boolean(true)],
            rollout: None,
            variables: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_rule(mut self, rule: TargetingRule) -> Self {
        self.targeting.push(rule);
        self
    }

    pub fn with_rollout(mut self, rollout: Rollout) -> Self {
        self.rollout = Some(rollout);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Disabled flags serve the off variation; otherwise the first matching
    /// rule, then the rollout, then the default.
    pub fn evaluate(&self, context: &EvaluationContext) -> Variation {
        if !self.enabled {
            return self
                .variations
                .first()
                .cloned()
                .unwrap_or(Variation::Boolean(false));
        }

        if let Some(rule) = self.targeting.iter().find(|rule| rule.matches(context)) {
            return rule.variation.clone();
        }

        if let Some(ref rollout) = self.rollout
            && let Some(variation) = rollout.evaluate(context, &self.key)
        {
            return variation;
        }

        self.default_variation.clone()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// A value a flag can serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variation {
    Boolean(bool),
    String(String),
    Number(f64),
    Json(Value),
}

impl Variation {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Variation {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Variation {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Serves `variation` when every condition matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    pub variation: Variation,
}

impl TargetingRule {
    pub fn new(variation: impl Into<Variation>) -> Self {
        Self {
            conditions: Vec::new(),
            variation: variation.into(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, context: &EvaluationContext) -> bool {
        self.conditions.iter().all(|c| c.matches(context))
    }
}

/// A test against one context attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: Operator,
    pub values: Vec<String>,

    #[serde(skip)]
    compiled: Patterns,
}

/// `values` compiled as regexes on first use. Invalid patterns are dropped.
#[derive(Debug, Clone, Default)]
struct Patterns(OnceCell<Vec<Regex>>);

impl PartialEq for Patterns {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Condition {
    pub fn new<I, S>(attribute: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute: attribute.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
            compiled: Patterns::default(),
        }
    }

    fn patterns(&self) -> &[Regex] {
        self.compiled
            .0
            .get_or_init(|| self.values.iter().filter_map(|v| Regex::new(v).ok()).collect())
    }

    /// A missing attribute only satisfies `notin`.
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        let Some(actual) = context.get(&self.attribute) else {
            return matches!(self.operator, Operator::NotIn);
        };

        let mut values = self.values.iter();
        match self.operator {
            Operator::In => values.any(|v| v == actual),
            Operator::NotIn => !values.any(|v| v == actual),
            Operator::Contains => values.any(|v| actual.contains(v.as_str())),
            Operator::StartsWith => values.any(|v| actual.starts_with(v.as_str())),
            Operator::EndsWith => values.any(|v| actual.ends_with(v.as_str())),
            Operator::Matches => self.patterns().iter().any(|re| re.is_match(actual)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

/// Percentage rollout keyed on a stable hash of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    /// 0 to 100
    pub percentage: u8,

    pub variation: Variation,

    /// Defaults to `user_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_by: Option<String>,
}

impl Rollout {
    pub fn new(percentage: u8, variation: impl Into<Variation>) -> Self {
        Self {
            percentage: percentage.min(100),
            variation: variation.into(),
            bucket_by: None,
        }
    }

    pub fn with_bucket_by(mut self, attribute: impl Into<String>) -> Self {
        self.bucket_by = Some(attribute.into());
        self
    }

    pub fn evaluate(&self, context: &EvaluationContext, flag_key: &str) -> Option<Variation> {
        let attribute = self.bucket_by.as_deref().unwrap_or(USER_ID);
        let value = context.get(attribute)?;

        (bucket(flag_key, value) < self.percentage).then(|| self.variation.clone())
    }
}

/// Stable bucket in `0..100`.
pub(crate) fn bucket(flag_key: &str, value: &str) -> u8 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(flag_key.as_bytes());
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();

    ((u16::from(digest[0]) * 100) / 256) as u8
}

const USER_ID: &str = "user_id";

/// Stringified view of a subject used by conditions and rollouts.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    attributes: HashMap<String, String>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a normalized subject; the identity is stored as `user_id`.
    pub fn for_subject(user_id: &str, attributes: &Attributes) -> Self {
        let mut context = Self::new().with_user_id(user_id);
        for (name, value) in attributes {
            context.attributes.insert(name.clone(), value.to_string());
        }
        context
    }

    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        self.with_attribute(USER_ID, user_id)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Attribute;
    use serde_json::json;

    #[test]
    fn test_boolean_flag() {
        let flag = FeatureFlag::boolean("BE_checkout", true);
        let context = EvaluationContext::new().with_user_id("user-1");
        assert_eq!(flag.evaluate(&context).as_bool(), Some(true));
    }

    #[test]
    fn test_disabled_flag_serves_off_variation() {
        let flag = FeatureFlag::boolean("BE_checkout", true).disabled();
        let context = EvaluationContext::new().with_user_id("user-1");
        assert_eq!(flag.evaluate(&context).as_bool(), Some(false));
    }

    #[test]
    fn test_targeting_rule() {
        let rule = TargetingRule::new(true).with_condition(Condition::new(
            "organization",
            Operator::In,
            ["org-1", "org-2"],
        ));
        let flag = FeatureFlag::boolean("BE_checkout", false).with_rule(rule);

        let inside = EvaluationContext::new().with_attribute("organization", "org-2");
        let outside = EvaluationContext::new().with_attribute("organization", "org-3");

        assert_eq!(flag.evaluate(&inside).as_bool(), Some(true));
        assert_eq!(flag.evaluate(&outside).as_bool(), Some(false));
        assert_eq!(flag.evaluate(&EvaluationContext::new()).as_bool(), Some(false));
    }

    #[test]
    fn test_missing_attribute_only_satisfies_notin() {
        let context = EvaluationContext::new();
        assert!(Condition::new("country", Operator::NotIn, ["PT"]).matches(&context));
        assert!(!Condition::new("country", Operator::Contains, ["PT"]).matches(&context));
    }

    #[test]
    fn test_regex_condition() {
        let condition = Condition::new("site", Operator::Matches, [r"^site-\d+$"]);
        let context = EvaluationContext::new().with_attribute("site", "site-42");
        assert!(condition.matches(&context));

        let broken = Condition::new("site", Operator::Matches, ["(unclosed"]);
        assert!(!broken.matches(&context));
    }

    #[test]
    fn test_patterns_compiled_once_per_condition() {
        let condition = Condition::new("site", Operator::Matches, [r"^site-\d+$", "(unclosed"]);
        assert!(condition.compiled.0.get().is_none());

        let context = EvaluationContext::new().with_attribute("site", "site-42");
        assert!(condition.matches(&context));
        let first = condition.patterns().as_ptr();
        assert!(condition.matches(&context));

        assert_eq!(condition.patterns().len(), 1);
        assert_eq!(condition.patterns().as_ptr(), first);
    }

    #[test]
    fn test_datafile_precompiles_patterns() {
        let datafile = Datafile::from_value(json!({
            "features": [{
                "key": "BE_sites",
                "default_variation": false,
                "targeting": [{
                    "variation": true,
                    "conditions": [
                        {"attribute": "site", "operator": "matches", "values": ["^site-"]}
                    ]
                }]
            }]
        }))
        .unwrap();

        datafile.compile_patterns();
        let condition = &datafile.features[0].targeting[0].conditions[0];
        assert_eq!(condition.compiled.0.get().map(Vec::len), Some(1));
    }

    #[test]
    fn test_rollout_distribution() {
        let flag = FeatureFlag::boolean("BE_checkout", false).with_rollout(Rollout::new(50, true));

        let enabled = (0..200)
            .filter(|i| {
                let context = EvaluationContext::new().with_user_id(format!("user-{}", i));
                flag.evaluate(&context).as_bool() == Some(true)
            })
            .count();

        assert!((70..=130).contains(&enabled), "enabled {}", enabled);
    }

    #[test]
    fn test_rollout_is_stable() {
        assert_eq!(bucket("BE_checkout", "u-1"), bucket("BE_checkout", "u-1"));
        assert!(bucket("BE_checkout", "u-1") < 100);
    }

    #[test]
    fn test_context_from_normalized_subject() {
        let mut attributes = Attributes::new();
        attributes.insert("country".into(), Attribute::from(3i64));
        attributes.insert("isCoach".into(), Attribute::from(true));

        let context = EvaluationContext::for_subject("testId", &attributes);
        assert_eq!(context.user_id(), Some("testId"));
        assert_eq!(context.get("country"), Some("3"));
        assert_eq!(context.get("isCoach"), Some("true"));
    }

    #[test]
    fn test_datafile_parsing_fills_defaults() {
        let datafile = Datafile::from_value(json!({
            "revision": "7",
            "features": [
                {"key": "BE_checkout", "default_variation": true, "variables": {"limit": 10}},
                {"key": "BE_theme", "enabled": false, "default_variation": "dark",
                 "variations": ["light", "dark"]}
            ]
        }))
        .unwrap();

        assert_eq!(datafile.revision.as_deref(), Some("7"));
        let checkout = datafile.feature("BE_checkout").unwrap();
        assert!(checkout.enabled);
        assert_eq!(checkout.variable("limit"), Some(&json!(10)));

        let theme = datafile.feature("BE_theme").unwrap();
        assert_eq!(theme.evaluate(&EvaluationContext::new()).as_str(), Some("light"));
    }

    #[test]
    fn test_datafile_requires_features() {
        assert!(Datafile::from_value(json!({})).is_err());
    }
}
