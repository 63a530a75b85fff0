use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;

/// A single search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrickSearchResult {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub publisher: String,
    pub created_at: String,
    #[serde(default)]
    pub downloads: u64,
}

/// A page of search hits plus the total number of matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrickSearchResults {
    #[serde(default)]
    pub bricks: Vec<BrickSearchResult>,
    #[serde(default)]
    pub total: u64,
}

/// The mason version constraint a brick was built for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub mason: String,
}

/// A brick variable as declared in its `brick.yaml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrickVariable {
    #[serde(rename = "type", default = "BrickVariable::default_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_default_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl BrickVariable {
    fn default_type() -> String {
        "string".to_string()
    }
}

/// Brick variables in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrickVariables(pub Vec<(String, BrickVariable)>);

impl BrickVariables {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BrickVariable)> {
        self.0.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for BrickVariables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = BrickVariables;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of brick variables")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut vars = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, var)) = map.next_entry::<String, BrickVariable>()? {
                    vars.push((name, var));
                }
                Ok(BrickVariables(vars))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(BrickVariables::default())
            }
        }

        deserializer.deserialize_any(OrderedVisitor)
    }
}

impl Serialize for BrickVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, var) in &self.0 {
            map.serialize_entry(name, var)?;
        }
        map.end()
    }
}

/// Variable defaults may be strings, numbers, booleans or lists; they are
/// only ever displayed, so keep their textual form.
fn deserialize_default_value<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DefaultValue {
        Text(String),
        Bool(bool),
        Integer(i64),
        Float(f64),
        List(Vec<String>),
    }

    Ok(Option::<DefaultValue>::deserialize(deserializer)?.map(|value| match value {
        DefaultValue::Text(s) => s,
        DefaultValue::Bool(b) => b.to_string(),
        DefaultValue::Integer(n) => n.to_string(),
        DefaultValue::Float(n) => n.to_string(),
        DefaultValue::List(items) => items.join(", "),
    }))
}

/// A brick version as described by the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrickMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub vars: BrickVariables,
    #[serde(default)]
    pub hooks: Vec<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    /// Only present when the request carried an access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<Vec<String>>,
}

/// A hook file shipped inside a bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundledHook {
    pub path: String,
}

/// The decoded contents of a `.bundle` archive.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BrickBundle {
    pub name: String,
    pub environment: Environment,
    pub vars: BrickVariables,
    pub hooks: Vec<BundledHook>,
    pub readme: String,
    pub changelog: String,
    pub license: String,
}

impl BrickBundle {
    pub fn has_hook(&self, path: &str) -> bool {
        self.hooks.iter().any(|hook| hook.path == path)
    }
}

/// Everything the brick page shows. Documents are rendered HTML.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BrickDetails {
    #[serde(flatten)]
    pub metadata: BrickMetadata,
    pub readme: String,
    pub changelog: String,
    pub license: String,
    pub usage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_keep_declaration_order() {
        let vars: BrickVariables = sonic_rs::from_str(
            r#"{
                "zeta": {"type": "string", "description": "last letter", "default": "z"},
                "alpha": {"type": "boolean", "default": true},
                "mid": {"type": "number", "default": 3, "prompt": "How many?"}
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = vars.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let (_, alpha) = vars.iter().nth(1).unwrap();
        assert_eq!(alpha.kind, "boolean");
        assert_eq!(alpha.default.as_deref(), Some("true"));

        let (_, mid) = vars.iter().nth(2).unwrap();
        assert_eq!(mid.default.as_deref(), Some("3"));
        assert_eq!(mid.prompt.as_deref(), Some("How many?"));
    }

    #[test]
    fn metadata_tolerates_missing_optional_fields() {
        let metadata: BrickMetadata = sonic_rs::from_str(
            r#"{"name":"greeting","version":"0.1.0","created_at":"2022-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(metadata.name, "greeting");
        assert!(metadata.vars.is_empty());
        assert_eq!(metadata.publishers, None);
        assert_eq!(metadata.downloads, 0);
    }
}
