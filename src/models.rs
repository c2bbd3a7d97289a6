use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Disease {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub doid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "de::parent_id")]
    pub parent: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Target {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub uniprot: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub sym: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub tdl: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub fam: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub famext: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub dtoid: Option<String>,
    #[serde(default, deserialize_with = "de::float")]
    pub novelty: Option<f64>,
}

/// A node of the Drug Target Ontology. `parent` is an absolute API URL.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Dto {
    #[serde(deserialize_with = "de::required_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub dtoid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "de::vec_or_null")]
    pub target: Vec<Target>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Association {
    #[serde(default, deserialize_with = "de::float")]
    pub importance: Option<f64>,
    #[serde(default, deserialize_with = "de::float")]
    pub novelty: Option<f64>,
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub disease: Option<Disease>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Article {
    #[serde(deserialize_with = "de::required_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// List endpoints answer either with a page envelope or a bare array.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged(Page<T>),
    Items(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged(page) => page.results,
            Listing::Items(items) => items,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum Mode {
    Disease,
    Target,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Disease => "disease",
            Mode::Target => "target",
        }
    }

    pub fn parse(value: &str) -> Option<Mode> {
        match value {
            "disease" => Some(Mode::Disease),
            "target" => Some(Mode::Target),
            _ => None,
        }
    }

    /// What the plot shows for a subject of this mode.
    pub fn partner_label(&self) -> &'static str {
        match self {
            Mode::Disease => "target",
            Mode::Target => "disease",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either side of an association: the plotted subject or one of its partners.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Disease(Disease),
    Target(Target),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Entity::Disease(d) => &d.name,
            Entity::Target(t) => &t.name,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Disease(d) => d.id,
            Entity::Target(t) => t.id,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Entity::Disease(_) => Mode::Disease,
            Entity::Target(_) => Mode::Target,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Entity::Target(t) => Some(t),
            Entity::Disease(_) => None,
        }
    }

    pub fn as_disease(&self) -> Option<&Disease> {
        match self {
            Entity::Disease(d) => Some(d),
            Entity::Target(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
    pub novelty: f64,
    pub importance: f64,
    pub partner: Entity,
}

impl Datapoint {
    pub fn label(&self) -> String {
        match &self.partner {
            Entity::Target(t) => match &t.sym {
                Some(sym) if !sym.is_empty() => format!("{} ({})", t.name, sym),
                _ => t.name.clone(),
            },
            Entity::Disease(d) => d.name.clone(),
        }
    }
}

mod de {
    use super::*;
    use serde::de::Error;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().ok_or_else(|| D::Error::custom("id out of range")),
            Value::String(s) => s.trim().parse().map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("unexpected id: {}", other))),
        }
    }

    pub fn required_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("unexpected id: {}", other))),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn parent_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(Value::Object(obj)) => obj.get("id").and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }),
            _ => None,
        })
    }

    pub fn vec_or_null<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }
}
