//! Declarative configuration schemas for registry providers.
//!
//! Every provider declares the keys it accepts, which of them are required,
//! their defaults, and which of them hold credentials. The same schema is
//! used to validate raw configuration entries and to mask them for display.

use serde::Serialize;
use serde_json::{Map, Value};
use skopos_core::{mask, ValidationError};

/// A validated registry configuration: key/value bag with defaults filled in.
pub type Configuration = Map<String, Value>;

/// Name reported for errors about the configuration entry as a whole.
const ROOT_FIELD: &str = "value";

/// Type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Non-empty string.
    String,
    /// Absolute URL.
    Uri,
    /// Boolean, also accepted as the strings `true` / `false`.
    Bool,
}

/// Declaration of one configuration field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Configuration key.
    pub name: &'static str,
    /// Expected type.
    pub kind: FieldKind,
    /// Whether the key must be present.
    pub required: bool,
    /// Value filled in when the key is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the value is a credential to be masked for display.
    pub secret: bool,
}

impl FieldSpec {
    /// Declares an optional string field.
    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Declares an optional URL field.
    #[must_use]
    pub const fn uri(name: &'static str) -> Self {
        Self::new(name, FieldKind::Uri)
    }

    /// Declares an optional boolean field.
    #[must_use]
    pub const fn bool(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            secret: false,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as a credential.
    #[must_use]
    pub const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Sets the value used when the field is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn coerce(&self, value: &Value) -> Result<Value, ValidationError> {
        let name = self.name;
        match (self.kind, value) {
            (FieldKind::Bool, Value::Bool(_)) => Ok(value.clone()),
            (FieldKind::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(ValidationError::invalid_type(name, "boolean")),
            },
            (FieldKind::Bool, _) => Err(ValidationError::invalid_type(name, "boolean")),
            (FieldKind::String | FieldKind::Uri, Value::Number(n)) => {
                self.coerce(&Value::String(n.to_string()))
            }
            (FieldKind::String | FieldKind::Uri, Value::String(s)) if s.is_empty() => Err(
                ValidationError::format(name, format!("\"{name}\" is not allowed to be empty")),
            ),
            (FieldKind::String, Value::String(_)) => Ok(value.clone()),
            (FieldKind::Uri, Value::String(s)) => match url::Url::parse(s) {
                Ok(parsed) if parsed.has_host() => Ok(value.clone()),
                _ => Err(ValidationError::format(
                    name,
                    format!("\"{name}\" must be a valid uri"),
                )),
            },
            (FieldKind::String | FieldKind::Uri, _) => {
                Err(ValidationError::invalid_type(name, "string"))
            }
        }
    }
}

/// Configuration schema of a registry provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    allow_empty: bool,
}

impl Schema {
    /// Creates a schema without fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an empty string (or null) as an anonymous configuration.
    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns true if an empty value is accepted as anonymous configuration.
    #[must_use]
    pub const fn allows_empty(&self) -> bool {
        self.allow_empty
    }

    /// Validates a raw configuration entry, filling defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field: an
    /// undeclared key, a missing required key, or a value of the wrong type
    /// or format.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use skopos_registry::schema::{FieldSpec, Schema};
    ///
    /// let schema = Schema::new()
    ///     .field(FieldSpec::uri("url").default_value("https://registry.gitlab.com"))
    ///     .field(FieldSpec::string("token").required().secret());
    ///
    /// let config = schema.validate(&json!({ "token": "t" })).unwrap();
    /// assert_eq!(config["url"], "https://registry.gitlab.com");
    ///
    /// let err = schema.validate(&json!({})).unwrap_err();
    /// assert_eq!(err.field, "token");
    /// ```
    pub fn validate(&self, raw: &Value) -> Result<Configuration, ValidationError> {
        let empty = Map::new();
        let entries = match raw {
            Value::Null if self.allow_empty => return Ok(Configuration::new()),
            Value::String(s) if self.allow_empty && s.trim().is_empty() => {
                return Ok(Configuration::new());
            }
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ValidationError::invalid_type(ROOT_FIELD, "object")),
        };

        if let Some(unknown) = entries
            .keys()
            .find(|key| !self.fields.iter().any(|f| f.name == key.as_str()))
        {
            return Err(ValidationError::not_allowed(unknown.as_str()));
        }

        let mut validated = Configuration::new();
        for field in &self.fields {
            match entries.get(field.name) {
                Some(value) => {
                    validated.insert(field.name.to_string(), field.coerce(value)?);
                }
                None => {
                    if let Some(default) = &field.default {
                        validated.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        return Err(ValidationError::required(field.name));
                    }
                }
            }
        }

        Ok(validated)
    }

    /// Returns a copy of `configuration` with every secret field masked.
    ///
    /// Non-secret fields pass through unchanged.
    #[must_use]
    pub fn mask(&self, configuration: &Configuration) -> Configuration {
        configuration
            .iter()
            .map(|(key, value)| {
                let secret = self
                    .fields
                    .iter()
                    .any(|f| f.secret && f.name == key.as_str());
                let value = match value {
                    Value::String(s) if secret => Value::String(mask(s)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}
