use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Subsection used for fields stored without one.
pub const UNGROUPED_SUBSECTION: &str = "General";

/// Input widget type of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    File,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    Number,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::File => "file",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Other(s) => s,
        }
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "" => FieldType::Text,
            "email" => FieldType::Email,
            "tel" | "phone" => FieldType::Tel,
            "file" => FieldType::File,
            "textarea" => FieldType::Textarea,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "date" => FieldType::Date,
            "number" => FieldType::Number,
            _ => FieldType::Other(raw),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

/// One configurable form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subsection: String,
    #[serde(default, alias = "field_order", deserialize_with = "lenient_order")]
    pub order: i64,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub required: bool,
    /// Serialized choices, e.g. a comma list or JSON array text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub options: String,
    /// Serialized rule set, usually JSON object text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub validations: String,
}

fn default_field_type() -> FieldType {
    FieldType::Text
}

// The dashboard serves raw store rows, so `required` may arrive as 0/1 and
// text columns as null.

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        _ => false,
    })
}

fn lenient_order<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Ordered mapping of subsection name to its ordered fields.
///
/// Serializes as a JSON object whose key order is the subsection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    sections: Vec<(String, Vec<FieldDefinition>)>,
}

impl Schema {
    /// Groups `fields` by subsection and orders everything.
    ///
    /// Fields within a subsection sort by `order`, ties keeping the order they
    /// were given in. Subsections sort by `section_order` when it has any
    /// entries (subsections missing from it go last), otherwise by the
    /// smallest field order they contain.
    pub fn from_fields(fields: Vec<FieldDefinition>, section_order: &HashMap<String, i64>) -> Self {
        let mut sections: Vec<(String, Vec<FieldDefinition>)> = Vec::new();
        for mut field in fields {
            if field.subsection.trim().is_empty() {
                field.subsection = UNGROUPED_SUBSECTION.to_string();
            }
            match sections.iter_mut().find(|(name, _)| *name == field.subsection) {
                Some((_, group)) => group.push(field),
                None => sections.push((field.subsection.clone(), vec![field])),
            }
        }

        for (_, group) in sections.iter_mut() {
            group.sort_by_key(|f| f.order);
        }

        if section_order.is_empty() {
            sections.sort_by_key(|(_, group)| group.iter().map(|f| f.order).min().unwrap_or(i64::MAX));
        } else {
            sections.sort_by_key(|(name, _)| match section_order.get(name) {
                Some(rank) => (false, *rank),
                None => (true, 0),
            });
        }

        Schema { sections }
    }

    /// Builds a schema whose subsections and fields are already in order.
    pub fn from_sections(sections: Vec<(String, Vec<FieldDefinition>)>) -> Self {
        Schema { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|(_, fields)| fields.is_empty())
    }

    pub fn subsection_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    #[cfg(test)]
    pub fn subsection(&self, name: &str) -> Option<&[FieldDefinition]> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// All fields, in subsection order then field order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.sections.iter().flat_map(|(_, fields)| fields.iter())
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, fields) in &self.sections {
            map.serialize_entry(name, fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping subsection names to field arrays")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Schema, A::Error> {
                let mut sections = Vec::new();
                while let Some((name, fields)) = access.next_entry::<String, Vec<FieldDefinition>>()? {
                    sections.push((name, fields));
                }
                Ok(Schema { sections })
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
