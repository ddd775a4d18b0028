use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use url::Url;

use crate::err::Error;

pub type Id = i64;

/// Column values of one row, keyed by field name. The `id` column is kept
/// outside, on [`Record`].
pub type Values = BTreeMap<&'static str, Value>;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Char { max_length: usize },
    Text,
    Email { max_length: usize },
    Url { max_length: usize },
    Username { max_length: usize },
    Bool,
    Date,
    DateTime,
    ForeignKey { to: &'static str, on_delete: OnDelete },
}

impl FieldKind {
    pub fn max_length(&self) -> Option<usize> {
        match *self {
            FieldKind::Char { max_length }
            | FieldKind::Email { max_length }
            | FieldKind::Url { max_length }
            | FieldKind::Username { max_length } => Some(max_length),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            FieldKind::Char { .. }
                | FieldKind::Text
                | FieldKind::Email { .. }
                | FieldKind::Url { .. }
                | FieldKind::Username { .. }
        )
    }

    fn sql_type(&self) -> String {
        match *self {
            FieldKind::Text => "TEXT".to_string(),
            FieldKind::Bool => "BOOLEAN".to_string(),
            FieldKind::Date => "DATE".to_string(),
            FieldKind::DateTime => "TIMESTAMPTZ".to_string(),
            FieldKind::ForeignKey { .. } => "BIGINT".to_string(),
            other => format!("VARCHAR({})", other.max_length().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub null: bool,
    pub blank: bool,
    pub unique: bool,
    pub editable: bool,
    pub auto_now_add: bool,
    pub default: Option<bool>,
}

impl Field {
    const fn new(name: &'static str, kind: FieldKind) -> Field {
        Field {
            name,
            kind,
            null: false,
            blank: false,
            unique: false,
            editable: true,
            auto_now_add: false,
            default: None,
        }
    }

    pub const fn char(name: &'static str, max_length: usize) -> Field {
        Field::new(name, FieldKind::Char { max_length })
    }

    pub const fn text(name: &'static str) -> Field {
        Field::new(name, FieldKind::Text)
    }

    pub const fn email(name: &'static str, max_length: usize) -> Field {
        Field::new(name, FieldKind::Email { max_length })
    }

    pub const fn url(name: &'static str, max_length: usize) -> Field {
        Field::new(name, FieldKind::Url { max_length })
    }

    pub const fn username(name: &'static str, max_length: usize) -> Field {
        Field::new(name, FieldKind::Username { max_length })
    }

    pub const fn boolean(name: &'static str, default: bool) -> Field {
        let mut field = Field::new(name, FieldKind::Bool);
        field.default = Some(default);
        field
    }

    pub const fn date(name: &'static str) -> Field {
        Field::new(name, FieldKind::Date)
    }

    pub const fn datetime(name: &'static str) -> Field {
        Field::new(name, FieldKind::DateTime)
    }

    pub const fn foreign_key(name: &'static str, to: &'static str, on_delete: OnDelete) -> Field {
        Field::new(name, FieldKind::ForeignKey { to, on_delete })
    }

    pub const fn null(mut self) -> Field {
        self.null = true;
        self
    }

    pub const fn blank(mut self) -> Field {
        self.blank = true;
        self
    }

    pub const fn unique(mut self) -> Field {
        self.unique = true;
        self
    }

    pub const fn read_only(mut self) -> Field {
        self.editable = false;
        self
    }

    /// Filled with the creation time and never written by clients.
    pub const fn auto_now_add(mut self) -> Field {
        self.auto_now_add = true;
        self.editable = false;
        self
    }

    fn invalid<M: Into<String>>(&self, message: M) -> Error {
        Error::validation(self.name, message)
    }

    /// Type-checks a raw JSON value against the field kind.
    pub fn coerce(&self, raw: &Json) -> Result<Value, Error> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let value = match self.kind {
            kind if kind.is_text() => match raw {
                Json::String(s) => Value::Text(s.clone()),
                _ => return Err(self.invalid("Expected a string.")),
            },
            FieldKind::Bool => raw
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| self.invalid("Must be either true or false."))?,
            FieldKind::Date => raw
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(Value::Date)
                .ok_or_else(|| self.invalid("Enter a valid date in YYYY-MM-DD format."))?,
            FieldKind::DateTime => raw
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| Value::DateTime(t.with_timezone(&Utc)))
                .ok_or_else(|| self.invalid("Enter a valid RFC 3339 timestamp."))?,
            FieldKind::ForeignKey { .. } => raw
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| self.invalid("Expected an integer id."))?,
            _ => unreachable!("text kinds are matched above"),
        };
        Ok(value)
    }

    /// Checks an already coerced value against the field constraints.
    pub fn check(&self, value: &Value) -> Result<(), Error> {
        let text = match value {
            Value::Null if self.null => return Ok(()),
            Value::Null => return Err(self.invalid("This field cannot be null.")),
            Value::Text(text) => text,
            _ => return Ok(()),
        };
        if text.is_empty() {
            return if self.blank {
                Ok(())
            } else {
                Err(self.invalid("This field cannot be blank."))
            };
        }
        if let Some(max) = self.kind.max_length() {
            let len = text.chars().count();
            if len > max {
                return Err(self.invalid(format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                )));
            }
        }
        match self.kind {
            FieldKind::Email { .. } if !EMAIL_RE.is_match(text) => {
                Err(self.invalid("Enter a valid email address."))
            }
            FieldKind::Username { .. } if !USERNAME_RE.is_match(text) => Err(self.invalid(
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            )),
            FieldKind::Url { .. } => match Url::parse(text) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
                _ => Err(self.invalid("Enter a valid URL.")),
            },
            _ => Ok(()),
        }
    }

    /// Coerces and checks; blank text on a nullable field is stored as null so
    /// that it never collides with another blank under a unique constraint.
    pub fn clean(&self, raw: &Json) -> Result<Value, Error> {
        let value = match self.coerce(raw)? {
            Value::Text(s) if s.is_empty() && self.null => Value::Null,
            other => other,
        };
        self.check(&value)?;
        Ok(value)
    }

    fn default_value(&self, now: DateTime<Utc>) -> Option<Value> {
        if self.auto_now_add {
            Some(Value::DateTime(now))
        } else if let Some(default) = self.default {
            Some(Value::Bool(default))
        } else if self.null {
            Some(Value::Null)
        } else if self.blank && self.kind.is_text() {
            Some(Value::Text(String::new()))
        } else {
            None
        }
    }
}

/// Static description of one entity: its admin name, its table and its
/// columns (the surrogate `id` is implicit).
#[derive(Debug, Serialize)]
pub struct Schema {
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Checks the parts of a schema that do not depend on other registrations.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() || self.table.is_empty() {
            return Err(Error::configuration(
                "a model must declare both a name and a table",
            ));
        }
        if self.fields.is_empty() {
            return Err(Error::configuration(format!(
                "model `{}` declares no fields",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for field in self.fields {
            if field.name.is_empty() || field.name == "id" {
                return Err(Error::configuration(format!(
                    "model `{}` declares an invalid field name `{}`",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name) {
                return Err(Error::configuration(format!(
                    "model `{}` declares field `{}` twice",
                    self.name, field.name
                )));
            }
            if field.kind.max_length() == Some(0) {
                return Err(Error::configuration(format!(
                    "field `{}.{}` needs a positive max_length",
                    self.name, field.name
                )));
            }
            if let FieldKind::ForeignKey {
                on_delete: OnDelete::SetNull,
                ..
            } = field.kind
            {
                if !field.null {
                    return Err(Error::configuration(format!(
                        "field `{}.{}` sets null on delete but is not nullable",
                        self.name, field.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn reject_unknown(&self, payload: &Map<String, Json>) -> Result<(), Error> {
        for key in payload.keys() {
            match self.field(key) {
                Some(field) if field.editable => {}
                Some(_) => return Err(Error::validation(key.as_str(), "This field is read-only.")),
                None if key == "id" => {
                    return Err(Error::validation("id", "This field is read-only."))
                }
                None => return Err(Error::validation(key.as_str(), "Unknown field.")),
            }
        }
        Ok(())
    }

    /// Validates a create payload, filling defaults for absent fields.
    pub fn build_insert(
        &self,
        payload: &Map<String, Json>,
        now: DateTime<Utc>,
    ) -> Result<Values, Error> {
        self.reject_unknown(payload)?;
        let mut values = Values::new();
        for field in self.fields {
            let value = match payload.get(field.name) {
                Some(raw) => field.clean(raw)?,
                None => field
                    .default_value(now)
                    .ok_or_else(|| field.invalid("This field is required."))?,
            };
            values.insert(field.name, value);
        }
        Ok(values)
    }

    /// Validates a partial update payload; only the given fields are touched.
    pub fn build_changes(&self, payload: &Map<String, Json>) -> Result<Values, Error> {
        self.reject_unknown(payload)?;
        let mut values = Values::new();
        for (key, raw) in payload {
            if let Some(field) = self.field(key) {
                values.insert(field.name, field.clean(raw)?);
            }
        }
        Ok(values)
    }

    pub fn unique_constraint(&self, field: &Field) -> String {
        format!("{}_{}_key", self.table, field.name)
    }

    pub fn foreign_key_constraint(&self, field: &Field) -> String {
        format!("{}_{}_fkey", self.table, field.name)
    }

    /// Maps a constraint name produced by [`Schema::create_table_sql`] back to
    /// the field it guards.
    pub fn field_for_constraint(&self, constraint: &str) -> Option<&'static Field> {
        let rest = constraint.strip_prefix(self.table)?.strip_prefix('_')?;
        let name = rest
            .strip_suffix("_fkey")
            .or_else(|| rest.strip_suffix("_key"))?;
        self.field(name)
    }

    pub fn create_table_sql(&self) -> String {
        let mut lines = vec!["id BIGSERIAL PRIMARY KEY".to_string()];
        for field in self.fields {
            let mut line = format!("{} {}", field.name, field.kind.sql_type());
            if !field.null {
                line.push_str(" NOT NULL");
            }
            lines.push(line);
        }
        for field in self.fields.iter().filter(|f| f.unique) {
            lines.push(format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.unique_constraint(field),
                field.name
            ));
        }
        for field in self.fields {
            if let FieldKind::ForeignKey { to, on_delete } = field.kind {
                let action = match on_delete {
                    OnDelete::Cascade => "CASCADE",
                    OnDelete::SetNull => "SET NULL",
                };
                lines.push(format!(
                    "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} (id) ON DELETE {}",
                    self.foreign_key_constraint(field),
                    field.name,
                    to,
                    action
                ));
            }
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table,
            lines.join(",\n    ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Id,
    pub values: Values,
}

impl Record {
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    fn unexpected(&self, name: &str) -> Error {
        Error::InternalError {
            kind: "RecordError",
            message: format!(
                "column `{}` of row {} holds an unexpected value: {:?}",
                name,
                self.id,
                self.get(name)
            ),
        }
    }

    pub fn text(&self, name: &str) -> Result<String, Error> {
        match self.get(name) {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<String>, Error> {
        match self.get(name) {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, Error> {
        match self.get(name) {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate, Error> {
        match self.get(name) {
            Value::Date(d) => Ok(*d),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn opt_date(&self, name: &str) -> Result<Option<NaiveDate>, Error> {
        match self.get(name) {
            Value::Null => Ok(None),
            Value::Date(d) => Ok(Some(*d)),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn datetime(&self, name: &str) -> Result<DateTime<Utc>, Error> {
        match self.get(name) {
            Value::DateTime(t) => Ok(*t),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn reference(&self, name: &str) -> Result<Id, Error> {
        match self.get(name) {
            Value::Int(id) => Ok(*id),
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn opt_reference(&self, name: &str) -> Result<Option<Id>, Error> {
        match self.get(name) {
            Value::Null => Ok(None),
            Value::Int(id) => Ok(Some(*id)),
            _ => Err(self.unexpected(name)),
        }
    }
}
