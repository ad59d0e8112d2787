//! Fields an expression may reference.
//!
//! Top-level fields live in the [`Schema`]. A field may refer to a [`Group`]
//! of further fields (a table), reached through a dotted path like
//! `person.manager.name`. Each step of such a path becomes a join when the
//! expression is added to a [`Query`](crate::Query).
//!
//! A schema can be built in code or loaded from JSON:
//!
//! ```json
//! {
//!     "age": "int",
//!     "name": {"type": "str", "sql": "p.name"},
//!     "dept": {
//!         "type": "str",
//!         "sql": "p.dept_id",
//!         "join": "p.dept_id = {d}.id",
//!         "group": {"table": "dept", "fields": {"title": "str", "*": "str"}}
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::types::DataType;

/// A field of the query context
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub identifier: String,
    pub data_type: DataType,
    /// SQL expression for the field; the quoted identifier if not given.
    /// Inside a group, `{a}` stands for the alias of the group's table.
    pub sql: Option<String>,
    reference: Option<Reference>,
}

/// The group a field refers to, and how to join it
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Join condition; `{m}` is the alias of the referring table, `{d}` the
    /// alias of the joined one
    pub join_sql: String,
    pub group: Arc<Group>,
}

impl Field {
    pub fn new(identifier: impl Into<String>, data_type: DataType) -> Self {
        Field {
            identifier: identifier.into(),
            data_type,
            sql: None,
            reference: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Make the field refer to `group`, joined through `join_sql`
    pub fn with_join(mut self, join_sql: impl Into<String>, group: Arc<Group>) -> Self {
        self.reference = Some(Reference {
            join_sql: join_sql.into(),
            group,
        });
        self
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// The SQL the field reference compiles to
    pub fn sql(&self, dialect: Dialect) -> String {
        self.reference_sql(dialect, &self.identifier, None)
    }

    /// The SQL for a reference to this field by `identifier` (which differs
    /// from the field's own for `*` fields), inside the table aliased `alias`
    pub fn reference_sql(&self, dialect: Dialect, identifier: &str, alias: Option<&str>) -> String {
        match (&self.sql, alias) {
            (Some(sql), Some(alias)) => sql.replace("{a}", alias),
            (Some(sql), None) => sql.clone(),
            (None, Some(alias)) => format!("{}.{}", alias, dialect.quote_identifier(identifier)),
            (None, None) => dialect.quote_identifier(identifier),
        }
    }
}

/// Fields reachable through a reference, usually the columns of one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    table_sql: Option<String>,
    fields: BTreeMap<String, Field>,
}

impl Group {
    /// A group stored in `table_sql`; `None` for groups that are not a table
    pub fn new(table_sql: Option<&str>) -> Self {
        Group {
            table_sql: table_sql.map(str::to_string),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.identifier.clone(), field);
        self
    }

    pub fn table_sql(&self) -> Option<&str> {
        self.table_sql.as_deref()
    }

    /// Look up a field, falling back to the `*` field
    pub fn get(&self, identifier: &str) -> Option<&Field> {
        self.fields.get(identifier).or_else(|| self.fields.get("*"))
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }
}

/// Maps field identifiers to fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Builder-style [`add`](Self::add)
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::{DataType, Field, Schema};
    ///
    /// let schema = Schema::new()
    ///     .with_field(Field::new("age", DataType::Int))
    ///     .with_field(Field::new("name", DataType::Str).with_sql("p.name"));
    /// assert_eq!(schema.len(), 2);
    /// assert_eq!(schema.get("name").unwrap().data_type, DataType::Str);
    /// ```
    pub fn with_field(mut self, field: Field) -> Self {
        self.add(field);
        self
    }

    /// Add a field, replacing any field with the same identifier
    pub fn add(&mut self, field: Field) {
        self.fields.insert(field.identifier.clone(), field);
    }

    /// Top-level field by identifier
    pub fn get(&self, identifier: &str) -> Option<&Field> {
        self.fields.get(identifier)
    }

    /// The fields along a dotted path, one per segment.
    ///
    /// Every segment but the last must refer to a group.
    pub fn resolve_chain(&self, path: &str) -> Option<Vec<&Field>> {
        let mut segments = path.split('.');
        let mut field = self.fields.get(segments.next()?)?;
        let mut chain = vec![field];
        for segment in segments {
            field = field.reference()?.group.get(segment)?;
            chain.push(field);
        }
        Some(chain)
    }

    /// The field a dotted path ends at
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use vsql::schema::{Field, Group, Schema};
    /// use vsql::DataType;
    ///
    /// let dept = Arc::new(Group::new(Some("dept")).with_field(Field::new("title", DataType::Str)));
    /// let schema = Schema::new()
    ///     .with_field(Field::new("dept", DataType::Int).with_join("p.dept_id = {d}.id", dept));
    /// assert_eq!(schema.resolve("dept.title").unwrap().data_type, DataType::Str);
    /// assert!(schema.resolve("dept.budget").is_none());
    /// ```
    pub fn resolve(&self, path: &str) -> Option<&Field> {
        self.resolve_chain(path)?.pop()
    }

    pub fn require(&self, path: &str) -> Result<&Field, CompileError> {
        self.resolve(path)
            .ok_or_else(|| CompileError::FieldUnknown(path.to_string()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Load a schema from its JSON form
    pub fn from_json(value: &JsonValue) -> Result<Schema, CompileError> {
        let mut schema = Schema::new();
        for field in fields_from_json(value)? {
            schema.add(field);
        }
        Ok(schema)
    }

    pub fn from_json_str(text: &str) -> Result<Schema, CompileError> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| CompileError::InvalidSchema(e.to_string()))?;
        Schema::from_json(&value)
    }
}

fn fields_from_json(value: &JsonValue) -> Result<Vec<Field>, CompileError> {
    let JsonValue::Object(entries) = value else {
        return Err(CompileError::InvalidSchema(
            "expected an object mapping field names to types".to_string(),
        ));
    };
    entries
        .iter()
        .map(|(identifier, entry)| field_from_json(identifier, entry))
        .collect()
}

fn optional_str<'a>(
    entry: &'a serde_json::Map<String, JsonValue>,
    key: &str,
    identifier: &str,
) -> Result<Option<&'a str>, CompileError> {
    match entry.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(CompileError::InvalidSchema(format!(
            "{} of field '{}' must be a string",
            key, identifier
        ))),
    }
}

fn field_from_json(identifier: &str, entry: &JsonValue) -> Result<Field, CompileError> {
    match entry {
        JsonValue::String(type_name) => Ok(Field::new(identifier, DataType::from_name(type_name)?)),
        JsonValue::Object(entry) => {
            let type_name = entry.get("type").and_then(JsonValue::as_str).ok_or_else(|| {
                CompileError::InvalidSchema(format!("field '{}' has no type", identifier))
            })?;
            let mut field = Field::new(identifier, DataType::from_name(type_name)?);
            if let Some(sql) = optional_str(entry, "sql", identifier)? {
                field = field.with_sql(sql);
            }
            let join = optional_str(entry, "join", identifier)?;
            match (join, entry.get("group")) {
                (None, None | Some(JsonValue::Null)) => {}
                (Some(join), Some(group @ JsonValue::Object(_))) => {
                    field = field.with_join(join, Arc::new(group_from_json(identifier, group)?));
                }
                _ => {
                    return Err(CompileError::InvalidSchema(format!(
                        "field '{}' needs both a join and a group object, or neither",
                        identifier
                    )));
                }
            }
            Ok(field)
        }
        _ => Err(CompileError::InvalidSchema(format!(
            "field '{}' must be a type name or an object",
            identifier
        ))),
    }
}

fn group_from_json(identifier: &str, value: &JsonValue) -> Result<Group, CompileError> {
    let JsonValue::Object(entry) = value else {
        return Err(CompileError::InvalidSchema(format!(
            "group of field '{}' must be an object",
            identifier
        )));
    };
    let table = optional_str(entry, "table", identifier)?;
    let fields = match entry.get("fields") {
        Some(fields) => fields_from_json(fields)?,
        None => Vec::new(),
    };
    Ok(fields
        .into_iter()
        .fold(Group::new(table), |group, field| group.with_field(field)))
}
