//! Entity shapes: what a type declares ([`EntityDecl`]) and what the session
//! derives from it ([`EntityType`]).

use crate::codec::{FieldType, FieldWriter, RowReader, ScalarCodec};
use crate::config::EntityConfig;
use crate::error::{Result, SchemaError};
use crate::normalize::NameKey;
use sheetdb_workbook::CellData;
use std::any::TypeId;
use std::fmt;

/// A record type that maps one-to-one onto a sheet.
///
/// Usually derived with `#[derive(Entity)]`. Field indices passed to
/// [`Entity::encode_field`] follow the order of [`EntityDecl::fields`].
pub trait Entity: Sized + Send + Sync + 'static {
    /// Name the type is known by in sheets, configuration and errors.
    const TYPE_NAME: &'static str;

    fn describe() -> EntityDecl;

    fn decode(row: &mut RowReader<'_>) -> Result<Self>;

    fn encode_field(&self, index: usize, out: &mut FieldWriter<'_>) -> Result<CellData>;
}

/// The closed set of scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Float,
    Text,
    Date,
    DateTime,
    Time,
    /// Calendar-like timestamp, stored as a UTC date-time.
    Timestamp,
}

impl ScalarKind {
    /// Map a Rust type name (as written in source) to its kind.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let last = name.rsplit("::").next().unwrap_or(name);
        Some(match last {
            "bool" => ScalarKind::Boolean,
            "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "usize" | "isize" => {
                ScalarKind::Integer
            }
            "f32" | "f64" => ScalarKind::Float,
            "String" | "str" => ScalarKind::Text,
            "NaiveDate" => ScalarKind::Date,
            "NaiveDateTime" => ScalarKind::DateTime,
            "NaiveTime" => ScalarKind::Time,
            "DateTime<Utc>" => ScalarKind::Timestamp,
            _ => return None,
        })
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::Boolean => "boolean",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "date-time",
            ScalarKind::Time => "time",
            ScalarKind::Timestamp => "timestamp",
        })
    }
}

/// Reference from a field to another entity type.
///
/// Built without describing the target, so entity types may reference
/// themselves or each other.
#[derive(Clone, Copy)]
pub struct RelationTarget {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl RelationTarget {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: E::TYPE_NAME,
        }
    }
}

impl fmt::Debug for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelationTarget").field(&self.type_name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Relation(RelationTarget),
    /// A type name with no coercion rule; rejected when the schema is built.
    Unsupported(String),
}

/// One field as declared by the entity type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub key: bool,
    pub has_default: bool,
    pub nullable: bool,
    pub kind: FieldKind,
}

impl FieldDecl {
    pub fn of<T: FieldType>(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            key: false,
            has_default: false,
            nullable: T::NULLABLE,
            kind: T::kind(),
        }
    }

    /// Declare a field by the name of its type, for hand-written schemas.
    /// `Option<..>` marks it nullable.
    pub fn with_type_name(name: &'static str, type_name: &str) -> Self {
        let trimmed = type_name.trim();
        let (nullable, inner) = match trimmed
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };
        let kind = match ScalarKind::from_type_name(inner) {
            Some(kind) => FieldKind::Scalar(kind),
            None => FieldKind::Unsupported(trimmed.to_string()),
        };
        Self {
            name,
            column: None,
            key: false,
            has_default: false,
            nullable,
            kind,
        }
    }

    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// The field may be omitted: its column is optional and blank cells use the default.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Declared shape of an entity type.
#[derive(Debug, Clone)]
pub struct EntityDecl {
    pub type_name: &'static str,
    pub sheet_name: Option<&'static str>,
    pub header_row: Option<u32>,
    pub fields: Vec<FieldDecl>,
}

impl EntityDecl {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            sheet_name: None,
            header_row: None,
            fields: Vec::new(),
        }
    }

    pub fn sheet_name(mut self, name: &'static str) -> Self {
        self.sheet_name = Some(name);
        self
    }

    pub fn header_row(mut self, row: u32) -> Self {
        self.header_row = Some(row);
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldShape {
    Scalar(ScalarCodec),
    Relation(RelationTarget),
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Declared field name.
    pub field: &'static str,
    /// Column name: the override when one is set, the field name otherwise.
    pub name: String,
    /// No default value: the column must exist.
    pub required: bool,
    pub nullable: bool,
    pub is_key: bool,
    pub shape: FieldShape,
    pub(crate) name_key: NameKey,
}

impl FieldDescriptor {
    pub fn is_relation(&self) -> bool {
        matches!(self.shape, FieldShape::Relation(_))
    }
}

/// Validated, session-cached description of an entity type.
#[derive(Debug, Clone)]
pub struct EntityType {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Configured or declared sheet name, if any.
    pub sheet_name: Option<String>,
    pub header_row: u32,
    pub fields: Vec<FieldDescriptor>,
    pub key: Option<usize>,
}

impl EntityType {
    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        self.key.map(|idx| &self.fields[idx])
    }

    /// Sheet used when the caller passes no override.
    pub fn default_sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or(self.type_name)
    }

    pub fn header_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Derives an [`EntityType`] from a declaration and optional configured overrides.
pub struct SchemaBuilder<'a> {
    overrides: Option<&'a EntityConfig>,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(overrides: Option<&'a EntityConfig>) -> Self {
        Self { overrides }
    }

    pub fn build(&self, type_id: TypeId, mut decl: EntityDecl) -> Result<EntityType, SchemaError> {
        let entity = decl.type_name;
        if decl.fields.is_empty() {
            return Err(SchemaError::SchemaMissing {
                entity: entity.to_string(),
            });
        }

        let mut sheet_name = decl
            .sheet_name
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let mut header_row = decl.header_row.unwrap_or(0);
        let mut column_overrides: Vec<Option<String>> = vec![None; decl.fields.len()];

        if let Some(cfg) = self.overrides {
            if let Some(name) = cfg.sheet_name.as_ref().filter(|s| !s.trim().is_empty()) {
                sheet_name = Some(name.clone());
            }
            if let Some(row) = cfg.header_row {
                header_row = row;
            }
            for (field, col) in &cfg.columns {
                let idx = decl
                    .fields
                    .iter()
                    .position(|f| f.name == field)
                    .ok_or_else(|| SchemaError::UnknownField {
                        entity: entity.to_string(),
                        field: field.clone(),
                    })?;
                if let Some(key) = col.key {
                    decl.fields[idx].key = key;
                }
                column_overrides[idx] = col.column_name.clone();
            }
        }

        let mut fields = Vec::with_capacity(decl.fields.len());
        for (decl_field, column_override) in decl.fields.iter().zip(column_overrides) {
            let shape = match &decl_field.kind {
                FieldKind::Scalar(kind) => FieldShape::Scalar(kind.codec()),
                FieldKind::Relation(target) => FieldShape::Relation(*target),
                FieldKind::Unsupported(type_name) => {
                    return Err(SchemaError::UnsupportedDataType {
                        entity: entity.to_string(),
                        field: decl_field.name.to_string(),
                        type_name: type_name.clone(),
                    });
                }
            };
            let name = column_override
                .or_else(|| decl_field.column.map(str::to_string))
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| decl_field.name.to_string());
            fields.push(FieldDescriptor {
                field: decl_field.name,
                name_key: NameKey::new(&name),
                name,
                required: !decl_field.has_default,
                nullable: decl_field.nullable,
                is_key: false,
                shape,
            });
        }

        let key = select_key(entity, &decl.fields, &fields)?;
        if let Some(idx) = key {
            let field = &mut fields[idx];
            if let FieldShape::Relation(target) = field.shape {
                return Err(SchemaError::UnsupportedDataType {
                    entity: entity.to_string(),
                    field: field.field.to_string(),
                    type_name: target.type_name.to_string(),
                });
            }
            field.is_key = true;
        }

        tracing::debug!(
            entity,
            fields = fields.len(),
            key = key.map(|k| fields[k].name.as_str()),
            header_row,
            "built entity schema"
        );

        Ok(EntityType {
            type_id,
            type_name: entity,
            sheet_name,
            header_row,
            fields,
            key,
        })
    }
}

/// Explicit key flags win; otherwise a field named `id`; otherwise no key.
fn select_key(
    entity: &str,
    decls: &[FieldDecl],
    fields: &[FieldDescriptor],
) -> Result<Option<usize>, SchemaError> {
    let pick = |candidates: Vec<usize>| -> Result<Option<usize>, SchemaError> {
        match candidates.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(SchemaError::MultipleKeyColumn {
                entity: entity.to_string(),
                fields: many.iter().map(|&i| fields[i].name.clone()).collect(),
            }),
        }
    };

    let flagged = (0..decls.len()).filter(|&i| decls[i].key).collect();
    if let Some(idx) = pick(flagged)? {
        return Ok(Some(idx));
    }
    pick((0..fields.len()).filter(|&i| fields[i].name == "id").collect())
}
