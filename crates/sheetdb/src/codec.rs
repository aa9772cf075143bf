//! Row codec: coercion of raw cells into declared scalar kinds, and the
//! reader/writer handles that generated `Entity` impls drive.

use crate::cache::Registry;
use crate::columns::ColumnMapping;
use crate::error::{CellLocation, Error, Result, RowError, SchemaError};
use crate::schema::{Entity, EntityType, FieldKind, FieldShape, RelationTarget, ScalarKind};
use crate::store::SheetStore;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sheetdb_common::{CellStyle, CellValue, serial_to_datetime};
use sheetdb_workbook::CellData;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y.%m.%d"];
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Raw cell holds a value kind the target kind cannot be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mismatch;

type Coerce = fn(&CellValue) -> Result<Option<CellValue>, Mismatch>;

/// Fixed decode rule and presentation style for one scalar kind, resolved
/// when the schema is built.
#[derive(Clone, Copy)]
pub struct ScalarCodec {
    pub kind: ScalarKind,
    pub style: Option<CellStyle>,
    coerce: Coerce,
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec")
            .field("kind", &self.kind)
            .field("style", &self.style)
            .finish()
    }
}

impl ScalarCodec {
    /// Canonical value for the kind, `None` for a null cell.
    pub(crate) fn coerce(&self, raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
        (self.coerce)(raw)
    }

    /// Whether `raw` decodes to null under this kind. Whitespace is a value
    /// for text and null for everything else.
    pub(crate) fn is_null(&self, raw: Option<&CellValue>) -> bool {
        match raw {
            None | Some(CellValue::Empty) => true,
            Some(v) => self.kind != ScalarKind::Text && v.is_blank(),
        }
    }
}

impl ScalarKind {
    pub fn style(self) -> Option<CellStyle> {
        match self {
            ScalarKind::Date => Some(CellStyle::Date),
            ScalarKind::DateTime | ScalarKind::Timestamp => Some(CellStyle::DateTime),
            ScalarKind::Time => Some(CellStyle::Time),
            _ => None,
        }
    }

    pub(crate) fn codec(self) -> ScalarCodec {
        let coerce: Coerce = match self {
            ScalarKind::Boolean => coerce_bool,
            ScalarKind::Integer => coerce_int,
            ScalarKind::Float => coerce_float,
            ScalarKind::Text => coerce_text,
            ScalarKind::Date => coerce_date,
            ScalarKind::DateTime | ScalarKind::Timestamp => coerce_date_time,
            ScalarKind::Time => coerce_time,
        };
        ScalarCodec {
            kind: self,
            style: self.style(),
            coerce,
        }
    }
}

/* ─────────────────────────── coercion table ─────────────────────────── */

fn coerce_bool(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(Some(CellValue::Boolean(match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::Boolean(b) => *b,
        CellValue::Int(i) => *i != 0,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(Mismatch),
        },
        _ => return Err(Mismatch),
    })))
}

fn parse_number(s: &str) -> Result<f64, Mismatch> {
    s.trim().parse::<f64>().map_err(|_| Mismatch)
}

/// Integers go through their numeric value and are truncated.
fn coerce_int(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    let n = match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::Int(i) => return Ok(Some(CellValue::Int(*i))),
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_number(s)?,
        _ => return Err(Mismatch),
    };
    if !n.is_finite() || n.abs() >= i64::MAX as f64 {
        return Err(Mismatch);
    }
    Ok(Some(CellValue::Int(n.trunc() as i64)))
}

fn coerce_float(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(Some(CellValue::Number(match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::Int(i) => *i as f64,
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_number(s)?,
        _ => return Err(Mismatch),
    })))
}

fn coerce_text(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(match raw {
        CellValue::Empty => None,
        CellValue::Text(s) => Some(CellValue::Text(s.trim().to_string())),
        other => other.as_text().map(CellValue::Text),
    })
}

fn parse_with<T>(
    s: &str,
    formats: &[&str],
    parse: impl Fn(&str, &str) -> chrono::ParseResult<T>,
) -> Result<T, Mismatch> {
    let s = s.trim();
    formats
        .iter()
        .find_map(|fmt| parse(s, fmt).ok())
        .ok_or(Mismatch)
}

fn from_serial(serial: f64) -> Result<NaiveDateTime, Mismatch> {
    serial_to_datetime(serial).ok_or(Mismatch)
}

fn coerce_date(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(Some(CellValue::Date(match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::Date(d) => *d,
        CellValue::DateTime(dt) => dt.date(),
        CellValue::Int(i) => from_serial(*i as f64)?.date(),
        CellValue::Number(n) => from_serial(*n)?.date(),
        CellValue::Text(s) => parse_with(s, &DATE_FORMATS, NaiveDate::parse_from_str)?,
        _ => return Err(Mismatch),
    })))
}

fn coerce_date_time(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(Some(CellValue::DateTime(match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::DateTime(dt) => *dt,
        CellValue::Date(d) => d.and_time(NaiveTime::MIN),
        CellValue::Int(i) => from_serial(*i as f64)?,
        CellValue::Number(n) => from_serial(*n)?,
        CellValue::Text(s) => parse_with(s, &DATE_TIME_FORMATS, NaiveDateTime::parse_from_str)
            .or_else(|_| {
                parse_with(s, &DATE_FORMATS, NaiveDate::parse_from_str)
                    .map(|d| d.and_time(NaiveTime::MIN))
            })?,
        _ => return Err(Mismatch),
    })))
}

fn coerce_time(raw: &CellValue) -> Result<Option<CellValue>, Mismatch> {
    Ok(Some(CellValue::Time(match raw {
        v if v.is_blank() => return Ok(None),
        CellValue::Time(t) => *t,
        CellValue::DateTime(dt) => dt.time(),
        CellValue::Number(n) => from_serial(*n)?.time(),
        CellValue::Text(s) => parse_with(s, &TIME_FORMATS, NaiveTime::parse_from_str)?,
        _ => return Err(Mismatch),
    })))
}

/* ───────────────────────────── row reader ───────────────────────────── */

/// One sheet row being decoded into an entity.
pub struct RowReader<'a> {
    registry: &'a mut Registry,
    store: &'a dyn SheetStore,
    entity: &'a EntityType,
    mapping: &'a ColumnMapping,
    sheet: &'a str,
    row: u32,
    cells: BTreeMap<u32, CellData>,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(
        registry: &'a mut Registry,
        store: &'a dyn SheetStore,
        entity: &'a EntityType,
        mapping: &'a ColumnMapping,
        sheet: &'a str,
        row: u32,
        cells: BTreeMap<u32, CellData>,
    ) -> Self {
        Self {
            registry,
            store,
            entity,
            mapping,
            sheet,
            row,
            cells,
        }
    }

    pub fn sheet(&self) -> &str {
        self.sheet
    }

    /// Zero-based row index.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn entity(&self) -> &EntityType {
        self.entity
    }

    /// Decode a field that has no default. Null is an error unless `T` is nullable.
    pub fn required<T: FieldType>(&mut self, index: usize) -> Result<T> {
        match T::read(self, index)? {
            Some(value) => Ok(value),
            None => Err(RowError::NullValue(self.location(index)).into()),
        }
    }

    /// Decode a defaulted field. An unmapped column or a null cell yields `default()`.
    pub fn or_default<T: FieldType>(
        &mut self,
        index: usize,
        default: impl FnOnce() -> T,
    ) -> Result<T> {
        if self.is_null(index)? {
            return Ok(default());
        }
        Ok(T::read(self, index)?.unwrap_or_else(default))
    }

    /// Canonical scalar value of a field, `None` when the cell is null or
    /// the field has no column in this sheet.
    pub fn scalar(&self, index: usize) -> Result<Option<CellValue>> {
        let codec = match self.descriptor(index)?.shape {
            FieldShape::Scalar(codec) => codec,
            FieldShape::Relation(target) => {
                return Err(self.shape_error(index, target.type_name));
            }
        };
        let Some(raw) = self.raw(index) else {
            return Ok(None);
        };
        codec.coerce(raw).map_err(|_| {
            RowError::UnsupportedCellType {
                location: self.location(index),
                found: raw.type_name().to_string(),
                expected: codec.kind.to_string(),
            }
            .into()
        })
    }

    /// [`Self::scalar`] followed by a conversion to the Rust type.
    pub fn scalar_as<T>(
        &self,
        index: usize,
        expected: &str,
        convert: impl FnOnce(CellValue) -> Option<T>,
    ) -> Result<Option<T>> {
        let Some(value) = self.scalar(index)? else {
            return Ok(None);
        };
        let found = value.type_name();
        convert(value).map(Some).ok_or_else(|| {
            RowError::UnsupportedCellType {
                location: self.location(index),
                found: found.to_string(),
                expected: expected.to_string(),
            }
            .into()
        })
    }

    /// Resolve a relationship field through the referenced type's key index.
    pub fn relation<E: Entity>(&mut self, index: usize) -> Result<Option<Arc<E>>> {
        if let FieldShape::Scalar(codec) = self.descriptor(index)?.shape {
            return Err(self.shape_error(index, &codec.kind.to_string()));
        }
        let Some(raw) = self.raw(index).filter(|v| !v.is_blank()).cloned() else {
            return Ok(None);
        };
        let location = self.location(index);
        self.registry
            .resolve::<E>(self.store, &raw, location)
            .map(Some)
    }

    /// Canonical key value of this row, if the entity has a key column.
    pub(crate) fn key_value(&self) -> Result<Option<CellValue>> {
        match self.entity.key {
            Some(idx) => self.scalar(idx),
            None => Ok(None),
        }
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        let raw = self.raw(index);
        Ok(match self.descriptor(index)?.shape {
            FieldShape::Scalar(codec) => codec.is_null(raw),
            FieldShape::Relation(_) => raw.is_none_or(CellValue::is_blank),
        })
    }

    fn raw(&self, index: usize) -> Option<&CellValue> {
        let col = self.mapping.column(index)?;
        self.cells
            .get(&col)
            .map(|cell| &cell.value)
            .filter(|v| **v != CellValue::Empty)
    }

    fn descriptor(&self, index: usize) -> Result<&crate::schema::FieldDescriptor> {
        self.entity
            .fields
            .get(index)
            .ok_or_else(|| Error::unknown_field(self.entity.type_name, index))
    }

    fn location(&self, index: usize) -> CellLocation {
        let field = self
            .entity
            .fields
            .get(index)
            .map(|f| f.name.as_str())
            .unwrap_or("?");
        CellLocation::new(self.sheet, self.row, self.mapping.column(index), field)
    }

    fn shape_error(&self, index: usize, type_name: &str) -> Error {
        SchemaError::UnsupportedDataType {
            entity: self.entity.type_name.to_string(),
            field: self
                .entity
                .fields
                .get(index)
                .map(|f| f.field.to_string())
                .unwrap_or_default(),
            type_name: type_name.to_string(),
        }
        .into()
    }
}

/* ───────────────────────────── field writer ──────────────────────────── */

/// Sink for one entity's field values during a write.
pub struct FieldWriter<'a> {
    registry: &'a mut Registry,
    store: &'a dyn SheetStore,
    writing: TypeId,
    entity: &'static str,
    field: &'static str,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn new(
        registry: &'a mut Registry,
        store: &'a dyn SheetStore,
        writing: TypeId,
        entity: &'static str,
    ) -> Self {
        Self {
            registry,
            store,
            writing,
            entity,
            field: "",
        }
    }

    /// Field the next encoded value belongs to, for error reports.
    pub(crate) fn set_field(&mut self, field: &'static str) {
        self.field = field;
    }

    /// A value the sheet cannot hold without losing it.
    pub fn out_of_range(&self, value: impl fmt::Display, kind: ScalarKind) -> Error {
        RowError::ValueOutOfRange {
            entity: self.entity.to_string(),
            field: self.field.to_string(),
            value: value.to_string(),
            expected: kind.to_string(),
        }
        .into()
    }

    pub fn scalar(&self, kind: ScalarKind, value: CellValue) -> CellData {
        CellData {
            value,
            formula: None,
            style: kind.style(),
        }
    }

    /// Emit the referenced entity's key and queue its type for a cascade write.
    pub fn relation<E: Entity>(&mut self, entity: &Arc<E>) -> Result<CellData> {
        self.registry
            .register(self.store, self.writing, Arc::clone(entity))
    }
}

/* ───────────────────────────── field types ───────────────────────────── */

/// A Rust type usable as an entity field.
pub trait FieldType: Sized {
    const NULLABLE: bool = false;

    fn kind() -> FieldKind;

    /// `Ok(None)` for a null cell.
    fn read(row: &mut RowReader<'_>, index: usize) -> Result<Option<Self>>;

    fn write(&self, out: &mut FieldWriter<'_>) -> Result<CellData>;
}

macro_rules! scalar_field {
    ($ty:ty, $kind:ident, |$v:ident| $read:expr, |$s:ident| $write:expr) => {
        impl FieldType for $ty {
            fn kind() -> FieldKind {
                FieldKind::Scalar(ScalarKind::$kind)
            }

            fn read(row: &mut RowReader<'_>, index: usize) -> Result<Option<Self>> {
                row.scalar_as(index, stringify!($ty), |$v| $read)
            }

            fn write(&self, out: &mut FieldWriter<'_>) -> Result<CellData> {
                let $s = self;
                Ok(out.scalar(ScalarKind::$kind, $write))
            }
        }
    };
}

/// Integers are stored as `Int`; values beyond `i64` cannot be and are refused.
macro_rules! integer_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            fn kind() -> FieldKind {
                FieldKind::Scalar(ScalarKind::Integer)
            }

            fn read(row: &mut RowReader<'_>, index: usize) -> Result<Option<Self>> {
                row.scalar_as(index, stringify!($ty), |v| match v {
                    CellValue::Int(i) => <$ty>::try_from(i).ok(),
                    _ => None,
                })
            }

            #[allow(unreachable_patterns)]
            fn write(&self, out: &mut FieldWriter<'_>) -> Result<CellData> {
                match i64::try_from(*self) {
                    Ok(i) => Ok(out.scalar(ScalarKind::Integer, CellValue::Int(i))),
                    Err(_) => Err(out.out_of_range(self, ScalarKind::Integer)),
                }
            }
        }
    )*};
}

integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

scalar_field!(
    bool,
    Boolean,
    |v| match v {
        CellValue::Boolean(b) => Some(b),
        _ => None,
    },
    |s| CellValue::Boolean(*s)
);

scalar_field!(
    f64,
    Float,
    |v| match v {
        CellValue::Number(n) => Some(n),
        _ => None,
    },
    |s| CellValue::Number(*s)
);

scalar_field!(
    f32,
    Float,
    |v| match v {
        CellValue::Number(n) => Some(n as f32),
        _ => None,
    },
    |s| CellValue::Number(f64::from(*s))
);

scalar_field!(
    String,
    Text,
    |v| match v {
        CellValue::Text(s) => Some(s),
        _ => None,
    },
    |s| CellValue::Text(s.clone())
);

scalar_field!(
    NaiveDate,
    Date,
    |v| match v {
        CellValue::Date(d) => Some(d),
        _ => None,
    },
    |s| CellValue::Date(*s)
);

scalar_field!(
    NaiveDateTime,
    DateTime,
    |v| match v {
        CellValue::DateTime(dt) => Some(dt),
        _ => None,
    },
    |s| CellValue::DateTime(*s)
);

scalar_field!(
    NaiveTime,
    Time,
    |v| match v {
        CellValue::Time(t) => Some(t),
        _ => None,
    },
    |s| CellValue::Time(*s)
);

scalar_field!(
    DateTime<Utc>,
    Timestamp,
    |v| match v {
        CellValue::DateTime(dt) => Some(DateTime::from_naive_utc_and_offset(dt, Utc)),
        _ => None,
    },
    |s| CellValue::DateTime(s.naive_utc())
);

impl<T: FieldType> FieldType for Option<T> {
    const NULLABLE: bool = true;

    fn kind() -> FieldKind {
        T::kind()
    }

    fn read(row: &mut RowReader<'_>, index: usize) -> Result<Option<Self>> {
        Ok(Some(T::read(row, index)?))
    }

    fn write(&self, out: &mut FieldWriter<'_>) -> Result<CellData> {
        match self {
            Some(value) => value.write(out),
            None => Ok(CellData::default()),
        }
    }
}

impl<E: Entity> FieldType for Arc<E> {
    fn kind() -> FieldKind {
        FieldKind::Relation(RelationTarget::of::<E>())
    }

    fn read(row: &mut RowReader<'_>, index: usize) -> Result<Option<Self>> {
        row.relation::<E>(index)
    }

    fn write(&self, out: &mut FieldWriter<'_>) -> Result<CellData> {
        out.relation(self)
    }
}
