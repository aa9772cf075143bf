//! Typed entities over spreadsheet sheets.
//!
//! An entity type maps onto one sheet: a header row names the columns, and
//! each following row is one record, up to the first row whose key column
//! (or first column) is blank. Header cells are matched to fields after
//! case, accent and punctuation folding. Fields referencing another entity
//! store that entity's key and resolve through a per-session cache.
//!
//! ```ignore
//! use sheetdb::{Entity, FileMode, SheetDb, UmyaAdapter};
//! use std::sync::Arc;
//!
//! #[derive(Entity)]
//! struct CarFactory {
//!     id: String,
//!     name: String,
//! }
//!
//! #[derive(Entity)]
//! struct Car {
//!     #[sheet(key)]
//!     plate: String,
//!     factory: Option<Arc<CarFactory>>,
//! }
//!
//! let mut db = SheetDb::<UmyaAdapter>::open("cars.xlsx", FileMode::Read)?;
//! for car in db.read_all::<Car>(None)?.iter() {
//!     println!("{} {:?}", car.plate, car.factory.as_ref().map(|f| &f.name));
//! }
//! ```

extern crate self as sheetdb;

mod cache;
pub mod codec;
pub mod columns;
pub mod config;
pub mod error;
pub mod iterator;
pub mod normalize;
pub mod schema;
pub mod session;
mod store;

pub use cache::EntityList;
pub use codec::{FieldType, FieldWriter, RowReader, ScalarCodec};
pub use columns::ColumnMapping;
pub use config::{ColumnConfig, EntityConfig, SessionConfig};
pub use error::{
    CellLocation, ConfigError, Error, MatchError, Result, RowError, SchemaError, SheetError,
};
pub use iterator::RowIterator;
pub use normalize::normalize_name;
pub use schema::{
    Entity, EntityDecl, EntityType, FieldDecl, FieldDescriptor, FieldKind, FieldShape,
    RelationTarget, ScalarKind, SchemaBuilder,
};
pub use session::SheetDb;

pub use sheetdb_macros::Entity;

pub use sheetdb_common::{CellStyle, CellValue};
#[cfg(feature = "umya")]
pub use sheetdb_workbook::UmyaAdapter;
pub use sheetdb_workbook::{
    CellData, FileMode, IoError, JsonAdapter, SpreadsheetIO, SpreadsheetReader, SpreadsheetWriter,
};
