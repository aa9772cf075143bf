use crate::columns::ColumnMapping;
use crate::error::{Result, RowError};
use crate::schema::{Entity, EntityType};
use crate::session::SheetDb;
use crate::store::row_present;
use sheetdb_workbook::SpreadsheetIO;
use std::marker::PhantomData;
use std::sync::Arc;

/// Lazy, row-by-row decoder over one sheet.
///
/// Rows are read from the store on demand and are not added to the entity
/// cache. Relationship fields still resolve through the session caches.
pub struct RowIterator<'s, T, S> {
    db: &'s mut SheetDb<S>,
    entity: Arc<EntityType>,
    mapping: Arc<ColumnMapping>,
    sheet: String,
    presence: u32,
    next_row: u32,
    failed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T: Entity, S: SpreadsheetIO> RowIterator<'s, T, S> {
    pub(crate) fn new(db: &'s mut SheetDb<S>, sheet: Option<&str>) -> Result<Self> {
        let entity = db.registry.schema::<T>()?;
        let sheet = db.registry.sheet_name(&entity, sheet);
        let mapping = db.registry.mapping(&db.store, &entity, &sheet)?;
        let presence = mapping.presence_column(&entity);
        Ok(Self {
            next_row: entity.header_row + 1,
            db,
            entity,
            mapping,
            sheet,
            presence,
            failed: false,
            _marker: PhantomData,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn has_next(&self) -> Result<bool> {
        if self.failed {
            return Ok(false);
        }
        row_present(&self.db.store, &self.sheet, self.next_row, self.presence)
    }

    /// Decode the next row. Past the last row this is [`RowError::Exhausted`].
    pub fn next_entity(&mut self) -> Result<T> {
        if !self.has_next()? {
            return Err(RowError::Exhausted {
                sheet: self.sheet.clone(),
            }
            .into());
        }
        let row = self.next_row;
        self.next_row += 1;
        let db = &mut *self.db;
        let (_, value) =
            db.registry
                .decode_row::<T>(&db.store, &self.entity, &self.mapping, &self.sheet, row)?;
        Ok(value)
    }
}

/// Yields `Err` once for a row that fails to decode, then ends.
impl<T: Entity, S: SpreadsheetIO> Iterator for RowIterator<'_, T, S> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.has_next() {
            Ok(false) => return None,
            Ok(true) => self.next_entity(),
            Err(err) => Err(err),
        };
        self.failed = item.is_err();
        Some(item)
    }
}
