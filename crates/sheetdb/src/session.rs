use crate::cache::{EntityList, Registry};
use crate::config::SessionConfig;
use crate::error::{Error, Result, SheetError};
use crate::iterator::RowIterator;
use crate::schema::{Entity, EntityType};
use crate::store::SheetStore;
use sheetdb_workbook::{FileMode, SaveDestination, SpreadsheetIO, SpreadsheetWriter};
use std::any::{TypeId, type_name};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// An entity session over one workbook store.
///
/// Owns the store and every cache derived from it: entity schemas, header
/// mappings and the entities already read or written. Entities returned by
/// [`SheetDb::read_all`] are shared, so a relationship resolved twice yields
/// the same `Arc`.
pub struct SheetDb<S> {
    pub(crate) store: S,
    pub(crate) registry: Registry,
}

impl<S: SpreadsheetIO> SheetDb<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            registry: Registry::new(config),
        }
    }

    /// Open a file-backed store according to `mode`.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<Self> {
        Self::open_with_config(path, mode, SessionConfig::default())
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        mode: FileMode,
        config: SessionConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let store = logged("open", mode.open::<S>(path).map_err(Error::store))?;
        Ok(Self::with_config(store, config))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Raw store access. Cached entities are not refreshed by changes made
    /// here; call [`SheetDb::invalidate`] for the affected types.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &SessionConfig {
        self.registry.config()
    }

    pub fn schema<T: Entity>(&mut self) -> Result<Arc<EntityType>> {
        logged("schema", self.registry.schema::<T>())
    }

    /// Sheet `T` is read from and written to for the given override.
    pub fn sheet_name<T: Entity>(&mut self, sheet: Option<&str>) -> Result<String> {
        let entity = self.schema::<T>()?;
        Ok(self.registry.sheet_name(&entity, sheet))
    }

    /// All entities of `T`'s sheet (or `sheet`), loaded once and then cached.
    pub fn read_all<T: Entity>(&mut self, sheet: Option<&str>) -> Result<EntityList<T>> {
        let _span = info_span!("read_all", entity = type_name::<T>(), sheet).entered();
        logged("read_all", self.load::<T>(sheet))
    }

    fn load<T: Entity>(&mut self, sheet: Option<&str>) -> Result<EntityList<T>> {
        let entity = self.registry.schema::<T>()?;
        let sheet = self.registry.sheet_name(&entity, sheet);
        self.registry.load_all::<T>(&self.store, &sheet)
    }

    /// Decode rows one at a time without caching them.
    pub fn read_iter<T: Entity>(&mut self, sheet: Option<&str>) -> Result<RowIterator<'_, T, S>> {
        match RowIterator::new(self, sheet) {
            Ok(iter) => Ok(iter),
            Err(err) => {
                warn!(op = "read_iter", error = %err, "sheetdb operation failed");
                Err(err)
            }
        }
    }

    /// Replace the sheet's rows with `entities`, then write every related
    /// entity type reached through relationship fields.
    ///
    /// With `clear_cache`, entities of `T` cached by earlier reads are
    /// dropped first, so related types are matched against the written list only.
    pub fn write_all<T: Entity>(
        &mut self,
        entities: impl IntoIterator<Item = Arc<T>>,
        sheet: Option<&str>,
        clear_cache: bool,
    ) -> Result<()> {
        let _span =
            info_span!("write_all", entity = type_name::<T>(), sheet, clear_cache).entered();
        let entities: Vec<Arc<T>> = entities.into_iter().collect();
        logged("write_all", self.store_entities(entities, sheet, clear_cache))
    }

    fn store_entities<T: Entity>(
        &mut self,
        entities: Vec<Arc<T>>,
        sheet: Option<&str>,
        clear_cache: bool,
    ) -> Result<()> {
        if clear_cache {
            self.registry.invalidate(TypeId::of::<T>());
        }
        let entity = self.registry.schema::<T>()?;
        let sheet = self.registry.sheet_name(&entity, sheet);
        self.registry.write_all(&mut self.store, entities, &sheet)
    }

    /// Drop `T`'s cached entities and read its sheet again.
    pub fn reload<T: Entity>(&mut self, sheet: Option<&str>) -> Result<EntityList<T>> {
        self.invalidate::<T>();
        self.read_all(sheet)
    }

    pub fn invalidate<T: Entity>(&mut self) {
        self.registry.invalidate(TypeId::of::<T>());
    }

    /// Write the workbook back to the path it was opened from.
    pub fn save(&mut self) -> Result<()> {
        logged("save", self.save_into(SaveDestination::InPlace).map(|_| ()))
    }

    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        logged("save_as", self.save_into(SaveDestination::Path(path)).map(|_| ()))
    }

    pub fn save_to_writer(&mut self, writer: &mut dyn Write) -> Result<()> {
        logged("save_to_writer", self.save_into(SaveDestination::Writer(writer)).map(|_| ()))
    }

    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        logged(
            "save_to_bytes",
            self.save_into(SaveDestination::Bytes)
                .map(Option::unwrap_or_default),
        )
    }

    /// A workbook without sheets is not a valid file; refuse it.
    fn save_into(&mut self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>> {
        let sheets = self.store.sheet_count()?;
        if sheets == 0 {
            return Err(SheetError::NoData.into());
        }
        debug!(sheets, "saving workbook");
        SpreadsheetWriter::save_to(&mut self.store, dest).map_err(Error::store)
    }
}

fn logged<R>(op: &'static str, result: Result<R>) -> Result<R> {
    if let Err(err) = &result {
        warn!(op, error = %err, "sheetdb operation failed");
    }
    result
}
