//! Session-owned caches: schemas, sheet names, header mappings and loaded
//! entities, plus the queue of related types awaiting a cascade write.

use crate::codec::{FieldWriter, RowReader};
use crate::columns::ColumnMapping;
use crate::config::SessionConfig;
use crate::error::{CellLocation, Error, Result, RowError, SheetError};
use crate::schema::{Entity, EntityType, FieldShape, SchemaBuilder};
use crate::store::{SheetStore, row_present};
use rustc_hash::{FxHashMap, FxHashSet};
use sheetdb_common::CellValue;
use sheetdb_workbook::CellData;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::{debug, trace};

/// Shared, immutable snapshot of a sheet's entities in row order.
pub type EntityList<T> = Arc<Vec<Arc<T>>>;

type SheetKey = (TypeId, String);
type WriteFn = fn(&mut Registry, &mut dyn SheetStore) -> Result<()>;

struct TypedCache<T> {
    list: EntityList<T>,
    /// First entity per key value.
    index: FxHashMap<CellValue, Arc<T>>,
}

impl<T> TypedCache<T> {
    fn new(entries: Vec<(Option<CellValue>, Arc<T>)>) -> Self {
        let mut index = FxHashMap::default();
        let mut list = Vec::with_capacity(entries.len());
        for (key, entity) in entries {
            if let Some(key) = key {
                index.entry(key).or_insert_with(|| Arc::clone(&entity));
            }
            list.push(entity);
        }
        Self {
            list: Arc::new(list),
            index,
        }
    }
}

/// A related type whose cached entities must be written after the current sheet.
#[derive(Clone, Copy)]
struct PendingWrite {
    type_id: TypeId,
    type_name: &'static str,
    write: WriteFn,
}

pub(crate) struct Registry {
    config: SessionConfig,
    schemas: FxHashMap<TypeId, Arc<EntityType>>,
    sheet_names: FxHashMap<(TypeId, Option<String>), String>,
    mappings: FxHashMap<SheetKey, Arc<ColumnMapping>>,
    caches: FxHashMap<SheetKey, Box<dyn Any + Send + Sync>>,
    pending: Vec<PendingWrite>,
    loading: FxHashSet<SheetKey>,
}

impl Registry {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            config,
            schemas: FxHashMap::default(),
            sheet_names: FxHashMap::default(),
            mappings: FxHashMap::default(),
            caches: FxHashMap::default(),
            pending: Vec::new(),
            loading: FxHashSet::default(),
        }
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn schema<T: Entity>(&mut self) -> Result<Arc<EntityType>> {
        let type_id = TypeId::of::<T>();
        if let Some(schema) = self.schemas.get(&type_id) {
            return Ok(Arc::clone(schema));
        }
        let decl = T::describe();
        let schema =
            Arc::new(SchemaBuilder::new(self.config.entity(decl.type_name)).build(type_id, decl)?);
        self.schemas.insert(type_id, Arc::clone(&schema));
        Ok(schema)
    }

    /// The caller's override when given, the entity's default sheet otherwise.
    pub(crate) fn sheet_name(&mut self, entity: &EntityType, sheet: Option<&str>) -> String {
        self.sheet_names
            .entry((entity.type_id, sheet.map(str::to_string)))
            .or_insert_with(|| sheet.unwrap_or_else(|| entity.default_sheet_name()).to_string())
            .clone()
    }

    pub(crate) fn mapping(
        &mut self,
        store: &dyn SheetStore,
        entity: &EntityType,
        sheet: &str,
    ) -> Result<Arc<ColumnMapping>> {
        let key = (entity.type_id, sheet.to_string());
        if let Some(mapping) = self.mappings.get(&key) {
            return Ok(Arc::clone(mapping));
        }
        if !store.has_sheet(sheet)? {
            return Err(SheetError::SheetNotFound(sheet.to_string()).into());
        }
        let header = store
            .read_row(sheet, entity.header_row)?
            .ok_or_else(|| RowError::RowNotFound {
                sheet: sheet.to_string(),
                row: entity.header_row + 1,
            })?;
        let mapping = Arc::new(ColumnMapping::resolve(entity, sheet, &header)?);
        self.mappings.insert(key, Arc::clone(&mapping));
        Ok(mapping)
    }

    fn cache<T: Entity>(&self, sheet: &str) -> Option<&TypedCache<T>> {
        self.caches
            .get(&(TypeId::of::<T>(), sheet.to_string()))?
            .downcast_ref()
    }

    fn cache_mut<T: Entity>(&mut self, sheet: &str) -> Option<&mut TypedCache<T>> {
        self.caches
            .get_mut(&(TypeId::of::<T>(), sheet.to_string()))?
            .downcast_mut()
    }

    /// Every entity of the sheet, read once per session and then served from cache.
    pub(crate) fn load_all<T: Entity>(
        &mut self,
        store: &dyn SheetStore,
        sheet: &str,
    ) -> Result<EntityList<T>> {
        if let Some(cache) = self.cache::<T>(sheet) {
            return Ok(Arc::clone(&cache.list));
        }
        let entity = self.schema::<T>()?;
        let key = (entity.type_id, sheet.to_string());
        if !self.loading.insert(key.clone()) {
            return Err(Error::CyclicLoad {
                entity: entity.type_name.to_string(),
                sheet: sheet.to_string(),
            });
        }
        let rows = self.read_rows::<T>(store, &entity, sheet);
        self.loading.remove(&key);
        let rows = rows?;

        debug!(entity = entity.type_name, sheet, rows = rows.len(), "loaded sheet");
        let cache = TypedCache::new(rows);
        let list = Arc::clone(&cache.list);
        self.caches.insert(key, Box::new(cache));
        Ok(list)
    }

    fn read_rows<T: Entity>(
        &mut self,
        store: &dyn SheetStore,
        entity: &EntityType,
        sheet: &str,
    ) -> Result<Vec<(Option<CellValue>, Arc<T>)>> {
        let mapping = self.mapping(store, entity, sheet)?;
        let presence = mapping.presence_column(entity);
        let mut out = Vec::new();
        let mut row = entity.header_row + 1;
        while row_present(store, sheet, row, presence)? {
            let (key, value) = self.decode_row::<T>(store, entity, &mapping, sheet, row)?;
            out.push((key, Arc::new(value)));
            row += 1;
        }
        Ok(out)
    }

    /// Decode one data row, returning its canonical key alongside the entity.
    pub(crate) fn decode_row<T: Entity>(
        &mut self,
        store: &dyn SheetStore,
        entity: &EntityType,
        mapping: &ColumnMapping,
        sheet: &str,
        row: u32,
    ) -> Result<(Option<CellValue>, T)> {
        let cells = store
            .read_row(sheet, row)?
            .ok_or_else(|| RowError::RowNotFound {
                sheet: sheet.to_string(),
                row: row + 1,
            })?;
        trace!(entity = entity.type_name, sheet, row, "decoding row");
        let mut reader = RowReader::new(self, store, entity, mapping, sheet, row, cells);
        let key = reader.key_value()?;
        let value = T::decode(&mut reader)?;
        Ok((key, value))
    }

    /// Look up the `E` whose key equals the referencing cell, loading `E`'s
    /// sheet on first use.
    pub(crate) fn resolve<E: Entity>(
        &mut self,
        store: &dyn SheetStore,
        raw: &CellValue,
        location: CellLocation,
    ) -> Result<Arc<E>> {
        let target = self.schema::<E>()?;
        let codec = match target.key_field().map(|f| f.shape) {
            Some(FieldShape::Scalar(codec)) => codec,
            _ => {
                return Err(RowError::NoKeyField {
                    entity: target.type_name.to_string(),
                }
                .into());
            }
        };
        let key = match codec.coerce(raw) {
            Ok(Some(key)) => key,
            Ok(None) => {
                return Err(RowError::KeyNotFound {
                    entity: target.type_name.to_string(),
                    key: raw.to_string(),
                    location,
                }
                .into());
            }
            Err(_) => {
                return Err(RowError::UnsupportedCellType {
                    location,
                    found: raw.type_name().to_string(),
                    expected: codec.kind.to_string(),
                }
                .into());
            }
        };

        let sheet = self.sheet_name(&target, None);
        self.load_all::<E>(store, &sheet)?;
        self.cache::<E>(&sheet)
            .and_then(|cache| cache.index.get(&key))
            .cloned()
            .ok_or_else(|| {
                RowError::KeyNotFound {
                    entity: target.type_name.to_string(),
                    key: key.to_string(),
                    location,
                }
                .into()
            })
    }

    /// Record a referenced entity while writing another type: add it to its
    /// type's cache when its key is new there and queue the type for writing.
    /// Returns the key cell to store in the referencing row.
    pub(crate) fn register<E: Entity>(
        &mut self,
        store: &dyn SheetStore,
        writing: TypeId,
        entity: Arc<E>,
    ) -> Result<CellData> {
        let target = self.schema::<E>()?;
        let Some(key_index) = target.key else {
            return Err(RowError::NoKeyField {
                entity: target.type_name.to_string(),
            }
            .into());
        };
        let mut out = FieldWriter::new(self, store, writing, target.type_name);
        out.set_field(target.fields[key_index].field);
        let cell = entity.encode_field(key_index, &mut out)?;
        let key = index_key(&target, &cell.value);

        let sheet = self.sheet_name(&target, None);
        if self.cache::<E>(&sheet).is_none() {
            if store.has_sheet(&sheet)? {
                self.load_all::<E>(store, &sheet)?;
            } else {
                self.caches.insert(
                    (target.type_id, sheet.clone()),
                    Box::new(TypedCache::<E>::new(Vec::new())),
                );
            }
        }
        if let (Some(key), Some(cache)) = (key, self.cache_mut::<E>(&sheet)) {
            if !cache.index.contains_key(&key) {
                trace!(entity = target.type_name, %key, "registering related entity");
                cache.index.insert(key, Arc::clone(&entity));
                Arc::make_mut(&mut cache.list).push(entity);
            }
        }

        if target.type_id != writing && self.pending.iter().all(|p| p.type_id != target.type_id) {
            self.pending.push(PendingWrite {
                type_id: target.type_id,
                type_name: target.type_name,
                write: write_cached::<E>,
            });
        }
        Ok(cell)
    }

    /// Replace `sheet` with a header row and one row per entity, then make
    /// the written list the cached state of that sheet.
    pub(crate) fn write_entities<T: Entity>(
        &mut self,
        store: &mut dyn SheetStore,
        entities: &[Arc<T>],
        sheet: &str,
    ) -> Result<()> {
        let entity = self.schema::<T>()?;
        let width = entity.fields.len();
        let mut rows = Vec::with_capacity(entities.len());
        {
            let mut out = FieldWriter::new(self, &*store, entity.type_id, entity.type_name);
            for item in entities {
                let mut cells = Vec::with_capacity(width);
                for (i, field) in entity.fields.iter().enumerate() {
                    out.set_field(field.field);
                    cells.push(item.encode_field(i, &mut out)?);
                }
                rows.push(cells);
            }
        }

        store.delete_sheet(sheet)?;
        store.create_sheet(sheet)?;
        let header = entity
            .fields
            .iter()
            .map(|f| CellData::from_value(f.name.as_str()))
            .collect();
        store.write_row(sheet, entity.header_row, header)?;

        let mut entries = Vec::with_capacity(entities.len());
        for (offset, (item, cells)) in entities.iter().zip(rows).enumerate() {
            let key = entity.key.and_then(|k| index_key(&entity, &cells[k].value));
            store.write_row(sheet, entity.header_row + 1 + offset as u32, cells)?;
            entries.push((key, Arc::clone(item)));
        }

        let key = (entity.type_id, sheet.to_string());
        self.mappings.remove(&key);
        self.caches.insert(key, Box::new(TypedCache::new(entries)));
        debug!(entity = entity.type_name, sheet, rows = entities.len(), "wrote sheet");
        Ok(())
    }

    /// Write `T`, then every related type reached while encoding, each at most once.
    pub(crate) fn write_all<T: Entity>(
        &mut self,
        store: &mut dyn SheetStore,
        entities: Vec<Arc<T>>,
        sheet: &str,
    ) -> Result<()> {
        self.pending.clear();
        let primary = TypeId::of::<T>();
        self.write_entities(store, &entities, sheet)?;

        let mut written = FxHashSet::default();
        written.insert(primary);
        while let Some(next) = self.take_pending(primary) {
            if !written.insert(next.type_id) {
                continue;
            }
            debug!(entity = next.type_name, "writing related entities");
            (next.write)(self, store)?;
        }
        self.pending.clear();
        Ok(())
    }

    fn take_pending(&mut self, excluding: TypeId) -> Option<PendingWrite> {
        let pos = self.pending.iter().position(|p| p.type_id != excluding)?;
        Some(self.pending.remove(pos))
    }

    /// Forget loaded entities and header mappings of one type, on every sheet.
    pub(crate) fn invalidate(&mut self, type_id: TypeId) {
        self.caches.retain(|(id, _), _| *id != type_id);
        self.mappings.retain(|(id, _), _| *id != type_id);
    }
}

/// Key-index form of a written key cell: the same coercion a loaded row gets.
fn index_key(entity: &EntityType, value: &CellValue) -> Option<CellValue> {
    match entity.key_field()?.shape {
        FieldShape::Scalar(codec) => codec
            .coerce(value)
            .ok()
            .flatten()
            .filter(|key| !key.is_blank()),
        FieldShape::Relation(_) => None,
    }
}

/// Cascade writer for a related type: its cached entities go to its default sheet.
fn write_cached<E: Entity>(registry: &mut Registry, store: &mut dyn SheetStore) -> Result<()> {
    let target = registry.schema::<E>()?;
    let sheet = registry.sheet_name(&target, None);
    let entities = registry
        .cache::<E>(&sheet)
        .map(|cache| cache.list.as_ref().clone())
        .unwrap_or_default();
    registry.write_entities::<E>(store, &entities, &sheet)
}
