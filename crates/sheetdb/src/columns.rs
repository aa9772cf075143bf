//! Header matching: which sheet column feeds which entity field.

use crate::error::MatchError;
use crate::normalize::NameKey;
use crate::schema::EntityType;
use sheetdb_common::column_letter;
use sheetdb_workbook::CellData;
use std::collections::BTreeMap;

/// Resolved column per field, by field index. `None` for an optional field
/// whose header is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<Option<u32>>,
}

impl ColumnMapping {
    /// Match every field against the header row's non-blank cells.
    pub fn resolve(
        entity: &EntityType,
        sheet: &str,
        header: &BTreeMap<u32, CellData>,
    ) -> Result<Self, MatchError> {
        let headers: Vec<(u32, String, NameKey)> = header
            .iter()
            .filter_map(|(&col, cell)| {
                let text = cell.value.as_text()?;
                if text.trim().is_empty() {
                    return None;
                }
                let key = NameKey::new(&text);
                Some((col, text, key))
            })
            .collect();

        let mut columns = Vec::with_capacity(entity.fields.len());
        for field in &entity.fields {
            let hits: Vec<&(u32, String, NameKey)> = headers
                .iter()
                .filter(|(_, _, key)| field.name_key.matches(key))
                .collect();
            match hits.as_slice() {
                [] if field.required => {
                    return Err(MatchError::ColumnNotFound {
                        sheet: sheet.to_string(),
                        field: field.name.clone(),
                    });
                }
                [] => columns.push(None),
                [(col, _, _)] => columns.push(Some(*col)),
                many => {
                    return Err(MatchError::NonUniqueColumn {
                        sheet: sheet.to_string(),
                        field: field.name.clone(),
                        headers: many
                            .iter()
                            .map(|(col, text, _)| {
                                format!("{}{} -> {}", column_letter(*col), entity.header_row + 1, text)
                            })
                            .collect(),
                    });
                }
            }
        }

        tracing::debug!(
            entity = entity.type_name,
            sheet,
            mapped = columns.iter().flatten().count(),
            "resolved header columns"
        );
        Ok(Self { columns })
    }

    pub fn column(&self, field: usize) -> Option<u32> {
        self.columns.get(field).copied().flatten()
    }

    /// Column whose blankness ends the data region: the key column when the
    /// entity has one, the first column otherwise.
    pub fn presence_column(&self, entity: &EntityType) -> u32 {
        entity.key.and_then(|k| self.column(k)).unwrap_or(0)
    }
}
