//! Entity types and in-memory fixtures shared by the integration tests.
#![allow(dead_code)]

use sheetdb::{CellData, CellValue, Entity, JsonAdapter, SpreadsheetWriter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Entity)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[sheet(name = "User")]
pub struct UserWithDefault {
    pub id: i64,
    #[sheet(default)]
    pub name: String,
    #[sheet(default = "default_age")]
    pub age: i32,
}

pub fn default_age() -> i32 {
    18
}

#[derive(Debug, Clone, PartialEq, Entity)]
pub struct CarFactory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Entity)]
pub struct Car {
    #[sheet(key)]
    pub plate: String,
    #[sheet(column = "Gyártási év")]
    pub year: i32,
    pub factory: Option<Arc<CarFactory>>,
}

pub const USERS: &[&[&str]] = &[
    &["id", "name", "email"],
    &["1", "Alice", "alice@example.com"],
    &["2", "Bob", ""],
    &["3", "  Carol  ", " "],
];

pub const FACTORIES: &[&[&str]] = &[
    &["id", "name"],
    &["VW", "Volkswagen"],
    &["TS", "Tesla"],
];

pub const CARS: &[&[&str]] = &[
    &["plate", "GYÁRTÁSI ÉV", "Factory"],
    &["ABC-123", "2019", "VW"],
    &["XYZ-999", "2021.0", "TS"],
    &["KKK-001", "2020", "VW"],
    &["NOF-000", "2018", ""],
];

/// Write rows of text into `sheet`, starting at A1. Text that parses as a
/// number is stored as a number; empty strings leave the cell empty.
pub fn fill(store: &mut JsonAdapter, sheet: &str, rows: &[&[&str]]) {
    store.create_sheet(sheet).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let value = match text.parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(text.to_string()),
            };
            store
                .write_cell(sheet, r as u32, c as u32, CellData::from_value(value))
                .unwrap();
        }
    }
}

pub fn store_with(sheets: &[(&str, &[&[&str]])]) -> JsonAdapter {
    let mut store = JsonAdapter::new();
    for (name, rows) in sheets {
        fill(&mut store, name, rows);
    }
    store
}

pub fn car_store() -> JsonAdapter {
    store_with(&[("CarFactory", FACTORIES), ("Car", CARS)])
}
