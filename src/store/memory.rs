use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};
use uuid::Uuid;

use super::{compare_values, matches_all, Filter, PlanReplacement, Query, Row, Store, Table};
use crate::errors::{LedgerError, Result};

/// In-process store keeping every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of rows currently in `table`
    pub fn len(&self, table: Table) -> usize {
        self.read()
            .map(|tables| tables.get(&table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        Table::ALL.iter().all(|t| self.len(*t) == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Table, Vec<Row>>>> {
        self.tables.read().map_err(|_| LedgerError::Store {
            message: "memory store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Table, Vec<Row>>>> {
        self.tables.write().map_err(|_| LedgerError::Store {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

fn with_id(mut row: Row) -> Row {
    let missing = row.get("id").map_or(true, Value::is_null);
    if missing {
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    row
}

fn merge(target: &mut Row, patch: &Row) {
    for (column, value) in patch {
        if column != "id" {
            target.insert(column.clone(), value.clone());
        }
    }
}

impl Store for MemoryStore {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>> {
        let tables = self.read()?;
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        trace!(%table, rows = rows.len(), "select");
        Ok(rows)
    }

    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>> {
        let rows: Vec<Row> = rows.into_iter().map(with_id).collect();
        let mut tables = self.write()?;
        tables.entry(table).or_default().extend(rows.iter().cloned());
        debug!(%table, rows = rows.len(), "insert");
        Ok(rows)
    }

    fn update(&self, table: Table, patch: &Row, filters: &[Filter]) -> Result<usize> {
        let mut tables = self.write()?;
        let mut updated = 0;
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| matches_all(filters, r)) {
                merge(row, patch);
                updated += 1;
            }
        }
        debug!(%table, updated, "update");
        Ok(updated)
    }

    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize> {
        let mut tables = self.write()?;
        let deleted = match tables.get_mut(&table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|r| !matches_all(filters, r));
                before - rows.len()
            }
            None => 0,
        };
        debug!(%table, deleted, "delete");
        Ok(deleted)
    }

    fn upsert(&self, table: Table, row: Row, conflict_keys: &[&str]) -> Result<Row> {
        if conflict_keys.is_empty() {
            return Err(LedgerError::Store {
                message: format!("upsert into {} needs at least one conflict key", table),
            });
        }

        let conflict: Vec<Filter> = conflict_keys
            .iter()
            .map(|key| Filter::eq(key, row.get(*key).cloned().unwrap_or(Value::Null)))
            .collect();

        let mut tables = self.write()?;
        let rows = tables.entry(table).or_default();

        if let Some(existing) = rows.iter_mut().find(|r| matches_all(&conflict, r)) {
            merge(existing, &row);
            debug!(%table, "upsert updated existing row");
            return Ok(existing.clone());
        }

        let row = with_id(row);
        rows.push(row.clone());
        debug!(%table, "upsert inserted row");
        Ok(row)
    }

    fn replace_installment_plan(&self, purchase_id: Uuid, plan: Vec<Row>) -> Result<PlanReplacement> {
        let owner = Filter::eq("purchase_id", purchase_id);
        if let Some(stray) = plan.iter().find(|r| !owner.matches(r)) {
            return Err(LedgerError::Store {
                message: format!(
                    "installment {} does not belong to purchase {}",
                    stray.get("id").cloned().unwrap_or(Value::Null),
                    purchase_id
                ),
            });
        }

        let inserted: Vec<Row> = plan.into_iter().map(with_id).collect();

        let mut tables = self.write()?;
        let installments = tables.entry(Table::Installments).or_default();
        let mut replaced: Vec<Row> = installments
            .iter()
            .filter(|r| !owner.matches(r))
            .cloned()
            .collect();
        let removed = installments.len() - replaced.len();
        replaced.extend(inserted.iter().cloned());
        *installments = replaced;

        debug!(%purchase_id, removed, inserted = inserted.len(), "installment plan replaced");
        Ok(PlanReplacement { removed, inserted })
    }
}
