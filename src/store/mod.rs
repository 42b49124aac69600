//! # Store
//!
//! The persistent store the ledger reads and writes. Every logical table
//! holds JSON-object rows; typed records go through [`Record`] and the
//! [`StoreExt`] helpers. Backends implement [`Store`].

pub mod memory;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

pub use memory::MemoryStore;

/// a stored row
pub type Row = serde_json::Map<String, Value>;

/// logical tables of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Cards,
    Purchases,
    Installments,
    PaidStatements,
    RecurringPurchases,
    ExpenseTypes,
    RecurringMaterializations,
    Budgets,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Cards,
        Table::Purchases,
        Table::Installments,
        Table::PaidStatements,
        Table::RecurringPurchases,
        Table::ExpenseTypes,
        Table::RecurringMaterializations,
        Table::Budgets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Cards => "cards",
            Table::Purchases => "purchases",
            Table::Installments => "installments",
            Table::PaidStatements => "paid_statements",
            Table::RecurringPurchases => "recurring_purchases",
            Table::ExpenseTypes => "expense_types",
            Table::RecurringMaterializations => "recurring_materializations",
            Table::Budgets => "budgets",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// predicate applied to one column
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Gte(Value),
    Lte(Value),
    NotNull,
    IsNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub condition: Condition,
}

impl Filter {
    pub fn eq<T: Serialize>(column: &str, value: T) -> Self {
        Self::new(column, Condition::Eq(value_of(value)))
    }

    pub fn gte<T: Serialize>(column: &str, value: T) -> Self {
        Self::new(column, Condition::Gte(value_of(value)))
    }

    pub fn lte<T: Serialize>(column: &str, value: T) -> Self {
        Self::new(column, Condition::Lte(value_of(value)))
    }

    pub fn not_null(column: &str) -> Self {
        Self::new(column, Condition::NotNull)
    }

    pub fn is_null(column: &str) -> Self {
        Self::new(column, Condition::IsNull)
    }

    fn new(column: &str, condition: Condition) -> Self {
        Self {
            column: column.to_string(),
            condition,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let value = row.get(&self.column).unwrap_or(&Value::Null);
        match &self.condition {
            // text matches exactly; only numbers compare by value
            Condition::Eq(expected) => match (value, expected) {
                (Value::Number(_), Value::Number(_)) => compare_values(value, expected) == Some(Ordering::Equal),
                _ => value == expected,
            },
            Condition::Gte(bound) => matches!(
                compare_values(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lte(bound) => matches!(
                compare_values(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::NotNull => !value.is_null(),
            Condition::IsNull => value.is_null(),
        }
    }
}

/// single-key ordering
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// conjunction of filters plus optional ordering and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq<T: Serialize>(self, column: &str, value: T) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn gte<T: Serialize>(self, column: &str, value: T) -> Self {
        self.filter(Filter::gte(column, value))
    }

    pub fn lte<T: Serialize>(self, column: &str, value: T) -> Self {
        self.filter(Filter::lte(column, value))
    }

    pub fn not_null(self, column: &str) -> Self {
        self.filter(Filter::not_null(column))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::is_null(column))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        matches_all(&self.filters, row)
    }
}

pub fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Order two stored values. Numbers compare numerically, strings holding
/// decimal amounts compare as decimals, other strings (ISO dates, ids)
/// lexicographically. Mixed or null values are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (Decimal::from_str(x), Decimal::from_str(y)) {
            (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// plain scalars (ids, dates, amounts, strings) always serialize
fn value_of<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Persistent store collaborator. Filters passed to `update` and `delete`
/// are conjunctions; an empty slice matches every row.
pub trait Store: Send + Sync {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>>;

    /// insert rows, assigning an `id` to rows without one
    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// merge `patch` into every matching row, returns the number updated
    fn update(&self, table: Table, patch: &Row, filters: &[Filter]) -> Result<usize>;

    /// returns the number of rows deleted
    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize>;

    /// Insert `row`, or merge it into the existing row whose `conflict_keys`
    /// columns all equal the new row's. The existing row keeps its id.
    fn upsert(&self, table: Table, row: Row, conflict_keys: &[&str]) -> Result<Row>;

    /// Atomically replace every installment of `purchase_id` with `plan`.
    fn replace_installment_plan(&self, purchase_id: Uuid, plan: Vec<Row>) -> Result<PlanReplacement>;
}

/// outcome of an installment plan replacement
#[derive(Debug, Clone, PartialEq)]
pub struct PlanReplacement {
    pub removed: usize,
    pub inserted: Vec<Row>,
}

/// typed row stored in a table
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn id(&self) -> Uuid;
}

pub fn to_row<T: Serialize>(record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(LedgerError::Store {
            message: format!("record did not serialize to an object: {}", other),
        }),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// typed helpers over any store
pub trait StoreExt: Store {
    fn fetch<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        self.select(R::TABLE, query)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    fn fetch_by_id<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
        let query = Query::new().eq("id", id).limit(1);
        Ok(self.fetch::<R>(&query)?.into_iter().next())
    }

    fn insert_record<R: Record>(&self, record: &R) -> Result<R> {
        let inserted = self.insert(R::TABLE, vec![to_row(record)?])?;
        let row = inserted.into_iter().next().ok_or_else(|| LedgerError::Store {
            message: format!("insert into {} returned no rows", R::TABLE),
        })?;
        from_row(row)
    }

    fn insert_records<R: Record>(&self, records: &[R]) -> Result<Vec<R>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let rows = records.iter().map(to_row).collect::<Result<Vec<_>>>()?;
        self.insert(R::TABLE, rows)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// write every column of `record` to the row with the same id
    fn update_record<R: Record>(&self, record: &R) -> Result<usize> {
        let mut patch = to_row(record)?;
        patch.remove("id");
        self.update(R::TABLE, &patch, &[Filter::eq("id", record.id())])
    }

    fn upsert_record<R: Record>(&self, record: &R, conflict_keys: &[&str]) -> Result<R> {
        from_row(self.upsert(R::TABLE, to_row(record)?, conflict_keys)?)
    }

    fn delete_by_id<R: Record>(&self, id: Uuid) -> Result<usize> {
        self.delete(R::TABLE, &[Filter::eq("id", id)])
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_eq_filter() {
        let r = row(json!({ "card_id": "abc", "paid": false, "index": 2 }));
        assert!(Filter::eq("card_id", "abc").matches(&r));
        assert!(!Filter::eq("card_id", "xyz").matches(&r));
        assert!(Filter::eq("paid", false).matches(&r));
        assert!(Filter::eq("index", 2u32).matches(&r));
        assert!(!Filter::eq("missing", "abc").matches(&r));
    }

    #[test]
    fn test_eq_filter_matches_text_exactly() {
        let r = row(json!({ "name": "10", "count": 2 }));
        assert!(Filter::eq("name", "10").matches(&r));
        assert!(!Filter::eq("name", "10.0").matches(&r));
        assert!(!Filter::eq("name", "10.00").matches(&r));
        assert!(Filter::eq("count", 2.0).matches(&r));
    }

    #[test]
    fn test_range_filters_on_dates_and_amounts() {
        let r = row(json!({ "date": "2024-03-18", "amount": "100.50" }));
        assert!(Filter::gte("date", "2024-03-01").matches(&r));
        assert!(Filter::lte("date", "2024-03-18").matches(&r));
        assert!(!Filter::lte("date", "2024-03-17").matches(&r));

        // decimal strings compare numerically, not lexicographically
        assert!(Filter::gte("amount", "99.99").matches(&r));
        assert!(Filter::lte("amount", "1000").matches(&r));
    }

    #[test]
    fn test_null_filters() {
        let r = row(json!({ "purchase_id": null, "card_id": "c1" }));
        assert!(Filter::is_null("purchase_id").matches(&r));
        assert!(Filter::is_null("not_a_column").matches(&r));
        assert!(Filter::not_null("card_id").matches(&r));
        assert!(!Filter::not_null("purchase_id").matches(&r));
        // null is unordered
        assert!(!Filter::gte("purchase_id", "a").matches(&r));
    }

    #[test]
    fn test_query_conjunction() {
        let r = row(json!({ "owner_id": "u1", "month": 3, "year": 2024 }));
        let hit = Query::new().eq("owner_id", "u1").eq("month", 3).gte("year", 2024);
        let miss = Query::new().eq("owner_id", "u1").eq("month", 4);
        assert!(hit.matches(&r));
        assert!(!miss.matches(&r));
        assert!(Query::new().matches(&r));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("10.00"), &json!("9.5")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::PaidStatements.to_string(), "paid_statements");
        assert_eq!(Table::ALL.len(), 8);
    }
}
