//! Query model shared by the REST and in-memory data services.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A table row as returned by the data service.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Neq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value)
    }

    /// PostgREST query parameter: `(column, "op.value")`. Null equality becomes `is.null`.
    pub fn to_query_param(&self) -> (String, String) {
        let rendered = match (&self.value, self.op) {
            (Value::Null, FilterOp::Eq) => "is.null".to_string(),
            (Value::Null, FilterOp::Neq) => "not.is.null".to_string(),
            (value, op) => format!("{}.{}", op.as_str(), render_value(value)),
        };
        (self.column.clone(), rendered)
    }

    /// Evaluate the filter against a row. A missing column behaves like null.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Neq => !values_equal(actual, &self.value),
            op => match compare_values(actual, &self.value) {
                Some(ordering) => match op {
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Eq | FilterOp::Neq => false,
                },
                None => false,
            },
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total-ish ordering for scalar JSON values; `None` when the types are not comparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    pub fn to_query_value(&self) -> String {
        format!(
            "{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// Select query: filters are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Query string pairs in PostgREST syntax.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().map(Filter::to_query_param));
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.to_query_value()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn renders_postgrest_params() {
        let query = Query::new()
            .filter(Filter::eq("course_id", 12))
            .filter(Filter::neq("status", "archived"))
            .filter(Filter::eq("deleted_at", Value::Null))
            .order(Order::desc("created_at"))
            .limit(10);

        assert_eq!(
            query.to_query_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("course_id".to_string(), "eq.12".to_string()),
                ("status".to_string(), "neq.archived".to_string()),
                ("deleted_at".to_string(), "is.null".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn filters_evaluate_locally() {
        let r = row(json!({"id": 3, "title": "Rust", "price": 19.5, "published": true}));
        assert!(Filter::eq("id", 3).matches(&r));
        assert!(Filter::eq("id", 3.0).matches(&r));
        assert!(Filter::gt("price", 10).matches(&r));
        assert!(Filter::lte("price", 19.5).matches(&r));
        assert!(!Filter::lt("price", 19.5).matches(&r));
        assert!(Filter::neq("title", "Go").matches(&r));
        assert!(Filter::eq("published", true).matches(&r));
        assert!(Filter::eq("missing", Value::Null).matches(&r));
        assert!(!Filter::gt("title", 1).matches(&r));
    }
}
