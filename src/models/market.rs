use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat, loosely-typed market data keyed by symbol (per-symbol objects) or by
/// market-wide indicator name.
///
/// Every accessor returns `None` for a field that is absent or of the wrong
/// shape. Callers decide what "unknown" means; the snapshot never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// When the data was collected. Stamped onto every exit strategy built
    /// from this snapshot.
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl MarketSnapshot {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            data: Map::new(),
        }
    }

    pub fn with_entry(mut self, key: &str, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The per-symbol object, if the symbol is present and maps to an object.
    pub fn symbol_entry(&self, symbol: &str) -> Option<&Map<String, Value>> {
        self.data.get(symbol).and_then(Value::as_object)
    }

    pub fn raw_field(&self, symbol: &str, field: &str) -> Option<&Value> {
        self.symbol_entry(symbol).and_then(|entry| entry.get(field))
    }

    /// A finite number stored as a JSON number or a numeric string.
    pub fn number(&self, symbol: &str, field: &str) -> Option<f64> {
        self.raw_field(symbol, field).and_then(as_finite_number)
    }

    /// A list of finite numbers. A list with any non-numeric element is
    /// malformed as a whole.
    pub fn series(&self, symbol: &str, field: &str) -> Option<Vec<f64>> {
        let items = self.raw_field(symbol, field)?.as_array()?;
        items.iter().map(as_finite_number).collect()
    }

    pub fn text(&self, symbol: &str, field: &str) -> Option<&str> {
        self.raw_field(symbol, field).and_then(Value::as_str)
    }

    /// A market-wide string value stored at the top level.
    pub fn global_text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn as_finite_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
