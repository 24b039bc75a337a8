use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One decoded response entry: wire key to value.
pub type Record = Map<String, Value>;

/// Decoded response to a control-channel command.
///
/// List commands return one record per entry; single-object commands
/// return exactly one. Records are turned into typed values through their
/// serde field names, so the wire-key mapping is fixed at compile time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub records: Vec<Record>,
}

impl Response {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// A response with no records, as returned by commands that only
    /// report success.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Deserializes the first record into the given type.
    ///
    /// Returns `None` if the response carries no records.
    pub fn decode_one<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        match self.records.first() {
            Some(record) => Ok(Some(serde_json::from_value(Value::Object(record.clone()))?)),
            None => Ok(None),
        }
    }

    /// Deserializes every record, preserving response order.
    pub fn decode_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.records
            .iter()
            .map(|r| serde_json::from_value(Value::Object(r.clone())))
            .collect()
    }
}

impl FromIterator<Record> for Response {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
