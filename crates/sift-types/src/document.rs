use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque JSON document.
///
/// Any JSON value is a valid document: object, array, scalar, or `null`.
/// A stored `null` is still a present document; absence is expressed by the
/// store returning `None`, never by the document's contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The explicit `null` document.
    pub fn null() -> Self {
        Self(Value::Null)
    }

    /// Decode a document from raw JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// Encode the document as compact JSON bytes.
    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.0
    }
}
