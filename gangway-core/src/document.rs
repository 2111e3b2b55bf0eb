//! # Request Documents
//!
//! Builds the untyped request document for a dynamic call out of the three
//! places an HTTP request can carry data: the JSON body, path parameters, and
//! query parameters.
//!
//! The merge rule is fixed: a JSON object body is the base and every path
//! parameter is overlaid on top of it (path parameters name the addressed
//! resource, so they win on collision). Without a usable body the document is
//! the flat parameter projection, query first, path parameters winning. The
//! schema is never consulted here; conformance is enforced by the codec when
//! the document is marshaled into the call.
use serde_json::{Map, Value};

/// Builds the request document for one call.
///
/// A body that is empty or not a JSON object is treated permissively: the
/// parameters alone form the document.
pub fn build(
    path_params: &[(String, String)],
    query_params: &[(String, String)],
    body: &[u8],
) -> Value {
    if !body.is_empty()
        && let Ok(Value::Object(mut doc)) = serde_json::from_slice::<Value>(body)
    {
        for (key, value) in path_params {
            doc.insert(key.clone(), Value::String(value.clone()));
        }
        return Value::Object(doc);
    }

    let mut doc = Map::new();
    for (key, value) in query_params {
        // First value wins for repeated query keys.
        doc.entry(key.clone())
            .or_insert_with(|| Value::String(value.clone()));
    }
    for (key, value) in path_params {
        doc.insert(key.clone(), Value::String(value.clone()));
    }
    Value::Object(doc)
}
