//! The board list returned by the board service.
//!
//! The payload is a JSON array of objects. Only `name`, `id` and `shortUrl`
//! are read; every other field is skipped, and a listed field that is missing
//! or not a string is left empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BoardError;

/// One board from the board list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    /// Display name.
    pub name: String,
    /// Service-side identifier.
    pub id: String,
    /// Short link to the board.
    #[serde(rename = "shortUrl")]
    pub short_url: String,
}

impl Board {
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        let field = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            name: field("name"),
            id: field("id"),
            short_url: field("shortUrl"),
        }
    }
}

/// Parse a board list.
///
/// # Errors
///
/// Returns [`BoardError::Json`] for malformed JSON, [`BoardError::NotArray`]
/// if the top-level value is not an array, and [`BoardError::NotObject`] for
/// the first element that is not an object.
pub fn parse_boards(json: &str) -> Result<Vec<Board>, BoardError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(BoardError::NotArray(kind(&value)));
    };

    let boards = items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(object) => Ok(Board::from_object(object)),
            other => Err(BoardError::NotObject {
                index,
                found: kind(other),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = boards.len(), "parsed board list");
    Ok(boards)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
