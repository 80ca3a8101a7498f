use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// One step of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed dotted path such as `response.data.items[0].name`.
///
/// Numeric dotted segments (`items.0`) are kept as keys and also match array
/// positions during lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),
    #[error("invalid index in path `{0}`")]
    InvalidIndex(String),
    #[error("unterminated `[` in path `{0}`")]
    UnterminatedIndex(String),
}

impl FieldPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in input.split('.') {
            let part = part.trim();
            if part.is_empty() {
                return Err(PathError::EmptySegment(input.to_string()));
            }

            // `items[0][1]` -> key `items`, index 0, index 1
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            } else if rest.is_empty() {
                return Err(PathError::EmptySegment(input.to_string()));
            }

            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped
                    .find(']')
                    .ok_or_else(|| PathError::UnterminatedIndex(input.to_string()))?;
                let index = stripped[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex(input.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return Err(PathError::InvalidIndex(input.to_string()));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// First segment as a key, used to pick a context root.
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(key)) => Some(key.as_str()),
            _ => None,
        }
    }

    /// Segments after the root.
    pub fn rest(&self) -> &[PathSegment] {
        self.segments.get(1..).unwrap_or(&[])
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Walk `segments` starting at `value`.
pub fn walk<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string())?,
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index)?,
            (Value::Array(items), PathSegment::Key(key)) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Walk `segments` starting at a map; an empty path yields the whole map.
pub fn walk_map(map: &Map<String, Value>, segments: &[PathSegment]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(Value::Object(map.clone()));
    };
    let head = match first {
        PathSegment::Key(key) => map.get(key)?,
        PathSegment::Index(index) => map.get(&index.to_string())?,
    };
    walk(head, rest).cloned()
}
