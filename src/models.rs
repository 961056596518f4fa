use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Free-text search parameters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl SearchQuery {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: non_empty(title),
            author: non_empty(author),
        }
    }

    /// True when neither parameter is set and the API default result set is requested
    pub fn is_unfiltered(&self) -> bool {
        self.title.is_none() && self.author.is_none()
    }

    /// Query parameters in request order, skipping the absent ones
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::new();
        if let Some(title) = &self.title {
            params.push(("title", title.as_str()));
        }
        if let Some(author) = &self.author {
            params.push(("author", author.as_str()));
        }
        params
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// `author_name` as returned by the API: usually a list, occasionally a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthorField {
    Single(String),
    Many(Vec<String>),
}

impl Default for AuthorField {
    fn default() -> Self {
        AuthorField::Many(Vec::new())
    }
}

impl AuthorField {
    /// Non-empty author names in API order
    pub fn names(&self) -> Vec<&str> {
        let names: Vec<&str> = match self {
            AuthorField::Single(name) => vec![name.as_str()],
            AuthorField::Many(names) => names.iter().map(String::as_str).collect(),
        };
        names.into_iter().filter(|name| !name.is_empty()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}

impl fmt::Display for AuthorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}

/// `first_publish_year`, which may be missing, numeric or free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PublishYear {
    #[default]
    Unknown,
    Year(i64),
    Text(String),
}

impl PublishYear {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(year) => PublishYear::Year(year),
                None => PublishYear::Text(n.to_string()),
            },
            Some(Value::String(s)) if !s.is_empty() => PublishYear::Text(s.clone()),
            _ => PublishYear::Unknown,
        }
    }

    /// Column representation; `None` for an unknown year
    pub fn as_stored(&self) -> Option<String> {
        match self {
            PublishYear::Unknown => None,
            PublishYear::Year(year) => Some(year.to_string()),
            PublishYear::Text(text) => Some(text.clone()),
        }
    }

    pub fn from_stored(stored: Option<String>) -> Self {
        match stored {
            None => PublishYear::Unknown,
            Some(s) if s.is_empty() => PublishYear::Unknown,
            Some(s) => s
                .parse::<i64>()
                .map(PublishYear::Year)
                .unwrap_or(PublishYear::Text(s)),
        }
    }
}

impl fmt::Display for PublishYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishYear::Unknown => Ok(()),
            PublishYear::Year(year) => write!(f, "{}", year),
            PublishYear::Text(text) => write!(f, "{}", text),
        }
    }
}

// Unknown serializes as "" to keep the API's loose typing visible in dumps.
impl Serialize for PublishYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PublishYear::Unknown => serializer.serialize_str(""),
            PublishYear::Year(year) => serializer.serialize_i64(*year),
            PublishYear::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// One normalized entry of the search response `docs` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub title: String,
    pub author: AuthorField,
    pub description: String,
    pub first_publish_year: PublishYear,
}

impl BookRecord {
    /// Build a record from a loosely-typed doc; missing keys fall back to defaults.
    pub fn from_doc(doc: &Value) -> Self {
        let title = doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let author = match doc.get("author_name") {
            Some(Value::String(name)) => AuthorField::Single(name.clone()),
            Some(Value::Array(names)) => AuthorField::Many(
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => AuthorField::default(),
        };

        // Work records sometimes carry {"type": "/type/text", "value": "..."}
        let description = match doc.get("description") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Object(obj)) => obj
                .get("value")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };

        Self {
            title,
            author,
            description,
            first_publish_year: PublishYear::from_value(doc.get("first_publish_year")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_query_skips_empty_params() {
        let query = SearchQuery::new("", "Ursula K. Le Guin");
        assert_eq!(query.title, None);
        assert_eq!(query.params(), vec![("author", "Ursula K. Le Guin")]);
        assert!(SearchQuery::new("", "").is_unfiltered());
    }

    #[test]
    fn test_record_defaults_for_missing_keys() {
        let record = BookRecord::from_doc(&json!({}));
        assert_eq!(record.title, "");
        assert_eq!(record.description, "");
        assert!(record.author.is_empty());
        assert_eq!(record.first_publish_year, PublishYear::Unknown);
    }

    #[test]
    fn test_record_reads_loose_fields() {
        let record = BookRecord::from_doc(&json!({
            "title": "The Dispossessed",
            "author_name": "Ursula K. Le Guin",
            "description": {"type": "/type/text", "value": "An ambiguous utopia."},
            "first_publish_year": "1974"
        }));
        assert_eq!(record.author, AuthorField::Single("Ursula K. Le Guin".to_string()));
        assert_eq!(record.author.names(), vec!["Ursula K. Le Guin"]);
        assert_eq!(record.description, "An ambiguous utopia.");
        assert_eq!(record.first_publish_year, PublishYear::Text("1974".to_string()));
    }

    #[test]
    fn test_author_names_drop_blank_entries() {
        let author = AuthorField::Many(vec!["".to_string(), "Terry Pratchett".to_string()]);
        assert_eq!(author.names(), vec!["Terry Pratchett"]);
        assert_eq!(author.to_string(), "Terry Pratchett");
    }

    #[test]
    fn test_publish_year_stored_form() {
        assert_eq!(PublishYear::Year(1965).as_stored(), Some("1965".to_string()));
        assert_eq!(PublishYear::from_stored(Some("1965".to_string())), PublishYear::Year(1965));
        assert_eq!(PublishYear::from_stored(Some("c. 1600".to_string())), PublishYear::Text("c. 1600".to_string()));
        assert_eq!(PublishYear::from_stored(None), PublishYear::Unknown);
    }

    #[test]
    fn test_unknown_year_serializes_as_empty_string() {
        let record = BookRecord::default();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["first_publish_year"], json!(""));
        assert_eq!(value["author"], json!([]));
    }
}
