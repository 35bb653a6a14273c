use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// The header row of a table: column names in order, plus a lookup from name to column index.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    headers: Vec<Header>,
    header_map: HashMap<Header, usize>,
}

impl Mapping {
    /// Create a new `Mapping` from a list of header strings. Blank headers are named
    /// `Unnamed: {index}` and a repeated header becomes `{name}.{n}`, the way spreadsheet tools
    /// label them, so a name always finds its first column.
    pub fn new<S, I>(headers: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let names: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(ix, s)| {
                let s = s.into();
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    format!("Unnamed: {ix}")
                } else {
                    trimmed.to_string()
                }
            })
            .collect();

        let mut headers: Vec<Header> = Vec::with_capacity(names.len());
        let mut header_map: HashMap<Header, usize> = HashMap::with_capacity(names.len());
        let mut repeats: HashMap<String, usize> = HashMap::new();
        for (ix, name) in names.into_iter().enumerate() {
            let mut header = Header::from(name.as_str());
            while header_map.contains_key(&header) {
                let n = repeats.entry(name.clone()).or_default();
                *n += 1;
                header = Header::from(format!("{name}.{n}"));
            }
            header_map.insert(header.clone(), ix);
            headers.push(header);
        }

        Self {
            headers,
            header_map,
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn contains(&self, header: &str) -> bool {
        self.header_map.contains_key(header)
    }

    pub fn header_index(&self, header: &str) -> Option<usize> {
        self.header_map.get(header).copied()
    }

    /// Looks up both headers. When either one is missing, both indices fall back to `fallback`.
    pub fn pair_index_or(&self, first: &str, second: &str, fallback: (usize, usize)) -> (usize, usize) {
        match (self.header_index(first), self.header_index(second)) {
            (Some(a), Some(b)) => (a, b),
            _ => fallback,
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.headers.len()))?;
        for header in &self.headers {
            seq.serialize_element(header.as_ref())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items: Vec<String> = Vec::deserialize(deserializer)?;
        Ok(Mapping::new(items))
    }
}

/// A column name as it appears in the header row, for example `官费`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header(String);

impl AsRef<str> for Header {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for Header {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl<S: Into<String>> From<S> for Header {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
