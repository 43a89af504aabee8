//! Static and dynamic indexing tables (RFC 7541 Sections 2.3 and 4)
//!
//! Indices are 1-based: 1..=61 address the static table, 62 onward address
//! the dynamic table from most- to least-recently inserted. Dynamic indices
//! are only stable until the next insertion or eviction, so callers resolve
//! them immediately.

use super::{HpackError, Result};
use std::collections::VecDeque;

/// The 61-entry static table from RFC 7541 Appendix A
#[rustfmt::skip]
pub const STATIC_TABLE: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Per-entry overhead added to name + value length (RFC 7541 Section 4.1)
const ENTRY_OVERHEAD: usize = 32;

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    value: String,
}

impl Entry {
    fn size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

/// Bounded dynamic table
///
/// New entries prepend; eviction pops from the tail until the cumulative
/// size fits the maximum.
#[derive(Debug)]
pub struct DynamicTable {
    entries: VecDeque<Entry>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    /// Create a table with the given maximum size in octets
    pub fn new(max_size: usize) -> Self {
        DynamicTable {
            entries: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    /// Current cumulative size in octets
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a (name, value) pair at index 1 of the dynamic range
    ///
    /// An entry larger than the whole table clears it (RFC 7541 Section
    /// 4.4); nothing is inserted in that case.
    pub fn insert(&mut self, name: &str, value: &str) {
        let entry = Entry {
            name: name.to_string(),
            value: value.to_string(),
        };
        let entry_size = entry.size();

        if entry_size > self.max_size {
            self.entries.clear();
            self.size = 0;
            return;
        }

        self.size += entry_size;
        self.entries.push_front(entry);
        self.evict();
    }

    /// Change the maximum size, evicting from the tail as needed
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    fn evict(&mut self) {
        while self.size > self.max_size {
            match self.entries.pop_back() {
                Some(old) => self.size -= old.size(),
                None => break,
            }
        }
    }

    /// Look up a 1-based dynamic index
    fn get(&self, index: usize) -> Option<(&str, &str)> {
        self.entries
            .get(index - 1)
            .map(|e| (e.name.as_str(), e.value.as_str()))
    }

    /// Find an exact (name, value) match, returning the 1-based dynamic index
    pub fn find(&self, name: &str, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name && e.value == value)
            .map(|i| i + 1)
    }

    /// Find a name match, returning the 1-based dynamic index
    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| i + 1)
    }
}

/// Resolve an index against static table then dynamic table
///
/// Index 0 is invalid by specification.
pub fn resolve(table: &DynamicTable, index: usize) -> Result<(&str, &str)> {
    if index == 0 {
        return Err(HpackError::InvalidIndex(0));
    }
    if index <= STATIC_TABLE.len() {
        let (name, value) = STATIC_TABLE[index - 1];
        return Ok((name, value));
    }
    table
        .get(index - STATIC_TABLE.len())
        .ok_or(HpackError::InvalidIndex(index))
}

/// Find an exact match across static then dynamic table, 1-based
pub fn find(table: &DynamicTable, name: &str, value: &str) -> Option<usize> {
    if let Some(i) = STATIC_TABLE
        .iter()
        .position(|&(n, v)| n == name && v == value)
    {
        return Some(i + 1);
    }
    table.find(name, value).map(|i| STATIC_TABLE.len() + i)
}

/// Find a name match across static then dynamic table, 1-based
pub fn find_name(table: &DynamicTable, name: &str) -> Option<usize> {
    if let Some(i) = STATIC_TABLE.iter().position(|&(n, _)| n == name) {
        return Some(i + 1);
    }
    table.find_name(name).map(|i| STATIC_TABLE.len() + i)
}
