//! Newsgroups and their active article ranges

use std::cmp::Ordering;

use crate::config::Origin;

/// A newsgroup at one origin
///
/// Names are unique per origin only; the same name at two origins is two
/// different groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    /// Server the group lives on
    pub origin: Origin,
    /// Group name (e.g. `comp.lang.rust`)
    pub name: String,
}

impl Group {
    /// Create a group reference
    pub fn new(origin: Origin, name: impl Into<String>) -> Self {
        Self {
            origin,
            name: name.into(),
        }
    }

    /// Compare two groups by name, for sorting listings
    pub fn by_name(a: &Group, b: &Group) -> Ordering {
        a.name.cmp(&b.name)
    }

    /// Administrative `control.*` hierarchy
    pub fn is_control(&self) -> bool {
        self.name.starts_with("control.")
    }
}

/// Currently valid article-number range of a group, as reported by GROUP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveRange {
    /// Lowest article number
    pub low: u64,
    /// Highest article number
    pub high: u64,
    /// Estimated article count, when the server reports one
    pub count: Option<u64>,
}

impl ActiveRange {
    /// Range without a reported count
    pub fn new(low: u64, high: u64) -> Self {
        Self {
            low,
            high,
            count: None,
        }
    }

    /// A group with no articles reports `high < low`
    pub fn is_empty(&self) -> bool {
        self.high < self.low
    }

    /// Whether `number` lies inside the range
    pub fn contains(&self, number: u64) -> bool {
        number >= self.low && number <= self.high
    }
}

/// One entry of `LIST ACTIVE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGroup {
    /// Group name
    pub name: String,
    /// Highest article number
    pub high: u64,
    /// Lowest article number
    pub low: u64,
    /// Posting allowed, when known
    pub posting: Option<bool>,
}

/// A group plus its active range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// The group
    pub group: Group,
    /// Highest article number
    pub high: u64,
    /// Lowest article number
    pub low: u64,
    /// Article count; overrides `high - low + 1` for display
    pub count: Option<u64>,
    /// Posting allowed, when known
    pub posting: Option<bool>,
}

impl GroupInfo {
    /// Attach a `LIST ACTIVE` entry to its origin
    pub fn from_active(origin: &Origin, entry: ActiveGroup) -> Self {
        Self {
            group: Group::new(origin.clone(), entry.name),
            high: entry.high,
            low: entry.low,
            count: None,
            posting: entry.posting,
        }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.group.name
    }

    /// Number of articles to show: `count` if reported, else the range size
    ///
    /// ```
    /// use nntp_reader::{Group, GroupInfo, Origin};
    ///
    /// let info = GroupInfo {
    ///     group: Group::new(Origin::new("h"), "alt.test"),
    ///     high: 20,
    ///     low: 11,
    ///     count: None,
    ///     posting: None,
    /// };
    /// assert_eq!(info.display_count(), 10);
    /// ```
    pub fn display_count(&self) -> u64 {
        self.count
            .unwrap_or_else(|| (self.high + 1).saturating_sub(self.low))
    }

    /// Active range view of this entry
    pub fn active(&self) -> ActiveRange {
        ActiveRange {
            low: self.low,
            high: self.high,
            count: self.count,
        }
    }
}
