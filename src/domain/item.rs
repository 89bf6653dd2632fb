use chrono::{DateTime, Utc};

use crate::domain::filter::{ItemProperty, SearchFilter};

pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub subject: String,
    pub received: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub property: ItemProperty,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn newest_first() -> Self {
        Self {
            property: ItemProperty::DateTimeReceived,
            direction: SortDirection::Descending,
        }
    }
}

/// One slice of a folder listing: `size` items starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub size: usize,
    pub offset: usize,
    pub sort: Option<SortOrder>,
    pub filter: Option<SearchFilter>,
}

impl PageRequest {
    pub fn new(size: usize, offset: usize) -> Self {
        Self {
            size,
            offset,
            sort: None,
            filter: None,
        }
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn filtered_by(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
    pub more_available: bool,
}
