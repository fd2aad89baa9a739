pub mod cursor;
pub mod keyset;
pub mod paging_result;

pub use cursor::*;
pub use keyset::*;
pub use paging_result::*;

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use crate::error::{PersistenceError, Result};
use crate::model::Id;

/// Page token: where to resume and how many items to return.
///
/// A page request takes a `Pagination` and hands back the items together with
/// the `Pagination` to continue from; the incoming value is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub cursor: Option<String>,
    pub limit: Option<NonZeroUsize>,
}

/// One slice of an id list plus the token for the next slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPage<'a> {
    pub ids: &'a [Id],
    pub next: Pagination,
}

impl Pagination {
    /// Build from raw request values; a zero limit is rejected.
    pub fn new(cursor: Option<String>, limit: Option<usize>) -> Result<Self> {
        let limit = match limit {
            Some(limit) => Some(NonZeroUsize::new(limit).ok_or(PersistenceError::InvalidLimit)?),
            None => None,
        };
        Ok(Self { cursor, limit })
    }

    pub fn first(limit: usize) -> Result<Self> {
        Self::new(None, Some(limit))
    }

    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.map(NonZeroUsize::get).unwrap_or(default)
    }

    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            cursor,
            limit: self.limit,
        }
    }

    /// Next slice of an ordered id list.
    ///
    /// Starts right after the cursor id (or at the front without a cursor).
    /// The continuation cursor is the last id returned; an exhausted list
    /// yields an empty slice and keeps the incoming cursor so replaying it
    /// never rewinds. A cursor id absent from the list is an error.
    pub fn next_page<'a>(&self, ids: &'a [Id]) -> Result<IdPage<'a>> {
        let start = match &self.cursor {
            Some(cursor) => {
                let position = ids
                    .iter()
                    .position(|id| id == cursor)
                    .ok_or_else(|| PersistenceError::CursorNotFound(cursor.clone()))?;
                position + 1
            }
            None => 0,
        };
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit.get()).min(ids.len()),
            None => ids.len(),
        };

        let page = &ids[start..end];
        let cursor = page.last().cloned().or_else(|| self.cursor.clone());
        Ok(IdPage {
            ids: page,
            next: self.with_cursor(cursor),
        })
    }
}
