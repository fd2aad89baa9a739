use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pagination::{decode_cursor, encode_cursor, Pagination};
use crate::store::{KeysetPosition, QueryFilter, SortField, SortKey};

pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Collection order every keyset cursor is relative to.
pub const KEYSET_ORDER: [SortKey; 2] = [SortKey::desc(SortField::CreatedAt), SortKey::desc(SortField::Id)];

/// Store query for one keyset page.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetQuery {
    pub filter: QueryFilter,
    pub sort: [SortKey; 2],
    pub limit: usize,
}

/// Query for the page after `pagination.cursor` among documents whose
/// `owner_field` equals `owner`:
///
/// ```text
/// owner_field = owner
///   AND (createdAt < c.createdAt OR (createdAt = c.createdAt AND id < c.id))
/// ORDER BY createdAt DESC, id DESC
/// LIMIT limit
/// ```
pub fn keyset_query(owner_field: &str, owner: &str, pagination: &Pagination) -> Result<KeysetQuery> {
    let mut filter = QueryFilter::new().field_equals(owner_field, owner);
    if let Some(cursor) = &pagination.cursor {
        filter = filter.older_than(KeysetPosition::from(decode_cursor(cursor)?));
    }

    Ok(KeysetQuery {
        filter,
        sort: KEYSET_ORDER,
        limit: pagination.limit_or(DEFAULT_PAGE_LIMIT),
    })
}

/// Continuation token after a keyset page whose last item is `last`; an empty
/// page keeps the incoming cursor.
pub fn keyset_continuation(pagination: &Pagination, last: Option<(DateTime<Utc>, &str)>) -> Result<Pagination> {
    match last {
        Some((created_at, id)) => Ok(pagination.with_cursor(Some(encode_cursor(created_at, id)?))),
        None => Ok(pagination.clone()),
    }
}
