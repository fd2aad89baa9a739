use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pagination::Pagination;

/// A page of domain items and the token to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct PagingResult<T> {
    pub pagination: Pagination,
    pub items: Vec<T>,
}

/// Transport shape of the collection listing contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingResponse {
    pub result: Vec<Value>,
    pub paging_metadata: PagingMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingMetadata {
    pub cursor: Option<String>,
}

impl<T> PagingResult<T> {
    pub fn create(pagination: Pagination, items: Vec<T>) -> Self {
        Self { pagination, items }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.pagination.cursor.as_deref()
    }
}

impl<T: Serialize> PagingResult<T> {
    pub fn to_plain(&self) -> Result<PagingResponse, serde_json::Error> {
        Ok(PagingResponse {
            result: self
                .items
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
            paging_metadata: PagingMetadata {
                cursor: self.pagination.cursor.clone(),
            },
        })
    }
}
