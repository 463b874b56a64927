use bson::{Bson, Document, doc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::PageError;
use crate::paginator::PaginationData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl From<Order> for Bson {
    fn from(o: Order) -> Self {
        match o {
            Order::Asc => Bson::Int32(1),
            Order::Desc => Bson::Int32(-1),
        }
    }
}

/// Locale-aware string comparison rule, passed through to the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collation {
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_level: Option<bool>,
}

impl Collation {
    pub fn new(locale: impl Into<String>) -> Self {
        Self { locale: locale.into(), strength: None, case_level: None }
    }

    #[must_use]
    pub fn strength(mut self, strength: i32) -> Self {
        self.strength = Some(strength);
        self
    }

    #[must_use]
    pub fn case_level(mut self, on: bool) -> Self {
        self.case_level = Some(on);
        self
    }

    /// Strength 1 and 2 ignore case differences.
    #[must_use]
    pub fn ignores_case(&self) -> bool {
        matches!(self.strength, Some(1 | 2)) && self.case_level != Some(true)
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut d = doc! { "locale": self.locale.clone() };
        if let Some(s) = self.strength {
            d.insert("strength", s);
        }
        if let Some(c) = self.case_level {
            d.insert("caseLevel", c);
        }
        d
    }
}

/// One page of raw documents plus where it sits in the full result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagedData {
    pub data: Vec<Document>,
    pub pagination: PaginationData,
}

impl PagedData {
    /// Deserializes every document that fits `T`; the rest are logged and skipped.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> Vec<T> {
        self.data
            .iter()
            .filter_map(|d| match bson::deserialize_from_document::<T>(d.clone()) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("skipping undecodable document: {e}");
                    None
                }
            })
            .collect()
    }

    /// # Errors
    /// Returns `PageError::Decode` on the first document that does not fit `T`.
    pub fn try_decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, PageError> {
        self.data
            .iter()
            .map(|d| bson::deserialize_from_document::<T>(d.clone()).map_err(PageError::from))
            .collect()
    }
}
