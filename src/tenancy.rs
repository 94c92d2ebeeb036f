//! Tenant scoping.
//!
//! A tenant is an organization, optionally narrowed to one of its companies.
//! Each half of the pair is either absent (no filter), explicitly null
//! (rows that belong to no organization/company) or a concrete id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One half of a tenant scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKey {
    /// No filter on this column.
    #[default]
    Any,
    /// Match rows where the column is NULL.
    Unassigned,
    /// Match rows with this id.
    Id(i64),
}

impl TenantKey {
    /// Concrete id, if any. Both `Any` and `Unassigned` yield `None`.
    pub fn id(&self) -> Option<i64> {
        match self {
            TenantKey::Id(id) => Some(*id),
            _ => None,
        }
    }

    fn relaxed(self) -> Self {
        match self {
            TenantKey::Unassigned => TenantKey::Any,
            other => other,
        }
    }
}

impl From<Option<i64>> for TenantKey {
    /// `Some(id)` scopes to the id, `None` is an explicit null.
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(id) => TenantKey::Id(id),
            None => TenantKey::Unassigned,
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantKey::Any => write!(f, "any"),
            TenantKey::Unassigned => write!(f, "null"),
            TenantKey::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Organization/company predicate handed verbatim to the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TenantFilter {
    pub organization: TenantKey,
    pub company: TenantKey,
}

impl TenantFilter {
    pub fn new(organization: TenantKey, company: TenantKey) -> Self {
        Self {
            organization,
            company,
        }
    }

    /// Filter that matches every tenant.
    pub fn any() -> Self {
        Self::default()
    }

    /// Same scope with explicit nulls dropped.
    ///
    /// Product, purchase and snapshot lookups only ever filter on concrete ids.
    pub fn relaxed(&self) -> Self {
        Self {
            organization: self.organization.relaxed(),
            company: self.company.relaxed(),
        }
    }
}

impl fmt::Display for TenantFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org={} company={}", self.organization, self.company)
    }
}
