//! Pagination utilities for search
//!
//! Search takes a plain `skip`/`limit` window; `page` is folded into `skip`
//! before the storage call.

use models::{errors::ModelError, FieldType, Fields};

pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";
pub const PAGE_PARAM: &str = "page";

/// Pagination parameters. `limit == 0` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
    /// 0-based page index; when present it overrides `skip`
    pub page: Option<u64>,
}

impl Pagination {
    /// Remove `skip`/`limit`/`page` from a query map, leaving only filter fields.
    pub fn take_from(params: &mut Fields) -> Result<Self, ModelError> {
        let skip = take_count(params, SKIP_PARAM)?.unwrap_or(0);
        let limit = take_count(params, LIMIT_PARAM)?.unwrap_or(0);
        let page = take_count(params, PAGE_PARAM)?;
        Ok(Self { skip, limit, page })
    }

    /// Resolve to the `(skip, limit)` window passed to storage.
    pub fn normalize(self) -> (u64, u64) {
        match self.page {
            Some(page) => (page.saturating_mul(self.limit), self.limit),
            None => (self.skip, self.limit),
        }
    }

    pub fn is_param(name: &str) -> bool {
        matches!(name, SKIP_PARAM | LIMIT_PARAM | PAGE_PARAM)
    }
}

fn take_count(params: &mut Fields, name: &str) -> Result<Option<u64>, ModelError> {
    match params.remove(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| ModelError::InvalidValue {
            field: name.to_string(),
            value: raw,
            expected: FieldType::Int,
        }),
    }
}

/// Apply a `(skip, limit)` window to an already sorted sequence.
pub fn window<T>(items: Vec<T>, skip: u64, limit: u64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let iter = items.into_iter().skip(skip);
    if limit == 0 {
        iter.collect()
    } else {
        iter.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_are_unbounded_from_start() {
        let mut p = params(&[("artist", "Nico")]);
        let pg = Pagination::take_from(&mut p).unwrap();
        assert_eq!(pg.normalize(), (0, 0));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn page_overrides_skip() {
        let mut p = params(&[("skip", "3"), ("limit", "10"), ("page", "2")]);
        let pg = Pagination::take_from(&mut p).unwrap();
        assert_eq!(pg.normalize(), (20, 10));
        assert!(p.is_empty());
    }

    #[test]
    fn page_without_limit_starts_at_zero() {
        let mut p = params(&[("page", "4")]);
        assert_eq!(Pagination::take_from(&mut p).unwrap().normalize(), (0, 0));
    }

    #[test]
    fn non_numeric_or_negative_rejected() {
        assert!(Pagination::take_from(&mut params(&[("limit", "ten")])).is_err());
        assert!(Pagination::take_from(&mut params(&[("skip", "-1")])).is_err());
    }

    #[test]
    fn window_applies_skip_then_limit() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(window(items.clone(), 2, 3), vec![2, 3, 4]);
        assert_eq!(window(items.clone(), 8, 0), vec![8, 9]);
        assert_eq!(window(items.clone(), 0, 0).len(), 10);
        assert!(window(items, 20, 5).is_empty());
    }
}
