use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// `?page=&limit=` query parameters, 1-based pages.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}

impl PageQuery {
    pub fn validate(self) -> Result<Page, AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::Validation("page is out of range".into()));
        }
        Ok(Page { page, limit })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Standard list envelope: `{ "items": [...], "pagination": {...} }`.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            items,
            pagination: page.meta(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageQuery::default().validate().unwrap();
        assert_eq!(page, Page { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset_and_total_pages() {
        let page = PageQuery {
            page: Some(3),
            limit: Some(20),
        }
        .validate()
        .unwrap();
        assert_eq!(page.offset(), 40);
        assert_eq!(page.meta(41).total_pages, 3);
        assert_eq!(page.meta(0).total_pages, 0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(PageQuery { page: Some(0), limit: None }.validate().is_err());
        assert!(PageQuery { page: None, limit: Some(0) }.validate().is_err());
        assert!(PageQuery { page: None, limit: Some(101) }.validate().is_err());
    }

    #[test]
    fn test_huge_page_is_rejected() {
        let result = PageQuery {
            page: Some(i64::MAX),
            limit: Some(10),
        }
        .validate();
        assert!(matches!(result, Err(AppError::Validation(_))));

        let last = PageQuery {
            page: Some(i64::MAX / 100),
            limit: Some(100),
        }
        .validate()
        .unwrap();
        assert!(last.offset() > 0);
    }
}
