use crate::error::app_error::AppError;

/// Offset pagination for list queries, 1-indexed with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: i64,
}

impl PageParams {
    pub const PAGE_SIZE: i64 = 20;

    /// Build from the `page` query parameter; absent means the first page.
    pub fn from_query(page: Option<i64>) -> Result<Self, AppError> {
        match page {
            None => Ok(Self { page: 1 }),
            Some(page) if page >= 1 => Ok(Self { page }),
            Some(page) => Err(AppError::validation(format!("page must be >= 1, got {}", page))),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        Self::PAGE_SIZE
    }

    /// SQL OFFSET for the current page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(Self::PAGE_SIZE)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_page_defaults_to_first() {
        let params = PageParams::from_query(None).unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn third_page_skips_forty_rows() {
        let params = PageParams::from_query(Some(3)).unwrap();
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn zero_and_negative_pages_are_rejected() {
        assert!(matches!(PageParams::from_query(Some(0)), Err(AppError::Validation { .. })));
        assert!(matches!(PageParams::from_query(Some(-2)), Err(AppError::Validation { .. })));
    }

    proptest! {
        #[test]
        fn offset_is_previous_pages_times_page_size(page in 1i64..1_000_000) {
            let params = PageParams::from_query(Some(page)).unwrap();
            prop_assert_eq!(params.offset(), (page - 1) * 20);
            prop_assert!(params.offset() >= 0);
        }
    }
}
