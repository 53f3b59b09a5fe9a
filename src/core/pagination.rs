use crate::utils::error::{GroupsError, Result};

/// `max(1, ceil(total / page_size))`. A zero page size is treated as one page.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if total == 0 || page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size)
}

/// Row offset of the first item on `page` (1-based).
pub fn offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(page_size)
}

pub fn validate_page(page: u64, page_size: u64, max_page_size: u64) -> Result<()> {
    if page < 1 {
        return Err(GroupsError::ValidationError {
            message: format!("page must be at least 1, got {}", page),
        });
    }
    if page_size < 1 || page_size > max_page_size {
        return Err(GroupsError::ValidationError {
            message: format!(
                "page size must be between 1 and {}, got {}",
                max_page_size, page_size
            ),
        });
    }
    Ok(())
}
