//! Enumerated page sizes a list may be viewed with.

use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};

/// Page sizes offered by the list pagination controls
pub const DEFAULT_PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

/// Page size used when a list is first opened
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The set of allowed page sizes plus the one a fresh query starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizeOptions {
    #[serde(default = "default_sizes")]
    pub page_sizes: Vec<u32>,
    #[serde(default = "default_size")]
    pub default_page_size: u32,
}

fn default_sizes() -> Vec<u32> {
    DEFAULT_PAGE_SIZES.to_vec()
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageSizeOptions {
    fn default() -> Self {
        Self {
            page_sizes: default_sizes(),
            default_page_size: default_size(),
        }
    }
}

impl PageSizeOptions {
    /// Build options, rejecting empty sets, zero sizes and a default outside the set.
    pub fn new(mut page_sizes: Vec<u32>, default_page_size: u32) -> Result<Self> {
        page_sizes.sort_unstable();
        page_sizes.dedup();
        let options = Self {
            page_sizes,
            default_page_size,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_sizes.is_empty() {
            return Err(BackofficeError::ValidationFailure(
                "at least one page size must be allowed".to_string(),
            ));
        }
        if self.page_sizes.contains(&0) {
            return Err(BackofficeError::ValidationFailure(
                "page size 0 is not allowed".to_string(),
            ));
        }
        if !self.page_sizes.contains(&self.default_page_size) {
            return Err(BackofficeError::ValidationFailure(format!(
                "default page size {} is not one of {:?}",
                self.default_page_size, self.page_sizes
            )));
        }
        Ok(())
    }

    pub fn contains(&self, size: u32) -> bool {
        self.page_sizes.contains(&size)
    }

    /// Check a requested size against the set.
    pub fn check(&self, size: u32) -> Result<u32> {
        if self.contains(size) {
            Ok(size)
        } else {
            Err(BackofficeError::ValidationFailure(format!(
                "page size {size} is not one of {:?}",
                self.page_sizes
            )))
        }
    }
}
