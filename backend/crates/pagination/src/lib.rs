//! Page-number pagination primitives shared by Birdwatch listing views.
//!
//! Listing endpoints address results by a one-based page number and a fixed
//! page size. This crate validates page numbers, converts them into
//! `LIMIT`/`OFFSET` windows that adapters bind as query parameters, and
//! provides the [`Page`] envelope returned to callers.
//!
//! # Example
//!
//! ```
//! use pagination::{Page, PageNumber, PageSize, PageWindow};
//!
//! let page = PageNumber::new(3).expect("positive page");
//! let window = PageWindow::new(page, PageSize::DEFAULT).expect("addressable page");
//! assert_eq!(window.offset(), 20);
//! assert_eq!(window.limit(), 10);
//!
//! let envelope = Page::new(vec!["a", "b"], 22, page, PageSize::DEFAULT);
//! assert_eq!(envelope.total_pages(), 3);
//! ```

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Fixed number of rows returned per listing page.
pub const PAGE_SIZE: u32 = 10;

/// Largest offset accepted by SQL adapters (`OFFSET` is a signed 64-bit value).
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Errors raised while validating pagination input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The requested page number is zero or negative.
    #[error("page must be a positive integer, got {value}")]
    NonPositivePage {
        /// Raw value supplied by the caller.
        value: i64,
    },
    /// The requested page number does not fit the supported range.
    #[error("page {value} is beyond the addressable range")]
    PageOutOfRange {
        /// Raw value supplied by the caller.
        value: i64,
    },
    /// A page size of zero was supplied.
    #[error("page size must be a positive integer")]
    ZeroPageSize,
}

/// One-based page number.
///
/// ## Invariants
/// - Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    /// The first page.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Validate a raw page number.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::NonPositivePage`] for values below 1 and
    /// [`PaginationError::PageOutOfRange`] for values above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, PaginationError> {
        if value < 1 {
            return Err(PaginationError::NonPositivePage { value });
        }
        let narrowed =
            u32::try_from(value).map_err(|_| PaginationError::PageOutOfRange { value })?;
        NonZeroU32::new(narrowed)
            .map(Self)
            .ok_or(PaginationError::NonPositivePage { value })
    }

    /// Validate an optional page number, defaulting to [`PageNumber::FIRST`].
    ///
    /// # Errors
    ///
    /// Propagates the validation failures of [`PageNumber::new`].
    pub fn from_optional(value: Option<i64>) -> Result<Self, PaginationError> {
        value.map_or(Ok(Self::FIRST), Self::new)
    }

    /// Page number as an unsigned integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<i64> for PageNumber {
    type Error = PaginationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageNumber> for u32 {
    fn from(value: PageNumber) -> Self {
        value.get()
    }
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Number of rows per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize(NonZeroU32);

impl PageSize {
    /// The fixed listing page size, [`PAGE_SIZE`].
    pub const DEFAULT: Self = match NonZeroU32::new(PAGE_SIZE) {
        Some(size) => Self(size),
        None => Self(NonZeroU32::MIN),
    };

    /// Build a page size.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::ZeroPageSize`] when `value` is zero.
    pub fn new(value: u32) -> Result<Self, PaginationError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(PaginationError::ZeroPageSize)
    }

    /// Page size as an unsigned integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// `LIMIT`/`OFFSET` pair derived from a page number and size.
///
/// `offset = size × (page − 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: PageNumber,
    size: PageSize,
    offset: u64,
}

impl PageWindow {
    /// Compute the window for `page`.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::PageOutOfRange`] when the offset would not
    /// fit a signed 64-bit SQL parameter.
    pub fn new(page: PageNumber, size: PageSize) -> Result<Self, PaginationError> {
        let offset = u64::from(size.get()) * u64::from(page.get() - 1);
        if offset > MAX_OFFSET {
            return Err(PaginationError::PageOutOfRange {
                value: i64::from(page.get()),
            });
        }
        Ok(Self { page, size, offset })
    }

    /// Window for `page` using the fixed [`PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// See [`PageWindow::new`].
    pub fn for_page(page: PageNumber) -> Result<Self, PaginationError> {
        Self::new(page, PageSize::DEFAULT)
    }

    /// Requested page.
    #[must_use]
    pub const fn page(&self) -> PageNumber {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn size(&self) -> PageSize {
        self.size
    }

    /// Maximum number of rows in the page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.size.get()
    }

    /// Number of rows skipped before the page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// `LIMIT` value ready to bind as a `BIGINT` parameter.
    #[must_use]
    pub fn limit_param(&self) -> i64 {
        i64::from(self.limit())
    }

    /// `OFFSET` value ready to bind as a `BIGINT` parameter.
    #[must_use]
    pub fn offset_param(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Apply the window to an already ordered sequence.
    ///
    /// Used by in-process adapters that sort rows themselves.
    pub fn apply<I>(&self, rows: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
    {
        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        rows.into_iter().skip(skip).take(take)
    }
}

/// Number of pages needed to show `total_count` rows.
#[must_use]
pub fn total_pages(total_count: u64, size: PageSize) -> u64 {
    total_count.div_ceil(u64::from(size.get()))
}

/// Page envelope returned by listing operations.
///
/// ## Invariants
/// - `items.len() <= page_size`.
/// - `total_count` comes from a dedicated count query, not from `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    total_count: u64,
    page: u32,
    page_size: u32,
    total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page envelope.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, page: PageNumber, size: PageSize) -> Self {
        Self {
            items,
            total_count,
            page: page.get(),
            page_size: size.get(),
            total_pages: total_pages(total_count, size),
        }
    }

    /// An empty page envelope.
    #[must_use]
    pub fn empty(page: PageNumber, size: PageSize) -> Self {
        Self::new(Vec::new(), 0, page, size)
    }

    /// Rows in this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the envelope and return its rows.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Total rows across all pages.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// One-based number of this page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total pages, `ceil(total_count / page_size)`.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Transform every row while keeping the envelope metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}
