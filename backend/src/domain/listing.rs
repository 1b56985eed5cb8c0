//! Query composition for grouped sighting and location listings.
//!
//! Raw `groupBy`, `sortBy` and `page` inputs are parsed into closed enums and
//! a [`PageWindow`] here, before any store is touched. Each accepted
//! combination maps to a fixed [`OrderPlan`]; adapters translate plans into
//! statement fragments without ever seeing caller text.

use std::fmt;
use std::str::FromStr;

use pagination::{PageNumber, PageWindow, PaginationError};
use serde_json::json;

use super::Error;

/// Column a sightings listing is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupBy {
    #[default]
    Date,
    Bird,
    Location,
}

impl GroupBy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Bird => "bird",
            Self::Location => "location",
        }
    }

    /// Sort applied when the caller does not name one.
    pub const fn default_sort(self) -> SortBy {
        match self {
            Self::Date => SortBy::DateDesc,
            Self::Bird | Self::Location => SortBy::Count,
        }
    }

    /// Whether `sort` is meaningful for this grouping.
    pub const fn allows(self, sort: SortBy) -> bool {
        match self {
            Self::Date => matches!(sort, SortBy::DateAsc | SortBy::DateDesc | SortBy::Count),
            Self::Bird | Self::Location => {
                matches!(sort, SortBy::AlphaAsc | SortBy::AlphaDesc | SortBy::Count)
            }
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = ListingValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "date" => Ok(Self::Date),
            "bird" => Ok(Self::Bird),
            "location" => Ok(Self::Location),
            other => Err(ListingValidationError::UnknownGroupBy(other.to_owned())),
        }
    }
}

/// Whitelisted sort tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortBy {
    AlphaAsc,
    AlphaDesc,
    Count,
    DateAsc,
    DateDesc,
}

impl SortBy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlphaAsc => "alphaAsc",
            Self::AlphaDesc => "alphaDesc",
            Self::Count => "count",
            Self::DateAsc => "dateAsc",
            Self::DateDesc => "dateDesc",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = ListingValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "alphaAsc" => Ok(Self::AlphaAsc),
            "alphaDesc" => Ok(Self::AlphaDesc),
            "count" => Ok(Self::Count),
            "dateAsc" => Ok(Self::DateAsc),
            "dateDesc" => Ok(Self::DateDesc),
            other => Err(ListingValidationError::UnknownSort(other.to_owned())),
        }
    }
}

/// Value a group is ordered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    /// The group identifier (date, bird id or location id).
    Key,
    /// The display text, compared case-insensitively then case-sensitively.
    Label,
    /// Number of sightings in the group.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `(key, direction)` term of an order plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub key: OrderKey,
    pub direction: Direction,
}

impl OrderTerm {
    const fn asc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Asc,
        }
    }

    const fn desc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Desc,
        }
    }
}

/// Ordered list of terms; the last term always makes the order total.
pub type OrderPlan = &'static [OrderTerm];

const DATE_DESC: &[OrderTerm] = &[OrderTerm::desc(OrderKey::Key)];
const DATE_ASC: &[OrderTerm] = &[OrderTerm::asc(OrderKey::Key)];
const DATE_COUNT: &[OrderTerm] = &[
    OrderTerm::desc(OrderKey::Count),
    OrderTerm::desc(OrderKey::Key),
];
const ALPHA_ASC: &[OrderTerm] = &[OrderTerm::asc(OrderKey::Label), OrderTerm::asc(OrderKey::Key)];
const ALPHA_DESC: &[OrderTerm] = &[
    OrderTerm::desc(OrderKey::Label),
    OrderTerm::asc(OrderKey::Key),
];
const NAMED_COUNT: &[OrderTerm] = &[
    OrderTerm::desc(OrderKey::Count),
    OrderTerm::asc(OrderKey::Label),
    OrderTerm::asc(OrderKey::Key),
];

/// Map an allowed `(group, sort)` pair to its plan.
///
/// Callers must have checked [`GroupBy::allows`]; the date and named arms
/// fall back to their defaults otherwise.
const fn plan_for(group_by: GroupBy, sort_by: SortBy) -> OrderPlan {
    match (group_by, sort_by) {
        (GroupBy::Date, SortBy::DateAsc) => DATE_ASC,
        (GroupBy::Date, SortBy::Count) => DATE_COUNT,
        (GroupBy::Date, _) => DATE_DESC,
        (_, SortBy::AlphaAsc) => ALPHA_ASC,
        (_, SortBy::AlphaDesc) => ALPHA_DESC,
        (_, _) => NAMED_COUNT,
    }
}

/// Reasons a listing request is rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingValidationError {
    #[error("unknown groupBy '{0}'")]
    UnknownGroupBy(String),
    #[error("unknown sortBy '{0}'")]
    UnknownSort(String),
    #[error("sortBy '{sort}' is not supported for {scope} listings")]
    SortNotAllowed { sort: SortBy, scope: &'static str },
    #[error(transparent)]
    Page(#[from] PaginationError),
}

impl ListingValidationError {
    fn field(&self) -> &'static str {
        match self {
            Self::UnknownGroupBy(_) => "groupBy",
            Self::UnknownSort(_) | Self::SortNotAllowed { .. } => "sortBy",
            Self::Page(_) => "page",
        }
    }
}

impl From<ListingValidationError> for Error {
    fn from(err: ListingValidationError) -> Self {
        let field = err.field();
        Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
    }
}

/// A validated grouped-sightings request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SightingListing {
    group_by: GroupBy,
    sort_by: SortBy,
    window: PageWindow,
}

impl SightingListing {
    /// Parse optional raw inputs, applying defaults for absent values.
    ///
    /// # Examples
    /// ```
    /// use birdwatch::domain::{GroupBy, SightingListing, SortBy};
    ///
    /// let listing = SightingListing::compose(Some("bird"), None, Some(2)).expect("valid");
    /// assert_eq!(listing.group_by(), GroupBy::Bird);
    /// assert_eq!(listing.sort_by(), SortBy::Count);
    /// assert_eq!(listing.window().offset(), 10);
    ///
    /// assert!(SightingListing::compose(Some("bird"), Some("dateAsc"), None).is_err());
    /// ```
    pub fn compose(
        group_by: Option<&str>,
        sort_by: Option<&str>,
        page: Option<i64>,
    ) -> Result<Self, ListingValidationError> {
        let group_by = group_by.map(str::parse::<GroupBy>).transpose()?.unwrap_or_default();
        let sort_by = sort_by.map(str::parse::<SortBy>).transpose()?;
        let page = PageNumber::from_optional(page)?;
        Self::new(group_by, sort_by, page)
    }

    /// Build from already parsed parts.
    pub fn new(
        group_by: GroupBy,
        sort_by: Option<SortBy>,
        page: PageNumber,
    ) -> Result<Self, ListingValidationError> {
        let sort_by = sort_by.unwrap_or(group_by.default_sort());
        if !group_by.allows(sort_by) {
            return Err(ListingValidationError::SortNotAllowed {
                sort: sort_by,
                scope: group_by.as_str(),
            });
        }
        Ok(Self {
            group_by,
            sort_by,
            window: PageWindow::for_page(page)?,
        })
    }

    pub const fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub const fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub const fn window(&self) -> PageWindow {
        self.window
    }

    pub const fn order_plan(&self) -> OrderPlan {
        plan_for(self.group_by, self.sort_by)
    }
}

/// A validated locations-with-counts request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationListing {
    sort_by: SortBy,
    window: PageWindow,
}

impl LocationListing {
    pub const DEFAULT_SORT: SortBy = SortBy::AlphaAsc;

    pub fn compose(
        sort_by: Option<&str>,
        page: Option<i64>,
    ) -> Result<Self, ListingValidationError> {
        let sort_by = sort_by.map(str::parse::<SortBy>).transpose()?;
        let page = PageNumber::from_optional(page)?;
        Self::new(sort_by, page)
    }

    pub fn new(sort_by: Option<SortBy>, page: PageNumber) -> Result<Self, ListingValidationError> {
        let sort_by = sort_by.unwrap_or(Self::DEFAULT_SORT);
        // Locations share the named-group whitelist.
        if !GroupBy::Location.allows(sort_by) {
            return Err(ListingValidationError::SortNotAllowed {
                sort: sort_by,
                scope: "locations",
            });
        }
        Ok(Self {
            sort_by,
            window: PageWindow::for_page(page)?,
        })
    }

    pub const fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub const fn window(&self) -> PageWindow {
        self.window
    }

    pub const fn order_plan(&self) -> OrderPlan {
        plan_for(GroupBy::Location, self.sort_by)
    }
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod tests;
