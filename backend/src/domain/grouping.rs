//! Grouped result rows and their in-process ordering.
//!
//! Store adapters that cannot push ordering down (the in-memory store, for
//! one) sort with [`compare_groups`]; the SQL adapter emits the same plan as
//! `ORDER BY` terms.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use super::listing::{Direction, OrderKey, OrderPlan};
use super::{BirdId, LocationId};

/// Identifier of a group, serialised as the bare value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    /// Calendar date, rendered `YYYY-MM-DD`.
    Date(NaiveDate),
    Bird(BirdId),
    Location(LocationId),
}

/// One `{id, text, count}` row of a grouped listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SightingGroup {
    pub id: GroupKey,
    pub text: String,
    pub count: u64,
}

impl SightingGroup {
    pub fn new(id: GroupKey, text: impl Into<String>, count: u64) -> Self {
        Self {
            id,
            text: text.into(),
            count,
        }
    }
}

/// ASCII case-insensitive label order with a byte-wise tie-break.
///
/// Non-ASCII characters are compared by their UTF-8 bytes without case
/// folding, the same as `lower()` under PostgreSQL's `"C"` collation.
pub fn compare_labels(left: &str, right: &str) -> Ordering {
    left.to_ascii_lowercase()
        .cmp(&right.to_ascii_lowercase())
        .then_with(|| left.cmp(right))
}

/// Compare two groups under `plan`.
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use birdwatch::domain::{compare_groups, BirdId, GroupKey, SightingGroup, SightingListing};
///
/// let plan = SightingListing::compose(Some("bird"), Some("alphaAsc"), None)
///     .expect("valid")
///     .order_plan();
/// let robin = SightingGroup::new(GroupKey::Bird(BirdId::new(2).expect("id")), "robin", 1);
/// let wren = SightingGroup::new(GroupKey::Bird(BirdId::new(1).expect("id")), "Wren", 5);
/// assert_eq!(compare_groups(plan, &robin, &wren), Ordering::Less);
/// ```
pub fn compare_groups(plan: OrderPlan, left: &SightingGroup, right: &SightingGroup) -> Ordering {
    plan.iter().fold(Ordering::Equal, |acc, term| {
        acc.then_with(|| {
            let ordering = match term.key {
                OrderKey::Key => left.id.cmp(&right.id),
                OrderKey::Label => compare_labels(&left.text, &right.text),
                OrderKey::Count => left.count.cmp(&right.count),
            };
            match term.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
    })
}

/// Sort groups in place under `plan`.
pub fn sort_groups(groups: &mut [SightingGroup], plan: OrderPlan) {
    groups.sort_by(|left, right| compare_groups(plan, left, right));
}
