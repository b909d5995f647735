//! Eligibility check for playlist items

use crate::playlist::PlaylistItem;
use chrono::NaiveDateTime;

/// Decide whether `item` may be rendered at `now`.
///
/// Inactive items are never valid and items without a schedule always are.
/// Otherwise each present bound is checked on its own and all must hold.
/// Time bounds are compared literally: a window whose start is later than
/// its end does not wrap past midnight.
pub fn is_valid(item: &PlaylistItem, now: NaiveDateTime) -> bool {
    if !item.active {
        return false;
    }

    let schedule = &item.schedule;
    if schedule.is_empty() {
        return true;
    }

    let today = now.date();
    let time = now.time();

    if schedule.start_date().is_some_and(|start| today < start) {
        return false;
    }
    if schedule.end_date().is_some_and(|end| today > end) {
        return false;
    }
    if schedule.start_time().is_some_and(|start| time < start) {
        return false;
    }
    if schedule.end_time().is_some_and(|end| time > end) {
        return false;
    }

    true
}
