//! Shift windows, per-product holidays, and the "next working minute"
//! oracle. Uses direct arithmetic rather than a general boolean-combinator
//! tree: the only combination this domain needs is "shift window
//! intersected with not-a-holiday", which doesn't warrant one.

use chrono::Duration;

use crate::model::{Product, Shift};
use crate::time::Clock;
use qtty::{Minute, Quantity};

/// Converts axis minutes to a (calendar day, minute-of-day) pair and back,
/// and answers shift/working-day feasibility questions against a product's
/// calendar and a team's worked shifts.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    clock: Clock,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            clock: Clock::default(),
        }
    }
}

impl Calendar {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Minute-of-day (`[0, 1440)`) for an axis instant.
    ///
    /// Goes through the actual wall-clock instant rather than taking
    /// `axis mod 1440` directly: the axis's zero point is the schedule
    /// epoch at `06:00`, not midnight, so a raw modulus would misalign
    /// every shift-window check by the epoch's own time-of-day offset.
    pub fn minute_of_day(&self, axis: Quantity<Minute>) -> u32 {
        use chrono::Timelike;
        let when = self.clock.from_axis(axis);
        when.hour() * 60 + when.minute()
    }

    /// Calendar date for an axis instant.
    pub fn date_of(&self, axis: Quantity<Minute>) -> chrono::NaiveDate {
        self.clock.from_axis(axis).date()
    }

    /// True if `axis` falls on a working day for `product`: a weekday not
    /// in its holiday set.
    pub fn is_working_minute(&self, axis: Quantity<Minute>, product: &Product) -> bool {
        product.is_working_day(self.date_of(axis))
    }

    /// True if `axis` falls within any of `shifts`.
    pub fn shift_covering(&self, axis: Quantity<Minute>, shifts: &[Shift]) -> Option<Shift> {
        let minute_of_day = self.minute_of_day(axis);
        shifts
            .iter()
            .copied()
            .find(|s| s.covers_minute_of_day(minute_of_day))
    }

    /// Advances `axis` forward to the next minute that is both a working
    /// day for `product` and within one of `shifts`, never moving
    /// backwards. Returns `None` if no such minute exists within
    /// `max_days` (a bounded search; callers translate exhaustion into the
    /// scheduler's 3-retry semantics rather than looping forever).
    pub fn next_working_minute(
        &self,
        mut axis: Quantity<Minute>,
        product: &Product,
        shifts: &[Shift],
        max_days: i64,
    ) -> Option<Quantity<Minute>> {
        if shifts.is_empty() {
            return None;
        }
        let start_date = self.date_of(axis);
        loop {
            let date = self.date_of(axis);
            if (date - start_date).num_days() > max_days {
                return None;
            }
            if product.is_working_day(date) && self.shift_covering(axis, shifts).is_some() {
                return Some(axis);
            }
            axis = axis + Quantity::<Minute>::new(1.0);
        }
    }

    /// Snaps `date` to `06:00` of the same calendar day, as an axis
    /// instant (used for late-part on-dock flooring).
    pub fn snap_to_six_am(&self, date: chrono::NaiveDate) -> Quantity<Minute> {
        self.clock.to_axis(date.and_hms_opt(6, 0, 0).unwrap())
    }

    /// `date + days`, used for the late-part delay Δ.
    pub fn add_days(&self, date: chrono::NaiveDate, days: i64) -> chrono::NaiveDate {
        date + Duration::days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn product() -> Product {
        Product {
            product_id: "A".into(),
            delivery_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            incomplete_range: (1, 10),
            holidays: BTreeSet::new(),
        }
    }

    #[test]
    fn epoch_is_first_working_minute_on_s1() {
        let calendar = Calendar::default();
        let axis = calendar.clock().to_axis(crate::time::epoch());
        assert!(calendar.is_working_minute(axis, &product()));
        assert_eq!(calendar.shift_covering(axis, &Shift::ALL), Some(Shift::S1));
    }

    #[test]
    fn next_working_minute_skips_weekend() {
        let calendar = Calendar::default();
        let product = product();
        // 2025-08-22 is a Friday; starting at 15:00 (past S1's 14:30 close)
        // on Friday looking only at S1 should roll forward to Monday 06:00.
        let friday_afternoon = calendar
            .clock()
            .to_axis(NaiveDate::from_ymd_opt(2025, 8, 22).unwrap().and_hms_opt(15, 0, 0).unwrap());
        let next = calendar
            .next_working_minute(friday_afternoon, &product, &[Shift::S1], 10)
            .unwrap();
        assert_eq!(calendar.date_of(next), NaiveDate::from_ymd_opt(2025, 8, 25).unwrap());
        assert_eq!(calendar.minute_of_day(next), 360);
    }
}
