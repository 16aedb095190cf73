//! Bills grouped by due day, for the month calendar view.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::client::Bill;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillDay {
    pub date: NaiveDate,
    pub bills: Vec<Bill>,
    pub total: f64,
}

/// Groups `bills` by due date, keeping only days inside `start..=end`.
///
/// Days come out in date order; bills on the same day keep their input order.
/// Days without bills are not listed.
pub fn bills_by_day(bills: &[Bill], start: NaiveDate, end: NaiveDate) -> Vec<BillDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Bill>> = BTreeMap::new();
    for bill in bills {
        if bill.due_date < start || bill.due_date > end {
            tracing::debug!(id = %bill.id, due = %bill.due_date, "bill outside calendar range");
            continue;
        }
        days.entry(bill.due_date).or_default().push(bill.clone());
    }
    days.into_iter()
        .map(|(date, bills)| BillDay {
            date,
            total: bills.iter().map(|b| b.amount).sum(),
            bills,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BillId;

    fn bill(id: i64, name: &str, amount: f64, due: (i32, u32, u32)) -> Bill {
        Bill {
            id: BillId::new(id),
            name: name.to_string(),
            amount,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            category: String::new(),
            is_recurring: false,
            frequency: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn groups_by_day_in_date_order() {
        let bills = [
            bill(1, "Rent", 1200.0, (2025, 3, 28)),
            bill(2, "Internet", 39.9, (2025, 3, 15)),
            bill(3, "Phone", 20.1, (2025, 3, 15)),
        ];
        let days = bills_by_day(&bills, d(2025, 3, 1), d(2025, 3, 31));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, d(2025, 3, 15));
        let names = days[0].bills.iter().map(|b| b.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Internet", "Phone"]);
        assert!((days[0].total - 60.0).abs() < 1e-9);
        assert_eq!(days[1].bills[0].name, "Rent");
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let bills = [
            bill(1, "First", 1.0, (2025, 2, 1)),
            bill(2, "Last", 2.0, (2025, 2, 28)),
            bill(3, "Next month", 3.0, (2025, 3, 1)),
        ];
        let days = bills_by_day(&bills, d(2025, 2, 1), d(2025, 2, 28));
        assert_eq!(days.len(), 2);
        assert!(bills_by_day(&bills, d(2025, 4, 1), d(2025, 4, 30)).is_empty());
    }
}
