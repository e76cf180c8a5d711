use serde::{Deserialize, Serialize};
use time::Date;

use crate::ValidationError;

/// One dated closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(with = "super::iso_date")]
    pub date: Date,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: Date, close: f64) -> Result<Self, ValidationError> {
        if !close.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "close" });
        }
        Ok(Self { date, close })
    }
}

/// Closing-price history, most recent first, one point per date.
///
/// The series is only as dense as its source; gaps are not filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Orders points most-recent-first and keeps the first point seen for each date.
    pub fn from_points(mut points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        if points.is_empty() {
            return Err(ValidationError::EmptySeries);
        }

        // stable: the first occurrence of a date survives dedup
        points.sort_by(|left, right| right.date.cmp(&left.date));
        points.dedup_by(|later, earlier| later.date == earlier.date);

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point `offset` observations back from the latest; `0` is the latest.
    pub fn get(&self, offset: usize) -> Option<&PricePoint> {
        self.points.get(offset)
    }

    pub fn latest(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices oldest-first, the order charting collaborators expect.
    pub fn chronological(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter().rev()
    }
}
