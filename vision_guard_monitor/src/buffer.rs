//! Fixed-capacity rolling buffer behind the availability chart

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// One point on the availability chart.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub time: String,
    pub availability: f64,
}

/// Ordered chart history; appends at the tail and evicts from the head
/// once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct ChartBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

/// Hour labels of the placeholder series shown before the first fetch.
const SEED_LABELS: [&str; 9] = [
    "08:30", "09:30", "10:30", "11:30", "12:30", "13:30", "14:30", "15:30", "16:30",
];

impl ChartBuffer {
    /// Create an empty buffer
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a buffer pre-filled with placeholder points so the chart
    /// has something to draw before the first successful fetch.
    pub fn seeded(capacity: usize) -> Self {
        let mut buffer = Self::new(capacity);
        for (i, label) in SEED_LABELS.iter().enumerate() {
            let value = 85.0 + (i as f64 * 0.5).sin() * 10.0;
            buffer.push(ChartPoint {
                time: label.to_string(),
                availability: crate::metrics::round1(value),
            });
        }
        buffer
    }

    /// Append a point, evicting the oldest if the buffer is full
    pub fn push(&mut self, point: ChartPoint) {
        if self.points.len() >= self.capacity {
            if let Some(evicted) = self.points.pop_front() {
                debug!("Chart buffer full, evicting point at {}", evicted.time);
            }
        }
        self.points.push_back(point);
    }

    /// Overwrite the availability of the newest point in place.
    ///
    /// Returns false when the buffer is empty.
    pub fn patch_last(&mut self, availability: f64) -> bool {
        match self.points.back_mut() {
            Some(last) => {
                last.availability = availability;
                true
            }
            None => false,
        }
    }

    pub fn last(&self) -> Option<&ChartPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points oldest first
    pub fn points(&self) -> Vec<ChartPoint> {
        self.points.iter().cloned().collect()
    }
}
