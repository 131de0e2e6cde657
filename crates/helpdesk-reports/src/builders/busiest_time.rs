use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use helpdesk_common::{Conversation, Result};
use serde::Serialize;

use super::{MetricResult, ReportBuilder, BUSIEST_TIME_OF_DAY};
use crate::date_range::MetricDateRange;

const DAYS: usize = 7;
const INTERVALS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusiestTimeOfDayResult {
    /// Rows Monday..Sunday, columns two-hour intervals starting at midnight
    pub data: Vec<Vec<u64>>,
    pub max_value: u64,
}

/// Day-of-week by time-of-day heat map of new conversations
pub struct BusiestTimeOfDayBuilder {
    range: MetricDateRange,
    matrix: [[u64; INTERVALS]; DAYS],
}

impl BusiestTimeOfDayBuilder {
    pub fn new(range: MetricDateRange) -> Self {
        Self {
            range,
            matrix: [[0; INTERVALS]; DAYS],
        }
    }
}

#[async_trait]
impl ReportBuilder for BusiestTimeOfDayBuilder {
    fn name(&self) -> &str {
        BUSIEST_TIME_OF_DAY
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            let local = self.range.local(conversation.created_at);
            let day = local.weekday().num_days_from_monday() as usize;
            let interval = (local.hour() / 2) as usize;
            self.matrix[day][interval] += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        let max_value = self.matrix.iter().flatten().copied().max().unwrap_or(0);

        MetricResult::BusiestTimeOfDay(BusiestTimeOfDayResult {
            data: self.matrix.iter().map(|row| row.to_vec()).collect(),
            max_value,
        })
    }
}
