use async_trait::async_trait;
use helpdesk_common::{average, percentage, round_to, Conversation, ReplyTimeUnit, Result};
use serde::Serialize;

use super::{MetricResult, ReportBuilder, FIRST_REPLY_TIMES};

/// Upper bounds in seconds with their labels; the last band is open-ended
const MINUTE_BANDS: &[(Option<i64>, &str)] = &[
    (Some(60), "0-1"),
    (Some(5 * 60), "1-5"),
    (Some(15 * 60), "5-15"),
    (Some(60 * 60), "15-60"),
    (None, "60+"),
];

const HOUR_BANDS: &[(Option<i64>, &str)] = &[
    (Some(3600), "0-1"),
    (Some(8 * 3600), "1-8"),
    (Some(24 * 3600), "8-24"),
    (None, "24+"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstReplyBand {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstReplyTimesResult {
    pub unit: ReplyTimeUnit,
    /// Mean delay to the first non-creator reply, in seconds
    pub average_time: f64,
    pub total: u64,
    pub bands: Vec<FirstReplyBand>,
}

/// Distribution of delays until someone other than the customer replied
pub struct FirstReplyTimesBuilder {
    unit: ReplyTimeUnit,
    bands: &'static [(Option<i64>, &'static str)],
    counts: Vec<u64>,
    total_seconds: i64,
    measured: u64,
}

impl FirstReplyTimesBuilder {
    pub fn new(unit: ReplyTimeUnit) -> Self {
        let bands = match unit {
            ReplyTimeUnit::Minutes => MINUTE_BANDS,
            ReplyTimeUnit::Hours => HOUR_BANDS,
        };

        Self {
            unit,
            bands,
            counts: vec![0; bands.len()],
            total_seconds: 0,
            measured: 0,
        }
    }

    /// Index of the first band whose upper bound holds `seconds`
    fn band_for(&self, seconds: i64) -> usize {
        self.bands
            .iter()
            .position(|(upper, _)| upper.map_or(true, |upper| seconds <= upper))
            .unwrap_or(self.bands.len() - 1)
    }
}

#[async_trait]
impl ReportBuilder for FirstReplyTimesBuilder {
    fn name(&self) -> &str {
        FIRST_REPLY_TIMES
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            let Some(first) = conversation.non_creator_replies().next() else {
                continue;
            };

            let seconds = (first.created_at - conversation.created_at).num_seconds().max(0);
            let band = self.band_for(seconds);
            self.counts[band] += 1;
            self.total_seconds += seconds;
            self.measured += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        let measured = self.measured;
        let bands = self
            .bands
            .iter()
            .zip(&self.counts)
            .map(|((_, label), count)| FirstReplyBand {
                label: (*label).to_string(),
                count: *count,
                percentage: round_to(percentage(*count, measured), 1),
            })
            .collect();

        MetricResult::FirstReplyTimes(FirstReplyTimesResult {
            unit: self.unit,
            average_time: round_to(average(self.total_seconds as f64, measured), 1),
            total: measured,
            bands,
        })
    }
}
