//! Domain records: investors, clients, introductions, booking sessions, meetings.

pub mod booking;
pub mod client;
pub mod introduction;
pub mod investor;
pub mod meeting;

use std::collections::BTreeSet;

pub use booking::{BookingSession, BookingStatus, MeetingData, NewBookingSession, Provenance};
pub use client::{Client, ClientStatus, NewClient};
pub use introduction::{Introduction, IntroductionStatus};
pub use investor::{Investor, InvestorPatch, InvestorStatus, NewInvestor, SizeRange};
pub use meeting::{Meeting, MeetingDraft, MeetingStatus};

/// Trimmed, deduplicated set of labels; blank entries are dropped.
pub fn clean_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|it| {
            let t = it.as_ref().trim();
            (!t.is_empty()).then(|| t.to_string())
        })
        .collect()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
