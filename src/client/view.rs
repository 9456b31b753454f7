//! Date grouping for display.

use chrono::{Duration, NaiveDate};

use crate::shared::Message;

/// Messages sent on one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub messages: Vec<Message>,
}

/// Group an ascending message sequence by calendar date
pub fn group_by_date(messages: &[Message]) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    for message in messages {
        let date = message.timestamp.date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.messages.push(message.clone()),
            _ => groups.push(DateGroup {
                date,
                messages: vec![message.clone()],
            }),
        }
    }
    groups
}

/// Heading shown above a date group
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.checked_sub_signed(Duration::days(1)) {
        "Yesterday".to_string()
    } else {
        date.format("%B %-d, %Y").to_string()
    }
}
