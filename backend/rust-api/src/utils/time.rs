use chrono::{DateTime, Local, TimeZone, Timelike};

/// Zero-padded `HH:MM:SS` of the given wall-clock instant.
pub fn clock_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("{:02}:{:02}:{:02}", at.hour(), at.minute(), at.second())
}

pub fn last_saved_status(at: &DateTime<Local>) -> String {
    format!("Last saved at {}.", clock_time(at))
}

pub fn submitted_status(at: &DateTime<Local>) -> String {
    format!("Submitted at {}.", clock_time(at))
}
