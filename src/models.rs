use jiff::civil::{Date, DateTime, Time};

pub mod project;
pub mod snapshot;
pub mod task;
pub mod user;

/// Server-assigned record identifier
pub type EntityId = i64;

/// Identifier carried by records that have not been persisted yet
pub const NEW_ENTITY_ID: EntityId = 0;

/// Records that can be picked by id or by name
pub trait Named {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
}

/// Formats a bare date the way the remote expects it: midnight of that day.
pub fn date_to_wire(date: Date) -> String {
    date.to_datetime(Time::midnight()).to_string()
}

/// Parses a wire date-time (or bare date) keeping only the date portion.
pub fn date_from_wire(raw: &str) -> Option<Date> {
    let date_part = raw.split('T').next().unwrap_or(raw).trim();
    date_part.parse::<Date>().ok()
}

/// Parses the date typed into a form field. Accepts a full date-time too,
/// in which case the time is discarded.
pub fn date_from_form(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    trimmed
        .parse::<Date>()
        .ok()
        .or_else(|| trimmed.parse::<DateTime>().ok().map(|dt| dt.date()))
}
