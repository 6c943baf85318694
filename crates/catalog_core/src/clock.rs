use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Source of "now" for everything that stamps a timestamp.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    fn timestamp(&self) -> String {
        format_timestamp(self.now())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// RFC 3339 in UTC. Falls back to unix seconds for instants RFC 3339 cannot express.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    utc.format(&Rfc3339)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}
