//! Time zone identity.
//!
//! Dates and times archive as `chrono` values directly; a zone is carried
//! as its IANA identifier so the reader can resolve it against its own
//! zone database.

/// An IANA time zone identifier, e.g. `America/Chicago`.
///
/// An empty id means "local time" and is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TimeZoneId(pub String);

impl TimeZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimeZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
