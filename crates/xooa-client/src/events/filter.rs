use {super::GatewayEvent, regex::Regex};

/// Selects which gateway events reach the subscriber.
///
/// Events are matched on their `eventName` field. Events without a name
/// only pass [`EventFilter::All`].
#[derive(Clone, Debug, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Exact event name.
    Name(String),
    /// Regular expression searched in the event name.
    Pattern(Regex),
}

impl EventFilter {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, event: &GatewayEvent) -> bool {
        match (self, event.event_name.as_deref()) {
            (Self::All, _) => true,
            (_, None) => false,
            (Self::Name(expected), Some(name)) => expected == name,
            (Self::Pattern(pattern), Some(name)) => pattern.is_match(name),
        }
    }
}
