//! Secondary number source.
//!
//! Some platforms withhold the number from the call state broadcast but
//! hand it to a call screening hook shortly before. The hook reports the
//! number here and the monitor picks it up when the Ringing event has none.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How long a reported number stays usable.
pub const SCREENING_TTL: Duration = Duration::from_secs(30);

pub struct ScreeningChannel {
    slot: Mutex<Option<(String, Instant)>>,
    ttl: Duration,
}

impl Default for ScreeningChannel {
    fn default() -> Self {
        Self::with_ttl(SCREENING_TTL)
    }
}

impl ScreeningChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<(String, Instant)>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remember `number` as the latest screened caller. Blank input is ignored.
    pub fn report(&self, number: &str) {
        let number = number.trim();
        if number.is_empty() {
            return;
        }
        tracing::debug!(number = %number, "screening number reported");
        *self.lock() = Some((number.to_string(), Instant::now()));
    }

    /// The reported number, if it has not expired.
    pub fn resolve(&self) -> Option<String> {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some((number, at)) if at.elapsed() < self.ttl => Some(number.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn clear(&self) {
        self.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_resolve() {
        let channel = ScreeningChannel::new();
        assert_eq!(channel.resolve(), None);

        channel.report(" 15551234567 ");
        assert_eq!(channel.resolve().as_deref(), Some("15551234567"));
        // Resolving does not consume.
        assert_eq!(channel.resolve().as_deref(), Some("15551234567"));
    }

    #[test]
    fn test_blank_report_ignored() {
        let channel = ScreeningChannel::new();
        channel.report("1");
        channel.report("   ");
        assert_eq!(channel.resolve().as_deref(), Some("1"));
    }

    #[test]
    fn test_expired_number_dropped() {
        let channel = ScreeningChannel::with_ttl(Duration::from_millis(20));
        channel.report("1");
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(channel.resolve(), None);
    }

    #[test]
    fn test_clear() {
        let channel = ScreeningChannel::new();
        channel.report("1");
        channel.clear();
        assert_eq!(channel.resolve(), None);
    }
}
