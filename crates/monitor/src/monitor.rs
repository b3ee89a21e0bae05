use crate::event::CallEvent;
use crate::ports::{CallerLookup, OverlaySink, PermissionGate};
use crate::screening::ScreeningChannel;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPhase {
    #[default]
    Idle,
    Ringing,
}

/// Outcome of handling one [`CallEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Overlay permission is missing; nothing happened.
    Denied,
    /// Caller found and the overlay was asked to show.
    Shown,
    /// Number known but not in the directory.
    Miss,
    /// Ringing with no number on either channel; still idle.
    Unresolved,
    /// Ringing while already ringing.
    Duplicate,
    /// Call answered or ended; overlay hidden.
    Hidden,
}

/// Call state machine.
///
/// Events must be delivered one at a time, which [`crate::EventPump`]
/// guarantees.
pub struct CallMonitor {
    lookup: Arc<dyn CallerLookup>,
    overlay: Arc<dyn OverlaySink>,
    permission: Arc<dyn PermissionGate>,
    screening: Arc<ScreeningChannel>,
    phase: CallPhase,
    number: Option<String>,
}

impl CallMonitor {
    pub fn new(
        lookup: Arc<dyn CallerLookup>,
        overlay: Arc<dyn OverlaySink>,
        permission: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            lookup,
            overlay,
            permission,
            screening: Arc::new(ScreeningChannel::new()),
            phase: CallPhase::Idle,
            number: None,
        }
    }

    pub fn with_screening(mut self, screening: Arc<ScreeningChannel>) -> Self {
        self.screening = screening;
        self
    }

    pub fn screening(&self) -> Arc<ScreeningChannel> {
        Arc::clone(&self.screening)
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    /// Number of the call being tracked, if any.
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn handle(&mut self, event: CallEvent) -> Transition {
        if !self.permission.has_overlay_permission() {
            tracing::debug!(?event, "no overlay permission, ignoring call event");
            return Transition::Denied;
        }

        let transition = match event {
            CallEvent::Ringing { number } => self.on_ringing(number.as_deref()),
            CallEvent::Active | CallEvent::Ended => self.on_finished(),
        };
        tracing::debug!(?transition, phase = ?self.phase, "call event handled");
        transition
    }

    fn on_ringing(&mut self, number: Option<&str>) -> Transition {
        if self.phase == CallPhase::Ringing {
            return Transition::Duplicate;
        }

        let Some(number) = self.resolve_number(number) else {
            tracing::info!("incoming call without a number");
            return Transition::Unresolved;
        };

        self.phase = CallPhase::Ringing;
        self.number = Some(number.clone());

        match self.lookup.lookup(&number) {
            Some(record) => {
                tracing::info!(number = %number, caller = %record.name, "caller identified");
                self.overlay.show(record);
                Transition::Shown
            }
            None => {
                tracing::debug!(number = %number, "caller not in directory");
                Transition::Miss
            }
        }
    }

    fn resolve_number(&self, primary: Option<&str>) -> Option<String> {
        primary
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| self.screening.resolve())
    }

    fn on_finished(&mut self) -> Transition {
        self.phase = CallPhase::Idle;
        self.number = None;
        self.screening.clear();
        self.overlay.hide();
        Transition::Hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SharedPermission;
    use callmark_directory::CallerRecord;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapLookup(HashMap<String, CallerRecord>);

    impl CallerLookup for MapLookup {
        fn lookup(&self, number: &str) -> Option<CallerRecord> {
            self.0.get(number).cloned()
        }
    }

    #[derive(Debug, PartialEq)]
    enum Command {
        Show(String),
        Hide,
    }

    #[derive(Default)]
    struct CommandLog(Mutex<Vec<Command>>);

    impl OverlaySink for CommandLog {
        fn show(&self, record: CallerRecord) {
            self.0.lock().unwrap().push(Command::Show(record.name));
        }

        fn hide(&self) {
            self.0.lock().unwrap().push(Command::Hide);
        }
    }

    impl CommandLog {
        fn take(&self) -> Vec<Command> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn setup() -> (CallMonitor, Arc<CommandLog>, SharedPermission) {
        let mut entries = HashMap::new();
        entries.insert("1".to_string(), CallerRecord::new("1", "Alice"));
        let sink = Arc::new(CommandLog::default());
        let permission = SharedPermission::new(true);
        let monitor = CallMonitor::new(
            Arc::new(MapLookup(entries)),
            sink.clone(),
            Arc::new(permission.clone()),
        );
        (monitor, sink, permission)
    }

    #[test]
    fn test_ringing_hit_shows() {
        let (mut monitor, sink, _) = setup();

        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Shown);
        assert_eq!(monitor.phase(), CallPhase::Ringing);
        assert_eq!(monitor.number(), Some("1"));
        assert_eq!(sink.take(), vec![Command::Show("Alice".to_string())]);
    }

    #[test]
    fn test_duplicate_ringing_shows_once() {
        let (mut monitor, sink, _) = setup();

        monitor.handle(CallEvent::ringing("1"));
        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Duplicate);
        assert_eq!(monitor.handle(CallEvent::ringing("2")), Transition::Duplicate);
        assert_eq!(sink.take(), vec![Command::Show("Alice".to_string())]);
        assert_eq!(monitor.number(), Some("1"));
    }

    #[test]
    fn test_miss_still_rings() {
        let (mut monitor, sink, _) = setup();

        assert_eq!(monitor.handle(CallEvent::ringing("2")), Transition::Miss);
        assert_eq!(monitor.phase(), CallPhase::Ringing);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_end_hides_and_resets() {
        let (mut monitor, sink, _) = setup();

        monitor.handle(CallEvent::ringing("1"));
        assert_eq!(monitor.handle(CallEvent::Ended), Transition::Hidden);
        assert_eq!(monitor.phase(), CallPhase::Idle);
        assert_eq!(monitor.number(), None);
        assert_eq!(
            sink.take(),
            vec![Command::Show("Alice".to_string()), Command::Hide]
        );

        // A new call can be identified again.
        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Shown);
    }

    #[test]
    fn test_active_hides() {
        let (mut monitor, sink, _) = setup();

        monitor.handle(CallEvent::ringing("1"));
        sink.take();
        assert_eq!(monitor.handle(CallEvent::Active), Transition::Hidden);
        assert_eq!(monitor.phase(), CallPhase::Idle);
        assert_eq!(sink.take(), vec![Command::Hide]);
    }

    #[test]
    fn test_end_while_idle_still_hides() {
        let (mut monitor, sink, _) = setup();

        assert_eq!(monitor.handle(CallEvent::Ended), Transition::Hidden);
        assert_eq!(monitor.handle(CallEvent::Ended), Transition::Hidden);
        assert_eq!(sink.take(), vec![Command::Hide, Command::Hide]);
    }

    #[test]
    fn test_permission_denied_is_inert() {
        let (mut monitor, sink, permission) = setup();
        permission.set(false);

        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Denied);
        assert_eq!(monitor.handle(CallEvent::Ended), Transition::Denied);
        assert_eq!(monitor.phase(), CallPhase::Idle);
        assert!(sink.take().is_empty());

        permission.set(true);
        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Shown);
    }

    #[test]
    fn test_withheld_number_uses_screening() {
        let (mut monitor, sink, _) = setup();

        assert_eq!(
            monitor.handle(CallEvent::ringing_withheld()),
            Transition::Unresolved
        );
        assert_eq!(monitor.phase(), CallPhase::Idle);

        monitor.screening().report("1");
        assert_eq!(
            monitor.handle(CallEvent::ringing_withheld()),
            Transition::Shown
        );
        assert_eq!(sink.take(), vec![Command::Show("Alice".to_string())]);
    }

    #[test]
    fn test_primary_number_wins_over_screening() {
        let (mut monitor, _, _) = setup();

        monitor.screening().report("2");
        assert_eq!(monitor.handle(CallEvent::ringing("1")), Transition::Shown);
        assert_eq!(monitor.number(), Some("1"));
    }

    #[test]
    fn test_blank_number_falls_back() {
        let (mut monitor, _, _) = setup();

        assert_eq!(
            monitor.handle(CallEvent::ringing("  ")),
            Transition::Unresolved
        );
        monitor.screening().report("1");
        assert_eq!(monitor.handle(CallEvent::ringing("")), Transition::Shown);
    }

    #[test]
    fn test_end_clears_screening() {
        let (mut monitor, _, _) = setup();

        monitor.screening().report("1");
        monitor.handle(CallEvent::Ended);
        assert_eq!(monitor.screening().resolve(), None);
    }
}
