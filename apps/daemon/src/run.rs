//! `callmark run`: feed stdin events through the call pipeline.

use crate::cli::{open_store, Cli};
use crate::wire::{parse_line, WireMessage};
use anyhow::Context;
use callmark_directory::BlockingLookup;
use callmark_monitor::{
    CallEvent, CallMonitor, CallerLookup, EventPump, PumpMessage, ScreeningChannel,
    SharedPermission, Transition, TransitionCallback,
};
use callmark_overlay::{NullSurface, OverlayController, RecordingSurface, SurfaceProbe};
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Everything the stdin reader talks to.
///
/// Every message is queued to the pump, so side-channel updates apply in
/// line order relative to call events.
struct Pipeline {
    events: Sender<PumpMessage>,
    screening: Arc<ScreeningChannel>,
    permission: SharedPermission,
    controller: Arc<OverlayController>,
}

impl Pipeline {
    /// Start a pump over `lookup` and `controller`.
    fn start(
        lookup: Arc<dyn CallerLookup>,
        controller: Arc<OverlayController>,
        granted: bool,
        callback: TransitionCallback,
    ) -> (Self, EventPump) {
        let permission = SharedPermission::new(granted);
        let screening = Arc::new(ScreeningChannel::new());
        let monitor = CallMonitor::new(lookup, controller.clone(), Arc::new(permission.clone()))
            .with_screening(Arc::clone(&screening));

        let (events, rx) = crossbeam_channel::unbounded();
        let mut pump = EventPump::new();
        pump.start_with_callback(monitor, rx, callback);

        let pipeline = Self {
            events,
            screening,
            permission,
            controller,
        };
        (pipeline, pump)
    }

    /// Queue one message. Returns `false` once the pump is gone.
    fn apply(&self, message: WireMessage) -> bool {
        let queued = match message {
            WireMessage::CallState(event) => PumpMessage::from(event),
            WireMessage::Screening { number } => {
                let screening = Arc::clone(&self.screening);
                PumpMessage::run(move || screening.report(&number))
            }
            WireMessage::Permission { granted } => {
                let permission = self.permission.clone();
                PumpMessage::run(move || permission.set(granted))
            }
            WireMessage::Dismiss => {
                let controller = Arc::clone(&self.controller);
                PumpMessage::run(move || dismiss_current(&controller))
            }
        };

        if self.events.send(queued).is_err() {
            tracing::warn!("event pump stopped, no longer accepting messages");
            return false;
        }
        true
    }
}

fn dismiss_current(controller: &OverlayController) {
    match controller.current().and_then(|s| s.window) {
        Some(handle) => {
            controller.dismiss(handle);
        }
        None => tracing::debug!("dismiss without a live overlay"),
    }
}

pub fn run(cli: &Cli, runtime: &Runtime) -> anyhow::Result<()> {
    let store = Arc::new(open_store(cli)?);
    let lookup =
        BlockingLookup::new(store, runtime.handle().clone()).with_timeout(cli.lookup_timeout());

    let timings = cli.timings();
    let (controller, probe) = build_controller(cli, runtime);
    let controller = Arc::new(controller);

    let log_transition: TransitionCallback = Arc::new(|event: &CallEvent, transition: Transition| {
        tracing::info!(?event, ?transition, "call event");
    });
    let (pipeline, mut pump) = Pipeline::start(
        Arc::new(lookup),
        Arc::clone(&controller),
        !cli.no_permission,
        log_transition,
    );

    tracing::info!(
        present_delay = ?timings.present_delay,
        auto_dismiss = ?timings.auto_dismiss,
        dry_run = cli.dry_run,
        "reading call events from stdin"
    );

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match parse_line(&line) {
            Ok(Some(message)) => {
                if !pipeline.apply(message) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, line = %line, "skipping malformed event"),
        }
    }

    // Let queued events drain, then give a pending overlay time to finish.
    drop(pipeline);
    pump.join();
    wait_for_idle(&controller, timings.present_delay + timings.auto_dismiss);

    if let Some(probe) = probe {
        // Hide anything still up so the report shows its release.
        controller.hide();
        drop(controller);
        println!("{}", serde_json::to_string_pretty(&probe.calls())?);
    }

    tracing::info!("stdin closed, exiting");
    Ok(())
}

fn build_controller(cli: &Cli, runtime: &Runtime) -> (OverlayController, Option<SurfaceProbe>) {
    let handle = runtime.handle().clone();
    if cli.dry_run {
        let surface = RecordingSurface::new();
        let probe = surface.probe();
        let controller =
            OverlayController::with_settings(surface, handle, cli.timings(), cli.app_name.clone());
        (controller, Some(probe))
    } else {
        let controller = OverlayController::with_settings(
            NullSurface::default(),
            handle,
            cli.timings(),
            cli.app_name.clone(),
        );
        (controller, None)
    }
}

fn wait_for_idle(controller: &OverlayController, limit: Duration) {
    let deadline = Instant::now() + limit + Duration::from_millis(100);
    while controller.current().is_some() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callmark_directory::CallerRecord;
    use callmark_overlay::OverlayTimings;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Directory that answers only after a delay.
    struct SlowLookup {
        records: HashMap<String, CallerRecord>,
        delay: Duration,
    }

    impl CallerLookup for SlowLookup {
        fn lookup(&self, number: &str) -> Option<CallerRecord> {
            std::thread::sleep(self.delay);
            self.records.get(number).cloned()
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn start(rt: &Runtime, granted: bool) -> (Pipeline, EventPump, Arc<Mutex<Vec<Transition>>>) {
        let mut records = HashMap::new();
        records.insert(
            "15551234567".to_string(),
            CallerRecord::new("15551234567", "Alice"),
        );
        let lookup = SlowLookup {
            records,
            delay: Duration::from_millis(150),
        };

        let controller = Arc::new(OverlayController::with_settings(
            RecordingSurface::new(),
            rt.handle().clone(),
            OverlayTimings {
                present_delay: Duration::from_secs(10),
                auto_dismiss: Duration::from_secs(10),
            },
            "Callmark",
        ));

        let transitions = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&transitions);
        let callback: TransitionCallback =
            Arc::new(move |_event: &CallEvent, transition: Transition| {
                seen.lock().unwrap().push(transition);
            });

        let (pipeline, pump) = Pipeline::start(Arc::new(lookup), controller, granted, callback);
        (pipeline, pump, transitions)
    }

    fn feed(pipeline: Pipeline, mut pump: EventPump, lines: &[&str]) {
        for line in lines {
            let message = parse_line(line).unwrap().unwrap();
            assert!(pipeline.apply(message));
        }
        drop(pipeline);
        pump.join();
    }

    #[test]
    fn test_screening_applies_in_line_order_behind_slow_lookup() {
        let rt = runtime();
        let (pipeline, pump, transitions) = start(&rt, true);

        feed(
            pipeline,
            pump,
            &[
                r#"{"type":"callState","state":"RINGING","number":"999"}"#,
                r#"{"type":"callState","state":"ENDED"}"#,
                r#"{"type":"screening","number":"15551234567"}"#,
                r#"{"type":"callState","state":"RINGING"}"#,
            ],
        );

        assert_eq!(
            *transitions.lock().unwrap(),
            vec![Transition::Miss, Transition::Hidden, Transition::Shown]
        );
    }

    #[test]
    fn test_permission_applies_in_line_order_behind_slow_lookup() {
        let rt = runtime();
        let (pipeline, pump, transitions) = start(&rt, true);

        feed(
            pipeline,
            pump,
            &[
                r#"{"type":"callState","state":"RINGING","number":"999"}"#,
                r#"{"type":"callState","state":"ENDED"}"#,
                r#"{"type":"permission","granted":false}"#,
                r#"{"type":"callState","state":"RINGING","number":"15551234567"}"#,
            ],
        );

        assert_eq!(
            *transitions.lock().unwrap(),
            vec![Transition::Miss, Transition::Hidden, Transition::Denied]
        );
    }
}
