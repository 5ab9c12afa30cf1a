use super::*;

use std::{
    sync::{mpsc, Arc, OnceLock},
    thread,
};

#[test]
fn unconnected_logger_is_a_silent_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let logger = quick_builder(temp.path()).build();

    assert!(!logger.is_connected());
    logger.write_line("dropped");
    logger.info("dropped");
    logger.write_fmt(format_args!("dropped {}", 1));
    logger.shutdown();
    assert!(!logger.is_connected());
}

#[test]
fn absent_viewer_yields_unavailable_within_timeout() {
    let temp = tempfile::tempdir().unwrap();
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .connect_timeout(Duration::from_millis(300))
        .diagnostics(events.sink())
        .build();

    let started = Instant::now();
    let status = logger.connect();

    assert_eq!(status, ConnectStatus::Unavailable);
    assert!(!logger.is_connected());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::Unavailable { .. })),
        1
    );
    logger.write_line("nobody is listening");
}

#[test]
fn connected_logger_delivers_lines_verbatim() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let logger = quick_builder(temp.path()).connect();
    assert!(logger.is_connected());

    let mut session = viewer.accept();
    logger.write_line("[INFO] Order ORDER-0001 completed with total: 125.00");
    logger.write_line("");
    logger.write_line("unicode: zażółć ✓");

    assert_eq!(
        session.read_lines(3),
        [
            "[INFO] Order ORDER-0001 completed with total: 125.00",
            "",
            "unicode: zażółć ✓",
        ]
    );
}

#[test]
fn connect_runs_once_per_initialization() {
    let temp = tempfile::tempdir().unwrap();
    let _viewer = FakeViewer::bind(temp.path());
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .diagnostics(events.sink())
        .build();

    assert_eq!(logger.connect(), ConnectStatus::Connected);
    assert_eq!(logger.connect(), ConnectStatus::Connected);
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::Connected { .. })),
        1
    );
}

#[test]
fn failed_initialization_is_not_retried_implicitly() {
    let temp = tempfile::tempdir().unwrap();
    let logger = quick_builder(temp.path()).build();
    assert_eq!(logger.connect(), ConnectStatus::Unavailable);

    // A viewer appearing later is only picked up by an explicit reconnect.
    let _viewer = FakeViewer::bind(temp.path());
    assert_eq!(logger.connect(), ConnectStatus::Unavailable);
    assert!(!logger.is_connected());
    assert_eq!(logger.reconnect(), ConnectStatus::Connected);
    assert!(logger.is_connected());
}

#[test]
fn shutdown_is_idempotent_and_closes_the_stream() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .diagnostics(events.sink())
        .connect();
    let mut session = viewer.accept();

    logger.write_line("before shutdown");
    logger.shutdown();
    logger.shutdown();
    logger.write_line("after shutdown");

    assert!(!logger.is_connected());
    assert_eq!(session.read_line().as_deref(), Some("before shutdown"));
    assert_eq!(session.read_line(), None);
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::Shutdown)),
        1
    );
}

#[test]
fn reconnect_after_shutdown_opens_a_fresh_connection() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let logger = quick_builder(temp.path()).connect();
    let mut first = viewer.accept();
    logger.shutdown();
    assert_eq!(first.read_line(), None);

    assert_eq!(logger.reconnect(), ConnectStatus::Connected);
    assert!(logger.is_connected());
    let mut second = viewer.accept();
    logger.write_line("second session");
    assert_eq!(second.read_line().as_deref(), Some("second session"));
}

#[test]
fn reconnect_while_connected_replaces_the_connection() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let logger = quick_builder(temp.path()).connect();
    let mut first = viewer.accept();

    assert_eq!(logger.reconnect(), ConnectStatus::Connected);
    assert_eq!(first.read_line(), None);

    let mut second = viewer.accept();
    logger.write_line("after reconnect");
    assert_eq!(second.read_line().as_deref(), Some("after reconnect"));
}

#[test]
fn vanished_viewer_flips_state_instead_of_failing() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .diagnostics(events.sink())
        .connect();
    let session = viewer.accept();

    drop(session);
    drop(viewer);

    logger.write_line("into the void");
    assert!(!logger.is_connected());
    assert!(matches!(
        logger.connect(),
        ConnectStatus::Failed { .. }
    ));
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::WriteFailed { .. })),
        1
    );
    logger.write_line("still silent");
}

#[test]
fn stalled_viewer_times_out_writes_instead_of_blocking() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .write_timeout(Duration::from_millis(200))
        .diagnostics(events.sink())
        .connect();
    // Accepted but never read, so the channel fills up.
    let _session = viewer.accept();

    let writer = {
        let logger = logger.clone();
        thread::spawn(move || {
            let line = "x".repeat(1024);
            for _ in 0..4096 {
                logger.write_line(&line);
                if !logger.is_connected() {
                    break;
                }
            }
        })
    };
    wait_for(|| writer.is_finished());
    writer.join().unwrap();

    assert!(!logger.is_connected());
    assert!(matches!(logger.connect(), ConnectStatus::Failed { .. }));
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::WriteFailed { .. })),
        1
    );

    let started = Instant::now();
    logger.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn diagnostic_sink_may_log_through_the_same_logger() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let slot: Arc<OnceLock<ConsoleLogger>> = Arc::default();
    let seen = Arc::clone(&slot);
    let logger = quick_builder(temp.path())
        .diagnostics(move |event: TransportEvent| {
            if let Some(logger) = seen.get() {
                logger.write_line(&format!("diagnostic: {event:?}"));
                if matches!(event, TransportEvent::Connected { .. }) {
                    logger.shutdown();
                }
            }
        })
        .build();
    slot.set(logger.clone()).unwrap();

    let (done, finished) = mpsc::channel();
    let worker = logger.clone();
    thread::spawn(move || done.send(worker.connect()).unwrap());
    let status = finished
        .recv_timeout(READ_TIMEOUT)
        .expect("connect did not return");
    assert_eq!(status, ConnectStatus::Connected);

    let mut session = viewer.accept();
    let line = session.read_line().unwrap();
    assert!(line.starts_with("diagnostic: Connected"), "{line:?}");
    // The shutdown requested from inside the sink raised its own event, delivered in turn
    // while disconnected.
    assert_eq!(session.read_line(), None);
    assert!(!logger.is_connected());
}

#[test]
fn viewer_that_fails_to_start_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let not_executable = temp.path().join("plain-file");
    std::fs::write(&not_executable, b"not a program").unwrap();
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .auto_launch(true)
        .viewer_binary(&not_executable)
        .diagnostics(events.sink())
        .build();

    assert_eq!(logger.connect(), ConnectStatus::Unavailable);
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::ViewerLaunchFailed { .. })),
        1
    );
}

#[test]
fn malformed_template_is_reported_even_when_disconnected() {
    let temp = tempfile::tempdir().unwrap();
    let logger = quick_builder(temp.path()).build();

    assert_eq!(
        logger.write_template("Processing order: {1}", &[&"ORDER-0001"]),
        Err(TemplateError::IndexOutOfRange { index: 1, len: 1 })
    );
    assert!(logger.write_template("Processing order: {0}", &[&"ORDER-0001"]).is_ok());
}

#[test]
fn template_and_fmt_lines_reach_the_viewer() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let logger = quick_builder(temp.path()).connect();
    let mut session = viewer.accept();

    logger
        .write_template("Plugin version: {0}, built on {1}", &[&"2.0.0", &"2024-05-17"])
        .unwrap();
    write!(logger, "via write! {}", 1);
    writeln!(logger, "via writeln! {}", 2);

    assert_eq!(
        session.read_lines(3),
        [
            "Plugin version: 2.0.0, built on 2024-05-17",
            "via write! 1",
            "via writeln! 2",
        ]
    );
}

#[test]
fn concurrent_writers_never_interleave_lines() {
    let temp = tempfile::tempdir().unwrap();
    let viewer = FakeViewer::bind(temp.path());
    let logger = Arc::new(quick_builder(temp.path()).connect());
    let mut session = viewer.accept();

    let reader = thread::spawn(move || session.read_lines(8 * 50));
    let writers: Vec<_> = (0..8)
        .map(|writer| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for n in 0..50 {
                    logger.write_line(&format!("writer-{writer} line-{n} {}", "x".repeat(64)));
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let lines = reader.join().unwrap();
    assert_eq!(lines.len(), 400);
    for line in &lines {
        assert!(line.starts_with("writer-"), "corrupted line: {line:?}");
        assert!(line.ends_with(&"x".repeat(64)), "corrupted line: {line:?}");
    }
    for writer in 0..8 {
        let mine: Vec<_> = lines
            .iter()
            .filter(|line| line.starts_with(&format!("writer-{writer} ")))
            .collect();
        assert_eq!(mine.len(), 50);
    }
}

#[test]
fn first_connect_launches_viewer_when_none_is_listening() {
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("launches.log");
    let binary = write_fake_viewer(temp.path(), &marker);
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .auto_launch(true)
        .viewer_binary(&binary)
        .connect_timeout(Duration::from_millis(500))
        .diagnostics(events.sink())
        .build();

    assert_eq!(logger.connect(), ConnectStatus::Unavailable);
    wait_for(|| launch_count(&marker) == 1);
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::ViewerLaunched { .. })),
        1
    );

    // Reconnect only repeats the channel steps.
    assert_eq!(logger.reconnect(), ConnectStatus::Unavailable);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(launch_count(&marker), 1);
}

#[test]
fn running_viewer_is_reused_without_launching() {
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("launches.log");
    let binary = write_fake_viewer(temp.path(), &marker);
    let _viewer = FakeViewer::bind(temp.path());
    let logger = quick_builder(temp.path())
        .auto_launch(true)
        .viewer_binary(&binary)
        .build();

    assert_eq!(logger.connect(), ConnectStatus::Connected);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(launch_count(&marker), 0);
}

#[test]
fn missing_viewer_binary_is_not_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let events = RecordedEvents::default();
    let logger = quick_builder(temp.path())
        .auto_launch(true)
        .install_dir(temp.path().join("nowhere"))
        .diagnostics(events.sink())
        .build();

    assert_eq!(logger.connect(), ConnectStatus::Unavailable);
    assert_eq!(
        events.count(|event| matches!(event, TransportEvent::ViewerNotFound { .. })),
        1
    );
}

fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + READ_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(20));
    }
}
