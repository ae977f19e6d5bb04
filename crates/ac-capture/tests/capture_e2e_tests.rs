//! End-to-end capture against a stub simulator on loopback.

mod helpers;

use helpers::{
    StubSimulator, handshake_reply, line_count, session_dirs, telemetry_frame, test_config,
    wait_for,
};
use racing_wheel_ac_capture::{CaptureError, CaptureLoop, StopSignal};
use racing_wheel_ac_remote_protocol::{CHANNEL_COUNT, Operation};
use racing_wheel_ac_session_store::{INFO_FILE, PARSED_LOG, RAW_LOG, SessionError, SessionInfo};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn handshake_frames_and_junk_land_in_session() -> TestResult {
    let stub = StubSimulator::bind()?;
    let root = tempfile::tempdir()?;
    let config = test_config(stub.addr()?, root.path());

    let (ops_tx, ops_rx) = mpsc::channel();
    let streaming = Arc::new(AtomicBool::new(true));
    let server_streaming = Arc::clone(&streaming);

    let server = thread::spawn(move || -> std::io::Result<()> {
        let (op, peer) = stub.recv_request()?;
        let _ = ops_tx.send(op);
        stub.send_to(&handshake_reply("ks_mazda_mx5_cup", "Tester", "magione", ""), peer)?;
        for _ in 0..2 {
            let (op, _) = stub.recv_request()?;
            let _ = ops_tx.send(op);
        }

        stub.send_to(&[0xAB; 100], peer)?;
        let mut n = 0u16;
        while server_streaming.load(Ordering::Relaxed) {
            stub.send_to(&telemetry_frame(f32::from(n), 10.0, -4.5), peer)?;
            n = n.saturating_add(1);
            thread::sleep(Duration::from_millis(10));
        }

        let (op, _) = stub.recv_request()?;
        let _ = ops_tx.send(op);
        Ok(())
    });

    let stop = StopSignal::new();
    let loop_stop = stop.clone();
    let capture = thread::spawn(move || CaptureLoop::new(config, loop_stop).run());

    let have_frames = wait_for(Duration::from_secs(5), || {
        session_dirs(root.path())
            .ok()
            .and_then(|dirs| dirs.first().cloned())
            .is_some_and(|dir| line_count(&dir.join(PARSED_LOG)) >= 4)
    });
    stop.trigger();
    let stats = capture
        .join()
        .map_err(|_| "capture thread panicked")??;
    streaming.store(false, Ordering::Relaxed);
    server.join().map_err(|_| "stub thread panicked")??;
    assert!(have_frames, "no telemetry frames were logged");

    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.restarts, 0);
    assert_eq!(stats.decode_failures, 1);
    assert!(stats.frames >= 3);

    let ops: Vec<Operation> = ops_rx.try_iter().collect();
    assert_eq!(
        ops,
        vec![
            Operation::Handshake,
            Operation::SubscribeUpdate,
            Operation::SubscribeSpot,
            Operation::Dismiss
        ]
    );

    let dirs = session_dirs(root.path())?;
    assert_eq!(dirs.len(), 1);
    let dir = dirs.first().ok_or("missing session dir")?;

    let info: SessionInfo = serde_json::from_str(&fs::read_to_string(dir.join(INFO_FILE))?)?;
    assert_eq!(info.car, "ks_mazda_mx5_cup");
    assert_eq!(info.user, "Tester");
    assert_eq!(info.track, "magione");
    assert_eq!(info.track_config, "");
    assert_eq!(info.raw_bytes()?.len(), 408);

    let parsed = fs::read_to_string(dir.join(PARSED_LOG))?;
    let mut lines = parsed.lines();
    let header = lines.next().ok_or("missing header")?;
    let width = header.split(',').count();
    assert_eq!(width, CHANNEL_COUNT + 1);

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len() as u64, stats.frames);
    for row in &rows {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), width);
        assert_eq!(fields.last().copied(), Some("-4.5"));
        assert_eq!(fields.get(fields.len() - 3).copied(), Some("10"));
    }
    let first_speed = rows
        .first()
        .and_then(|row| row.split(',').nth(1))
        .ok_or("missing speed")?;
    assert_eq!(first_speed, "0");

    assert_eq!(line_count(&dir.join(RAW_LOG)) as u64, stats.datagrams);
    assert_eq!(stats.datagrams, stats.frames + 1);
    Ok(())
}

#[test]
fn silent_server_mid_stream_restarts_into_new_session() -> TestResult {
    let stub = StubSimulator::bind()?;
    let root = tempfile::tempdir()?;
    let config = test_config(stub.addr()?, root.path());

    let streaming = Arc::new(AtomicBool::new(true));
    let server_streaming = Arc::clone(&streaming);

    let server = thread::spawn(move || -> std::io::Result<u32> {
        let mut handshakes = 0u32;

        // First session: two frames, then silence until the client gives up.
        let (_, peer) = stub.recv_request()?;
        handshakes += 1;
        stub.send_to(&handshake_reply("car_a", "u", "track_a", ""), peer)?;
        stub.send_to(&telemetry_frame(1.0, 0.0, 0.0), peer)?;
        stub.send_to(&telemetry_frame(2.0, 0.0, 0.0), peer)?;

        // Second session: answer the next handshake and keep streaming.
        let peer = loop {
            let (op, peer) = stub.recv_request()?;
            if op == Operation::Handshake {
                handshakes += 1;
                break peer;
            }
        };
        stub.send_to(&handshake_reply("car_b", "u", "track_b", ""), peer)?;
        while server_streaming.load(Ordering::Relaxed) {
            stub.send_to(&telemetry_frame(3.0, 0.0, 0.0), peer)?;
            thread::sleep(Duration::from_millis(10));
        }
        Ok(handshakes)
    });

    let stop = StopSignal::new();
    let loop_stop = stop.clone();
    let capture = thread::spawn(move || CaptureLoop::new(config, loop_stop).run());

    let second_session_logging = wait_for(Duration::from_secs(10), || {
        session_dirs(root.path())
            .ok()
            .and_then(|dirs| dirs.get(1).cloned())
            .is_some_and(|dir| line_count(&dir.join(PARSED_LOG)) >= 2)
    });
    stop.trigger();
    let stats = capture
        .join()
        .map_err(|_| "capture thread panicked")??;
    streaming.store(false, Ordering::Relaxed);
    let handshakes = server.join().map_err(|_| "stub thread panicked")??;

    assert!(second_session_logging, "capture did not restart");
    assert_eq!(handshakes, 2);
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.restarts, 1);

    let dirs = session_dirs(root.path())?;
    assert_eq!(dirs.len(), 2);
    let first = dirs.first().ok_or("missing first session")?;
    let second = dirs.get(1).ok_or("missing second session")?;

    assert_eq!(line_count(&first.join(PARSED_LOG)), 3);
    let first_info: SessionInfo =
        serde_json::from_str(&fs::read_to_string(first.join(INFO_FILE))?)?;
    let second_info: SessionInfo =
        serde_json::from_str(&fs::read_to_string(second.join(INFO_FILE))?)?;
    assert_eq!(first_info.car, "car_a");
    assert_eq!(second_info.car, "car_b");
    Ok(())
}

#[test]
fn unwritable_log_root_dismisses_and_ends_run() -> TestResult {
    let stub = StubSimulator::bind()?;
    let root = tempfile::tempdir()?;
    let occupied = root.path().join("occupied");
    fs::write(&occupied, "not a directory")?;
    let config = test_config(stub.addr()?, &occupied);

    let server = thread::spawn(move || -> std::io::Result<Vec<Operation>> {
        let (op, peer) = stub.recv_request()?;
        stub.send_to(&handshake_reply("car", "u", "track", ""), peer)?;
        let mut ops = vec![op];
        for _ in 0..3 {
            ops.push(stub.recv_request()?.0);
        }
        Ok(ops)
    });

    let mut capture = CaptureLoop::new(config, StopSignal::new());
    let result = capture.run();
    let ops = server.join().map_err(|_| "stub thread panicked")??;

    assert!(
        matches!(
            result,
            Err(CaptureError::Storage(SessionError::CreateDir { .. }))
        ),
        "unexpected result: {result:?}"
    );
    assert_eq!(capture.stats().sessions, 0);
    assert_eq!(capture.stats().restarts, 0);
    assert_eq!(
        ops,
        vec![
            Operation::Handshake,
            Operation::SubscribeUpdate,
            Operation::SubscribeSpot,
            Operation::Dismiss
        ]
    );
    assert!(occupied.is_file());
    Ok(())
}

#[test]
fn stop_while_waiting_on_a_silent_server_ends_without_restart() -> TestResult {
    let stub = StubSimulator::bind()?;
    let root = tempfile::tempdir()?;
    let mut config = test_config(stub.addr()?, root.path());
    config.recv_timeout_ms = 1_000;

    // Subscribed, then silent until the client dismisses.
    let server = thread::spawn(move || -> std::io::Result<Vec<Operation>> {
        let (op, peer) = stub.recv_request()?;
        stub.send_to(&handshake_reply("car", "u", "track", ""), peer)?;
        let mut ops = vec![op];
        for _ in 0..3 {
            ops.push(stub.recv_request()?.0);
        }
        Ok(ops)
    });

    let stop = StopSignal::new();
    let loop_stop = stop.clone();
    let capture = thread::spawn(move || {
        let mut capture = CaptureLoop::new(config, loop_stop);
        let result = capture.run();
        (result, capture.stats())
    });

    let session_open = wait_for(Duration::from_secs(5), || {
        session_dirs(root.path()).is_ok_and(|dirs| dirs.len() == 1)
    });
    // Let the loop block in a receive before asking it to stop.
    thread::sleep(Duration::from_millis(200));
    stop.trigger();

    let (result, stats) = capture.join().map_err(|_| "capture thread panicked")?;
    let returned = result?;
    let ops = server.join().map_err(|_| "stub thread panicked")??;
    assert!(session_open, "session was never opened");

    assert_eq!(returned, stats);
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.restarts, 0);
    assert_eq!(stats.datagrams, 0);
    assert_eq!(
        ops,
        vec![
            Operation::Handshake,
            Operation::SubscribeUpdate,
            Operation::SubscribeSpot,
            Operation::Dismiss
        ]
    );

    let dirs = session_dirs(root.path())?;
    assert_eq!(dirs.len(), 1);
    let dir = dirs.first().ok_or("missing session dir")?;
    assert_eq!(line_count(&dir.join(PARSED_LOG)), 1);
    assert_eq!(line_count(&dir.join(RAW_LOG)), 0);
    Ok(())
}
