// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::connector::FakeConnector;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn successful_connect_is_logged_with_target() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedConnector::new(FakeConnector::new("collector:4570"));
        traced.connect().await.map(|_| ())
    });

    assert!(result.is_ok());
    assert!(logs.contains("connector.connect"), "Logs:\n{}", logs);
    assert!(logs.contains("collector:4570"), "Logs:\n{}", logs);
    assert!(logs.contains("connected"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn failed_connect_is_logged_as_warning() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeConnector::new("collector:4570");
        fake.set_refuse(true);
        TracedConnector::new(fake).connect().await.map(|_| ())
    });

    assert!(result.is_err());
    assert!(logs.contains("WARN"), "Logs:\n{}", logs);
    assert!(logs.contains("connect failed"), "Logs:\n{}", logs);
}

#[test]
fn target_passes_through() {
    let traced = TracedConnector::new(FakeConnector::new("a:1"));
    assert_eq!(traced.target(), "a:1");
}
