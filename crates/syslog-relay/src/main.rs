// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use syslog_forwarder::{Forwarder, ForwarderConfig, ReadinessState, Severity};

const DEFAULT_LINE_SEVERITY: Severity = Severity::Informational;
const READY_WAIT: Duration = Duration::from_secs(5);
const FLUSH_GRACE: Duration = Duration::from_millis(100);

#[tokio::main]
pub async fn main() {
    let log_level = env::var("SYSLOG_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("hyper=off,reqwest=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = ForwarderConfig::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid syslog relay configuration: {e}");
        return;
    }

    let forwarder = Forwarder::start_with_http_probe(config).await;
    if !forwarder.is_enabled() {
        error!("Syslog forwarder could not be started. Shutting down relay.");
        return;
    }
    info!("Relaying standard input to syslog");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let (severity, text) = split_severity(&line);
                    forwarder.log(severity, text);
                }
                Ok(None) => {
                    debug!("End of input");
                    flush(&forwarder).await;
                    break;
                }
                Err(e) => {
                    error!("Failed to read standard input: {e}");
                    break;
                }
            },
        }
    }

    forwarder.shutdown();
}

/// Gives queued and in-flight lines a chance to leave before the transport closes.
async fn flush(forwarder: &Forwarder) {
    let ready = timeout(READY_WAIT, async {
        while forwarder.readiness() == Some(ReadinessState::NotReady) {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if ready.is_err() {
        warn!(
            "Network not ready after {:?}, {} queued lines will be lost",
            READY_WAIT,
            forwarder.pending()
        );
    }
    sleep(FLUSH_GRACE).await;
}

/// Lines may start with a severity name, e.g. `warning: disk almost full`.
fn split_severity(line: &str) -> (Severity, &str) {
    if let Some((prefix, rest)) = line.split_once(':') {
        if let Ok(severity) = prefix.parse::<Severity>() {
            return (severity, rest.trim_start());
        }
    }
    (DEFAULT_LINE_SEVERITY, line)
}
