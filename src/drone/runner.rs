//! # Producer Runner
//!
//! Drives a [`DroneProducer`] over a telemetry link.
//!
//! One task selects over three intervals (telemetry, attack poll, failsafe
//! poll) and a poll-result channel. Control plane calls run in spawned tasks
//! under a timeout and report back through the channel, so a slow station
//! never delays a telemetry tick. At most one poll of each kind is in flight.
//!
//! Losing the link ends the session; [`run`] reconnects after a fixed backoff
//! and keeps the producer's state across sessions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{self, interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{DroneProducer, Escalation};
use crate::clock::MonotonicClock;
use crate::config::TimingConfig;
use crate::error::{DroneGuardError, Result};
use crate::failsafe::FailsafeSnapshot;
use crate::link::{ControlPlane, LinkConnector, TelemetryLink};

enum PollResult {
    Attack(Result<(bool, Option<Value>)>),
    Failsafe(Result<FailsafeSnapshot>),
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

async fn with_timeout<T>(
    request: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    time::timeout(limit, call)
        .await
        .map_err(|_| DroneGuardError::ControlTimeout(request))?
}

async fn poll_attack(
    control: &dyn ControlPlane,
    want_details: bool,
    limit: Duration,
) -> Result<(bool, Option<Value>)> {
    let active = with_timeout("attack_active", limit, control.attack_active()).await?;
    if !(active && want_details) {
        return Ok((active, None));
    }
    // Missing details fall back to the default injection
    let details = match with_timeout("latest_attack", limit, control.latest_attack()).await {
        Ok(details) => details,
        Err(e) => {
            warn!("Could not fetch attack details: {}", e);
            None
        }
    };
    Ok((active, details))
}

fn spawn_attack_poll(
    control: Arc<dyn ControlPlane>,
    want_details: bool,
    limit: Duration,
    results: mpsc::Sender<PollResult>,
) {
    tokio::spawn(async move {
        let outcome = poll_attack(control.as_ref(), want_details, limit).await;
        if results.send(PollResult::Attack(outcome)).await.is_err() {
            debug!("Attack poll finished after the session ended");
        }
    });
}

fn spawn_failsafe_poll(control: Arc<dyn ControlPlane>, limit: Duration, results: mpsc::Sender<PollResult>) {
    tokio::spawn(async move {
        let outcome = with_timeout("failsafe_state", limit, control.failsafe_state()).await;
        if results.send(PollResult::Failsafe(outcome)).await.is_err() {
            debug!("Failsafe poll finished after the session ended");
        }
    });
}

/// Fire-and-forget activation request plus diagnostic event.
fn spawn_escalation(control: Arc<dyn ControlPlane>, escalation: Escalation, limit: Duration) {
    tokio::spawn(async move {
        match with_timeout("activate_failsafe", limit, control.activate_failsafe(escalation.reason.clone())).await {
            Ok(state) => info!("Station acknowledged failsafe: {} ({:?})", state.action, state.reason),
            Err(e) => warn!("Failsafe activation request failed: {}", e),
        }
        if let Err(e) = with_timeout("post_event", limit, control.post_event(escalation.event)).await {
            debug!("Diagnostic event not delivered: {}", e);
        }
    });
}

/// Runs one connected session until the link fails.
///
/// Sends `hello` first, then one telemetry frame per tick. Sample times come
/// from `clock`, which should outlive the session so times keep increasing
/// across reconnects.
///
/// # Errors
///
/// Returns the transport error that ended the session.
pub async fn run_session<L: TelemetryLink>(
    producer: &mut DroneProducer,
    link: &mut L,
    control: &Arc<dyn ControlPlane>,
    timing: &TimingConfig,
    clock: &MonotonicClock,
) -> Result<()> {
    link.send(producer.hello(clock.now_s()).encode()?).await?;

    let limit = millis(timing.control_timeout_ms);
    let (results_tx, mut results_rx) = mpsc::channel(4);

    let mut telemetry = interval(millis(timing.telemetry_interval_ms));
    let mut attack_poll = interval(millis(timing.attack_poll_interval_ms));
    attack_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failsafe_poll = interval(millis(timing.failsafe_poll_interval_ms));
    failsafe_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attack_in_flight = false;
    let mut failsafe_in_flight = false;
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            _ = telemetry.tick() => {
                let output = producer.tick(clock.now_s());
                if let Some(escalation) = output.escalation {
                    spawn_escalation(Arc::clone(control), escalation, limit);
                }

                match output.message.encode() {
                    Ok(frame) => link.send(frame).await?,
                    Err(e) => {
                        warn!("Failed to encode telemetry: {}", e);
                        continue;
                    }
                }

                frames += 1;
                if frames % 240 == 0 {
                    debug!("Sent {} telemetry frames", frames);
                }
            }

            _ = attack_poll.tick(), if !attack_in_flight => {
                attack_in_flight = true;
                spawn_attack_poll(Arc::clone(control), producer.wants_attack_details(), limit, results_tx.clone());
            }

            _ = failsafe_poll.tick(), if !failsafe_in_flight => {
                failsafe_in_flight = true;
                spawn_failsafe_poll(Arc::clone(control), limit, results_tx.clone());
            }

            Some(result) = results_rx.recv() => match result {
                PollResult::Attack(outcome) => {
                    attack_in_flight = false;
                    match outcome {
                        Ok((active, details)) => producer.on_attack_poll(active, details, clock.now_s()),
                        Err(e) => debug!("Attack poll failed: {}", e),
                    }
                }
                PollResult::Failsafe(outcome) => {
                    failsafe_in_flight = false;
                    match outcome {
                        Ok(state) => producer.on_failsafe_poll(&state),
                        Err(e) => debug!("Failsafe poll failed: {}", e),
                    }
                }
            },
        }
    }
}

/// Connects, runs sessions and reconnects forever.
///
/// Cancel by dropping the future (e.g. from `tokio::select!`).
pub async fn run<C: LinkConnector>(
    producer: &mut DroneProducer,
    connector: &C,
    control: Arc<dyn ControlPlane>,
    timing: &TimingConfig,
) {
    let backoff = millis(timing.reconnect_backoff_ms);
    let clock = MonotonicClock::start();

    loop {
        match connector.connect().await {
            Ok(mut link) => {
                info!("Connected to {}", connector.endpoint());
                if let Err(e) = run_session(producer, &mut link, &control, timing, &clock).await {
                    warn!("Link to {} lost: {}", connector.endpoint(), e);
                }
            }
            Err(e) => warn!("Cannot connect to {}: {}", connector.endpoint(), e),
        }

        info!("Reconnecting in {} ms", backoff.as_millis());
        time::sleep(backoff).await;
    }
}
