//! Polling waiter (exponential backoff)
//!
//! Drives a [`StateProber`] until the probed object reaches a terminal state,
//! the timeout expires or the caller cancels.

use crate::error::{CloudError, Result};
use crate::model::{GatewayState, NatGateway};
use crate::prober::{Probe, StateProber};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout_at};

/// Deadline used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// How a probed state relates to the state being waited for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Still in progress, keep polling
    Transitional,
    /// Terminal, the wait succeeded
    Success,
    /// Terminal, the wait failed
    Failure,
}

/// The terminal condition a wait is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// Gateway became `available`
    Created,
    /// Gateway became `deleted` or disappeared
    Deleted,
}

impl WaitTarget {
    /// Classify a state label. `None` means the gateway was absent.
    pub fn classify_state(&self, state: Option<GatewayState>) -> Classification {
        use Classification::*;
        match (self, state) {
            (WaitTarget::Created, Some(GatewayState::Pending)) => Transitional,
            (WaitTarget::Created, Some(GatewayState::Available)) => Success,
            (WaitTarget::Created, Some(GatewayState::Failed)) => Failure,
            (WaitTarget::Created, Some(GatewayState::Deleting | GatewayState::Deleted)) => Failure,
            // Eventual consistency: a fresh gateway may not be listed yet.
            (WaitTarget::Created, None) => Transitional,

            (WaitTarget::Deleted, Some(GatewayState::Deleting)) => Transitional,
            (WaitTarget::Deleted, Some(GatewayState::Deleted) | None) => Success,
            (WaitTarget::Deleted, Some(GatewayState::Failed)) => Failure,
            (WaitTarget::Deleted, Some(GatewayState::Pending | GatewayState::Available)) => Failure,
        }
    }

    pub fn classify(&self, probe: &Probe) -> Classification {
        match probe {
            Probe::Found(gw) => self.classify_state(Some(gw.state)),
            Probe::Absent(_) => self.classify_state(None),
        }
    }

    fn failure_reason(&self, probe: &Probe) -> String {
        match probe {
            Probe::Found(gw) if gw.state == GatewayState::Failed => gw.failure_reason(),
            Probe::Found(gw) => format!("unexpected state '{}' while waiting for {}", gw.state, self),
            Probe::Absent(_) => format!("gateway disappeared while waiting for {}", self),
        }
    }
}

impl std::fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitTarget::Created => write!(f, "create"),
            WaitTarget::Deleted => write!(f, "delete"),
        }
    }
}

/// Polling policy
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    /// Delay before the first probe
    pub initial_delay: Duration,
    /// Delay after the first transitional probe
    pub poll_interval: Duration,
    /// Upper bound for the backoff delay
    pub max_interval: Duration,
    /// Exponential multiplier applied per attempt
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.1 = ±10%)
    pub jitter: f64,
    /// Maximum total wait
    pub timeout: Duration,
    /// Consecutive transient probe errors tolerated before giving up
    pub max_transient_errors: u32,
    /// Consecutive absent probes tolerated while waiting for creation
    pub not_found_checks: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::for_create()
    }
}

impl WaitPolicy {
    pub fn for_create() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            poll_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
            timeout: Duration::from_secs(10 * 60),
            max_transient_errors: 3,
            not_found_checks: 20,
        }
    }

    pub fn for_delete() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
            ..Self::for_create()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_interval = self.max_interval.max(poll_interval);
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Delay before the probe following `attempt` (0-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let secs = self.poll_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_interval.as_secs_f64();
        Duration::try_from_secs_f64(secs.min(max)).unwrap_or(self.max_interval)
    }

    /// Delay before the probe following `attempt`, jitter included
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let spread = self.jitter.min(1.0);
        let factor = 1.0 + rand::thread_rng().gen_range(-spread..=spread);
        Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(base)
    }
}

/// Result of a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Terminal success. `None` when absence was the success condition.
    Succeeded(Option<NatGateway>),
    /// Still transitional when the timeout expired
    TimedOut { last_state: String },
    /// The remote reported a failure (or unexpected) state
    Failed(String),
    /// Stopped by the cancellation signal
    Cancelled,
}

impl WaitOutcome {
    /// Convert non-success outcomes into the matching error
    pub fn into_result(self, id: &str, policy: &WaitPolicy) -> Result<Option<NatGateway>> {
        match self {
            WaitOutcome::Succeeded(gw) => Ok(gw),
            WaitOutcome::TimedOut { last_state } => Err(CloudError::WaitTimeout {
                id: id.to_string(),
                last_state,
                timeout: policy.timeout,
            }),
            WaitOutcome::Failed(reason) => Err(CloudError::WaitFailed {
                id: id.to_string(),
                reason,
            }),
            WaitOutcome::Cancelled => Err(CloudError::WaitCancelled { id: id.to_string() }),
        }
    }
}

/// Cancellation signal for in-flight waits
///
/// Cancelled once the paired sender publishes `true`. Dropping the sender
/// without sending never cancels.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn channel() -> (watch::Sender<bool>, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (tx, CancelSignal { rx })
    }

    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn cancelled(cancel: &mut Option<CancelSignal>) {
    match cancel {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

/// Polls a prober until a terminal state
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    policy: WaitPolicy,
    cancel: Option<CancelSignal>,
}

impl Waiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Poll until `target` is reached
    ///
    /// Non-transient probe errors are returned as errors. Transient ones are
    /// retried until more than `max_transient_errors` occur in a row, then
    /// the last one is returned.
    pub async fn wait<P>(&self, prober: &P, target: WaitTarget) -> Result<WaitOutcome>
    where
        P: StateProber + ?Sized,
    {
        let id = prober.id();
        let policy = &self.policy;
        let started = Instant::now();
        let deadline = started
            .checked_add(policy.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut cancel = self.cancel.clone();

        let mut attempt: u32 = 0;
        let mut transient_errors: u32 = 0;
        let mut absent_checks: u32 = 0;
        let mut last_state = String::from("unknown");

        tracing::debug!(
            "Waiting for NAT gateway {} {} (timeout {:?})",
            id,
            target,
            policy.timeout
        );

        if !policy.initial_delay.is_zero() {
            let delay = policy.initial_delay.min(policy.timeout);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancelled(&mut cancel) => return Ok(WaitOutcome::Cancelled),
            }
        }

        loop {
            if cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
                tracing::info!("Wait for NAT gateway {} {} cancelled", id, target);
                return Ok(WaitOutcome::Cancelled);
            }

            let result = tokio::select! {
                result = timeout_at(deadline, prober.probe()) => match result {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            "Probe of NAT gateway {} still pending at the {} deadline",
                            id,
                            target
                        );
                        return Ok(WaitOutcome::TimedOut { last_state });
                    }
                },
                _ = cancelled(&mut cancel) => {
                    tracing::info!("Wait for NAT gateway {} {} cancelled", id, target);
                    return Ok(WaitOutcome::Cancelled);
                }
            };

            match result {
                Ok(probe) => {
                    transient_errors = 0;
                    last_state = probe.label().to_string();

                    match target.classify(&probe) {
                        Classification::Success => {
                            tracing::debug!("NAT gateway {} reached {} target", id, target);
                            return Ok(WaitOutcome::Succeeded(probe.into_gateway()));
                        }
                        Classification::Failure => {
                            return Ok(WaitOutcome::Failed(target.failure_reason(&probe)));
                        }
                        Classification::Transitional if probe.is_absent() => {
                            absent_checks += 1;
                            if absent_checks > policy.not_found_checks {
                                return Ok(WaitOutcome::Failed(format!(
                                    "NAT gateway {} not found after {} checks",
                                    id, absent_checks
                                )));
                            }
                        }
                        Classification::Transitional => {
                            absent_checks = 0;
                            tracing::debug!("NAT gateway {} is {}", id, last_state);
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    transient_errors += 1;
                    if transient_errors > policy.max_transient_errors {
                        tracing::warn!(
                            "Giving up on NAT gateway {} after {} consecutive probe errors",
                            id,
                            transient_errors
                        );
                        return Err(e);
                    }
                    tracing::warn!(
                        "Transient error probing NAT gateway {} ({}/{}): {}",
                        id,
                        transient_errors,
                        policy.max_transient_errors,
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut { last_state });
            }

            let delay = policy.delay_for_attempt(attempt).min(deadline - now);
            attempt = attempt.saturating_add(1);

            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancelled(&mut cancel) => {
                    tracing::info!("Wait for NAT gateway {} {} cancelled", id, target);
                    return Ok(WaitOutcome::Cancelled);
                }
            }
        }
    }
}
