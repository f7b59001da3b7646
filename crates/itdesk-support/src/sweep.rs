//! Periodic SLA sweep
//!
//! Re-evaluates every non-settled ticket of every company. Each ticket is an
//! independent unit: a failure or a lost compare-and-set race is counted and
//! the sweep moves on. Flags are written only when they change.

use std::sync::Arc;
use std::time::Duration;

use itdesk_common::SharedClock;
use itdesk_tenant::SystemContext;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::domain::{LogAction, SupportEvent, Ticket, TicketLog};
use crate::notify::NotificationDispatcher;
use crate::repository::TicketRepository;
use crate::sla::{SlaChange, SlaEvaluator};

/// Longest allowed pause between two sweeps
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub checked: usize,
    /// Tickets with at least one dimension that just became violated
    pub newly_violated: usize,
    /// Tickets whose flags went back to clear
    pub cleared: usize,
    pub unchanged: usize,
    /// Writes skipped because the ticket changed since it was read
    pub conflicts: usize,
    pub failed: usize,
    pub events_emitted: usize,
    pub interrupted: bool,
}

pub struct SlaSweeper {
    tickets: Arc<dyn TicketRepository>,
    evaluator: SlaEvaluator,
    dispatcher: NotificationDispatcher,
    clock: SharedClock,
    shutdown: Option<watch::Receiver<bool>>,
}

impl SlaSweeper {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        evaluator: SlaEvaluator,
        dispatcher: NotificationDispatcher,
        clock: SharedClock,
    ) -> Self {
        Self { tickets, evaluator, dispatcher, clock, shutdown: None }
    }

    /// Stop between tickets once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn run_sla_sweep(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();
        let ctx = SystemContext::internal("sla sweep");
        let candidates = match self.tickets.sweep_candidates(&ctx).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "SLA sweep could not load tickets");
                summary.failed += 1;
                return summary;
            }
        };

        let now = self.clock.now();
        for mut ticket in candidates {
            if self.shutting_down() {
                summary.interrupted = true;
                break;
            }
            summary.checked += 1;

            let change = match self.evaluator.reconcile(&mut ticket, now) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(ticket_id = %ticket.id(), error = %e, "SLA evaluation failed");
                    summary.failed += 1;
                    continue;
                }
            };
            if !change.changed() {
                summary.unchanged += 1;
                continue;
            }

            match self.tickets.update_sla_flags(ticket.id(), ticket.version(), change.after).await {
                Ok(true) => {
                    if change.newly_violated().is_empty() {
                        summary.cleared += 1;
                    } else {
                        summary.newly_violated += 1;
                    }
                    summary.events_emitted += self.publish(&mut ticket, &change).await;
                }
                Ok(false) => {
                    tracing::debug!(ticket_id = %ticket.id(), "ticket changed during sweep, skipped");
                    summary.conflicts += 1;
                }
                Err(e) => {
                    tracing::warn!(ticket_id = %ticket.id(), error = %e, "SLA flag write failed");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            newly_violated = summary.newly_violated,
            cleared = summary.cleared,
            unchanged = summary.unchanged,
            conflicts = summary.conflicts,
            failed = summary.failed,
            events = summary.events_emitted,
            interrupted = summary.interrupted,
            "SLA sweep finished"
        );
        summary
    }

    async fn publish(&self, ticket: &mut Ticket, change: &SlaChange) -> usize {
        let events = ticket.take_events();
        for event in &events {
            if let SupportEvent::SlaViolated { kind, deadline, .. } = event {
                tracing::warn!(ticket_id = %ticket.id(), company_id = %ticket.company(), %kind, %deadline, "SLA violated");
                self.log(ticket, LogAction::SlaViolated, format!("{} deadline {} passed", kind, deadline)).await;
            }
        }
        for kind in change.cleared_dimensions() {
            self.log(ticket, LogAction::SlaCleared, format!("{} violation cleared", kind)).await;
        }
        self.dispatcher.dispatch_all(&events).await;
        events.len()
    }

    async fn log(&self, ticket: &Ticket, action: LogAction, detail: String) {
        let entry = TicketLog::new(*ticket.id(), None, action, detail, self.clock.now());
        if let Err(e) = self.tickets.append_log(&entry).await {
            tracing::warn!(ticket_id = %ticket.id(), error = %e, "ticket log append failed");
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Drives [`SlaSweeper::run_sla_sweep`] on a fixed interval
pub struct SlaScheduler;

impl SlaScheduler {
    /// The first sweep runs immediately. `every` is clamped to 1 s ..= 1 h.
    pub fn spawn(sweeper: Arc<SlaSweeper>, every: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let every = every.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            tracing::info!(interval_secs = every.as_secs(), "SLA scheduler started");
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweeper.run_sla_sweep().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("SLA scheduler stopped");
        })
    }
}
