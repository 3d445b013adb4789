use std::collections::VecDeque;
use std::convert::Infallible;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::trailer::{TrailerEvent, TrailerId};


/// Types which publish events to subscribers.
pub trait EventBroker {
    /// Associated Type representing the event for set of Aggregates.
    type SetEvent;

    /// Error type of handling EventBroker.
    type Error;

    /// Publish events to the subscribers, in the order they were saved.
    fn publish(&mut self, events: Vec<Self::SetEvent>) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
}

/// A message for the user. Warnings are shown non-blocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub trailer: TrailerId,
    pub severity: Severity,
    pub message: String,
}

/// Collects notifications until the UI drains them.
#[derive(Debug, Default)]
pub struct Notifier {
    pending: VecDeque<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    fn push(&mut self, trailer: TrailerId, severity: Severity, message: String) {
        match severity {
            Severity::Info => info!("trailer {}: {}", trailer, message),
            Severity::Warning => warn!("trailer {}: {}", trailer, message),
        }
        self.pending.push_back(Notification {
            trailer,
            severity,
            message,
        });
    }
}

fn describe_gaps(gaps: &[u32]) -> String {
    let list = gaps
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("compartment numbers missing: {list}")
}

impl EventBroker for Notifier {
    type SetEvent = TrailerEvent;
    type Error = Infallible;

    fn publish(&mut self, events: Vec<Self::SetEvent>) -> Result<(), Self::Error> {
        for event in events {
            match event {
                TrailerEvent::CompartmentRemoved { id, gap_report, .. } if !gap_report.is_empty() => {
                    self.push(id, Severity::Warning, describe_gaps(&gap_report));
                }
                TrailerEvent::ActivityChanged { id, active: true } => {
                    self.push(id, Severity::Info, "trailer is active".to_string());
                }
                TrailerEvent::ActivityChanged { id, active: false } => {
                    self.push(id, Severity::Info, "trailer is inactive".to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }
}
