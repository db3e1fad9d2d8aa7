//! # Notification Log Handler
//!
//! Stands in for the patient-notification collaborator: consumes queue
//! events from the bus and writes one structured log line per event.
//! Delivery results never flow back into the queue.

use shared_bus::{QueueEvent, Subscription};
use tokio::sync::watch;
use tracing::{debug, info};

pub struct NotificationLogHandler {
    subscription: Subscription,
}

impl NotificationLogHandler {
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Run until shutdown or until the bus closes. Returns how many events
    /// were handled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!("Notification log handler started");
        let mut handled = 0;
        loop {
            tokio::select! {
                event = self.subscription.recv() => match event {
                    Some(event) => {
                        notify(&event);
                        handled += 1;
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(handled, "Notification log handler stopped");
        handled
    }
}

/// One log line per patient-facing event.
pub fn notify(event: &QueueEvent) {
    let meta = event.meta();
    match event {
        QueueEvent::PatientAddedToQueue {
            patient_ref,
            position,
            ..
        } => info!(clinic_id = %meta.clinic_id, patient = %patient_ref, position, "Notify: you are in the queue"),
        QueueEvent::PatientCalled {
            patient_ref,
            staff_id,
            ..
        } => info!(clinic_id = %meta.clinic_id, patient = %patient_ref, staff_id = %staff_id, "Notify: please proceed"),
        QueueEvent::PatientMarkedAbsent {
            patient_ref,
            grace_period_ends_at,
            ..
        } => info!(
            clinic_id = %meta.clinic_id,
            patient = %patient_ref,
            until = %grace_period_ends_at,
            "Notify: you missed your call"
        ),
        QueueEvent::PatientReturned {
            patient_ref,
            new_position,
            ..
        } => info!(clinic_id = %meta.clinic_id, patient = %patient_ref, position = new_position, "Notify: welcome back"),
        QueueEvent::PatientAutoCancelled { patient_ref, .. } => {
            info!(clinic_id = %meta.clinic_id, patient = %patient_ref, "Notify: appointment cancelled")
        }
        QueueEvent::DayClosed {
            no_show_ids,
            completed_ids,
            ..
        } => info!(
            clinic_id = %meta.clinic_id,
            no_shows = no_show_ids.len(),
            completed = completed_ids.len(),
            "Queue closed for the day"
        ),
        QueueEvent::DayReopened { restored_ids, .. } => {
            info!(clinic_id = %meta.clinic_id, restored = restored_ids.len(), "Queue reopened")
        }
        other => debug!(clinic_id = %meta.clinic_id, event = other.name(), "Queue event"),
    }
}
