//! Scheduler that plans operations for a UI host to apply.
//!
//! Ids are generated in Rust and handed to the host together with the
//! operation list, so the host can create the platform notification under
//! the same id (the platform API accepts caller-provided ids).

use super::{
    NotificationChannel, NotificationError, NotificationId, NotificationScheduler, NotifyResult,
    TriggerRequest,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// One host-side action produced by core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOp {
    CreateChannel {
        id: String,
        name: String,
    },
    Schedule {
        id: NotificationId,
        title: String,
        body: String,
        timestamp: DateTime<Utc>,
        channel_id: String,
    },
    Cancel {
        id: NotificationId,
    },
    Display {
        title: String,
        body: String,
    },
}

/// In-process scheduler recording planned operations.
#[derive(Debug, Default)]
pub struct PlanningScheduler {
    permission_granted: bool,
    /// Seeded host ids carry no request.
    pending: BTreeMap<NotificationId, Option<TriggerRequest>>,
    channels: BTreeSet<String>,
    ops: Vec<NotificationOp>,
}

impl PlanningScheduler {
    /// `permission_granted` is the grant state already known to the host.
    pub fn new(permission_granted: bool) -> Self {
        Self {
            permission_granted,
            ..Self::default()
        }
    }

    /// Seeds ids the host reports as currently pending.
    pub fn with_pending_ids(mut self, ids: impl IntoIterator<Item = NotificationId>) -> Self {
        self.pending.extend(ids.into_iter().map(|id| (id, None)));
        self
    }

    pub fn ops(&self) -> &[NotificationOp] {
        &self.ops
    }

    /// Drains the recorded operations.
    pub fn take_ops(&mut self) -> Vec<NotificationOp> {
        std::mem::take(&mut self.ops)
    }

    /// Request behind a pending id scheduled through this instance.
    pub fn pending_request(&self, id: &str) -> Option<&TriggerRequest> {
        self.pending.get(id).and_then(Option::as_ref)
    }

    pub fn set_permission(&mut self, granted: bool) {
        self.permission_granted = granted;
    }
}

impl NotificationScheduler for PlanningScheduler {
    fn has_permission(&self) -> NotifyResult<bool> {
        Ok(self.permission_granted)
    }

    fn request_permission(&mut self) -> NotifyResult<bool> {
        Ok(self.permission_granted)
    }

    fn create_channel(&mut self, channel: &NotificationChannel) -> NotifyResult<String> {
        if self.channels.insert(channel.id.clone()) {
            self.ops.push(NotificationOp::CreateChannel {
                id: channel.id.clone(),
                name: channel.name.clone(),
            });
        }
        Ok(channel.id.clone())
    }

    fn create_trigger_notification(
        &mut self,
        request: &TriggerRequest,
    ) -> NotifyResult<NotificationId> {
        if !self.permission_granted {
            return Err(NotificationError::PermissionDenied);
        }
        let id = Uuid::new_v4().to_string();
        self.pending.insert(id.clone(), Some(request.clone()));
        self.ops.push(NotificationOp::Schedule {
            id: id.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
            timestamp: request.timestamp,
            channel_id: request.channel_id.clone(),
        });
        Ok(id)
    }

    /// Ids unknown to this instance are still forwarded; the host owns the
    /// authoritative pending set.
    fn cancel_trigger_notification(&mut self, id: &str) -> NotifyResult<()> {
        self.pending.remove(id);
        self.ops.push(NotificationOp::Cancel { id: id.to_string() });
        Ok(())
    }

    fn trigger_notification_ids(&self) -> NotifyResult<Vec<NotificationId>> {
        Ok(self.pending.keys().cloned().collect())
    }

    fn display_notification(&mut self, title: &str, body: &str) -> NotifyResult<()> {
        if !self.permission_granted {
            return Err(NotificationError::PermissionDenied);
        }
        self.ops.push(NotificationOp::Display {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationOp, PlanningScheduler};
    use crate::notify::{NotificationChannel, NotificationError, NotificationScheduler, TriggerRequest};
    use chrono::{TimeZone, Utc};

    fn request() -> TriggerRequest {
        TriggerRequest {
            title: "stretch".to_string(),
            body: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            channel_id: "reminder".to_string(),
        }
    }

    #[test]
    fn schedule_then_cancel_records_both_ops() {
        let mut scheduler = PlanningScheduler::new(true);
        let id = scheduler.create_trigger_notification(&request()).unwrap();
        assert_eq!(scheduler.trigger_notification_ids().unwrap(), vec![id.clone()]);

        scheduler.cancel_trigger_notification(&id).unwrap();
        assert!(scheduler.trigger_notification_ids().unwrap().is_empty());
        let ops = scheduler.take_ops();
        assert!(matches!(ops[0], NotificationOp::Schedule { .. }));
        assert_eq!(ops[1], NotificationOp::Cancel { id });
        assert!(scheduler.ops().is_empty());
    }

    #[test]
    fn scheduling_without_permission_is_rejected() {
        let mut scheduler = PlanningScheduler::new(false);
        let err = scheduler.create_trigger_notification(&request()).unwrap_err();
        assert_eq!(err, NotificationError::PermissionDenied);
        assert!(scheduler.ops().is_empty());
    }

    #[test]
    fn channel_creation_is_recorded_once() {
        let mut scheduler = PlanningScheduler::new(true);
        let channel = NotificationChannel {
            id: "reminder".to_string(),
            name: "Reminder Channel".to_string(),
        };
        scheduler.create_channel(&channel).unwrap();
        scheduler.create_channel(&channel).unwrap();
        assert_eq!(scheduler.ops().len(), 1);
    }

    #[test]
    fn cancel_forwards_seeded_and_unknown_ids() {
        let mut scheduler =
            PlanningScheduler::new(true).with_pending_ids(vec!["host-1".to_string()]);
        scheduler.cancel_trigger_notification("host-1").unwrap();
        scheduler.cancel_trigger_notification("host-2").unwrap();
        assert!(scheduler.trigger_notification_ids().unwrap().is_empty());
        assert_eq!(
            scheduler.take_ops(),
            vec![
                NotificationOp::Cancel { id: "host-1".to_string() },
                NotificationOp::Cancel { id: "host-2".to_string() },
            ]
        );
    }
}
