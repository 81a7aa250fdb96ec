#[cfg(test)]
#[path = "action_approvals_test.rs"]
mod tests;

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::models::ActionMarker;
use crate::domain::models::ActionStatus;
use crate::domain::models::ClientError;
use crate::domain::models::Decision;
use crate::domain::models::Message;
use crate::infrastructure::api::ApprovalsApi;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The server accepted the decision. The action is final.
    Confirmed,
    /// The action was not pending, nothing was sent.
    Ignored,
}

/// Tracks the lifecycle of every action the agent asked about. An action
/// leaves `pending` at most once, and only after the server confirmed the
/// decision.
#[derive(Clone)]
pub struct ActionApprovals {
    api: ApprovalsApi,
    statuses: Arc<DashMap<String, ActionStatus>>,
}

impl ActionApprovals {
    pub fn new(api: ApprovalsApi) -> ActionApprovals {
        return ActionApprovals {
            api,
            statuses: Arc::new(DashMap::new()),
        };
    }

    pub fn status(&self, action_id: &str) -> ActionStatus {
        return self
            .statuses
            .get(action_id)
            .map(|status| return *status)
            .unwrap_or(ActionStatus::Pending);
    }

    pub fn controls_enabled(&self, action_id: &str) -> bool {
        return self.status(action_id) == ActionStatus::Pending;
    }

    /// The action a message asks about, with its current status.
    pub fn marker_for(&self, message: &Message) -> Option<ActionMarker> {
        let mut marker = message.action()?;
        marker.status = self.status(&marker.action_id);

        return Some(marker);
    }

    /// Actions in `messages` still waiting for a decision, oldest first.
    pub fn pending(&self, messages: &[Message]) -> Vec<ActionMarker> {
        return messages
            .iter()
            .filter_map(|message| return self.marker_for(message))
            .filter(|marker| return marker.status == ActionStatus::Pending)
            .collect();
    }

    pub async fn resolve(
        &self,
        action_id: &str,
        decision: Decision,
    ) -> Result<Resolution, ClientError> {
        if !self.claim(action_id) {
            tracing::debug!(action_id, "Action is not pending, ignoring decision");
            return Ok(Resolution::Ignored);
        }

        match self.api.submit(action_id, decision).await {
            Ok(()) => {
                self.statuses
                    .insert(action_id.to_string(), decision.status());
                return Ok(Resolution::Confirmed);
            }
            Err(err) => {
                self.statuses
                    .insert(action_id.to_string(), ActionStatus::Pending);
                return Err(err);
            }
        }
    }

    /// Moves a pending action to `submitting`. Fails for every other status
    /// so a second click never reaches the server.
    fn claim(&self, action_id: &str) -> bool {
        let mut status = self
            .statuses
            .entry(action_id.to_string())
            .or_insert(ActionStatus::Pending);

        if *status != ActionStatus::Pending {
            return false;
        }

        *status = ActionStatus::Submitting;
        return true;
    }
}
