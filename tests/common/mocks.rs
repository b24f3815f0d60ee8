//! Mock services for integration tests

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;

use lattice_licensing::models::Organization;
use lattice_licensing::services::InviteNotifier;

/// Notifier that records every send and can be told to fail for specific
/// addresses, so tests can observe which invites had their email delivered.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail_for: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to this address fail from now on.
    pub fn fail_for(&self, email: &str) {
        self.fail_for.lock().unwrap().insert(email.to_string());
    }

    /// Addresses that received an email, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl InviteNotifier for RecordingNotifier {
    async fn send_invite(
        &self,
        email: &str,
        _organization: &Organization,
        _invite_code: &str,
    ) -> anyhow::Result<()> {
        if self.fail_for.lock().unwrap().contains(email) {
            bail!("simulated SMTP failure for {}", email);
        }
        self.sent.lock().unwrap().push(email.to_string());
        Ok(())
    }
}
