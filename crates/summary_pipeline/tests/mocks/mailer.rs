use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use summary_pipeline::{Mailer, OutgoingEmail};

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    /// Recipients the relay refuses
    pub rejected: HashSet<String>,
    /// Recipients whose delivery never finishes
    pub stalled: HashSet<String>,
}

impl MockMailer {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            rejected: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn stalling(addresses: &[&str]) -> Self {
        Self {
            stalled: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().iter().map(|e| e.to.to_string()).collect()
    }
}

impl Mailer for MockMailer {
    type Error = anyhow::Error;

    async fn send(&self, email: OutgoingEmail) -> Result<(), Self::Error> {
        let to = email.to.to_string();

        if self.stalled.contains(&to) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.rejected.contains(&to) {
            anyhow::bail!("550 mailbox unavailable: {}", to);
        }

        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
