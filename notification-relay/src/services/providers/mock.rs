use super::{ErrorCode, ProviderError, PushProvider};
use crate::models::ProviderMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// What a [`MockPushProvider`] answers to every send.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed { message_id: String },
    Reject { code: ErrorCode, message: String },
}

/// In-process push provider for tests and local runs.
pub struct MockPushProvider {
    outcome: MockOutcome,
    send_count: AtomicU64,
    sent: Mutex<Vec<ProviderMessage>>,
}

impl MockPushProvider {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(message_id: impl Into<String>) -> Self {
        Self::new(MockOutcome::Succeed {
            message_id: message_id.into(),
        })
    }

    pub fn rejecting(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(MockOutcome::Reject {
            code,
            message: message.into(),
        })
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Every message received so far, in arrival order.
    pub fn sent_messages(&self) -> Vec<ProviderMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, message: &ProviderMessage) -> Result<String, ProviderError> {
        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());

        tracing::info!(
            token = ?message.token,
            title = ?message.notification.title,
            send_count = count,
            "[MOCK] Push notification would be sent"
        );

        match &self.outcome {
            MockOutcome::Succeed { message_id } => Ok(message_id.clone()),
            MockOutcome::Reject { code, message } => Err(ProviderError::Rejected {
                code: *code,
                message: message.clone(),
            }),
        }
    }
}
