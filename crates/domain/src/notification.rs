//! Customer notification gateway and the fire-and-forget dispatcher.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::{Order, OrderId};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Default upper bound on a single notification attempt.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors reported by a notification gateway.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// External service that tells a customer about their order.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Sends the order confirmation for a freshly created order.
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError>;
}

/// Gateway that only writes the confirmation to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationGateway;

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError> {
        tracing::info!(
            order_id = %order.id,
            customer = order.owner_display(),
            total = %order.total_price,
            items = order.item_count(),
            "order confirmation sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    delivered: Vec<OrderId>,
    fail: bool,
    delay: Option<Duration>,
}

/// In-memory gateway that records deliveries, for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationGateway {
    state: Arc<Mutex<RecordingState>>,
}

impl InMemoryNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail.
    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }

    /// Delays every following delivery.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Orders a confirmation was delivered for, in delivery order.
    pub fn delivered(&self) -> Vec<OrderId> {
        self.lock().delivered.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotificationGateway {
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail {
            return Err(NotificationError::Delivery("gateway unavailable".into()));
        }
        state.delivered.push(order.id);
        Ok(())
    }
}

/// Runs notifications on their own task so callers never wait for them.
///
/// Each attempt is bounded by a timeout. Failures are logged and dropped;
/// there are no retries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Dispatcher backed by [`LoggingNotificationGateway`].
    pub fn logging() -> Self {
        Self::new(
            Arc::new(LoggingNotificationGateway),
            DEFAULT_NOTIFICATION_TIMEOUT,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Schedules the order confirmation and returns immediately.
    ///
    /// The returned handle is only useful to tests; dropping it does not
    /// cancel the task.
    pub fn dispatch(&self, order: Order) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, gateway.notify_order_created(&order))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(NotificationError::Timeout(timeout)),
            };

            match outcome {
                Ok(()) => {
                    metrics::counter!("order_notifications_total", "outcome" => "sent")
                        .increment(1);
                }
                Err(error) => {
                    metrics::counter!("order_notifications_total", "outcome" => "failed")
                        .increment(1);
                    tracing::warn!(order_id = %order.id, %error, "order notification failed");
                }
            }
        })
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
