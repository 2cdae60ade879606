//! Single-worker queue in front of a stateful actuator.
//!
//! The desktop actuator drives one shared application window, so overlapping
//! invocations would interleave keystrokes. Jobs are processed strictly FIFO by
//! one worker task that owns the actuator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::actuator_contract::{Actuator, ActuatorError};

enum ActuatorJob {
    Deliver {
        payload: String,
        reply: oneshot::Sender<Result<(), ActuatorError>>,
    },
    NotifyFallback {
        summary: String,
        reply: oneshot::Sender<Result<(), ActuatorError>>,
    },
}

#[derive(Clone)]
pub struct ActuatorQueue {
    sender: mpsc::Sender<ActuatorJob>,
}

impl ActuatorQueue {
    /// Spawns the worker. The worker stops once every queue handle is dropped.
    pub fn spawn(actuator: Arc<dyn Actuator>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_actuator_worker(actuator, receiver));
        (Self { sender }, handle)
    }

    async fn submit(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), ActuatorError>>) -> ActuatorJob,
    ) -> Result<(), ActuatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| ActuatorError::QueueClosed)?;
        reply_rx.await.map_err(|_| ActuatorError::QueueClosed)?
    }
}

async fn run_actuator_worker(
    actuator: Arc<dyn Actuator>,
    mut receiver: mpsc::Receiver<ActuatorJob>,
) {
    while let Some(job) = receiver.recv().await {
        match job {
            ActuatorJob::Deliver { payload, reply } => {
                let result = actuator.deliver(&payload).await;
                let _ = reply.send(result);
            }
            ActuatorJob::NotifyFallback { summary, reply } => {
                let result = actuator.notify_fallback(&summary).await;
                let _ = reply.send(result);
            }
        }
    }
    debug!("actuator worker stopped");
}

#[async_trait]
impl Actuator for ActuatorQueue {
    async fn deliver(&self, payload: &str) -> Result<(), ActuatorError> {
        let payload = payload.to_string();
        self.submit(|reply| ActuatorJob::Deliver { payload, reply })
            .await
    }

    async fn notify_fallback(&self, summary: &str) -> Result<(), ActuatorError> {
        let summary = summary.to_string();
        self.submit(|reply| ActuatorJob::NotifyFallback { summary, reply })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::ActuatorQueue;
    use crate::actuator_contract::{Actuator, ActuatorError};

    #[derive(Default)]
    struct OverlapTrackingActuator {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Actuator for OverlapTrackingActuator {
        async fn deliver(&self, payload: &str) -> Result<(), ActuatorError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.delivered
                .lock()
                .expect("delivered lock")
                .push(payload.to_string());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if payload == "fail" {
                return Err(ActuatorError::InvalidConfig("scripted failure".to_string()));
            }
            Ok(())
        }

        async fn notify_fallback(&self, _summary: &str) -> Result<(), ActuatorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn functional_actuator_queue_serializes_concurrent_deliveries() {
        let tracker = Arc::new(OverlapTrackingActuator::default());
        let (queue, _worker) = ActuatorQueue::spawn(tracker.clone(), 4);

        let mut handles = Vec::new();
        for index in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue.deliver(&format!("payload-{index}")).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("delivered");
        }

        assert_eq!(tracker.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.delivered.lock().expect("delivered lock").len(), 8);
    }

    #[tokio::test]
    async fn unit_actuator_queue_propagates_actuator_errors() {
        let tracker = Arc::new(OverlapTrackingActuator::default());
        let (queue, _worker) = ActuatorQueue::spawn(tracker, 1);
        let error = queue.deliver("fail").await.expect_err("delivery fails");
        assert!(matches!(error, ActuatorError::InvalidConfig(_)));
        queue.notify_fallback("summary").await.expect("notify");
    }

    #[tokio::test]
    async fn regression_actuator_queue_reports_closed_worker() {
        let tracker = Arc::new(OverlapTrackingActuator::default());
        let (queue, worker) = ActuatorQueue::spawn(tracker, 1);
        worker.abort();
        let _ = worker.await;
        let error = queue.deliver("late").await.expect_err("queue closed");
        assert!(matches!(error, ActuatorError::QueueClosed));
    }
}
