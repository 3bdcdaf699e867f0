use crossbeam::channel::{Receiver, Sender, TryRecvError};

use super::partition::partition;
use super::types::WorkerMessage;
use crate::error::InputError;
use crate::task::Task;

/// Routes tasks to per-worker queues in submission order
pub(crate) struct Dispatcher {
    queues: Vec<Sender<WorkerMessage>>,
    cancel: Receiver<()>,
}

impl Dispatcher {
    pub(crate) fn new(queues: Vec<Sender<WorkerMessage>>, cancel: Receiver<()>) -> Self {
        Self { queues, cancel }
    }

    /// Forward every task to its slot's queue, then send one shutdown marker
    /// to every queue.
    ///
    /// Sending blocks while the target queue is full. The first input error
    /// stops dispatch; shutdown markers are broadcast regardless so every
    /// worker terminates. Returns the number of tasks dispatched.
    pub(crate) fn dispatch<I>(self, tasks: I) -> Result<usize, InputError>
    where
        I: IntoIterator<Item = Result<Task, InputError>>,
    {
        let outcome = self.feed(tasks.into_iter());
        self.broadcast_shutdown();
        outcome
    }

    fn feed(&self, tasks: impl Iterator<Item = Result<Task, InputError>>) -> Result<usize, InputError> {
        let worker_count = self.queues.len();
        let mut dispatched = 0;

        for task in tasks {
            if matches!(self.cancel.try_recv(), Err(TryRecvError::Disconnected)) {
                tracing::info!(dispatched, "Run cancelled, stopping dispatch");
                break;
            }

            let task = task?;
            let slot = partition(&task.entity_id, worker_count);
            tracing::trace!(entity = %task.entity_id, slot, "Dispatching task");

            if self.queues[slot].send(WorkerMessage::Task(task)).is_err() {
                // Worker gone (it panicked); the scope reports it
                tracing::warn!(slot, "Worker queue closed, dropping task");
                continue;
            }
            dispatched += 1;
        }

        tracing::debug!(dispatched, "Task source exhausted");
        Ok(dispatched)
    }

    fn broadcast_shutdown(&self) {
        for (slot, queue) in self.queues.iter().enumerate() {
            if queue.send(WorkerMessage::Shutdown).is_err() {
                tracing::warn!(slot, "Worker queue closed before shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crossbeam::channel::{bounded, unbounded};

    fn queues(n: usize) -> (Vec<Sender<WorkerMessage>>, Vec<Receiver<WorkerMessage>>) {
        (0..n).map(|_| unbounded()).unzip()
    }

    fn drain(rx: &Receiver<WorkerMessage>) -> Vec<Option<String>> {
        rx.try_iter()
            .map(|message| match message {
                WorkerMessage::Task(task) => Some(task.entity_id),
                WorkerMessage::Shutdown => None,
            })
            .collect()
    }

    #[test]
    fn test_routes_by_partition_and_shuts_down_every_queue() {
        let (senders, receivers) = queues(4);
        let (_cancel_tx, cancel_rx) = bounded::<()>(0);
        let now = Utc::now();
        let entities = ["host_1", "host_2", "host_1", "host_3", "host_1"];

        let dispatched = Dispatcher::new(senders, cancel_rx)
            .dispatch(entities.iter().map(|e| Ok(Task::new(*e, now, now))))
            .unwrap();
        assert_eq!(dispatched, 5);

        let host_1_slot = partition("host_1", 4);
        for (slot, rx) in receivers.iter().enumerate() {
            let messages = drain(rx);
            assert_eq!(messages.last(), Some(&None), "slot {slot} missing shutdown");
            assert_eq!(messages.iter().filter(|m| m.is_none()).count(), 1);
            if slot == host_1_slot {
                let host_1 = messages
                    .iter()
                    .filter(|m| m.as_deref() == Some("host_1"))
                    .count();
                assert_eq!(host_1, 3);
            }
        }
    }

    #[test]
    fn test_input_error_stops_dispatch_but_still_shuts_down() {
        let (senders, receivers) = queues(2);
        let (_cancel_tx, cancel_rx) = bounded::<()>(0);
        let now = Utc::now();
        let tasks = vec![
            Ok(Task::new("host_1", now, now)),
            Err(InputError::EmptyEntity { line: 3 }),
            Ok(Task::new("host_2", now, now)),
        ];

        let err = Dispatcher::new(senders, cancel_rx).dispatch(tasks).unwrap_err();
        assert!(matches!(err, InputError::EmptyEntity { line: 3 }));

        let all: Vec<Option<String>> = receivers.iter().flat_map(drain).collect();
        assert_eq!(all.iter().filter(|m| m.is_some()).count(), 1);
        assert_eq!(all.iter().filter(|m| m.is_none()).count(), 2);
    }

    #[test]
    fn test_cancelled_dispatch_sends_only_shutdowns() {
        let (senders, receivers) = queues(3);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        drop(cancel_tx);
        let now = Utc::now();

        let dispatched = Dispatcher::new(senders, cancel_rx)
            .dispatch((0..10).map(|i| Ok(Task::new(format!("host_{i}"), now, now))))
            .unwrap();

        assert_eq!(dispatched, 0);
        for rx in &receivers {
            assert_eq!(drain(rx), vec![None]);
        }
    }
}
