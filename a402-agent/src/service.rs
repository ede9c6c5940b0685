//! The paid-work contract and the bundled demo handler.
//!
//! A [`WorkHandler`] is the actual service behind the paywall. It runs only
//! after payment verification succeeds and reports progress by pushing task
//! snapshots into an [`EventSink`]; the last snapshot becomes the response's
//! task.

use std::future::Future;

use a402::task::{Message, Task, TaskState};

/// Boxed error returned by work handlers.
pub type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// Context handed to the work handler for one verified request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The task being served, payment metadata included.
    pub task: Task,
    /// The user's message.
    pub message: Message,
}

/// Collects task updates emitted while serving a request.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Task>,
}

impl EventSink {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records a task update.
    pub fn push(&mut self, task: Task) {
        self.events.push(task);
    }

    /// Whether any updates were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consumes the sink, yielding the recorded updates in order.
    #[must_use]
    pub fn into_events(self) -> Vec<Task> {
        self.events
    }
}

/// The underlying paid work, invoked only for verified payments.
pub trait WorkHandler: Send + Sync {
    /// Executes the work for one request, pushing zero or more task updates
    /// into the sink. When no update is pushed, the payment-stamped task is
    /// returned as-is.
    fn execute(
        &self,
        context: &RequestContext,
        events: &mut EventSink,
    ) -> impl Future<Output = Result<(), WorkError>> + Send;
}

/// Demo handler that acknowledges the paid request.
///
/// Makes the binary runnable end to end; deployments replace it with their
/// own handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoService;

impl WorkHandler for EchoService {
    async fn execute(
        &self,
        context: &RequestContext,
        events: &mut EventSink,
    ) -> Result<(), WorkError> {
        let text = context.message.text();
        let reply = if text.is_empty() {
            "Processed your paid request.".to_owned()
        } else {
            format!("Processed your paid request: {text}")
        };
        events.push(
            context
                .task
                .snapshot(TaskState::Completed, Message::agent(reply)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::task::Role;

    #[tokio::test]
    async fn test_echo_service_completes_with_the_request_text() {
        let task = Task::receive(Message::user("tell me a joke"), None, None, None);
        let context = RequestContext {
            message: Message::user("tell me a joke"),
            task,
        };
        let mut sink = EventSink::new();
        EchoService.execute(&context, &mut sink).await.unwrap();

        let events = sink.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status.state, TaskState::Completed);
        let message = events[0].status.message.as_ref().unwrap();
        assert_eq!(message.role, Role::Agent);
        assert_eq!(
            message.text(),
            "Processed your paid request: tell me a joke"
        );
    }
}
