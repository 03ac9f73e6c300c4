//! In-process message bus - pub/sub fan-out plus request/response correlation.
//!
//! Every [`Subscription`] owns an unbounded `mpsc` receiver; [`MessageBus::publish`]
//! fans a message out to every live subscription whose kind and filter match
//! (hot broadcast: nothing is replayed to late subscribers).
//!
//! Request/response is layered on top of the same fan-out:
//!
//! | Table | Key | Entry removed when |
//! |-------|-----|--------------------|
//! | `pending_responses` | request id | response arrives, caller times out, bus closes |
//! | `open_requests` | request id | response arrives, deadline passes |
//!
//! A [`ResponseMessage`] whose `request_id` is in neither table is dropped.

use super::error::{BusError, Result};
use super::metrics::{BusMetrics, MetricsRecorder};
use super::subscription::Subscription;
use conductor_application::BusParams;
use conductor_application::ports::message_journal::{
    JournalEntry, MessageJournal, NoMessageJournal,
};
use conductor_domain::{
    AckMessage, AckStatus, AgentMessage, MessageKind, RequestMessage, ResponseMessage,
    TypedMessage,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant as StdInstant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Sender id used for messages the bus publishes itself (acks).
pub const BUS_SENDER_ID: &str = "message-bus";

/// Journal reason for a response nobody is waiting on.
const UNKNOWN_REQUEST: &str = "unknown or expired request";

type MessageFilter = Box<dyn Fn(&AgentMessage) -> bool + Send + Sync>;

struct SubscriberEntry {
    kind: Option<MessageKind>,
    filter: Option<MessageFilter>,
    sender: mpsc::UnboundedSender<AgentMessage>,
}

impl SubscriberEntry {
    fn accepts_kind(&self, kind: MessageKind) -> bool {
        self.kind.is_none_or(|k| k == kind)
    }
}

pub struct MessageBus {
    params: BusParams,
    subscribers: RwLock<HashMap<u64, SubscriberEntry>>,
    next_subscription_id: AtomicU64,
    /// Callers blocked in [`MessageBus::request_response`].
    pending_responses: Mutex<HashMap<String, oneshot::Sender<ResponseMessage>>>,
    /// Deadline of every published request still awaiting an answer.
    open_requests: Mutex<HashMap<String, Instant>>,
    closed: AtomicBool,
    metrics: MetricsRecorder,
    journal: Arc<dyn MessageJournal>,
}

impl MessageBus {
    pub fn new(params: BusParams) -> Arc<Self> {
        Self::with_journal(params, Arc::new(NoMessageJournal))
    }

    /// Create a bus that records every publication to `journal`.
    pub fn with_journal(params: BusParams, journal: Arc<dyn MessageJournal>) -> Arc<Self> {
        Arc::new(Self {
            params,
            subscribers: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            pending_responses: Mutex::new(HashMap::new()),
            open_requests: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            metrics: MetricsRecorder::new(),
            journal,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Publish a message to every matching subscription.
    ///
    /// Returns how many receivers got the message (subscriptions plus a
    /// waiting [`request_response`](Self::request_response) caller). A
    /// response for an unknown or expired request is dropped and yields 0.
    pub fn publish(&self, message: impl Into<AgentMessage>) -> Result<usize> {
        let message = message.into();

        if self.is_closed() {
            self.metrics.record_error();
            return Err(BusError::Delivery("bus is closed".to_string()));
        }
        if let Err(e) = message.validate() {
            self.metrics.record_error();
            warn!(id = message.id(), error = %e, "Rejected invalid message");
            return Err(e.into());
        }

        let started = StdInstant::now();
        let mut delivered = 0;

        match &message {
            AgentMessage::Request(request) => self.open_request(request),
            AgentMessage::Response(response) => match self.settle_request(response) {
                Settled::Unknown => {
                    debug!(
                        id = %response.id,
                        request_id = %response.request_id,
                        "Dropping response for unknown or expired request"
                    );
                    self.journal.record(JournalEntry::Dropped {
                        message: &message,
                        reason: UNKNOWN_REQUEST,
                    });
                    return Ok(0);
                }
                Settled::Waiter(waiter) => {
                    if waiter.send(response.clone()).is_ok() {
                        delivered += 1;
                    }
                }
                Settled::Open => {}
            },
            _ => {}
        }

        delivered += self.fan_out(&message);
        self.metrics.record_delivery(started.elapsed());
        self.journal.record(JournalEntry::Published {
            message: &message,
            delivered,
        });

        if let AgentMessage::Request(request) = &message
            && delivered > 0
        {
            let ack = AckMessage::new(BUS_SENDER_ID, request.id.clone(), AckStatus::Received);
            if let Err(e) = self.publish(ack) {
                debug!(request_id = %request.id, error = %e, "Could not acknowledge request");
            }
        }

        Ok(delivered)
    }

    /// Deserialize a JSON-encoded message and publish it.
    pub fn publish_json(&self, json: &str) -> Result<usize> {
        let message: AgentMessage = serde_json::from_str(json).inspect_err(|_| {
            self.metrics.record_error();
        })?;
        self.publish(message)
    }

    /// Subscribe to every message of kind `T`.
    pub fn subscribe<T: TypedMessage>(self: &Arc<Self>) -> Result<Subscription<T>> {
        self.register::<T>(None)
    }

    /// Subscribe to messages of kind `T` accepted by `filter`.
    ///
    /// A filter that panics is treated as "not matched" for that message.
    pub fn subscribe_filtered<T, F>(self: &Arc<Self>, filter: F) -> Result<Subscription<T>>
    where
        T: TypedMessage,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let filter: MessageFilter =
            Box::new(move |message| T::from_ref(message).is_some_and(|typed| filter(typed)));
        self.register::<T>(Some(filter))
    }

    /// Subscribe to every message regardless of kind.
    pub fn subscribe_all(self: &Arc<Self>) -> Result<Subscription<AgentMessage>> {
        self.subscribe::<AgentMessage>()
    }

    /// Publish `request` and wait for its correlated response.
    ///
    /// `timeout` overrides the bus default; it is also written into the
    /// request so responders see the same deadline.
    pub async fn request_response(
        &self,
        mut request: RequestMessage,
        timeout: Option<Duration>,
    ) -> Result<ResponseMessage> {
        let timeout = timeout.unwrap_or(self.params.default_timeout);
        let timeout_ms = (timeout.as_millis() as u64).max(1);
        request.timeout_ms = timeout_ms;
        let request_id = request.id.clone();

        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(request_id.clone(), tx);

        if let Err(e) = self.publish(request) {
            self.lock_pending().remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BusError::Delivery(format!(
                "bus closed before request {} was answered",
                request_id
            ))),
            Err(_) => {
                self.lock_pending().remove(&request_id);
                self.lock_open().remove(&request_id);
                self.metrics.record_error();
                debug!(request_id = %request_id, timeout_ms, "Request timed out");
                Err(BusError::Timeout {
                    request_id,
                    timeout_ms,
                })
            }
        }
    }

    /// Number of callers currently blocked in `request_response`.
    pub fn pending_request_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Requests still accepting a response, answered by a waiter or not.
    pub fn open_request_count(&self) -> usize {
        self.lock_open().len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn metrics(&self) -> BusMetrics {
        self.metrics
            .snapshot(self.subscription_count(), self.pending_request_count())
    }

    /// Close the bus: end every subscription stream and fail every pending
    /// request with [`BusError::Delivery`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let subscriptions = {
            let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        let pending = {
            let mut pending = self.lock_pending();
            let count = pending.len();
            pending.clear();
            count
        };
        self.lock_open().clear();
        debug!(subscriptions, pending, "Message bus closed");
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if subscribers.remove(&id).is_some() {
            trace!(subscription = id, "Deregistered subscription");
        }
    }

    fn register<T: TypedMessage>(
        self: &Arc<Self>,
        filter: Option<MessageFilter>,
    ) -> Result<Subscription<T>> {
        if self.is_closed() {
            return Err(BusError::Subscription("bus is closed".to_string()));
        }
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            subscribers.insert(
                id,
                SubscriberEntry {
                    kind: T::KIND,
                    filter,
                    sender,
                },
            );
        }
        trace!(subscription = id, kind = ?T::KIND, "Registered subscription");
        Ok(Subscription::new(id, receiver, Arc::clone(self)))
    }

    fn fan_out(&self, message: &AgentMessage) -> usize {
        let kind = message.kind();
        let mut delivered = 0;
        let mut disconnected = Vec::new();
        {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, entry) in subscribers.iter() {
                if !entry.accepts_kind(kind) {
                    continue;
                }
                if let Some(filter) = &entry.filter {
                    match catch_unwind(AssertUnwindSafe(|| filter(message))) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(_) => {
                            self.metrics.record_error();
                            warn!(subscription = id, message = message.id(), "Subscription filter panicked");
                            continue;
                        }
                    }
                }
                if entry.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    self.metrics.record_error();
                    disconnected.push(*id);
                }
            }
        }
        for id in disconnected {
            self.unsubscribe(id);
        }
        trace!(id = message.id(), kind = %kind, delivered, "Fanned out message");
        delivered
    }

    fn open_request(&self, request: &RequestMessage) {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(request.timeout_ms);
        let mut open = self.lock_open();
        open.retain(|_, d| *d > now);
        open.insert(request.id.clone(), deadline);
    }

    fn settle_request(&self, response: &ResponseMessage) -> Settled {
        let now = Instant::now();
        let was_open = self
            .lock_open()
            .remove(&response.request_id)
            .is_some_and(|deadline| deadline > now);
        match self.lock_pending().remove(&response.request_id) {
            Some(waiter) => Settled::Waiter(waiter),
            None if was_open => Settled::Open,
            None => Settled::Unknown,
        }
    }

    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<ResponseMessage>>> {
        self.pending_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lock_open(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.open_requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

enum Settled {
    Waiter(oneshot::Sender<ResponseMessage>),
    Open,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{EventMessage, MessagePayload, event_types};
    use futures::StreamExt;

    fn bus() -> Arc<MessageBus> {
        MessageBus::new(BusParams::default())
    }

    fn event(event_type: &str) -> EventMessage {
        EventMessage::new("tester", event_type, MessagePayload::text("hello"))
    }

    /// (message id, kind, delivered, drop reason)
    type Recorded = (String, MessageKind, usize, Option<&'static str>);

    #[derive(Default)]
    struct CollectingJournal {
        entries: Mutex<Vec<Recorded>>,
    }

    impl MessageJournal for CollectingJournal {
        fn record(&self, entry: JournalEntry<'_>) {
            let message = entry.message();
            self.entries.lock().unwrap().push((
                message.id().to_string(),
                message.kind(),
                entry.delivered(),
                entry.reason(),
            ));
        }
    }

    #[tokio::test]
    async fn test_hot_broadcast_skips_late_subscribers() {
        let bus = bus();
        assert_eq!(bus.publish(event("early")).unwrap(), 0);

        let mut sub = bus.subscribe::<EventMessage>().unwrap();
        bus.publish(event("late")).unwrap();

        let received = sub.recv().await.unwrap();
        assert_eq!(received.event_type, "late");
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_typed_subscription_filters_by_kind() {
        let bus = bus();
        let mut events = bus.subscribe::<EventMessage>().unwrap();
        let mut all = bus.subscribe_all().unwrap();

        bus.publish(AckMessage::new("a", "m-1", AckStatus::Processed))
            .unwrap();
        bus.publish(event(event_types::STEP_STARTED)).unwrap();

        assert_eq!(
            events.recv().await.unwrap().event_type,
            event_types::STEP_STARTED
        );
        assert!(events.try_recv().is_none());

        assert_eq!(all.next().await.unwrap().kind(), MessageKind::Ack);
        assert_eq!(all.next().await.unwrap().kind(), MessageKind::Event);
    }

    #[tokio::test]
    async fn test_filter_selects_messages() {
        let bus = bus();
        let mut heartbeats = bus
            .subscribe_filtered::<EventMessage, _>(|e| e.event_type == event_types::AGENT_HEARTBEAT)
            .unwrap();

        bus.publish(event(event_types::STEP_STARTED)).unwrap();
        bus.publish(event(event_types::AGENT_HEARTBEAT)).unwrap();

        let received = heartbeats.recv().await.unwrap();
        assert_eq!(received.event_type, event_types::AGENT_HEARTBEAT);
        assert!(heartbeats.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_panicking_filter_is_isolated() {
        let bus = bus();
        let _broken = bus
            .subscribe_filtered::<EventMessage, _>(|_| panic!("filter bug"))
            .unwrap();
        let mut healthy = bus.subscribe::<EventMessage>().unwrap();

        let delivered = bus.publish(event("ping")).unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(healthy.recv().await.unwrap().event_type, "ping");
        assert_eq!(bus.metrics().total_errors, 1);
    }

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let bus = bus();
        let mut requests = bus.subscribe::<RequestMessage>().unwrap();

        let responder = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                let request = requests.recv().await.unwrap();
                let reply = request.reply("analyzer", MessagePayload::text("done"));
                bus.publish(reply).unwrap();
            })
        };

        let request = RequestMessage::new("orchestrator", "code.analyze", MessagePayload::text("x"));
        let request_id = request.id.clone();
        let response = bus
            .request_response(request, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        responder.await.unwrap();

        assert_eq!(response.request_id, request_id);
        assert_eq!(response.payload.as_text(), Some("done"));
        assert_eq!(bus.pending_request_count(), 0);
    }

    #[tokio::test]
    async fn test_request_without_responder_times_out() {
        let bus = bus();
        let request = RequestMessage::new("orchestrator", "nobody.listens", MessagePayload::default());
        let request_id = request.id.clone();

        let err = bus
            .request_response(request.clone(), Some(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BusError::Timeout {
                request_id: request_id.clone(),
                timeout_ms: 50
            }
        );
        assert_eq!(bus.pending_request_count(), 0);

        // A late answer has nowhere to go
        let late = request.reply("slowpoke", MessagePayload::text("too late"));
        assert_eq!(bus.publish(late).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delivered_request_is_acknowledged_once() {
        let bus = bus();
        let _requests = bus.subscribe::<RequestMessage>().unwrap();
        let _more_requests = bus.subscribe::<RequestMessage>().unwrap();
        let mut acks = bus.subscribe::<AckMessage>().unwrap();

        let request = RequestMessage::new("orchestrator", "code.analyze", MessagePayload::default());
        let request_id = request.id.clone();
        assert_eq!(bus.publish(request).unwrap(), 2);

        let ack = acks.recv().await.unwrap();
        assert_eq!(ack.original_message_id, request_id);
        assert_eq!(ack.status, AckStatus::Received);
        assert_eq!(ack.sender_id, BUS_SENDER_ID);
        assert!(acks.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_undelivered_request_is_not_acknowledged() {
        let bus = bus();
        let mut acks = bus.subscribe::<AckMessage>().unwrap();
        bus.publish(RequestMessage::new("a", "t", MessagePayload::default()))
            .unwrap();
        assert!(acks.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_fire_and_forget_response_reaches_subscribers() {
        let bus = bus();
        let mut responses = bus.subscribe::<ResponseMessage>().unwrap();

        let request = RequestMessage::new("a", "t", MessagePayload::default());
        bus.publish(request.clone()).unwrap();
        bus.publish(request.reply("b", MessagePayload::text("ok")))
            .unwrap();
        // Second answer to the same request is dropped
        assert_eq!(
            bus.publish(request.reply("c", MessagePayload::text("again")))
                .unwrap(),
            0
        );

        assert_eq!(responses.recv().await.unwrap().sender_id, "b");
        assert!(responses.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unknown_response_is_dropped() {
        let bus = bus();
        let mut responses = bus.subscribe::<ResponseMessage>().unwrap();
        let orphan = RequestMessage::new("a", "t", MessagePayload::default())
            .reply("b", MessagePayload::text("who asked?"));

        assert_eq!(bus.publish(orphan).unwrap(), 0);
        assert!(responses.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_stray_response_leaves_waiter_untouched() {
        let bus = bus();
        let mut requests = bus.subscribe::<RequestMessage>().unwrap();

        let caller = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                let request = RequestMessage::new("orchestrator", "code.analyze", MessagePayload::default());
                bus.request_response(request, Some(Duration::from_secs(2))).await
            })
        };
        let request = requests.recv().await.unwrap();
        assert_eq!(bus.pending_request_count(), 1);

        let stray = RequestMessage::new("someone", "other.topic", MessagePayload::default())
            .reply("stranger", MessagePayload::text("not yours"));
        assert_eq!(bus.publish(stray).unwrap(), 0);
        assert_eq!(bus.pending_request_count(), 1);
        assert_eq!(bus.open_request_count(), 1);

        bus.publish(request.reply("analyzer", MessagePayload::text("yours")))
            .unwrap();
        let response = caller.await.unwrap().unwrap();

        assert_eq!(response.request_id, request.id);
        assert_eq!(response.payload.as_text(), Some("yours"));
        assert_eq!(bus.pending_request_count(), 0);
        assert_eq!(bus.open_request_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_timeouts_leave_no_bookkeeping() {
        let bus = bus();

        for i in 0..50 {
            let request = RequestMessage::new(
                "orchestrator",
                format!("nobody.listens.{}", i),
                MessagePayload::default(),
            );
            let err = bus
                .request_response(request, Some(Duration::from_millis(1)))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }

        assert_eq!(bus.pending_request_count(), 0);
        assert_eq!(bus.open_request_count(), 0);
        assert_eq!(bus.metrics().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_invalid_message_is_rejected() {
        let bus = bus();
        let request =
            RequestMessage::new("orchestrator", "code.analyze", MessagePayload::default())
                .with_timeout_ms(0);

        let err = bus.publish(request).unwrap_err();
        assert!(matches!(err, BusError::InvalidMessage(_)));
        assert_eq!(bus.metrics().total_errors, 1);
        assert_eq!(bus.metrics().total_messages, 0);
    }

    #[tokio::test]
    async fn test_publish_json() {
        let bus = bus();
        let mut events = bus.subscribe::<EventMessage>().unwrap();

        let json = serde_json::to_string(&AgentMessage::from(event("from_json"))).unwrap();
        bus.publish_json(&json).unwrap();
        assert_eq!(events.recv().await.unwrap().event_type, "from_json");

        let err = bus.publish_json("{not json").unwrap_err();
        assert!(matches!(err, BusError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_dropping_subscription_deregisters() {
        let bus = bus();
        let sub = bus.subscribe_all().unwrap();
        assert_eq!(bus.metrics().active_subscriptions, 1);
        drop(sub);
        assert_eq!(bus.metrics().active_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_fails_pending() {
        let bus = bus();
        let mut events = bus.subscribe::<EventMessage>().unwrap();

        let waiting = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                let request = RequestMessage::new("a", "never.answered", MessagePayload::default());
                bus.request_response(request, Some(Duration::from_secs(5)))
                    .await
            })
        };
        while bus.pending_request_count() == 0 {
            tokio::task::yield_now().await;
        }

        bus.close();

        assert!(events.next().await.is_none());
        assert!(matches!(
            waiting.await.unwrap(),
            Err(BusError::Delivery(_))
        ));
        assert!(matches!(
            bus.publish(event("after")),
            Err(BusError::Delivery(_))
        ));
        assert!(matches!(
            bus.subscribe_all(),
            Err(BusError::Subscription(_))
        ));
    }

    #[tokio::test]
    async fn test_metrics_count_messages() {
        let bus = bus();
        let _sub = bus.subscribe_all().unwrap();
        bus.publish(event("one")).unwrap();
        bus.publish(event("two")).unwrap();

        let metrics = bus.metrics();
        assert_eq!(metrics.total_messages, 2);
        assert_eq!(metrics.total_errors, 0);
        assert_eq!(metrics.error_rate, 0.0);
        assert_eq!(metrics.active_subscriptions, 1);
        assert_eq!(metrics.pending_requests, 0);
    }

    #[tokio::test]
    async fn test_journal_records_publications() {
        let journal = Arc::new(CollectingJournal::default());
        let bus = MessageBus::with_journal(BusParams::default(), journal.clone());
        let _sub = bus.subscribe::<EventMessage>().unwrap();

        let journaled = event("journaled");
        let event_id = journaled.id.clone();
        bus.publish(journaled).unwrap();
        let orphan = RequestMessage::new("a", "t", MessagePayload::default())
            .reply("b", MessagePayload::default());
        let orphan_id = orphan.id.clone();
        bus.publish(orphan).unwrap();

        let entries = journal.entries.lock().unwrap();
        assert_eq!(
            *entries,
            vec![
                (event_id, MessageKind::Event, 1, None),
                (orphan_id, MessageKind::Response, 0, Some(UNKNOWN_REQUEST)),
            ]
        );
    }
}
