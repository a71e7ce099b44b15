//! Core broker implementation.

use crate::consumer::Consumer;
use crate::dlq::DeadLetterQueue;
use crate::retry::RetryCoordinator;
use crate::routing::PartitionRouter;
use parking_lot::Mutex;
use skein_core::{
    BrokerConfig, ConsumerId, Event, InFlightGuard, PartitionId, Result, SubscriptionId,
    TaskExecutor,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

/// In-process message broker with partitioned per-key ordering.
///
/// A broker is an explicitly constructed instance owning its own topic and
/// consumer registries; separate instances are fully independent. Topics and
/// their partition queues are created lazily on first publish or subscribe.
///
/// Delivery model, per partition: a single drainer pops queued events in
/// FIFO order and offers each to every currently subscribed consumer before
/// the next is dequeued. Each (partition, consumer) pair has its own ordered
/// delivery lane, so a consumer observes same-key events in publish order
/// even while other consumers lag or retry. Across partitions, and across
/// consumers of one event, nothing is ordered.
pub struct Broker<E: Event> {
    config: BrokerConfig,
    router: PartitionRouter,
    retry: RetryCoordinator,
    executor: TaskExecutor,
    dead_letters: Arc<DeadLetterQueue<E>>,
    topics: RwLock<HashMap<E::Topic, Arc<TopicState<E>>>>,
}

/// Handle returned by [`Broker::subscribe`].
///
/// Subscriptions live for the broker's lifetime; the handle identifies the
/// registration in traces and carries no cancellation authority.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    consumer: ConsumerId,
}

impl SubscriptionHandle {
    /// Unique identifier of this subscription.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Identifier of the subscribed consumer.
    #[must_use]
    pub const fn consumer(&self) -> &ConsumerId {
        &self.consumer
    }
}

/// Broker runtime statistics.
#[derive(Debug, Clone, Copy)]
pub struct BrokerStats {
    /// Number of topics touched by a publish or subscribe so far
    pub topics: usize,
    /// Events sitting in partition queues, not yet offered to any consumer
    pub queued_events: usize,
    /// Deliveries and drains currently in flight
    pub in_flight: usize,
    /// Entries recorded in the dead-letter queue
    pub dead_letters: usize,
}

/// Per-topic registry entry: fixed partition queues plus the consumer lanes
/// fanned out to on every dequeue.
struct TopicState<E: Event> {
    partitions: Vec<Arc<PartitionQueue<E>>>,
    consumers: RwLock<Vec<ConsumerLanes<E>>>,
}

/// One registered consumer and its per-partition ordered delivery lanes.
struct ConsumerLanes<E> {
    consumer: ConsumerId,
    lanes: Vec<mpsc::UnboundedSender<Delivery<E>>>,
}

/// An event queued into a delivery lane; the guard keeps the delivery
/// visible to [`Broker::quiesce`] until the retry path finishes with it.
struct Delivery<E> {
    event: E,
    _guard: InFlightGuard,
}

/// An ordered queue of events for one (topic, partition index) pair.
///
/// The mutex serializes enqueue and dequeue; the flag admits one drainer at
/// a time. Together they are the unit of mutual exclusion the per-key
/// ordering guarantee rests on. Partitions of the same topic share nothing.
struct PartitionQueue<E> {
    id: PartitionId,
    queue: Mutex<VecDeque<E>>,
    draining: AtomicBool,
}

impl<E: Event> TopicState<E> {
    fn new(num_partitions: u32) -> Self {
        let partitions = (0..num_partitions)
            .map(|index| {
                Arc::new(PartitionQueue {
                    id: PartitionId::new(index),
                    queue: Mutex::new(VecDeque::new()),
                    draining: AtomicBool::new(false),
                })
            })
            .collect();
        Self { partitions, consumers: RwLock::new(Vec::new()) }
    }

    fn queued(&self) -> usize {
        self.partitions.iter().map(|partition| partition.queue.lock().len()).sum()
    }
}

impl<E> PartitionQueue<E> {
    fn index(&self) -> usize {
        self.id.value() as usize
    }
}

impl<E: Event> Broker<E> {
    /// Create a new broker instance with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration fails
    /// validation.
    ///
    /// [`Error::Configuration`]: skein_core::Error::Configuration
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            router: PartitionRouter::new(config.num_partitions),
            retry: RetryCoordinator::new(config.retry.clone()),
            executor: TaskExecutor::new(),
            dead_letters: Arc::new(DeadLetterQueue::new()),
            topics: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Publish an event under a partition key.
    ///
    /// Routes the key to a partition, enqueues the event at the tail of that
    /// partition's queue, and triggers delivery. Returns the partition the
    /// event landed in as soon as it is queued, before any consumer has
    /// run. A topic with no subscribers simply accumulates backlog.
    pub async fn publish(&self, event: E, key: &str) -> PartitionId {
        let topic = event.topic();
        let state = self.topic_state(topic).await;
        let partition_id = self.router.route(key);
        let partition = Arc::clone(&state.partitions[partition_id.value() as usize]);

        partition.queue.lock().push_back(event);
        trace!(?topic, partition = %partition_id, key, "event queued");

        self.spawn_drain(state, partition);
        partition_id
    }

    /// Register a consumer for a topic.
    ///
    /// Immediately attempts delivery of any enqueued backlog across all
    /// partitions of the topic, in each partition's stored order, so a
    /// consumer joining late still receives everything still queued.
    pub async fn subscribe(
        &self,
        topic: E::Topic,
        consumer: Arc<dyn Consumer<E>>,
    ) -> SubscriptionHandle {
        let state = self.topic_state(topic).await;
        let consumer_id = consumer.id().clone();

        let lanes =
            state.partitions.iter().map(|_| self.spawn_lane(Arc::clone(&consumer))).collect();
        state
            .consumers
            .write()
            .await
            .push(ConsumerLanes { consumer: consumer_id.clone(), lanes });

        let handle = SubscriptionHandle { id: SubscriptionId::new(), consumer: consumer_id };
        debug!(
            ?topic,
            consumer = %handle.consumer,
            subscription = %handle.id,
            "consumer subscribed"
        );

        // Catch-up: offer whatever is still queued, per partition.
        for partition in &state.partitions {
            self.spawn_drain(Arc::clone(&state), Arc::clone(partition));
        }
        handle
    }

    /// Identifiers of the consumers subscribed to a topic, in subscription
    /// order. Empty for topics never touched.
    pub async fn subscriptions(&self, topic: E::Topic) -> Vec<ConsumerId> {
        let Some(state) = self.topics.read().await.get(&topic).map(Arc::clone) else {
            return Vec::new();
        };
        let consumers = state.consumers.read().await;
        consumers.iter().map(|lanes| lanes.consumer.clone()).collect()
    }

    /// The dead-letter queue of this broker.
    #[must_use]
    pub fn dead_letters(&self) -> &DeadLetterQueue<E> {
        &self.dead_letters
    }

    /// The configuration this broker was built with.
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Wait until no delivery work remains in flight.
    ///
    /// Covers queued fan-outs, running handlers, and pending retry timers,
    /// including work spawned transitively by republishing consumers.
    pub async fn quiesce(&self) {
        self.executor.quiesce().await;
    }

    /// Get current broker statistics.
    pub async fn stats(&self) -> BrokerStats {
        let topics = self.topics.read().await;
        BrokerStats {
            topics: topics.len(),
            queued_events: topics.values().map(|state| state.queued()).sum(),
            in_flight: self.executor.in_flight(),
            dead_letters: self.dead_letters.len(),
        }
    }

    /// Look up a topic's state, creating its partition queues on first use.
    async fn topic_state(&self, topic: E::Topic) -> Arc<TopicState<E>> {
        if let Some(state) = self.topics.read().await.get(&topic) {
            return Arc::clone(state);
        }
        let mut topics = self.topics.write().await;
        Arc::clone(
            topics
                .entry(topic)
                .or_insert_with(|| Arc::new(TopicState::new(self.config.num_partitions))),
        )
    }

    /// Spawn the long-lived delivery worker for one (partition, consumer)
    /// lane. The worker processes deliveries strictly one at a time, which
    /// is what keeps a consumer's view of a partition in publish order even
    /// across retries.
    fn spawn_lane(&self, consumer: Arc<dyn Consumer<E>>) -> mpsc::UnboundedSender<Delivery<E>> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Delivery<E>>();
        let retry = self.retry.clone();
        let dead_letters = Arc::clone(&self.dead_letters);
        tokio::spawn(async move {
            while let Some(Delivery { event, _guard }) = receiver.recv().await {
                retry.deliver(event, Arc::clone(&consumer), Arc::clone(&dead_letters)).await;
            }
        });
        sender
    }

    /// Claim the partition's drainer slot and start draining; a no-op when a
    /// drainer is already active (it will pick up the new event).
    fn spawn_drain(&self, state: Arc<TopicState<E>>, partition: Arc<PartitionQueue<E>>) {
        if partition.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        let executor = self.executor.clone();
        self.executor.spawn(drain_partition(state, partition, executor));
    }
}

impl<E: Event> fmt::Debug for Broker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("num_partitions", &self.config.num_partitions)
            .field("in_flight", &self.executor.in_flight())
            .finish_non_exhaustive()
    }
}

/// Drain one partition: pop events in FIFO order and fan each out to every
/// currently subscribed consumer's lane for this partition. Fan-out is
/// pipelined: the next event is dequeued as soon as the current one has
/// been offered, without awaiting any consumer.
async fn drain_partition<E: Event>(
    state: Arc<TopicState<E>>,
    partition: Arc<PartitionQueue<E>>,
    executor: TaskExecutor,
) {
    loop {
        loop {
            let Some(event) = partition.queue.lock().pop_front() else {
                break;
            };
            // Snapshot the consumers only after the pop: a consumer whose
            // registration completes while the event is still queued must be
            // in the fan-out set, or its catch-up drain (a no-op while this
            // drainer holds the slot) would never see the event again.
            let senders: Vec<mpsc::UnboundedSender<Delivery<E>>> = state
                .consumers
                .read()
                .await
                .iter()
                .map(|lanes| lanes.lanes[partition.index()].clone())
                .collect();
            if senders.is_empty() {
                // No subscribers yet; restore the head so the backlog stays
                // queued for catch-up.
                partition.queue.lock().push_front(event);
                break;
            }
            trace!(partition = %partition.id, consumers = senders.len(), "event offered");
            for sender in senders {
                // A closed lane only happens at teardown; nothing to deliver to.
                let _ = sender.send(Delivery { event: event.clone(), _guard: executor.track() });
            }
        }

        partition.draining.store(false, Ordering::Release);

        // A publish or subscribe may have slipped in behind the empty check.
        // Reclaim the drainer slot if there is work, unless a newcomer beat
        // us to it.
        let backlog = !partition.queue.lock().is_empty();
        if !backlog || state.consumers.read().await.is_empty() {
            return;
        }
        if partition.draining.swap(true, Ordering::AcqRel) {
            return;
        }
    }
}
