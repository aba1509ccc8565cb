//! Response notifications keyed by response id
//!
//! `publish` never runs callbacks itself. Responses are queued on a channel and a
//! dispatcher task delivers them on a later scheduler turn, so an extraction always
//! returns to its caller before any subscriber sees the response.
//!
//! That ordering only holds when the dispatcher shares the publisher's thread, so a
//! notifier can only be created on a current-thread runtime.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use error_stack::Report;
use serde_json::Value;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::json_object::{JsonField, JsonObjectAccess};
use crate::response::{ExtractOptions, FalsyResult, ResponseExtractor, RpcResponse, is_response};

const CURRENT_THREAD_HINT: &str =
    "Use #[tokio::main(flavor = \"current_thread\")] or Builder::new_current_thread()";

/// Callback invoked for every matching response
type Callback = Arc<dyn Fn(&RpcResponse) + Send + Sync>;

/// Callback invoked for the next matching response only
type OnceCallback = Box<dyn FnOnce(&RpcResponse) + Send>;

#[derive(Default)]
struct Subscribers {
    persistent: Vec<Callback>,
    once:       Vec<OnceCallback>,
}

impl Subscribers {
    fn len(&self) -> usize { self.persistent.len() + self.once.len() }
}

type SubscriberMap = Arc<Mutex<HashMap<String, Subscribers>>>;

/// Handle to a shared subscription table
///
/// Clones share the same table and dispatcher. The dispatcher task stops once every
/// handle has been dropped.
#[derive(Clone)]
pub struct ResponseNotifier {
    subscribers:  SubscriberMap,
    queue:        mpsc::UnboundedSender<Arc<RpcResponse>>,
    falsy_result: FalsyResult,
}

impl std::fmt::Debug for ResponseNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseNotifier")
            .field("ids", &lock(&self.subscribers).len())
            .field("falsy_result", &self.falsy_result)
            .finish_non_exhaustive()
    }
}

impl ResponseNotifier {
    /// Create a notifier and spawn its dispatcher on the current tokio runtime
    ///
    /// The runtime must be a current-thread runtime; on a multi-thread runtime the
    /// dispatcher could deliver a response while its publisher is still running.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            Report::new(Error::Runtime(
                "ResponseNotifier must be created inside a tokio runtime".to_string(),
            ))
            .attach(format!("Error: {e}"))
        })?;

        let flavor = handle.runtime_flavor();
        if flavor != RuntimeFlavor::CurrentThread {
            return Err(Report::new(Error::Runtime(
                "ResponseNotifier requires a current-thread tokio runtime".to_string(),
            ))
            .attach(format!("Runtime flavor: {flavor:?}"))
            .attach(CURRENT_THREAD_HINT));
        }

        let subscribers = SubscriberMap::default();
        let (queue, receiver) = mpsc::unbounded_channel();
        handle.spawn(dispatch_loop(Arc::clone(&subscribers), receiver));

        Ok(Self {
            subscribers,
            queue,
            falsy_result: FalsyResult::default(),
        })
    }

    /// Classify falsy results in `publish_value` with `falsy_result`
    #[must_use]
    pub const fn with_falsy_result(mut self, falsy_result: FalsyResult) -> Self {
        self.falsy_result = falsy_result;
        self
    }

    /// Classification policy used by `publish_value`
    pub const fn falsy_result(&self) -> FalsyResult { self.falsy_result }

    /// Call `callback` with every response published under `id`
    ///
    /// Registrations accumulate; each registered callback fires once per matching publish.
    pub fn subscribe<F>(&self, id: impl Into<String>, callback: F)
    where
        F: Fn(&RpcResponse) + Send + Sync + 'static,
    {
        let id = id.into();
        debug!("Subscribing to responses for id '{id}'");
        lock(&self.subscribers)
            .entry(id)
            .or_default()
            .persistent
            .push(Arc::new(callback));
    }

    /// Call `callback` with the next response published under `id`, then forget it
    pub fn subscribe_once<F>(&self, id: impl Into<String>, callback: F)
    where
        F: FnOnce(&RpcResponse) + Send + 'static,
    {
        let id = id.into();
        debug!("Subscribing once to response for id '{id}'");
        lock(&self.subscribers)
            .entry(id)
            .or_default()
            .once
            .push(Box::new(callback));
    }

    /// Receive the next response published under `id`
    ///
    /// The subscription is registered immediately, so a publish that happens before the
    /// receiver is awaited is not missed.
    pub fn next_response(&self, id: impl Into<String>) -> oneshot::Receiver<RpcResponse> {
        let (sender, receiver) = oneshot::channel();
        self.subscribe_once(id, move |response| {
            let _ = sender.send(response.clone());
        });
        receiver
    }

    /// Number of callbacks currently registered for `id`
    pub fn subscriber_count(&self, id: &str) -> usize {
        lock(&self.subscribers)
            .get(id)
            .map_or(0, Subscribers::len)
    }

    /// Queue `response` for delivery to subscribers of its id
    ///
    /// Responses without an id are ignored.
    pub fn publish(&self, response: &RpcResponse) {
        let Some(id) = response.id().filter(|id| !id.is_empty()) else {
            debug!("Not publishing response without id");
            return;
        };

        debug!("Queueing response for id '{id}'");
        if self.queue.send(Arc::new(response.clone())).is_err() {
            warn!("Response dispatcher has stopped; dropping notification for id '{id}'");
        }
    }

    /// Publish a raw reply
    ///
    /// The reply must be an object with a non-empty string `id` and an `error` or `result`
    /// key; anything else is ignored. The reply is classified the same way `extract` does,
    /// under this notifier's `falsy_result` policy.
    pub fn publish_value(&self, raw: &Value) {
        let has_string_id = raw
            .get_field_str(JsonField::Id)
            .is_some_and(|id| !id.is_empty());
        if !has_string_id || !is_response(raw) {
            debug!("Not publishing raw reply without string id or payload");
            return;
        }

        let extractor = ResponseExtractor::new(self.clone(), self.falsy_result);
        self.publish(&extractor.extract(raw, &ExtractOptions::new().with_notify(false)));
    }
}

async fn dispatch_loop(
    subscribers: SubscriberMap,
    mut receiver: mpsc::UnboundedReceiver<Arc<RpcResponse>>,
) {
    while let Some(response) = receiver.recv().await {
        dispatch(&subscribers, &response);
    }
    debug!("Response dispatcher stopped");
}

fn dispatch(subscribers: &SubscriberMap, response: &RpcResponse) {
    let Some(id) = response.id() else {
        return;
    };

    // Snapshot under the lock, call outside it so callbacks may subscribe again
    let (persistent, once) = {
        let mut table = lock(subscribers);
        let Some(entry) = table.get_mut(id) else {
            debug!("No subscribers for id '{id}'");
            return;
        };
        let once = std::mem::take(&mut entry.once);
        let persistent = entry.persistent.clone();
        if entry.len() == 0 {
            table.remove(id);
        }
        (persistent, once)
    };

    debug!(
        "Dispatching response for id '{id}' to {} subscriber(s)",
        persistent.len() + once.len()
    );

    for callback in persistent {
        run_callback(id, || callback(response));
    }
    for callback in once {
        run_callback(id, || callback(response));
    }
}

fn run_callback(id: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        error!("Response callback for id '{id}' panicked");
    }
}

fn lock(subscribers: &SubscriberMap) -> MutexGuard<'_, HashMap<String, Subscribers>> {
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, reason = "test assertions")]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::response::{DataResponse, ErrorResponse};

    fn data(id: Option<&str>, result: Value) -> RpcResponse {
        RpcResponse::Data(DataResponse {
            result,
            id: id.map(str::to_string),
        })
    }

    /// Let the dispatcher drain everything queued so far
    async fn settle(notifier: &ResponseNotifier) {
        let marker = "__settle__";
        let done = notifier.next_response(marker);
        notifier.publish(&data(Some(marker), json!(null)));
        tokio::time::timeout(Duration::from_secs(5), done)
            .await
            .unwrap()
            .unwrap();
    }

    fn counter(notifier: &ResponseNotifier, id: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        notifier.subscribe(id, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = ResponseNotifier::new().unwrap_err();
        assert!(matches!(err.current_context(), Error::Runtime(_)));
    }

    #[tokio::test]
    async fn test_persistent_subscribers_fire_per_publish() {
        let notifier = ResponseNotifier::new().unwrap();
        let count = counter(&notifier, "foo");

        notifier.publish(&data(Some("foo"), json!(100)));
        notifier.publish(&data(None, json!(100)));
        notifier.publish(&data(Some("foo"), json!(100)));

        settle(&notifier).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.subscriber_count("foo"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_multi_thread_runtime_is_rejected() {
        let err = ResponseNotifier::new().unwrap_err();
        assert!(matches!(err.current_context(), Error::Runtime(_)));
        assert!(format!("{err:?}").contains("current_thread"));
    }

    #[tokio::test]
    async fn test_dispatch_is_deferred() {
        let notifier = ResponseNotifier::new().unwrap();
        let count = counter(&notifier, "x");

        for i in 0..1000 {
            notifier.publish(&data(Some("x"), json!(i)));
            // busy work without yielding to the scheduler
            let spin = (0..200_u64).fold(0_u64, |acc, n| acc.wrapping_add(std::hint::black_box(n)));
            std::hint::black_box(spin);
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }

        settle(&notifier).await;
        assert_eq!(count.load(Ordering::SeqCst), 1000);
    }

    #[tokio::test]
    async fn test_callbacks_accumulate() {
        let notifier = ResponseNotifier::new().unwrap();
        let first = counter(&notifier, "acc");
        let second = counter(&notifier, "acc");
        assert_eq!(notifier.subscriber_count("acc"), 2);

        notifier.publish(&data(Some("acc"), json!(1)));
        settle(&notifier).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_receives_full_response() {
        let notifier = ResponseNotifier::new().unwrap();
        let received = notifier.next_response("err");

        let response = RpcResponse::Error(ErrorResponse::new("boom", Some("err".to_string())));
        notifier.publish(&response);

        let delivered = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, response);
        assert_eq!(notifier.subscriber_count("err"), 0);
    }

    #[tokio::test]
    async fn test_subscribe_once_fires_once() {
        let notifier = ResponseNotifier::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        notifier.subscribe_once("one", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        notifier.publish(&data(Some("one"), json!(1)));
        notifier.publish(&data(Some("one"), json!(2)));
        settle(&notifier).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.subscriber_count("one"), 0);
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated() {
        let notifier = ResponseNotifier::new().unwrap();
        notifier.subscribe("p", |_| panic!("subscriber failure"));
        let count = counter(&notifier, "p");

        notifier.publish(&data(Some("p"), json!(1)));
        notifier.publish(&data(Some("p"), json!(2)));
        settle(&notifier).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_callbacks_may_subscribe_again() {
        let notifier = ResponseNotifier::new().unwrap();
        let inner = notifier.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        notifier.subscribe_once("chain", move |_| {
            let seen = Arc::clone(&seen);
            inner.subscribe("chain", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });

        notifier.publish(&data(Some("chain"), json!(1)));
        notifier.publish(&data(Some("chain"), json!(2)));
        settle(&notifier).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_value_checks_shape() {
        let notifier = ResponseNotifier::new().unwrap();
        let count = counter(&notifier, "raw");

        notifier.publish_value(&json!({"id": "raw", "result": 5}));
        notifier.publish_value(&json!({"id": "raw"}));
        notifier.publish_value(&json!({"id": 7, "result": 5}));
        notifier.publish_value(&json!(null));
        notifier.publish_value(&json!({"id": "raw", "error": {"code": 1}}));
        settle(&notifier).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_publish_value_uses_falsy_policy() {
        let raw = json!({"id": "a", "result": 0});

        let lenient = ResponseNotifier::new().unwrap();
        assert_eq!(lenient.falsy_result(), FalsyResult::Data);
        let delivered = lenient.next_response("a");
        lenient.publish_value(&raw);
        let response = tokio::time::timeout(Duration::from_secs(5), delivered)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(response, RpcResponse::Data(_)));

        let strict = ResponseNotifier::new()
            .unwrap()
            .with_falsy_result(FalsyResult::Error);
        let delivered = strict.next_response("a");
        strict.publish_value(&raw);
        let response = tokio::time::timeout(Duration::from_secs(5), delivered)
            .await
            .unwrap()
            .unwrap();
        assert!(response.is_error());
        assert_eq!(response.id(), Some("a"));
    }
}
