//! Row-change notifications from PostgreSQL
//!
//! Triggers installed by the initial migration `pg_notify` on
//! [`CHANGE_CHANNEL`] with a JSON body `{collection, operation, id, document}`.
//! [`ChangeFeed`] listens on that channel and yields parsed [`ChangeEvent`]s.
//! Rows too large for a notification arrive with `truncated` set and only
//! their routing keys in `document`.

use std::time::Duration;

use futures_util::Stream;
use rolechat_core::events::ChangeEvent;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Notification channel the triggers publish on
pub const CHANGE_CHANNEL: &str = "rolechat_changes";

/// Change feed configuration
#[derive(Debug, Clone)]
pub struct ChangeFeedConfig {
    /// Events buffered before the listener waits on the consumer
    pub buffer: usize,
    /// Delay before reconnecting after a listener error
    pub reconnect_delay: Duration,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            buffer: 1024,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Parse one notification payload
pub fn parse_notification(payload: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Background `LISTEN` task plus the receiving end of its events
pub struct ChangeFeed {
    rx: mpsc::Receiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl ChangeFeed {
    /// Start listening. The task stops once the feed is dropped.
    pub fn spawn(pool: PgPool, config: ChangeFeedConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.buffer);
        let task = tokio::spawn(listener_loop(pool, config, tx));
        Self { rx, task }
    }

    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Consume the feed as a stream of events
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send + 'static {
        futures_util::stream::unfold(self, |mut feed| async move {
            feed.recv().await.map(|event| (event, feed))
        })
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn listener_loop(pool: PgPool, config: ChangeFeedConfig, tx: mpsc::Sender<ChangeEvent>) {
    loop {
        match run_listener(&pool, &tx).await {
            Ok(()) => {
                info!("change feed consumer gone, stopping listener");
                return;
            }
            Err(e) => {
                error!(error = %e, "change feed listener failed, reconnecting");
                tokio::time::sleep(config.reconnect_delay).await;
            }
        }
    }
}

/// Returns `Ok` when the consumer hung up, `Err` on a connection problem
async fn run_listener(pool: &PgPool, tx: &mpsc::Sender<ChangeEvent>) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    info!(channel = CHANGE_CHANNEL, "change feed listening");

    loop {
        let notification = listener.recv().await?;
        match parse_notification(notification.payload()) {
            Ok(event) => {
                debug!(
                    collection = event.collection.as_str(),
                    operation = ?event.operation,
                    "change notification"
                );
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
            Err(e) => warn!(error = %e, "unparseable change notification"),
        }
    }
}
