//! Integration tests for the feed runner event loop.
//!
//! Each test seeds a fresh in-memory store, spawns a runner over the
//! in-memory feed, and observes it through `FeedNotice`s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use feed_resurfacer::feed::queue::InsertionQueue;
use feed_resurfacer::feed::retry::RetryPolicy;
use feed_resurfacer::feed::runner::{FeedRunner, RunnerTiming};
use feed_resurfacer::feed::{FeedEvent, FeedNotice, FeedSettings, ForeignItem, ScrollDirection};
use feed_resurfacer::models::item::PostPayload;
use feed_resurfacer::persistence::db;
use feed_resurfacer::persistence::item_repo::ItemRepo;
use feed_resurfacer::review::{now_ms, ReviewService, Scheduler, ONE_DAY};
use feed_resurfacer::{AppError, Result};

use super::feed_fixture::FakeFeed;

type Outcome = Result<InsertionQueue<FakeFeed, FakeFeed>>;

struct Harness {
    feed: FakeFeed,
    repo: ItemRepo,
    events: mpsc::Sender<FeedEvent>,
    notices: mpsc::Receiver<FeedNotice>,
    cancel: CancellationToken,
    handle: JoinHandle<Outcome>,
}

fn timing() -> RunnerTiming {
    RunnerTiming {
        scan_interval: Duration::from_secs(30),
        drain_delay: Duration::from_millis(10),
        retry: RetryPolicy {
            delay: Duration::from_millis(5),
            max_attempts: 3,
        },
    }
}

async fn start(feed: FakeFeed, due: &[&str], later: &[&str]) -> Harness {
    start_with(feed, due, later, timing()).await
}

/// Seed `due` items as overdue and `later` items as not yet due, then start.
async fn start_with(feed: FakeFeed, due: &[&str], later: &[&str], timing: RunnerTiming) -> Harness {
    let pool = db::connect_memory().await.expect("db");
    let repo = ItemRepo::new(Arc::new(pool));
    let service = ReviewService::new(Arc::new(repo.clone()), Scheduler::default());

    let now = now_ms();
    for id in due {
        service
            .save((*id).to_owned(), PostPayload::default(), now - 2 * ONE_DAY)
            .await
            .expect("save due");
    }
    for id in later {
        service
            .save((*id).to_owned(), PostPayload::default(), now)
            .await
            .expect("save later");
    }

    let (event_tx, event_rx) = mpsc::channel(32);
    let (notice_tx, notice_rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();

    let queue = InsertionQueue::new(feed.clone(), feed.clone(), FeedSettings::default());
    let handle = FeedRunner::new(queue, service, timing, event_rx, cancel.clone())
        .with_notices(notice_tx)
        .spawn();

    Harness {
        feed,
        repo,
        events: event_tx,
        notices: notice_rx,
        cancel,
        handle,
    }
}

impl Harness {
    async fn next_notice(&mut self) -> FeedNotice {
        tokio::time::timeout(Duration::from_secs(5), self.notices.recv())
            .await
            .expect("notice within timeout")
            .expect("notice channel open")
    }

    async fn send(&self, event: FeedEvent) {
        self.events.send(event).await.expect("runner listening");
    }

    async fn stop(self) -> InsertionQueue<FakeFeed, FakeFeed> {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("runner stops")
            .expect("runner task")
            .expect("runner result")
    }
}

// ── Due-scan and draining ────────────────────────────────────

#[tokio::test]
async fn due_items_are_inserted_five_apart() {
    let mut h = start(FakeFeed::column(30, 100.0), &["a", "b"], &["c"]).await;

    assert_eq!(
        h.next_notice().await,
        FeedNotice::Inserted {
            item_id: "a".into(),
            position: 0
        }
    );
    assert_eq!(
        h.next_notice().await,
        FeedNotice::Inserted {
            item_id: "b".into(),
            position: 5
        }
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.feed.mounted_ids(), vec!["a".to_owned(), "b".to_owned()]);

    let queue = h.stop().await;
    assert_eq!(queue.occupied_positions(), vec![0, 5]);
    assert!(!queue.is_processing());
    assert!(!queue.is_mounted("c"));
}

#[tokio::test]
async fn nothing_due_inserts_nothing() {
    let mut h = start(FakeFeed::column(30, 100.0), &[], &["a"]).await;

    let waited = tokio::time::timeout(Duration::from_millis(100), h.notices.recv()).await;
    assert!(waited.is_err(), "unexpected notice: {waited:?}");
    assert!(h.feed.mounted_ids().is_empty());
    h.stop().await;
}

#[tokio::test]
async fn content_change_resumes_after_running_out_of_slots() {
    let mut h = start(FakeFeed::column(3, 100.0), &["a", "b", "c"], &[]).await;

    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { ref item_id, .. } if item_id == "a"));
    // "b" finds no slot among three candidates and is dropped.
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.feed.with_state(|s| {
        for (anchor, n) in (3..10).zip(4u32..) {
            s.foreign.push(ForeignItem {
                anchor,
                top: f64::from(n) * 100.0,
            });
        }
        s.viewport.document_height = 1100.0;
    });
    h.send(FeedEvent::ContentChanged).await;

    assert_eq!(
        h.next_notice().await,
        FeedNotice::Inserted {
            item_id: "c".into(),
            position: 5
        }
    );
    h.stop().await;
}

// ── Host events ──────────────────────────────────────────────

#[tokio::test]
async fn remembered_item_is_rescheduled_and_shows_next_review() {
    let mut h = start(FakeFeed::column(30, 100.0), &["a"], &[]).await;
    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { .. }));

    let before = now_ms();
    h.send(FeedEvent::Remembered {
        item_id: "a".into(),
    })
    .await;

    let FeedNotice::Reviewed {
        item_id,
        next_review,
    } = h.next_notice().await
    else {
        panic!("expected Reviewed notice");
    };
    assert_eq!(item_id, "a");
    assert!(next_review >= before + 2 * ONE_DAY);

    let stored = h.repo.get_by_id("a").await.expect("get").expect("present");
    assert_eq!(stored.interval, 2 * ONE_DAY);
    assert_eq!(stored.review_count, 1);
    assert_eq!(stored.next_review, next_review);
    assert_eq!(
        h.feed.element("a").and_then(|e| e.next_review),
        Some(next_review)
    );
    h.stop().await;
}

#[tokio::test]
async fn forgotten_item_resets_to_one_day() {
    let mut h = start(FakeFeed::column(30, 100.0), &["a"], &[]).await;
    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { .. }));

    h.send(FeedEvent::Forgotten {
        item_id: "a".into(),
    })
    .await;
    assert!(matches!(h.next_notice().await, FeedNotice::Reviewed { .. }));

    let stored = h.repo.get_by_id("a").await.expect("get").expect("present");
    assert_eq!(stored.interval, ONE_DAY);
    assert_eq!(stored.review_count, 0);
    h.stop().await;
}

#[tokio::test]
async fn removed_item_leaves_store_and_view() {
    let mut h = start(FakeFeed::column(30, 100.0), &["a"], &[]).await;
    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { .. }));

    h.send(FeedEvent::Removed {
        item_id: "a".into(),
    })
    .await;
    assert_eq!(
        h.next_notice().await,
        FeedNotice::Removed {
            item_id: "a".into()
        }
    );

    assert!(h.repo.get_by_id("a").await.expect("get").is_none());
    assert!(h.feed.mounted_ids().is_empty());
    let queue = h.stop().await;
    assert!(queue.occupied_positions().is_empty());
}

#[tokio::test]
async fn scrolling_up_retires_far_items() {
    let mut h = start(FakeFeed::column(100, 100.0), &["a"], &[]).await;
    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { .. }));

    h.feed.scroll_to(4000.0);
    h.send(FeedEvent::Scrolled {
        direction: ScrollDirection::Up,
    })
    .await;
    assert_eq!(
        h.next_notice().await,
        FeedNotice::Retired {
            item_id: "a".into()
        }
    );
    assert_eq!(h.feed.unmounted(), vec!["a".to_owned()]);
    h.stop().await;
}

#[tokio::test]
async fn visibility_loss_retires_far_item() {
    let mut h = start(FakeFeed::column(100, 100.0), &["a"], &[]).await;
    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { .. }));

    h.feed.scroll_to(2300.0);
    h.send(FeedEvent::VisibilityLost {
        item_id: "a".into(),
    })
    .await;
    assert_eq!(
        h.next_notice().await,
        FeedNotice::Retired {
            item_id: "a".into()
        }
    );
    h.stop().await;
}

// ── Lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn view_that_never_appears_fails_the_runner() {
    let feed = FakeFeed::column(30, 100.0);
    feed.set_ready(false);
    let h = start(feed, &["a"], &[]).await;

    let result = tokio::time::timeout(Duration::from_secs(5), h.handle)
        .await
        .expect("runner finishes")
        .expect("runner task");
    assert!(matches!(result, Err(AppError::Feed(_))));
    assert!(h.feed.mounted_ids().is_empty());
}

#[tokio::test]
async fn late_ready_view_still_gets_items() {
    let feed = FakeFeed::column(30, 100.0);
    feed.set_ready(false);
    let waiting = feed.clone();
    let patient = RunnerTiming {
        retry: RetryPolicy {
            delay: Duration::from_millis(5),
            max_attempts: 400,
        },
        ..timing()
    };
    let mut h = start_with(feed, &["a"], &[], patient).await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.feed.mounted_ids().is_empty());
    waiting.set_ready(true);

    assert!(matches!(h.next_notice().await, FeedNotice::Inserted { ref item_id, .. } if item_id == "a"));
    h.stop().await;
}

#[tokio::test]
async fn closing_event_channel_stops_runner() {
    let h = start(FakeFeed::column(30, 100.0), &[], &[]).await;
    drop(h.events);

    let result = tokio::time::timeout(Duration::from_secs(5), h.handle)
        .await
        .expect("runner stops")
        .expect("runner task");
    assert!(result.is_ok());
}
