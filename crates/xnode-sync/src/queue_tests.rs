use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{DisposeHandle, WorkQueue};
use crate::error::SyncError;

#[tokio::test]
async fn pull_delivers_fifo() {
    let shutdown = CancellationToken::new();
    let queue = WorkQueue::pull(&shutdown);
    let token = CancellationToken::new();

    for i in 0..5 {
        queue.enqueue(i);
    }

    for expected in 0..5 {
        assert_eq!(queue.dequeue(&token).await.unwrap(), expected);
    }
    assert!(queue.is_empty());
}

#[tokio::test]
async fn pull_preserves_per_producer_order() {
    let shutdown = CancellationToken::new();
    let queue = Arc::new(WorkQueue::pull(&shutdown));
    let token = CancellationToken::new();

    let mut producers = Vec::new();
    for producer in 0..3u32 {
        let queue = queue.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0..50u32 {
                queue.enqueue((producer, seq));
                tokio::task::yield_now().await;
            }
        }));
    }
    for p in producers {
        p.await.unwrap();
    }

    let mut next_seq = [0u32; 3];
    for _ in 0..150 {
        let (producer, seq) = queue.dequeue(&token).await.unwrap();
        assert_eq!(seq, next_seq[producer as usize]);
        next_seq[producer as usize] += 1;
    }
}

#[tokio::test]
async fn dequeue_suspends_until_enqueue() {
    let shutdown = CancellationToken::new();
    let queue = Arc::new(WorkQueue::pull(&shutdown));

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let token = CancellationToken::new();
            queue.dequeue(&token).await.unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!consumer.is_finished());

    queue.enqueue(42);
    assert_eq!(consumer.await.unwrap(), 42);
}

#[tokio::test]
async fn try_dequeue_never_suspends() {
    let shutdown = CancellationToken::new();
    let queue = WorkQueue::pull(&shutdown);

    assert_eq!(queue.try_dequeue(), None);
    queue.enqueue(7);
    assert_eq!(queue.try_dequeue(), Some(7));
    assert_eq!(queue.try_dequeue(), None);
}

#[tokio::test]
async fn dequeue_on_push_queue_is_rejected() {
    let shutdown = CancellationToken::new();
    let queue: WorkQueue<u32> = WorkQueue::push(&shutdown, |_| async { Ok(()) }.boxed());
    let token = CancellationToken::new();

    let result = queue.dequeue(&token).await;
    assert!(matches!(result, Err(SyncError::PushMode)));
    assert_eq!(queue.try_dequeue(), None);
}

#[tokio::test]
async fn caller_token_cancels_pending_dequeue() {
    let shutdown = CancellationToken::new();
    let queue = Arc::new(WorkQueue::<u32>::pull(&shutdown));
    let cancel = CancellationToken::new();

    let waiter = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.dequeue(&cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled)));
}

#[tokio::test]
async fn dispose_unwinds_pending_dequeues() {
    let shutdown = CancellationToken::new();
    let queue = Arc::new(WorkQueue::<u32>::pull(&shutdown));

    let mut waiters = Vec::new();
    for _ in 0..4 {
        let queue = queue.clone();
        waiters.push(tokio::spawn(async move {
            let token = CancellationToken::new();
            queue.dequeue(&token).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    queue.dispose().await.unwrap();

    for waiter in waiters {
        assert!(matches!(waiter.await.unwrap(), Err(SyncError::Cancelled)));
    }

    // Dequeue attempts after disposal fail with a cancellation error.
    let token = CancellationToken::new();
    assert!(matches!(queue.dequeue(&token).await, Err(SyncError::Cancelled)));
}

#[tokio::test]
async fn enqueue_after_dispose_drops_the_item() {
    let shutdown = CancellationToken::new();
    let queue = WorkQueue::pull(&shutdown);

    queue.dispose().await.unwrap();
    queue.enqueue(1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let shutdown = CancellationToken::new();
    let queue = WorkQueue::<u32>::pull(&shutdown);

    queue.dispose().await.unwrap();
    queue.dispose().await.unwrap();
}

#[tokio::test]
async fn push_invokes_callback_once_per_item_without_overlap() {
    let shutdown = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let in_callback = Arc::new(AtomicBool::new(false));

    let queue = {
        let seen = seen.clone();
        let in_callback = in_callback.clone();
        WorkQueue::push(&shutdown, move |item: u32| {
            let seen = seen.clone();
            let in_callback = in_callback.clone();
            async move {
                assert!(!in_callback.swap(true, Ordering::SeqCst));
                tokio::task::yield_now().await;
                seen.lock().push(item);
                in_callback.store(false, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        })
    };

    for i in 0..20 {
        queue.enqueue(i);
    }

    // Wait for the backlog to drain, then dispose; disposal after all
    // callbacks finish must return without hanging.
    while seen.lock().len() < 20 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    queue.dispose().await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 20);
    assert_eq!(*seen, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn push_consumer_error_terminates_the_loop() {
    let shutdown = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let queue = {
        let calls = calls.clone();
        WorkQueue::push(&shutdown, move |item: u32| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if item == 1 {
                    return Err("boom".into());
                }
                Ok(())
            }
            .boxed()
        })
    };

    queue.enqueue(0);
    queue.enqueue(1);
    queue.enqueue(2);
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Item 2 is never delivered; the failure resurfaces on dispose.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let result = queue.dispose().await;
    assert!(matches!(result, Err(SyncError::Consumer(_))));
}

#[tokio::test]
async fn push_consumer_error_shuts_down_the_intake() {
    let shutdown = CancellationToken::new();
    let queue = WorkQueue::push(&shutdown, |_: u32| async { Err("boom".into()) }.boxed());

    queue.enqueue(0);
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The dead loop drains nothing; new items are dropped on enqueue
    // rather than piling up until disposal.
    queue.enqueue(1);
    queue.enqueue(2);
    assert!(queue.is_empty());

    assert!(matches!(queue.dispose().await, Err(SyncError::Consumer(_))));
}

#[tokio::test]
async fn push_self_dispose_defers_teardown_to_the_loop() {
    let shutdown = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let handle_slot = Arc::new(Mutex::new(None::<DisposeHandle>));

    let queue = {
        let calls = calls.clone();
        let handle_slot = handle_slot.clone();
        WorkQueue::push(&shutdown, move |_: u32| {
            let calls = calls.clone();
            let handle_slot = handle_slot.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                // Request disposal from inside the callback; this
                // returns before teardown completes.
                if let Some(handle) = handle_slot.lock().as_ref() {
                    handle.request_dispose();
                }
                Ok(())
            }
            .boxed()
        })
    };
    *handle_slot.lock() = Some(queue.dispose_handle());

    queue.enqueue(1);
    queue.enqueue(2);
    queue.enqueue(3);

    // The loop finishes the current callback, then tears itself down;
    // the remaining items are never delivered.
    queue.dispose().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
