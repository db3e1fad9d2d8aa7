//! # Concurrency Races
//!
//! Staff at several desks and the grace-period scheduler act on the same
//! clinic day at once. Mutations are serialized per day, so every race has
//! exactly one winner and the loser sees a clean, typed outcome.

#[cfg(test)]
mod tests {
    use queue_engine::test_utils::{check_in, check_in_all, harness};
    use queue_engine::{
        ErrorKind, ExpiryOutcome, ExpirySkip, MarkAbsentRequest, QueueApi, QueueRepository,
        RetryingQueueApi,
    };
    use shared_bus::QueueEvent;
    use shared_types::{QueueStatus, StaffId};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn desk() -> StaffId {
        StaffId::from("front-desk")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_check_ins_get_unique_positions() {
        let h = harness();
        let mut handles = Vec::new();
        for n in 0..20 {
            let service = Arc::clone(&h.service);
            let request = h.check_in_request("dr-lee", &format!("p-{n}"));
            handles.push(tokio::spawn(async move { service.check_in(request).await }));
        }

        let mut positions = HashSet::new();
        for handle in handles {
            let entry = handle.await.unwrap().unwrap();
            assert!(positions.insert(entry.queue_position.unwrap()));
        }
        assert_eq!(positions, (1..=20).collect::<HashSet<u64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_events_publish_in_commit_order() {
        let h = harness();
        let mut handles = Vec::new();
        for n in 0..20 {
            let service = Arc::clone(&h.service);
            let request = h.check_in_request("dr-lee", &format!("p-{n}"));
            handles.push(tokio::spawn(async move { service.check_in(request).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Positions are handed out in commit order.
        let published: Vec<(u64, usize)> = h
            .events
            .events()
            .iter()
            .scan(0, |position, event| {
                Some(match event {
                    QueueEvent::PatientAddedToQueue { position: p, .. } => {
                        *position = *p;
                        None
                    }
                    QueueEvent::QueueUpdated { waiting_count, .. } => {
                        Some((*position, *waiting_count))
                    }
                    _ => None,
                })
            })
            .flatten()
            .collect();
        assert_eq!(published.len(), 20);
        for (n, (position, waiting)) in published.into_iter().enumerate() {
            assert_eq!(position, n as u64 + 1);
            assert_eq!(waiting, n + 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_calls_for_one_staff_member() {
        let h = harness();
        check_in_all(&h, "dr-lee", &["p-1", "p-2"]).await;
        let lee = StaffId::from("dr-lee");

        let (a, b) = tokio::join!(
            h.service.call_next(&h.day, &lee),
            h.service.call_next(&h.day, &lee)
        );
        let results = [a, b];
        let won = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(won, 1);
        let lost = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(lost.kind(), ErrorKind::BusinessRuleViolation);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_arrival_races_grace_expiry() {
        for _ in 0..20 {
            let h = harness();
            let id = check_in(&h, "dr-lee", "p-1").await;
            h.service
                .mark_absent(MarkAbsentRequest {
                    appointment_id: id,
                    performed_by: desk(),
                    grace_period_minutes: Some(1),
                    reason: None,
                })
                .await
                .unwrap();
            h.clock.advance_minutes(1);
            let version = h.service.query().entry(&id).await.unwrap().version;

            let returning = Arc::clone(&h.service);
            let expiring = Arc::clone(&h.service);
            let day = h.day.clone();
            let (returned, expired) = tokio::join!(
                tokio::spawn(async move { returning.handle_late_arrival(id, &desk()).await }),
                tokio::spawn(async move { expiring.expire_absence(&day, id, version).await }),
            );
            let returned = returned.unwrap();
            let expired = expired.unwrap().unwrap();

            let status = h.service.query().entry(&id).await.unwrap().status;
            match expired {
                ExpiryOutcome::Expired(_) => {
                    assert_eq!(returned.unwrap_err().kind(), ErrorKind::Conflict);
                    assert_eq!(status, QueueStatus::NoShow);
                }
                ExpiryOutcome::Skipped(reason) => {
                    assert_eq!(reason, ExpirySkip::Superseded);
                    assert!(returned.is_ok());
                    assert_eq!(status, QueueStatus::Waiting);
                }
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_held_lock_times_out() {
        let h = harness();
        let lease = h
            .repository
            .begin(&h.day, Duration::from_millis(100))
            .await
            .unwrap();

        let err = h
            .service
            .check_in(h.check_in_request("dr-lee", "p-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockTimeout);
        assert!(err.is_retryable());
        drop(lease);

        // Nothing was applied by the timed-out call.
        let view = h.service.get_queue_status(&h.day, None).await.unwrap();
        assert!(view.waiting.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_retry_once_rides_out_short_contention() {
        let h = harness();
        let api = RetryingQueueApi::new(Arc::clone(&h.service));
        let lease = h
            .repository
            .begin(&h.day, Duration::from_millis(100))
            .await
            .unwrap();

        // Released after the first attempt gave up (lock timeout is 200ms).
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(lease);
        });

        let entry = api
            .check_in(h.check_in_request("dr-lee", "p-1"))
            .await
            .unwrap();
        assert_eq!(entry.queue_position, Some(1));
        release.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_do_not_wait_for_writers() {
        let h = harness();
        check_in(&h, "dr-lee", "p-1").await;
        let _lease = h
            .repository
            .begin(&h.day, Duration::from_millis(100))
            .await
            .unwrap();

        let view = tokio::time::timeout(
            Duration::from_millis(50),
            h.service.get_queue_status(&h.day, None),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(view.waiting.len(), 1);
    }
}
