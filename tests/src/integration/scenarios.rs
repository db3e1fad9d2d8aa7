//! # Clinic Day Scenarios
//!
//! One practitioner's morning, end to end:
//!
//! 1. Three check-ins get positions 1, 2, 3 and `callNext` takes the first.
//! 2. An absent patient is not "present": calling the third skips nobody.
//! 3. The absent patient returns in time and is re-queued at the tail.
//! 4. Another absent patient never returns and the scheduler cancels them.
//! 5. Closing the day sweeps the queue; reopening restores the waiting patient.

#[cfg(test)]
mod tests {
    use queue_engine::test_utils::{check_in, check_in_all, harness, Harness};
    use queue_engine::{
        ActionType, CallPresentRequest, EndDayRequest, GracePeriodScheduler, MarkAbsentRequest,
        InMemoryQueueRepository, OverrideAuditor, QueueApi, ReopenDayRequest, SchedulerConfig,
    };
    use shared_types::{AppointmentId, QueueStatus, StaffId};

    // =============================================================================
    // FIXTURES
    // =============================================================================

    fn lee() -> StaffId {
        StaffId::from("dr-lee")
    }

    fn desk() -> StaffId {
        StaffId::from("front-desk")
    }

    async fn mark_absent(h: &Harness, id: AppointmentId, minutes: u32) {
        h.service
            .mark_absent(MarkAbsentRequest {
                appointment_id: id,
                performed_by: desk(),
                grace_period_minutes: Some(minutes),
                reason: Some("not in waiting room".to_string()),
            })
            .await
            .unwrap();
    }

    async fn status(h: &Harness, id: &AppointmentId) -> QueueStatus {
        h.service.query().entry(id).await.unwrap().status
    }

    // =============================================================================
    // SCENARIOS 1-4: ONE MORNING
    // =============================================================================

    #[tokio::test]
    async fn test_morning_with_absences_and_late_arrival() {
        let h = harness();

        // 1. Check-ins in arrival order.
        let ids = check_in_all(&h, "dr-lee", &["P1", "P2", "P3"]).await;
        let (p1, p2, p3) = (ids[0], ids[1], ids[2]);
        let view = h.service.get_queue_status(&h.day, Some(&lee())).await.unwrap();
        let positions: Vec<_> = view.waiting.iter().map(|e| e.queue_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);

        let called = h.service.call_next(&h.day, &lee()).await.unwrap();
        assert_eq!(called.entry.id, p1);
        assert!(called.skipped.is_empty());

        // 2. P2 steps out; calling P3 bypasses nobody present.
        mark_absent(&h, p2, 10).await;
        h.service.complete_current(&h.day, &lee()).await.unwrap();
        let called = h
            .service
            .call_present(CallPresentRequest {
                appointment_id: p3,
                performed_by: lee(),
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(called.entry.id, p3);
        assert!(called.skipped.is_empty());
        assert!(!h.events.names().contains(&"PatientSkipped"));

        // 3. P2 is back before the grace period ends.
        h.clock.advance_minutes(4);
        let returned = h.service.handle_late_arrival(p2, &desk()).await.unwrap();
        assert_eq!(returned.previous_position, Some(2));
        assert_eq!(returned.new_position, 4);
        assert_eq!(returned.entry.status, QueueStatus::Waiting);

        // 4. P4 leaves and never comes back.
        let p4 = check_in(&h, "dr-lee", "P4").await;
        mark_absent(&h, p4, 5).await;

        let scheduler = GracePeriodScheduler::new(h.service.clone(), SchedulerConfig::default());
        assert!(scheduler.tick().await.expired.is_empty());
        h.clock.advance_minutes(6);
        let report = scheduler.tick().await;
        assert_eq!(report.expired, vec![p4]);

        assert_eq!(status(&h, &p4).await, QueueStatus::NoShow);
        let absences = h.service.query().absences_of(&p4).await.unwrap();
        assert_eq!(absences.len(), 1);
        assert!(absences[0].auto_cancelled);
        assert_eq!(status(&h, &p2).await, QueueStatus::Waiting);

        // The trail tells the story in order.
        let rows = h.service.auditor().history(&h.day).await.unwrap();
        assert!(OverrideAuditor::<InMemoryQueueRepository>::verify_sequence(&rows).is_ok());
        let actions: Vec<_> = rows.iter().map(|r| r.action_type).collect();
        assert_eq!(
            actions,
            vec![
                ActionType::Next,
                ActionType::MarkAbsent,
                ActionType::Complete,
                ActionType::CallPresent,
                ActionType::LateArrival,
                ActionType::MarkAbsent,
                ActionType::AutoCancel,
            ]
        );
    }

    // =============================================================================
    // SCENARIO 5: CLOSING AND REOPENING
    // =============================================================================

    #[tokio::test]
    async fn test_end_day_then_reopen_within_window() {
        let h = harness();
        let kim = StaffId::from("dr-kim");

        let p6 = check_in(&h, "dr-kim", "P6").await;
        h.service.call_next(&h.day, &kim).await.unwrap();
        let p5 = check_in(&h, "dr-kim", "P5").await;

        let preview = h.service.get_closure_preview(&h.day, &kim).await.unwrap();
        assert_eq!(preview.would_mark_no_show, vec![p5]);
        assert_eq!(preview.would_complete, vec![p6]);

        let closure = h
            .service
            .end_day(EndDayRequest {
                clinic_id: h.day.clinic_id.clone(),
                date: h.day.date,
                staff_id: kim.clone(),
                reason: Some("end of session".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(closure.marked_no_show_ids, vec![p5]);
        assert_eq!(closure.marked_completed_ids, vec![p6]);
        assert_eq!(status(&h, &p5).await, QueueStatus::NoShow);
        assert_eq!(status(&h, &p6).await, QueueStatus::Completed);
        assert!(h.service.get_closure_preview(&h.day, &kim).await.unwrap().already_closed);

        h.clock.advance_minutes(2);
        let reopened = h
            .service
            .reopen_day(ReopenDayRequest {
                closure_id: closure.id,
                performed_by: kim.clone(),
                reason: Some("closed by mistake".to_string()),
            })
            .await
            .unwrap();
        assert!(reopened.reopened_at.is_some());

        let p5_entry = h.service.query().entry(&p5).await.unwrap();
        assert_eq!(p5_entry.status, QueueStatus::Waiting);
        assert_eq!(p5_entry.queue_position, Some(3));
        assert_eq!(status(&h, &p6).await, QueueStatus::Completed);

        let names = h.events.names();
        assert!(names.contains(&"DayClosed"));
        assert!(names.contains(&"DayReopened"));

        // Reopen is one-shot.
        let again = h
            .service
            .reopen_day(ReopenDayRequest {
                closure_id: closure.id,
                performed_by: kim,
                reason: None,
            })
            .await;
        assert!(again.is_err());
    }
}
