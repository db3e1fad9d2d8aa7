//! # Queue Properties
//!
//! Invariants that must hold for every clinic day, checked through the
//! public API only.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use queue_engine::test_utils::{check_in, check_in_all, harness, Harness};
    use queue_engine::{
        ActionType, CallPresentRequest, EndDayRequest, ErrorKind, InMemoryQueueRepository,
        MarkAbsentRequest, OverrideAuditor, QueueApi, QueueError, QueueRepository,
        ReopenDayRequest, RetryingQueueApi, ScheduleRequest,
    };
    use shared_types::{AppointmentId, QueueStatus, StaffId};
    use std::sync::Arc;

    // =============================================================================
    // FIXTURES
    // =============================================================================

    fn lee() -> StaffId {
        StaffId::from("dr-lee")
    }

    fn desk() -> StaffId {
        StaffId::from("front-desk")
    }

    fn absent_request(id: AppointmentId, minutes: u32) -> MarkAbsentRequest {
        MarkAbsentRequest {
            appointment_id: id,
            performed_by: desk(),
            grace_period_minutes: Some(minutes),
            reason: None,
        }
    }

    fn end_day_request(h: &Harness, staff: &StaffId) -> EndDayRequest {
        EndDayRequest {
            clinic_id: h.day.clinic_id.clone(),
            date: h.day.date,
            staff_id: staff.clone(),
            reason: None,
        }
    }

    async fn waiting_positions(h: &Harness) -> Vec<u64> {
        h.service
            .get_queue_status(&h.day, None)
            .await
            .unwrap()
            .waiting
            .iter()
            .filter_map(|e| e.queue_position)
            .collect()
    }

    // =============================================================================
    // SCHEDULING
    // =============================================================================

    fn schedule_request(h: &Harness, id: AppointmentId) -> ScheduleRequest {
        ScheduleRequest {
            appointment_id: Some(id),
            clinic_id: h.day.clinic_id.clone(),
            date: h.day.date,
            staff_id: lee(),
            patient_ref: "p-booked".into(),
            appointment_type: "follow-up".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scheduled_appointment_checks_in_without_walk_in() {
        let h = harness();
        let id = AppointmentId::new();
        let entry = h.service.schedule_appointment(schedule_request(&h, id)).await.unwrap();
        assert_eq!(entry.status, QueueStatus::Scheduled);
        assert_eq!(entry.queue_position, None);

        let err = h
            .service
            .schedule_appointment(schedule_request(&h, id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);

        let mut request = h.check_in_request("dr-lee", "p-booked");
        request.appointment_id = Some(id);
        let checked_in = h.service.check_in(request).await.unwrap();
        assert_eq!(checked_in.id, id);
        assert_eq!(checked_in.status, QueueStatus::Waiting);
        assert_eq!(checked_in.appointment_type, "follow-up");
        assert_eq!(checked_in.queue_position, Some(1));
    }

    #[tokio::test]
    async fn test_check_in_on_another_day_is_rejected() {
        let h = harness();
        let id = AppointmentId::new();
        h.service.schedule_appointment(schedule_request(&h, id)).await.unwrap();

        let mut request = h.check_in_request("dr-lee", "p-booked");
        request.appointment_id = Some(id);
        request.date = h.day.date.succ_opt().unwrap();
        let err = h.service.check_in(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(
            h.service.query().entry(&id).await.unwrap().status,
            QueueStatus::Scheduled
        );
    }

    // =============================================================================
    // CALLING
    // =============================================================================

    #[tokio::test]
    async fn test_call_next_never_selects_absent_patient() {
        let h = harness();
        let ids = check_in_all(&h, "dr-lee", &["p-1", "p-2"]).await;
        h.service.mark_absent(absent_request(ids[0], 10)).await.unwrap();

        let called = h.service.call_next(&h.day, &lee()).await.unwrap();
        assert_eq!(called.entry.id, ids[1]);

        h.service.complete_current(&h.day, &lee()).await.unwrap();
        let err = h.service.call_next(&h.day, &lee()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    }

    #[tokio::test]
    async fn test_call_present_rejects_absent_patient() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        h.service.mark_absent(absent_request(id, 10)).await.unwrap();

        let err = h
            .service
            .call_present(CallPresentRequest {
                appointment_id: id,
                performed_by: lee(),
                reason: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(err.offending_ids(), vec![id]);
    }

    #[tokio::test]
    async fn test_call_present_counts_each_skip_once() {
        let h = harness();
        let ids = check_in_all(&h, "dr-lee", &["p-1", "p-2", "p-3", "p-4"]).await;

        let outcome = h
            .service
            .call_present(CallPresentRequest {
                appointment_id: ids[3],
                performed_by: lee(),
                reason: Some("urgent".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(outcome.skipped, ids[..3].to_vec());

        for id in &ids[..3] {
            assert_eq!(h.service.query().entry(id).await.unwrap().skip_count, 1);
        }

        let rows = h.service.auditor().history(&h.day).await.unwrap();
        let calls: Vec<_> = rows
            .iter()
            .filter(|r| r.action_type == ActionType::CallPresent)
            .collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].skipped_appointment_ids, ids[..3].to_vec());
        assert_eq!(calls[0].reason.as_deref(), Some("urgent"));
        assert_eq!(
            OverrideAuditor::<InMemoryQueueRepository>::skips_of(&rows, &ids[0]),
            1
        );
    }

    #[tokio::test]
    async fn test_one_consultation_per_staff_member() {
        let h = harness();
        check_in_all(&h, "dr-lee", &["p-1", "p-2"]).await;
        h.service.call_next(&h.day, &lee()).await.unwrap();

        let err = h.service.call_next(&h.day, &lee()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);

        let current = h.service.query().current_patient(&h.day, &lee()).await.unwrap();
        assert!(current.is_some());
    }

    // =============================================================================
    // ABSENCES
    // =============================================================================

    #[tokio::test]
    async fn test_double_mark_absent_is_rejected() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        h.service.mark_absent(absent_request(id, 10)).await.unwrap();

        let err = h.service.mark_absent(absent_request(id, 10)).await.unwrap_err();
        assert!(matches!(err, QueueError::BusinessRuleViolation { .. }));
        assert_eq!(h.service.query().absences_of(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_late_arrival_after_expiry_conflicts() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        h.service.mark_absent(absent_request(id, 1)).await.unwrap();
        h.clock.advance_minutes(2);

        let version = h.service.query().entry(&id).await.unwrap().version;
        h.service.expire_absence(&h.day, id, version).await.unwrap();

        let err = h.service.handle_late_arrival(id, &desk()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_second_return_is_not_retried() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        h.service.mark_absent(absent_request(id, 10)).await.unwrap();
        h.service.handle_late_arrival(id, &desk()).await.unwrap();
        let audits = h.service.auditor().history(&h.day).await.unwrap().len();

        let api = RetryingQueueApi::new(Arc::clone(&h.service));
        let err = api.handle_late_arrival(id, &desk()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
        assert_eq!(err.offending_ids(), vec![id]);
        assert_eq!(h.service.auditor().history(&h.day).await.unwrap().len(), audits);
    }

    #[tokio::test]
    async fn test_grace_expiry_is_audited_as_system() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        h.service.mark_absent(absent_request(id, 1)).await.unwrap();
        h.clock.advance_minutes(2);
        let before = h.service.auditor().history(&h.day).await.unwrap();

        let version = h.service.query().entry(&id).await.unwrap().version;
        h.service.expire_absence(&h.day, id, version).await.unwrap();

        let after = h.service.auditor().history(&h.day).await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        let row = after.last().unwrap();
        assert_eq!(row.action_type, ActionType::AutoCancel);
        assert_eq!(row.appointment_id, Some(id));
        assert_eq!(row.performed_by, StaffId::system());
        assert_eq!(row.previous_position, Some(1));
        assert!(OverrideAuditor::<InMemoryQueueRepository>::verify_sequence(&after).is_ok());
    }

    #[tokio::test]
    async fn test_late_arrival_without_absence_is_not_found() {
        let h = harness();
        let id = check_in(&h, "dr-lee", "p-1").await;
        let err = h.service.handle_late_arrival(id, &desk()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_late_arrival_lands_behind_everyone_waiting() {
        let h = harness();
        let ids = check_in_all(&h, "dr-lee", &["p-1", "p-2", "p-3"]).await;
        h.service.mark_absent(absent_request(ids[0], 10)).await.unwrap();
        check_in(&h, "dr-kim", "p-4").await;

        let prior_max = waiting_positions(&h).await.into_iter().max().unwrap();
        let outcome = h.service.handle_late_arrival(ids[0], &desk()).await.unwrap();
        assert!(outcome.new_position > prior_max);
    }

    // =============================================================================
    // DAY CLOSURE
    // =============================================================================

    #[tokio::test]
    async fn test_end_day_is_all_or_nothing() {
        let h = harness();
        let ids = check_in_all(&h, "dr-lee", &["p-1", "p-2"]).await;
        h.service.mark_absent(absent_request(ids[1], 10)).await.unwrap();
        let events_before = h.events.events().len();
        let audits_before = h.service.auditor().history(&h.day).await.unwrap().len();

        h.repository.fail_next_commits(1);
        let err = h.service.end_day(end_day_request(&h, &lee())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        for id in &ids {
            let entry = h.service.query().entry(id).await.unwrap();
            assert_ne!(entry.status, QueueStatus::NoShow);
        }
        assert!(h.service.query().closures(&h.day).await.unwrap().is_empty());
        assert_eq!(h.events.events().len(), events_before);
        assert_eq!(
            h.service.auditor().history(&h.day).await.unwrap().len(),
            audits_before
        );

        let closure = h.service.end_day(end_day_request(&h, &lee())).await.unwrap();
        assert_eq!(closure.marked_no_show_ids, ids);
        assert_eq!(h.service.query().closures(&h.day).await.unwrap().len(), 1);

        // The swept absence can no longer be returned from.
        let err = h.service.handle_late_arrival(ids[1], &desk()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_second_closure_rejected_while_active() {
        let h = harness();
        check_in(&h, "dr-lee", "p-1").await;
        h.service.end_day(end_day_request(&h, &lee())).await.unwrap();

        let err = h.service.end_day(end_day_request(&h, &lee())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    }

    #[tokio::test]
    async fn test_reopen_blocked_by_edit_since_closure() {
        let h = harness();
        let ids = check_in_all(&h, "dr-lee", &["p-1", "p-2"]).await;
        let closure = h.service.end_day(end_day_request(&h, &lee())).await.unwrap();

        // Out-of-band edit through the storage port.
        let mut tx = h
            .repository
            .begin(&h.day, std::time::Duration::from_millis(100))
            .await
            .unwrap();
        tx.state_mut().require_entry_mut(&ids[1]).unwrap().touch();
        h.repository.commit(tx).await.unwrap();

        let err = h
            .service
            .reopen_day(ReopenDayRequest {
                closure_id: closure.id,
                performed_by: lee(),
                reason: None,
            })
            .await
            .unwrap_err();
        match err {
            QueueError::StaleClosure { changed_ids, .. } => assert_eq!(changed_ids, vec![ids[1]]),
            other => panic!("expected StaleClosure, got {other:?}"),
        }
        assert_eq!(
            h.service.query().entry(&ids[0]).await.unwrap().status,
            QueueStatus::NoShow
        );
    }

    #[tokio::test]
    async fn test_reopen_after_window_is_stale() {
        let h = harness();
        check_in(&h, "dr-lee", "p-1").await;
        let closure = h.service.end_day(end_day_request(&h, &lee())).await.unwrap();

        h.clock.advance_minutes(6);
        let err = h
            .service
            .reopen_day(ReopenDayRequest {
                closure_id: closure.id,
                performed_by: lee(),
                reason: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleClosure);
        assert!(err.offending_ids().is_empty());
    }

    // =============================================================================
    // POSITIONS (property-based)
    // =============================================================================

    #[derive(Debug, Clone)]
    enum Op {
        CheckIn,
        MarkAbsent(usize),
        Return(usize),
        CallNext,
        Complete,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::CheckIn),
            2 => (0usize..16).prop_map(Op::MarkAbsent),
            2 => (0usize..16).prop_map(Op::Return),
            1 => Just(Op::CallNext),
            1 => Just(Op::Complete),
        ]
    }

    async fn run_ops(ops: Vec<Op>) -> Vec<u64> {
        let h = harness();
        let mut ids: Vec<AppointmentId> = Vec::new();
        for (n, op) in ops.into_iter().enumerate() {
            // Rejections are part of the workload; only the invariant matters.
            match op {
                Op::CheckIn => ids.push(check_in(&h, "dr-lee", &format!("p-{n}")).await),
                Op::MarkAbsent(i) if !ids.is_empty() => {
                    let _ = h.service.mark_absent(absent_request(ids[i % ids.len()], 10)).await;
                }
                Op::Return(i) if !ids.is_empty() => {
                    let _ = h.service.handle_late_arrival(ids[i % ids.len()], &desk()).await;
                }
                Op::CallNext => {
                    let _ = h.service.call_next(&h.day, &lee()).await;
                }
                Op::Complete => {
                    let _ = h.service.complete_current(&h.day, &lee()).await;
                }
                _ => {}
            }
        }
        waiting_positions(&h).await
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_waiting_positions_strictly_increase(ops in prop::collection::vec(op(), 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let positions = runtime.block_on(run_ops(ops));
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]), "positions {:?}", positions);
        }
    }
}
