//! Retry-once decorator for [`QueueApi`].
//!
//! Contention failures (`LockTimeout`, a retryable `Conflict`) are repeated
//! exactly once. Anything else, and a second failure, goes back to the caller.

use crate::domain::{
    AbsenceRecord, CallOutcome, ClosurePreview, LateArrivalOutcome, QueueDayClosure, QueueEntry,
    QueueResult, QueueStatusView,
};
use crate::ports::{
    CallPresentRequest, CheckInRequest, EndDayRequest, MarkAbsentRequest, QueueApi,
    ReopenDayRequest, ScheduleRequest,
};
use async_trait::async_trait;
use shared_types::{AppointmentId, DayKey, StaffId};
use std::future::Future;
use tracing::warn;

pub struct RetryingQueueApi<A> {
    inner: A,
}

impl<A: QueueApi> RetryingQueueApi<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

async fn retry_once<T, F, Fut>(operation: &'static str, mut attempt: F) -> QueueResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = QueueResult<T>>,
{
    match attempt().await {
        Err(err) if err.is_retryable() => {
            warn!(operation, error = %err, "Retrying after contention");
            attempt().await
        }
        other => other,
    }
}

#[async_trait]
impl<A: QueueApi> QueueApi for RetryingQueueApi<A> {
    async fn schedule_appointment(&self, request: ScheduleRequest) -> QueueResult<QueueEntry> {
        let inner = &self.inner;
        retry_once("schedule_appointment", move || {
            inner.schedule_appointment(request.clone())
        })
        .await
    }

    async fn check_in(&self, request: CheckInRequest) -> QueueResult<QueueEntry> {
        let inner = &self.inner;
        retry_once("check_in", move || inner.check_in(request.clone())).await
    }

    async fn call_next(&self, day: &DayKey, staff_id: &StaffId) -> QueueResult<CallOutcome> {
        let inner = &self.inner;
        retry_once("call_next", move || inner.call_next(day, staff_id)).await
    }

    async fn call_present(&self, request: CallPresentRequest) -> QueueResult<CallOutcome> {
        let inner = &self.inner;
        retry_once("call_present", move || inner.call_present(request.clone())).await
    }

    async fn mark_absent(&self, request: MarkAbsentRequest) -> QueueResult<AbsenceRecord> {
        let inner = &self.inner;
        retry_once("mark_absent", move || inner.mark_absent(request.clone())).await
    }

    async fn handle_late_arrival(
        &self,
        appointment_id: AppointmentId,
        performed_by: &StaffId,
    ) -> QueueResult<LateArrivalOutcome> {
        let inner = &self.inner;
        retry_once("handle_late_arrival", move || {
            inner.handle_late_arrival(appointment_id, performed_by)
        })
        .await
    }

    async fn complete_current(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<QueueEntry> {
        let inner = &self.inner;
        retry_once("complete_current", move || inner.complete_current(day, staff_id)).await
    }

    async fn end_day(&self, request: EndDayRequest) -> QueueResult<QueueDayClosure> {
        let inner = &self.inner;
        retry_once("end_day", move || inner.end_day(request.clone())).await
    }

    async fn reopen_day(&self, request: ReopenDayRequest) -> QueueResult<QueueDayClosure> {
        let inner = &self.inner;
        retry_once("reopen_day", move || inner.reopen_day(request.clone())).await
    }

    async fn get_queue_status(
        &self,
        day: &DayKey,
        staff_id: Option<&StaffId>,
    ) -> QueueResult<QueueStatusView> {
        self.inner.get_queue_status(day, staff_id).await
    }

    async fn get_closure_preview(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<ClosurePreview> {
        self.inner.get_closure_preview(day, staff_id).await
    }
}
