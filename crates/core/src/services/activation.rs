//! Doctor activation workflow.
//!
//! Admins review pending doctor registrations and approve or reject them.
//! The decision is persisted first; the confirmation/rejection notification
//! is best-effort and never fails the operation.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::entities::doctor::{ActivationAction, ActivationStatus};
use crate::notify::{NotificationEvent, NotificationSink, DEFAULT_REJECTION_REASON};
use crate::store::{ActivationRequestStore, DoctorStore};
use crate::{CoreError, CoreResult};

/// Summary of a doctor awaiting activation, as rendered in the admin queue.
#[derive(Debug, Clone)]
pub struct PendingDoctor {
    pub request_id: Option<String>,
    pub doctor_id: String,
    pub email: String,
    pub full_name: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub hospital_affiliation: Option<String>,
    pub years_of_experience: Option<u32>,
    pub registration_date: DateTime<Utc>,
    pub request_date: Option<DateTime<Utc>>,
}

/// An admin's decision on a doctor's activation request.
#[derive(Debug, Clone)]
pub struct ProcessActivation {
    pub doctor_id: String,
    /// `APPROVE` or `REJECT`, case-insensitive.
    pub action: String,
    pub notes: Option<String>,
    pub admin_id: String,
    pub admin_email: String,
}

pub struct ActivationService {
    doctors: Arc<dyn DoctorStore>,
    requests: Arc<dyn ActivationRequestStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ActivationService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        requests: Arc<dyn ActivationRequestStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            doctors,
            requests,
            notifier,
        }
    }

    /// All doctors whose registration is still PENDING.
    ///
    /// Unpaginated: the pending queue is expected to stay small. Revisit if
    /// registration volume ever makes this list large.
    pub async fn pending_doctors(&self) -> CoreResult<Vec<PendingDoctor>> {
        let pending = self
            .doctors
            .find_by_activation_status(ActivationStatus::Pending)
            .await?;
        tracing::info!(count = pending.len(), "fetched pending doctor registrations");

        let mut summaries = Vec::with_capacity(pending.len());
        for doctor in pending {
            let request = self.requests.find_by_doctor_id(&doctor.id).await?;
            summaries.push(PendingDoctor {
                request_id: request.map(|r| r.id),
                doctor_id: doctor.id.clone(),
                email: doctor.email.clone(),
                full_name: doctor.full_name(),
                medical_license_number: doctor.medical_license_number.clone(),
                specialization: doctor.specialization.clone(),
                hospital_affiliation: doctor.hospital_affiliation.clone(),
                years_of_experience: doctor.years_of_experience,
                registration_date: doctor.created_at,
                request_date: doctor.activation_request_date,
            });
        }
        Ok(summaries)
    }

    /// Apply an admin's APPROVE/REJECT decision.
    ///
    /// The request's pending guard runs before any mutation, so a second
    /// decision on the same request fails with `Conflict` and leaves the
    /// first intact. Notification dispatch happens after both writes and is
    /// contained: a failure is logged, never propagated.
    ///
    /// # Errors
    ///
    /// * `NotFound`: doctor or its activation request is absent.
    /// * `InvalidArgument`: action is neither APPROVE nor REJECT.
    /// * `Conflict`: the request was already processed.
    pub async fn process(&self, decision: ProcessActivation) -> CoreResult<()> {
        tracing::info!(doctor_id = %decision.doctor_id, action = %decision.action, "processing doctor activation");

        let mut doctor = self
            .doctors
            .find_by_id(&decision.doctor_id)
            .await?
            .ok_or_else(|| CoreError::doctor_not_found(&decision.doctor_id))?;

        let mut request = self
            .requests
            .find_by_doctor_id(&doctor.id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("activation request not found for doctor {}", doctor.id))
            })?;

        let action: ActivationAction = decision.action.parse()?;
        let now = Utc::now();

        request.mark_processed(
            &decision.admin_id,
            &decision.admin_email,
            action,
            decision.notes.as_deref(),
            now,
        )?;

        let event = match action {
            ActivationAction::Approve => {
                doctor.approve(&decision.admin_id, now);
                NotificationEvent::DoctorApproved {
                    doctor_user_id: doctor.user_id.clone(),
                    doctor_email: doctor.email.clone(),
                    first_name: doctor.first_name.clone(),
                    last_name: doctor.last_name.clone(),
                }
            }
            ActivationAction::Reject => {
                doctor.reject(&decision.admin_id, decision.notes.as_deref(), now);
                NotificationEvent::DoctorRejected {
                    doctor_user_id: doctor.user_id.clone(),
                    doctor_email: doctor.email.clone(),
                    last_name: doctor.last_name.clone(),
                    reason: decision
                        .notes
                        .clone()
                        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
                }
            }
        };

        self.doctors.save(&doctor).await?;
        self.requests.save(&request).await?;
        tracing::info!(doctor_id = %doctor.id, %action, "doctor activation decision persisted");

        // Decision is committed; notification is best-effort from here.
        if let Err(e) = self.notifier.notify(event).await {
            tracing::warn!(doctor_id = %doctor.id, error = %e, "activation notification failed");
        }

        Ok(())
    }

    /// Count of unprocessed activation requests.
    pub async fn count_pending(&self) -> CoreResult<u64> {
        self.requests.count_pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ActivationRequest, Doctor};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: NotificationEvent) -> CoreResult<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _event: NotificationEvent) -> CoreResult<()> {
            Err(CoreError::Directory("notification transport down".into()))
        }
    }

    async fn seed_pending_doctor(store: &Arc<MemoryStore>) -> Doctor {
        let now = Utc::now();
        let doctor = Doctor::new(
            "u-1",
            "ada@clinic.test",
            "Ada",
            "Byron",
            "ML-1",
            "Cardiology",
            now,
        );
        let request = ActivationRequest::for_doctor(&doctor, now);
        DoctorStore::insert(store.as_ref(), doctor.clone()).await.unwrap();
        ActivationRequestStore::insert(store.as_ref(), request).await.unwrap();
        doctor
    }

    fn service(
        store: &Arc<MemoryStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> ActivationService {
        ActivationService::new(store.clone(), store.clone(), sink)
    }

    fn decision(doctor_id: &str, action: &str, notes: Option<&str>) -> ProcessActivation {
        ProcessActivation {
            doctor_id: doctor_id.into(),
            action: action.into(),
            notes: notes.map(str::to_string),
            admin_id: "admin-1".into(),
            admin_email: "admin@clinic.test".into(),
        }
    }

    #[tokio::test]
    async fn test_approve_activates_doctor_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let svc = service(&store, sink.clone());
        let doctor = seed_pending_doctor(&store).await;

        svc.process(decision(&doctor.id, "approve", None)).await.unwrap();

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(saved.is_activated);
        assert_eq!(saved.activation_status, ActivationStatus::Approved);
        assert_eq!(saved.activated_by.as_deref(), Some("admin-1"));

        let request = store.find_by_doctor_id(&doctor.id).await.unwrap().unwrap();
        assert!(!request.is_pending);
        assert_eq!(request.action, Some(ActivationAction::Approve));

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], NotificationEvent::DoctorApproved { .. }));
    }

    #[tokio::test]
    async fn test_reject_records_reason_and_defaults_notification_reason() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let svc = service(&store, sink.clone());
        let doctor = seed_pending_doctor(&store).await;

        svc.process(decision(&doctor.id, "REJECT", None)).await.unwrap();

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!saved.is_activated);
        assert_eq!(saved.activation_status, ActivationStatus::Rejected);

        let events = sink.events.lock().unwrap();
        match &events[0] {
            NotificationEvent::DoctorRejected { reason, .. } => {
                assert_eq!(reason, DEFAULT_REJECTION_REASON);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_doctor_and_missing_request_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Arc::new(RecordingSink::default()));

        let missing_doctor = svc.process(decision("nope", "APPROVE", None)).await;
        assert!(matches!(missing_doctor, Err(CoreError::NotFound(_))));

        // Doctor exists but has no activation request.
        let doctor = Doctor::new("u-2", "b@clinic.test", "Grace", "Hopper", "ML-2", "Oncology", Utc::now());
        DoctorStore::insert(store.as_ref(), doctor.clone()).await.unwrap();
        let missing_request = svc.process(decision(&doctor.id, "APPROVE", None)).await;
        assert!(matches!(missing_request, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_action_is_rejected_before_mutation() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Arc::new(RecordingSink::default()));
        let doctor = seed_pending_doctor(&store).await;

        let result = svc.process(decision(&doctor.id, "DEFER", None)).await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));

        let request = store.find_by_doctor_id(&doctor.id).await.unwrap().unwrap();
        assert!(request.is_pending);
    }

    #[tokio::test]
    async fn test_second_decision_conflicts_and_first_survives() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Arc::new(RecordingSink::default()));
        let doctor = seed_pending_doctor(&store).await;

        svc.process(decision(&doctor.id, "APPROVE", None)).await.unwrap();
        let second = svc.process(decision(&doctor.id, "REJECT", Some("changed mind"))).await;
        assert!(matches!(second, Err(CoreError::Conflict(_))));

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(saved.is_activated);
        assert_eq!(saved.activation_status, ActivationStatus::Approved);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_the_decision() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Arc::new(FailingSink));
        let doctor = seed_pending_doctor(&store).await;

        svc.process(decision(&doctor.id, "APPROVE", None)).await.unwrap();

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(saved.is_activated);
    }

    #[tokio::test]
    async fn test_pending_listing_and_count() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Arc::new(RecordingSink::default()));
        let doctor = seed_pending_doctor(&store).await;

        let pending = svc.pending_doctors().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].doctor_id, doctor.id);
        assert_eq!(pending[0].full_name, "Ada Byron");
        assert!(pending[0].request_id.is_some());
        assert_eq!(svc.count_pending().await.unwrap(), 1);

        svc.process(decision(&doctor.id, "APPROVE", None)).await.unwrap();
        assert!(svc.pending_doctors().await.unwrap().is_empty());
        assert_eq!(svc.count_pending().await.unwrap(), 0);
    }
}
