//! In-memory port implementations shared by the integration tests. They
//! mirror the conditional-update semantics of the Postgres adapters so the
//! idempotency and concurrency properties can be exercised without a
//! database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use coursepay_core::domain::{
    Course, CourseStatus, Enrollment, Transaction, TransactionStatus,
};
use coursepay_core::gateways::{
    Continuation, GatewayError, GatewayRegistry, InitiatedPayment, PaymentEvent, PaymentGateway,
    PaymentRequest, VerificationError,
};
use coursepay_core::ports::{
    AuthUser, CourseCatalog, EnrollmentStore, StoreError, StoreResult, TransactionLedger,
    Transition,
};

#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<HashMap<Uuid, Transaction>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    /// Seed a row directly, bypassing the insert path.
    pub fn seed(&self, tx: Transaction) {
        self.rows.lock().unwrap().insert(tx.id, tx);
    }
}

#[async_trait]
impl TransactionLedger for InMemoryLedger {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_gateway_reference(&self, id: Uuid, reference: &str) -> StoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let tx = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if tx.has_placeholder_reference() {
            tx.gateway_reference = reference.to_string();
            tx.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> StoreResult<Transition> {
        if !from.can_transition(to) {
            return Err(StoreError::Conflict(format!(
                "illegal transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }

        // The lock makes the read-then-write atomic, matching the
        // single-row conditional UPDATE in the Postgres adapter.
        let mut rows = self.rows.lock().unwrap();
        let tx = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if tx.status == from {
            tx.status = to;
            tx.updated_at = Utc::now();
            Ok(Transition::Applied(tx.clone()))
        } else {
            Ok(Transition::Superseded(tx.clone()))
        }
    }

    async fn list_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|tx| tx.status == status)
            .cloned()
            .collect())
    }

    async fn expire_pending_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut expired = 0;
        for tx in rows.values_mut() {
            if tx.status == TransactionStatus::Pending && tx.created_at < cutoff {
                tx.status = TransactionStatus::Failed;
                tx.updated_at = Utc::now();
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[derive(Default)]
pub struct InMemoryEnrollments {
    rows: Mutex<Vec<Enrollment>>,
}

impl InMemoryEnrollments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Enrollment> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollments {
    async fn find_current(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> StoreResult<Option<Enrollment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id && e.status.is_current())
            .cloned())
    }

    async fn insert_or_get(&self, enrollment: &Enrollment) -> StoreResult<Enrollment> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter().find(|e| {
            e.user_id == enrollment.user_id
                && e.course_id == enrollment.course_id
                && e.status.is_current()
        }) {
            return Ok(existing.clone());
        }
        rows.push(enrollment.clone());
        Ok(enrollment.clone())
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    courses: Mutex<HashMap<Uuid, Course>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, course: Course) {
        self.courses.lock().unwrap().insert(course.id, course);
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn find_published(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self
            .courses
            .lock()
            .unwrap()
            .get(&id)
            .filter(|c| c.is_published())
            .cloned())
    }
}

/// Programmable gateway double for the initiation path.
pub struct StubGateway {
    pub fail: bool,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiatedPayment, GatewayError> {
        if self.fail {
            return Err(GatewayError::Rejected {
                provider: "stub",
                detail: "simulated provider rejection".to_string(),
            });
        }
        Ok(InitiatedPayment {
            reference: format!("stub_{}", request.transaction_id.simple()),
            continuation: Continuation::ClientSecret(format!(
                "secret_{}",
                request.transaction_id.simple()
            )),
        })
    }

    fn verify(&self, _payload: &[u8], _signature: Option<&str>) -> Result<(), VerificationError> {
        Ok(())
    }

    fn normalize(&self, _payload: &[u8]) -> Result<Option<PaymentEvent>, VerificationError> {
        Ok(None)
    }
}

pub fn stub_registry(fail: bool) -> Arc<GatewayRegistry> {
    Arc::new(GatewayRegistry::new(
        Arc::new(StubGateway { fail }),
        Arc::new(StubGateway { fail }),
        Arc::new(StubGateway { fail }),
    ))
}

/// Identity double that accepts every bearer token as the same user.
pub struct StaticDirectory {
    pub user: AuthUser,
}

#[async_trait]
impl coursepay_core::ports::UserDirectory for StaticDirectory {
    async fn resolve_bearer(&self, _token: &str) -> StoreResult<Option<AuthUser>> {
        Ok(Some(self.user.clone()))
    }
}

pub fn published_course(price: &str) -> Course {
    Course {
        id: Uuid::new_v4(),
        title: "Systems Programming".to_string(),
        price: price.parse::<BigDecimal>().unwrap(),
        currency: "USD".to_string(),
        status: CourseStatus::Published,
    }
}

pub fn student() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: "student@example.com".to_string(),
        role: "STUDENT".to_string(),
    }
}
