mod common;

use std::sync::Arc;

use coursepay_core::domain::{CourseStatus, Enrollment, Gateway, TransactionStatus};
use coursepay_core::error::AppError;
use coursepay_core::gateways::Continuation;
use coursepay_core::ports::EnrollmentStore;
use coursepay_core::services::{InitiatePayment, PaymentService};

use common::{published_course, student, stub_registry, InMemoryCatalog, InMemoryEnrollments, InMemoryLedger};

struct Fixture {
    ledger: Arc<InMemoryLedger>,
    catalog: Arc<InMemoryCatalog>,
    enrollments: Arc<InMemoryEnrollments>,
    service: PaymentService,
}

fn fixture(gateway_fails: bool) -> Fixture {
    let ledger = Arc::new(InMemoryLedger::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let enrollments = Arc::new(InMemoryEnrollments::new());
    let service = PaymentService::new(
        ledger.clone(),
        catalog.clone(),
        enrollments.clone(),
        stub_registry(gateway_fails),
    );
    Fixture {
        ledger,
        catalog,
        enrollments,
        service,
    }
}

fn request(course_id: uuid::Uuid) -> InitiatePayment {
    InitiatePayment {
        course_id,
        gateway: Gateway::Stripe,
        currency: None,
        return_url: None,
    }
}

#[tokio::test]
async fn valid_purchase_creates_one_pending_transaction() {
    let fx = fixture(false);
    let course = published_course("50");
    fx.catalog.add(course.clone());
    let user = student();

    let initiated = fx
        .service
        .initiate(&user, request(course.id))
        .await
        .unwrap();

    let rows = fx.ledger.all();
    assert_eq!(rows.len(), 1);
    let tx = &rows[0];
    assert_eq!(tx.id, initiated.transaction_id);
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.user_id, user.id);
    assert_eq!(tx.course_id, course.id);
    assert_eq!(tx.currency, "USD");

    // The placeholder was replaced by the provider's reference.
    assert!(!tx.has_placeholder_reference());
    assert_eq!(tx.gateway_reference, initiated.gateway_reference);
    assert!(matches!(initiated.continuation, Continuation::ClientSecret(_)));
}

#[tokio::test]
async fn free_course_is_rejected_without_a_transaction() {
    let fx = fixture(false);
    let course = published_course("0");
    fx.catalog.add(course.clone());

    let err = fx
        .service
        .initiate(&student(), request(course.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("free")));
    assert!(fx.ledger.all().is_empty());
}

#[tokio::test]
async fn already_enrolled_user_is_rejected_without_a_transaction() {
    let fx = fixture(false);
    let course = published_course("50");
    fx.catalog.add(course.clone());
    let user = student();
    fx.enrollments
        .insert_or_get(&Enrollment::new(user.id, course.id))
        .await
        .unwrap();

    let err = fx
        .service
        .initiate(&user, request(course.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("enrolled")));
    assert!(fx.ledger.all().is_empty());
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let fx = fixture(false);

    let err = fx
        .service
        .initiate(&student(), request(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(fx.ledger.all().is_empty());
}

#[tokio::test]
async fn unpublished_course_is_not_found() {
    let fx = fixture(false);
    let mut course = published_course("50");
    course.status = CourseStatus::Draft;
    fx.catalog.add(course.clone());

    let err = fx
        .service
        .initiate(&student(), request(course.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn gateway_rejection_leaves_transaction_pending_with_placeholder() {
    let fx = fixture(true);
    let course = published_course("50");
    fx.catalog.add(course.clone());

    let err = fx
        .service
        .initiate(&student(), request(course.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Gateway(_)));
    assert_eq!(err.to_string(), "could not initialize payment");

    // The attempt is auditable: the row exists, still PENDING, never
    // promoted to a real provider reference.
    let rows = fx.ledger.all();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TransactionStatus::Pending);
    assert!(rows[0].has_placeholder_reference());
}

#[tokio::test]
async fn explicit_currency_overrides_course_currency() {
    let fx = fixture(false);
    let course = published_course("50");
    fx.catalog.add(course.clone());

    fx.service
        .initiate(
            &student(),
            InitiatePayment {
                course_id: course.id,
                gateway: Gateway::Paystack,
                currency: Some("NGN".to_string()),
                return_url: Some("https://app.example.com/done".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(fx.ledger.all()[0].currency, "NGN");
}
