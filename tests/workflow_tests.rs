//! Workflow-level tests: services driven directly against the in-memory repository.

use course_platform::{
    ApiError, AuthService, CourseService, EnrollmentService, InMemoryRepository, StudentService,
    TokenIssuer,
    auth::AuthUser,
    models::{
        CourseQuery, CourseRequest, CreateEnrollmentRequest, CreateStudentRequest,
        EnrollmentQuery, EnrollmentStatus, LoginRequest, NewIdentity, RegisterRequest, Role,
        UpdateStudentRequest,
    },
    repository::{Repository, RepositoryState},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Fixtures ---

struct Fixture {
    mem: Arc<InMemoryRepository>,
    repo: RepositoryState,
}

impl Fixture {
    fn new() -> Self {
        let mem = Arc::new(InMemoryRepository::new());
        let repo = mem.clone() as RepositoryState;
        Self { mem, repo }
    }

    fn auth(&self) -> AuthService {
        let tokens =
            TokenIssuer::new("workflow-secret", "course-platform", "course-platform-clients");
        AuthService::new(self.repo.clone(), tokens, true)
    }

    fn courses(&self) -> CourseService {
        CourseService::new(self.repo.clone())
    }

    fn students(&self) -> StudentService {
        StudentService::new(self.repo.clone())
    }

    fn enrollments(&self) -> EnrollmentService {
        EnrollmentService::new(self.repo.clone())
    }

    async fn user(&self, username: &str, role: Role) -> AuthUser {
        let identity = self
            .repo
            .insert_identity(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                // Never verified: these fixtures do not log in.
                password_hash: "unused".to_string(),
                full_name: format!("{username} full name"),
                roles: vec![role],
            })
            .await
            .unwrap();
        AuthUser {
            id: identity.id,
            username: identity.username,
            email: identity.email,
            roles: identity.roles,
        }
    }

    async fn course(&self, admin: &AuthUser, title: &str, category: &str) -> Uuid {
        self.courses()
            .create(admin, course_request(title, category))
            .await
            .unwrap()
            .id
    }
}

fn course_request(title: &str, category: &str) -> CourseRequest {
    CourseRequest {
        title: title.to_string(),
        description: Some("A course".to_string()),
        category: category.to_string(),
        workload: 40,
    }
}

fn register_request(username: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        full_name: "Maria Silva".to_string(),
        password: "Student123".to_string(),
    }
}

fn enroll_in(course_id: Uuid) -> CreateEnrollmentRequest {
    CreateEnrollmentRequest {
        course_id,
        student_id: None,
    }
}

fn validation_fields(err: ApiError) -> Vec<String> {
    match err {
        ApiError::Validation(fields) => fields,
        other => panic!("expected a validation failure, got {other:?}"),
    }
}

// --- Auth Workflow ---

#[tokio::test]
async fn test_register_then_login() {
    let fx = Fixture::new();
    let auth = fx.auth();

    auth.register(register_request("maria", "maria@example.com"))
        .await
        .unwrap();

    let stored = fx
        .repo
        .find_live_identity_by_username("maria")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.roles, vec![Role::Student]);
    assert_ne!(stored.password_hash, "Student123");

    let login = auth
        .login(LoginRequest {
            username: "maria".into(),
            password: "Student123".into(),
        })
        .await
        .unwrap();
    assert!(login.is_some());

    let wrong = auth
        .login(LoginRequest {
            username: "maria".into(),
            password: "Student124".into(),
        })
        .await
        .unwrap();
    assert!(wrong.is_none());
}

#[tokio::test]
async fn test_register_same_email_twice_conflicts() {
    let fx = Fixture::new();
    let auth = fx.auth();

    auth.register(register_request("first", "dup@example.com"))
        .await
        .unwrap();
    let err = auth
        .register(register_request("second", "DUP@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(fx.repo.list_live_identities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_taken_username_is_a_field_error() {
    let fx = Fixture::new();
    let auth = fx.auth();

    auth.register(register_request("samename", "one@example.com"))
        .await
        .unwrap();
    let err = auth
        .register(register_request("samename", "two@example.com"))
        .await
        .unwrap_err();

    let fields = validation_fields(err);
    assert!(fields.iter().any(|f| f.contains("already taken")));
}

#[tokio::test]
async fn test_register_collects_every_field_problem() {
    let fx = Fixture::new();
    let err = fx
        .auth()
        .register(RegisterRequest {
            username: "ab".into(),
            email: "not-an-email".into(),
            full_name: "Al".into(),
            password: "short".into(),
        })
        .await
        .unwrap_err();

    let fields = validation_fields(err);
    assert!(fields.iter().any(|f| f.starts_with("username")));
    assert!(fields.iter().any(|f| f.starts_with("email")));
    assert!(fields.iter().any(|f| f.starts_with("full name")));
    assert!(fields.iter().any(|f| f.contains("at least 8")));
}

#[tokio::test]
async fn test_login_rejects_inactive_and_deleted_accounts() {
    let fx = Fixture::new();
    let auth = fx.auth();
    let inactive = fx.user("inactive", Role::Student).await;
    let deleted = fx.user("deleted", Role::Student).await;

    fx.mem.deactivate_identity(inactive.id).unwrap();
    fx.repo.soft_delete_identity(deleted.id).await.unwrap();

    for username in ["inactive", "deleted", "nobody"] {
        let outcome = auth
            .verify_credentials(username, "Password1")
            .await
            .unwrap();
        assert!(outcome.is_none(), "{username} must not authenticate");
    }
}

// --- Course Workflow ---

#[tokio::test]
async fn test_course_writes_are_role_gated() {
    let fx = Fixture::new();
    let student = fx.user("stu", Role::Student).await;
    let instructor = fx.user("ins", Role::Instructor).await;

    let err = fx
        .courses()
        .create(&student, course_request("Systems Programming", "CS"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let id = fx.course(&instructor, "Systems Programming", "CS").await;

    let err = fx.courses().delete(&instructor, id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden), "delete is Admin only");
}

#[tokio::test]
async fn test_course_title_must_be_unique_among_live_courses() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;

    let first = fx.course(&admin, "Compilers in Practice", "CS").await;
    let err = fx
        .courses()
        .create(&admin, course_request("Compilers in Practice", "CS"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // Once deleted, the title is free again.
    assert!(fx.courses().delete(&admin, first).await.unwrap());
    fx.course(&admin, "Compilers in Practice", "CS").await;
}

#[tokio::test]
async fn test_course_update_overwrites_and_rejects_taken_titles() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let a = fx.course(&admin, "Algorithms Part One", "CS").await;
    fx.course(&admin, "Algorithms Part Two", "CS").await;

    let err = fx
        .courses()
        .update(&admin, a, course_request("Algorithms Part Two", "CS"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let mut replacement = course_request("Algorithms Revisited", "Math");
    replacement.description = None;
    replacement.workload = 12;
    assert!(fx.courses().update(&admin, a, replacement).await.unwrap());

    let course = fx.courses().get(a).await.unwrap().unwrap();
    assert_eq!(course.title, "Algorithms Revisited");
    assert_eq!(course.category, "Math");
    assert_eq!(course.description, None);
    assert_eq!(course.workload, 12);

    assert!(
        !fx.courses()
            .update(&admin, Uuid::new_v4(), course_request("Nonexistent Course", "CS"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_course_field_validation() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;

    let err = fx
        .courses()
        .create(
            &admin,
            CourseRequest {
                title: "Short".into(),
                description: Some("x".repeat(2001)),
                category: "".into(),
                workload: 0,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(validation_fields(err).len(), 4);
}

#[tokio::test]
async fn test_course_listing_orders_filters_and_paginates() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    fx.course(&admin, "Zoology for Everyone", "Biology").await;
    fx.course(&admin, "Astronomy Basics Course", "Physics").await;
    fx.course(&admin, "Marine Biology Intro", "Biology").await;
    let deleted = fx.course(&admin, "Deleted Course Title", "Biology").await;
    fx.courses().delete(&admin, deleted).await.unwrap();

    let by_title = fx.courses().list(&CourseQuery::default()).await.unwrap();
    assert_eq!(by_title.total, 3);
    let titles: Vec<_> = by_title.data.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Astronomy Basics Course", "Marine Biology Intro", "Zoology for Everyone"]
    );

    let newest = fx
        .courses()
        .list(&CourseQuery {
            order_by: Some("date".into()),
            ..CourseQuery::default()
        })
        .await
        .unwrap();
    assert!(
        newest
            .data
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );

    let biology = fx
        .courses()
        .list(&CourseQuery {
            category: Some("Biology".into()),
            ..CourseQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(biology.total, 2);

    let search = fx
        .courses()
        .list(&CourseQuery {
            search: Some("biology".into()),
            ..CourseQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(search.total, 2, "matches title or category, ignoring case");

    let second_page = fx
        .courses()
        .list(&CourseQuery {
            page: 2,
            page_size: 2,
            ..CourseQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.data.len(), 1);
    assert_eq!(second_page.data[0].title, "Zoology for Everyone");

    let err = fx
        .courses()
        .list(&CourseQuery {
            page: 0,
            ..CourseQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

// --- Student Workflow ---

#[tokio::test]
async fn test_admin_creates_student_with_email_as_username() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;

    let student = fx
        .students()
        .create(
            &admin,
            CreateStudentRequest {
                full_name: "Joana Prado".into(),
                email: "joana@example.com".into(),
                password: "Welcome123".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(student.username, "joana@example.com");
    assert_eq!(student.roles, vec![Role::Student]);
    assert!(student.is_active);

    let err = fx
        .students()
        .create(
            &admin,
            CreateStudentRequest {
                full_name: "Joana Again".into(),
                email: "joana@example.com".into(),
                password: "Welcome123".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_student_records_are_admin_or_self() {
    let fx = Fixture::new();
    let alice = fx.user("alice", Role::Student).await;
    let bob = fx.user("bob", Role::Student).await;

    assert!(fx.students().get(&alice, alice.id).await.unwrap().is_some());
    assert!(matches!(
        fx.students().get(&alice, bob.id).await.unwrap_err(),
        ApiError::Forbidden
    ));
    assert!(matches!(
        fx.students().list_all(&alice).await.unwrap_err(),
        ApiError::Forbidden
    ));
    assert!(matches!(
        fx.students().delete(&alice, alice.id).await.unwrap_err(),
        ApiError::Forbidden
    ));

    assert!(
        fx.students()
            .update(
                &alice,
                alice.id,
                UpdateStudentRequest {
                    full_name: "Alice Renamed".into()
                }
            )
            .await
            .unwrap()
    );
    let me = fx.students().me(&alice).await.unwrap().unwrap();
    assert_eq!(me.full_name, "Alice Renamed");
}

#[tokio::test]
async fn test_deleted_student_disappears_from_reads() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let gone = fx.user("gone", Role::Student).await;

    assert!(fx.students().delete(&admin, gone.id).await.unwrap());
    assert!(!fx.students().delete(&admin, gone.id).await.unwrap());

    assert!(fx.students().get(&admin, gone.id).await.unwrap().is_none());
    assert!(fx.students().me(&gone).await.unwrap().is_none());
    let all = fx.students().list_all(&admin).await.unwrap();
    assert!(all.iter().all(|s| s.id != gone.id));

    let raw = fx.repo.find_identity(gone.id).await.unwrap().unwrap();
    assert!(raw.is_deleted && !raw.is_active);
}

// --- Enrollment Workflow ---

#[tokio::test]
async fn test_enroll_twice_conflicts_with_one_row() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let student = fx.user("student", Role::Student).await;
    let course = fx.course(&admin, "Operating Systems", "CS").await;

    let enrollment = fx
        .enrollments()
        .enroll(&student, enroll_in(course))
        .await
        .unwrap();
    assert_eq!(enrollment.student_id, student.id);
    assert_eq!(enrollment.course_title, "Operating Systems");
    assert_eq!(enrollment.status, EnrollmentStatus::Active);

    let err = fx
        .enrollments()
        .enroll(&student, enroll_in(course))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(fx.mem.enrollment_rows(student.id, course).unwrap(), 1);
}

#[tokio::test]
async fn test_non_admin_cannot_enroll_someone_else() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let alice = fx.user("alice", Role::Student).await;
    let bob = fx.user("bob", Role::Student).await;
    let course = fx.course(&admin, "Linear Algebra I", "Math").await;

    let enrollment = fx
        .enrollments()
        .enroll(
            &alice,
            CreateEnrollmentRequest {
                course_id: course,
                student_id: Some(bob.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(enrollment.student_id, alice.id, "the target is ignored");

    let for_bob = fx
        .enrollments()
        .enroll(
            &admin,
            CreateEnrollmentRequest {
                course_id: course,
                student_id: Some(bob.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(for_bob.student_id, bob.id);
}

#[tokio::test]
async fn test_enroll_validation_order() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let inactive = fx.user("inactive", Role::Student).await;
    fx.mem.deactivate_identity(inactive.id).unwrap();
    let missing_course = Uuid::new_v4();

    // Admin without a target: no student to resolve.
    let err = fx
        .enrollments()
        .enroll(&admin, enroll_in(missing_course))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ref f) if f == &["invalid student"]));

    // Student and course both bad: the student check wins.
    let err = fx
        .enrollments()
        .enroll(
            &admin,
            CreateEnrollmentRequest {
                course_id: missing_course,
                student_id: Some(inactive.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m == "student not found or inactive"));

    let err = fx
        .enrollments()
        .enroll(
            &admin,
            CreateEnrollmentRequest {
                course_id: missing_course,
                student_id: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m == "student not found or inactive"));

    // Live student, missing course.
    let err = fx
        .enrollments()
        .enroll(
            &admin,
            CreateEnrollmentRequest {
                course_id: missing_course,
                student_id: Some(admin.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m == "course not found"));
}

#[tokio::test]
async fn test_enroll_in_deleted_course_is_rejected() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let student = fx.user("student", Role::Student).await;
    let course = fx.course(&admin, "Retired Course Title", "CS").await;
    fx.courses().delete(&admin, course).await.unwrap();

    let err = fx
        .enrollments()
        .enroll(&student, enroll_in(course))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m == "course not found"));
}

#[tokio::test]
async fn test_cancel_lifecycle_and_status_filter() {
    let fx = Fixture::new();
    let admin = fx.user("admin", Role::Admin).await;
    let student = fx.user("student", Role::Student).await;
    let x = fx.course(&admin, "Databases Course X", "CS").await;
    let y = fx.course(&admin, "Networking Course Y", "CS").await;

    let in_x = fx.enrollments().enroll(&student, enroll_in(x)).await.unwrap();
    fx.enrollments().enroll(&student, enroll_in(y)).await.unwrap();

    assert!(matches!(
        fx.enrollments().cancel(&student, in_x.id).await.unwrap_err(),
        ApiError::Forbidden
    ));
    assert!(fx.enrollments().cancel(&admin, in_x.id).await.unwrap());
    assert!(!fx.enrollments().cancel(&admin, in_x.id).await.unwrap());

    let visible = fx
        .enrollments()
        .list_by_student(&student, student.id, &EnrollmentQuery::default())
        .await
        .unwrap();
    assert_eq!(visible.total, 1);
    assert_eq!(visible.data[0].course_id, y);

    let cancelled = fx
        .enrollments()
        .list_by_student(
            &student,
            student.id,
            &EnrollmentQuery {
                status: Some(EnrollmentStatus::Cancelled),
                ..EnrollmentQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.total, 1);
    assert_eq!(cancelled.data[0].id, in_x.id);
    assert_eq!(cancelled.data[0].status, EnrollmentStatus::Cancelled);

    // After cancelling, the pair may be enrolled again.
    fx.enrollments().enroll(&student, enroll_in(x)).await.unwrap();
    assert_eq!(fx.mem.enrollment_rows(student.id, x).unwrap(), 2);
}

#[tokio::test]
async fn test_listing_enrollments_checks_ownership_before_pagination() {
    let fx = Fixture::new();
    let alice = fx.user("alice", Role::Student).await;
    let bob = fx.user("bob", Role::Student).await;

    let bad_page = EnrollmentQuery {
        page: 0,
        ..EnrollmentQuery::default()
    };

    let err = fx
        .enrollments()
        .list_by_student(&alice, bob.id, &bad_page)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let err = fx
        .enrollments()
        .list_by_student(&alice, alice.id, &bad_page)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_listing_enrollments_rejects_overflowing_page() {
    let fx = Fixture::new();
    let alice = fx.user("alice", Role::Student).await;

    let huge = EnrollmentQuery {
        page: i64::MAX,
        page_size: 3,
        ..EnrollmentQuery::default()
    };
    let err = fx
        .enrollments()
        .list_by_student(&alice, alice.id, &huge)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}
