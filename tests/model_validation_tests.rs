use axum::{extract::Query, http::Uri};
use chrono::Utc;
use course_platform::models::{
    Course, CourseOrder, CourseQuery, CreateEnrollmentRequest, EnrollmentQuery, EnrollmentStatus,
    Identity, Role, StudentResponse,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

fn parse_query<T: DeserializeOwned>(query: &str) -> Option<T> {
    let uri: Uri = format!("/courses?{query}").parse().unwrap();
    Query::<T>::try_from_uri(&uri).ok().map(|Query(value)| value)
}

#[test]
fn test_course_query_accepts_camel_and_snake_case() {
    let camel: CourseQuery = parse_query("orderBy=date&pageSize=25&page=3&category=CS").unwrap();
    assert_eq!(camel.order(), CourseOrder::NewestFirst);
    assert_eq!(camel.page_size, 25);
    assert_eq!(camel.page, 3);
    assert_eq!(camel.offset(), 50);
    assert_eq!(camel.category.as_deref(), Some("CS"));

    let snake: CourseQuery = parse_query("order_by=title&page_size=7").unwrap();
    assert_eq!(snake.order(), CourseOrder::Title);
    assert_eq!(snake.page_size, 7);
    assert_eq!(snake.page, 1);
}

#[test]
fn test_course_query_defaults() {
    let query: CourseQuery = parse_query("").unwrap();
    assert_eq!(query.page, 1);
    assert_eq!(query.page_size, 10);
    assert_eq!(query.offset(), 0);
    assert_eq!(query.order(), CourseOrder::Title, "missing orderBy sorts by title");

    let unknown: CourseQuery = parse_query("orderBy=popularity").unwrap();
    assert_eq!(unknown.order(), CourseOrder::Title);
}

#[test]
fn test_enrollment_query_parses_status() {
    let query: EnrollmentQuery = parse_query("status=Cancelled&pageSize=2").unwrap();
    assert_eq!(query.status, Some(EnrollmentStatus::Cancelled));
    assert_eq!(query.page_size, 2);

    let bad: Option<EnrollmentQuery> = parse_query("status=Paused");
    assert!(bad.is_none());
}

#[test]
fn test_course_serialization_hides_deleted_flag() {
    let course = Course {
        id: Uuid::new_v4(),
        title: "Serialization Course".into(),
        description: None,
        category: "CS".into(),
        workload: 10,
        created_at: Utc::now(),
        is_deleted: true,
    };

    let json = serde_json::to_value(&course).unwrap();
    assert!(json.get("is_deleted").is_none());
    assert!(json["description"].is_null());
    assert_eq!(json["workload"], 10);
}

#[test]
fn test_student_response_never_carries_the_hash() {
    let identity = Identity {
        id: Uuid::new_v4(),
        username: "ana@example.com".into(),
        email: "ana@example.com".into(),
        password_hash: "$argon2id$secret".into(),
        full_name: "Ana".into(),
        is_active: true,
        is_deleted: false,
        created_at: Utc::now(),
        roles: vec![Role::Student, Role::Instructor],
    };

    let json = serde_json::to_string(&StudentResponse::from(identity)).unwrap();
    assert!(!json.contains("argon2"));
    assert!(json.contains(r#""roles":["Student","Instructor"]"#));
}

#[test]
fn test_role_names_round_trip_through_text() {
    for role in Role::ALL {
        assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
    }
    assert!("admin".parse::<Role>().is_err(), "role names are case-sensitive");
}

#[test]
fn test_enrollment_request_student_id_is_optional() {
    let course_id = Uuid::new_v4();
    let req: CreateEnrollmentRequest =
        serde_json::from_str(&format!(r#"{{"course_id":"{course_id}"}}"#)).unwrap();
    assert_eq!(req.course_id, course_id);
    assert_eq!(req.student_id, None);
}
