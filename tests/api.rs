use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{test, App};
use serde_json::{json, Value};

use rollcall::database::memory::MemoryManager;
use rollcall::registry::Registry;

async fn app() -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let registry = Registry::standard::<MemoryManager>();
    test::init_service(
        App::new()
            .app_data(Data::new(MemoryManager::new()))
            .app_data(Data::new(registry.clone()))
            .configure(move |cfg| rollcall::configure::<MemoryManager>(&registry, cfg)),
    )
    .await
}

async fn send<S>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, value)
}

async fn post<S>(app: &S, path: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    send(app, test::TestRequest::post().uri(path).set_json(body)).await
}

async fn get<S>(app: &S, path: &str) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    send(app, test::TestRequest::get().uri(path)).await
}

async fn organization<S>(app: &S, name: &str) -> i64
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = post(app, "/api/organization/", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn event<S>(app: &S, organizations: &[i64]) -> i64
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = post(app, "/api/events/", json!({ "name": "Kickoff", "date": "2026-10-19", "organizations": organizations })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[actix_web::test]
async fn index_lists_registered_entities() {
    let app = app().await;
    let (status, body) = get(&app, "/api/").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 12);
    let event = entries.iter().find(|e| e["name"] == "Event").unwrap();
    assert_eq!(event["path"], "/event");
    assert_eq!(event["overrides"], json!(["create", "update"]));
}

#[actix_web::test]
async fn crud_round_trip_for_organizations() {
    let app = app().await;
    let id = organization(&app, "North").await;
    organization(&app, "South").await;

    let (status, body) = get(&app, "/api/organization/?page=1&size=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["list"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, test::TestRequest::patch().uri(&format!("/api/organization/{}/", id)).set_json(json!({ "location": "Oslo" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "North");
    assert_eq!(body["location"], "Oslo");

    let (status, body) = send(&app, test::TestRequest::delete().uri(&format!("/api/organization/{}/", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], id);

    let (status, body) = get(&app, &format!("/api/organization/{}/", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[actix_web::test]
async fn far_away_page_is_empty() {
    let app = app().await;
    organization(&app, "North").await;
    let (status, body) = get(&app, "/api/organization/?page=9223372036854775807&size=200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["list"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn malformed_payload_is_unprocessable() {
    let app = app().await;
    let (status, body) = post(&app, "/api/organization/", json!({ "location": "Oslo" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "ValidationError");
}

#[actix_web::test]
async fn registration_enforces_uniqueness_and_organizations() {
    let app = app().await;
    let north = organization(&app, "North").await;
    let south = organization(&app, "South").await;
    let event = event(&app, &[north]).await;

    let registration = json!({ "event": event, "attendee_type": "participant", "participant": "p-1" });
    let (status, body) = post(&app, "/api/event-attendees/", registration.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["attendee_type"], "participant");
    assert_eq!(body["attendance_status"], "attended");
    assert_eq!(body["organizations"], json!([north]));

    let (status, body) = post(&app, "/api/event-attendees/", registration).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "DuplicateRegistration");

    let (_, facilitator) = post(&app, "/api/facilitator/", json!({ "first_name": "Ada", "last_name": "Byron", "organization": south })).await;
    let (status, body) = post(
        &app,
        "/api/event-attendees/",
        json!({ "event": event, "attendee_type": "facilitator", "facilitator": facilitator["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "OrganizationMismatch");

    let (status, body) = post(
        &app,
        "/api/event-attendees/",
        json!({ "event": event, "attendee_type": "participant", "participant": "p-2", "facilitator": facilitator["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "DiscriminatorMismatch");

    let (_, body) = get(&app, &format!("/api/eventattendee/?event={}", event)).await;
    assert_eq!(body["total"], 1);
}

#[actix_web::test]
async fn batch_registration_reports_each_item() {
    let app = app().await;
    let north = organization(&app, "North").await;
    let event = event(&app, &[north]).await;
    let item = |unique_id: &str| json!({ "event": event, "attendee_type": "participant", "participant": unique_id });

    let (status, body) = post(&app, "/api/event-attendees/batch/", json!({ "items": [item("a"), item("b"), item("c"), item("a")] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 3);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][3]["status"], "failed");
    assert_eq!(body["results"][3]["kind"], "DuplicateRegistration");

    let (status, body) = post(&app, "/api/event-attendees/batch/", json!({ "atomic": true, "items": [item("d"), item("a")] })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "BatchAborted");
    assert_eq!(body["index"], 1);
    assert_eq!(body["cause"]["kind"], "DuplicateRegistration");

    let (_, body) = get(&app, "/api/participant/?unique_id=d").await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn event_detail_and_protected_delete() {
    let app = app().await;
    let north = organization(&app, "North").await;
    let (status, body) = post(
        &app,
        "/api/events/",
        json!({
            "name": "Kickoff",
            "date": "2026-10-19",
            "time": "18:30:00",
            "organizations": [north],
            "questions": [{ "text": "How did it go?", "organization": north }],
            "attendees": [{ "attendee_type": "participant", "first_name": "Grace" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let event = body["id"].as_i64().unwrap();
    assert_eq!(body["attendees"].as_array().unwrap().len(), 1);

    let (status, body) = get(&app, &format!("/api/event/{}/detail/", event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question_details"][0]["text"], "How did it go?");

    let (_, body) = get(&app, "/api/question/").await;
    assert_eq!(body["total"], 1);

    let (status, body) = send(&app, test::TestRequest::delete().uri(&format!("/api/event/{}/", event))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "ReferentialProtect");
    assert_eq!(body["dependents"], 1);

    let (status, _) = get(&app, &format!("/api/event/{}/", event)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn add_participants_to_an_event() {
    let app = app().await;
    let north = organization(&app, "North").await;
    let event = event(&app, &[north]).await;
    let (status, body) = post(
        &app,
        &format!("/api/event/{}/participants/", event),
        json!([{ "unique_id": "p-1", "first_name": "Grace" }, { "first_name": "Alan" }, { "unique_id": "p-1" }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);
    assert_eq!(body["failed"], 1);

    let (_, body) = get(&app, &format!("/api/participant/?organization={}", north)).await;
    assert_eq!(body["total"], 2);
}

#[actix_web::test]
async fn unknown_event_is_not_found() {
    let app = app().await;
    let (status, body) = get(&app, "/api/event/404/detail/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}
