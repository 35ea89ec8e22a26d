// routes.rs
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/polls", get(handlers::get_all_polls).post(handlers::create_poll))
        .route("/polls/{id}", get(handlers::get_poll))
        .route("/polls/{id}/options", get(handlers::get_date_options))
        .route("/polls/{id}/tally", get(handlers::get_tally))
        .route("/polls/{id}/vote", post(handlers::vote))
        .route("/polls/{id}/end", post(handlers::end_poll))
        .route("/polls/{id}/voters/{account}", get(handlers::get_voter_info))
        .route("/polls/{id}/creator/{account}", get(handlers::is_creator))
        .route("/polls/{id}/winner", get(handlers::get_winner))
        .route(
            "/election/candidates",
            get(handlers::get_candidates).post(handlers::add_candidate),
        )
        .route("/election/start", post(handlers::start_voting))
        .route("/election/end", post(handlers::end_voting))
        .route("/election/vote", post(handlers::election_vote))
        .route("/election/status", get(handlers::election_status))
        .route("/election/voters/{account}", get(handlers::election_voter_info))
        .route("/election/winner", get(handlers::election_winner));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handlers::ACCOUNT_HEADER;
    use crate::ledger::Ledger;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        create_routes(AppState::new(Ledger::in_memory(), &Config::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        account: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(account) = account {
            builder = builder.header(ACCOUNT_HEADER, account);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send(app, request).await
    }

    fn lunch() -> Value {
        json!({
            "title": "Team Lunch",
            "options": [
                { "timestamp": 1705327200, "displayDate": "Jan 15, 2024 at 2:00 PM" },
                { "timestamp": 1705413600, "displayDate": "Jan 16, 2024 at 2:00 PM" }
            ]
        })
    }

    #[tokio::test]
    async fn health_returns_200() {
        let (status, body) = call(&test_router(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn poll_round_trip_over_http() {
        let app = test_router();

        let (status, body) =
            call(&app, "POST", "/api/polls", Some("0xCreator"), Some(lunch())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pollId"], 1);

        let ballot = Some(json!({ "optionId": 1 }));
        let (status, _) = call(&app, "POST", "/api/polls/1/vote", Some("0xX"), ballot).await;
        assert_eq!(status, StatusCode::OK);
        let ballot = Some(json!({ "optionId": 0 }));
        let (status, body) = call(&app, "POST", "/api/polls/1/vote", Some("0xX"), ballot).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "AlreadyVoted");

        let (_, body) = call(&app, "GET", "/api/polls/1/voters/0xx", None, None).await;
        assert_eq!(body, json!({ "hasVoted": true, "chosenOptionId": 1 }));

        let (_, body) = call(&app, "GET", "/api/polls/1/winner", None, None).await;
        assert_eq!(body["kind"], "PollStillActive");

        let (status, body) =
            call(&app, "POST", "/api/polls/1/end", Some("0xSomeoneElse"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "Unauthorized");
        let (status, _) = call(&app, "POST", "/api/polls/1/end", Some("0xcreator"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/api/polls/1/winner", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        assert_eq!(body["displayDate"], "Jan 16, 2024 at 2:00 PM");
        assert_eq!(body["voteCount"], 1);

        let (_, body) = call(&app, "GET", "/api/polls/1", None, None).await;
        assert_eq!(body["active"], false);
        assert_eq!(body["dateOptionsCount"], 2);
        assert_eq!(body["creator"], "0xcreator");

        let (_, body) = call(&app, "GET", "/api/polls", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = call(&app, "GET", "/api/polls/1/creator/0xCREATOR", None, None).await;
        assert_eq!(body["isCreator"], true);
    }

    #[tokio::test]
    async fn errors_are_typed() {
        let app = test_router();

        let (status, body) = call(&app, "POST", "/api/polls", None, Some(lunch())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "Unauthorized");

        let one_option = json!({
            "title": "Solo",
            "options": [{ "timestamp": 1, "displayDate": "x" }]
        });
        let (status, body) =
            call(&app, "POST", "/api/polls", Some("0xA"), Some(one_option)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidInput");

        let (status, body) = call(&app, "GET", "/api/polls/5/options", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "NotFound");
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let app = test_router();

        let truncated = Request::builder()
            .method("POST")
            .uri("/api/polls")
            .header(ACCOUNT_HEADER, "0xA")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"#))
            .unwrap();
        let (status, body) = send(&app, truncated).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidInput");
        assert!(body["error"].as_str().unwrap().starts_with("invalid input"));

        let untyped = Request::builder()
            .method("POST")
            .uri("/api/polls")
            .header(ACCOUNT_HEADER, "0xA")
            .body(Body::from(lunch().to_string()))
            .unwrap();
        let (status, body) = send(&app, untyped).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidInput");

        let wrong_shape = Some(json!({ "optionId": "first" }));
        let (status, body) =
            call(&app, "POST", "/api/polls/1/vote", Some("0xA"), wrong_shape).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidInput");

        let (status, body) = call(&app, "GET", "/api/polls/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidInput");

        let (_, body) = call(&app, "GET", "/api/polls", None, None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn legacy_election_over_http() {
        let app = test_router();
        let admin = Some("0xadmin");

        for name in ["Alice", "Bob"] {
            let candidate = Some(json!({ "name": name }));
            let (status, _) =
                call(&app, "POST", "/api/election/candidates", admin, candidate).await;
            assert_eq!(status, StatusCode::OK);
        }
        let duration = Some(json!({ "durationMinutes": 60 }));
        let (status, body) = call(&app, "POST", "/api/election/start", admin, duration).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], true);

        let ballot = Some(json!({ "candidateId": 1 }));
        let (status, _) = call(&app, "POST", "/api/election/vote", Some("0x1"), ballot).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/api/election/winner", None, None).await;
        assert_eq!(body["kind"], "PollStillActive");

        let (status, _) = call(&app, "POST", "/api/election/end", admin, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "POST", "/api/election/end", admin, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "AlreadyClosed");
        assert_eq!(body["error"], "election voting has already ended");

        let (_, body) = call(&app, "GET", "/api/election/winner", None, None).await;
        assert_eq!(body["name"], "Bob");

        let (_, body) = call(&app, "GET", "/api/election/candidates", None, None).await;
        assert_eq!(body[1]["voteCount"], 1);

        let (_, body) = call(&app, "GET", "/api/election/voters/0x1", None, None).await;
        assert_eq!(body["chosenOptionId"], 1);

        let (_, body) = call(&app, "GET", "/api/election/status", None, None).await;
        assert_eq!(body["ended"], true);
        assert_eq!(body["remainingSeconds"], 0);
    }
}
