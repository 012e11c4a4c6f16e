//! HTTP-level contract tests: health endpoint, bearer-token
//! enforcement, and the wire shape of the response payload.

use actix_web::{get, test, web, App, HttpResponse};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use recommendation_service::handlers;
use recommendation_service::middleware::{Claims, JwtAuthMiddleware, UserId};
use recommendation_service::models::{
    ConversationRecommendation, RecommendationsResponse, SubjectSummary, TagSummary,
};
use uuid::Uuid;

const SECRET: &str = "contract-test-secret";

fn bearer_token(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[get("/whoami")]
async fn whoami(user_id: UserId) -> HttpResponse {
    HttpResponse::Ok().body(user_id.0.to_string())
}

#[actix_rt::test]
async fn test_health_returns_ok() {
    let app = test::init_service(App::new().service(handlers::health)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert_eq!(body, "OK");
}

#[actix_rt::test]
async fn test_missing_token_is_rejected() {
    let app = test::init_service(
        App::new().service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(SECRET.to_string()))
                .service(whoami),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/whoami").to_request();
    let resp = test::try_call_service(&app, req).await;

    match resp {
        Ok(resp) => assert_eq!(resp.status().as_u16(), 401),
        Err(err) => assert_eq!(err.as_response_error().status_code().as_u16(), 401),
    }
}

#[actix_rt::test]
async fn test_valid_token_reaches_handler_with_user_id() {
    let user_id = Uuid::new_v4();
    let app = test::init_service(
        App::new().service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(SECRET.to_string()))
                .service(whoami),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header(("Authorization", format!("Bearer {}", bearer_token(user_id))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert_eq!(body, user_id.to_string().as_bytes());
}

#[actix_rt::test]
async fn test_tampered_token_is_rejected() {
    let app = test::init_service(
        App::new().service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(SECRET.to_string()))
                .service(whoami),
        ),
    )
    .await;

    let mut token = bearer_token(Uuid::new_v4());
    token.push('x');
    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::try_call_service(&app, req).await;

    match resp {
        Ok(resp) => assert_eq!(resp.status().as_u16(), 401),
        Err(err) => assert_eq!(err.as_response_error().status_code().as_u16(), 401),
    }
}

#[std::prelude::v1::test]
fn test_response_wire_shape_round_trips() {
    let response = RecommendationsResponse {
        recommendations: vec![ConversationRecommendation {
            conversation_id: Uuid::new_v4(),
            conversation_name: "Control Theory study group".to_string(),
            similarity: 0.74,
            rank: 1,
            subject: Some(SubjectSummary {
                id: Uuid::new_v4(),
                name: "Control Theory".to_string(),
                code: "EE305".to_string(),
            }),
            tags: vec![TagSummary {
                id: Uuid::new_v4(),
                name: "pid".to_string(),
            }],
            avatar_url: Some("https://cdn.example/avatar.png".to_string()),
            member_count: 21,
            is_current_user_member: false,
            has_pending_join_request: true,
        }],
        total_processed: 40,
        processing_time_ms: 7.3,
    };

    let json = serde_json::to_string(&response).unwrap();
    let parsed: RecommendationsResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.recommendations.len(), 1);
    assert_eq!(parsed.recommendations[0].rank, 1);
    assert_eq!(parsed.total_processed, 40);
}
