//! Backend client and privileged operations against a mocked hosted backend.

use heritrail_backend::{
    hard_delete_review, require_admin, store_gallery_image, BackendClient, BackendError, VariantUpload,
};
use heritrail_config::BackendConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REVIEW_ID: &str = "5f0c6a1e-8d1b-4a43-9d0e-2b0f3c1a7e11";

async fn client(server: &MockServer) -> BackendClient {
    let config = BackendConfig { url: server.uri(), ..Default::default() };
    BackendClient::with_keys(&config, Some("anon-key".into()), Some("service-key".into())).unwrap()
}

async fn mount_user(server: &MockServer, token: &str, user_id: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": user_id, "email": "a@b.org"})))
        .mount(server)
        .await;
}

async fn mount_review(server: &MockServer, owner: &str, images: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("id", format!("eq.{REVIEW_ID}").as_str()))
        .and(query_param("select", "id,user_id,image_paths"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": REVIEW_ID, "user_id": owner, "image_paths": images}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_owner_can_hard_delete_review() {
    let server = MockServer::start().await;
    mount_user(&server, "tok", "user-1").await;
    mount_review(&server, "user-1", json!(["user-1/a.jpg", "user-1/b.jpg"])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/hard_delete_review"))
        .and(body_json(json!({"review_id": REVIEW_ID})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/review-images"))
        .and(body_json(json!({"prefixes": ["user-1/a.jpg", "user-1/b.jpg"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let deleted = hard_delete_review(&client(&server).await, "tok", REVIEW_ID).await.unwrap();
    assert_eq!(deleted.review_id, REVIEW_ID);
    assert_eq!(deleted.images_removed, 2);
}

#[tokio::test]
async fn test_storage_cleanup_failure_is_swallowed() {
    let server = MockServer::start().await;
    mount_user(&server, "tok", "user-1").await;
    mount_review(&server, "user-1", json!(["user-1/a.jpg"])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/hard_delete_review"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/review-images"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "storage down"})))
        .mount(&server)
        .await;

    let deleted = hard_delete_review(&client(&server).await, "tok", REVIEW_ID).await.unwrap();
    assert_eq!(deleted.images_removed, 0);
}

#[tokio::test]
async fn test_other_users_review_is_forbidden() {
    let server = MockServer::start().await;
    mount_user(&server, "tok", "intruder").await;
    mount_review(&server, "user-1", Value::Null).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/hard_delete_review"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = hard_delete_review(&client(&server).await, "tok", REVIEW_ID).await.unwrap_err();
    assert!(matches!(err, BackendError::Forbidden(_)));
}

#[tokio::test]
async fn test_missing_review_is_not_found() {
    let server = MockServer::start().await;
    mount_user(&server, "tok", "user-1").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = hard_delete_review(&client(&server).await, "tok", REVIEW_ID).await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(&server)
        .await;

    let err = client(&server).await.auth_user("expired").await.unwrap_err();
    match err {
        BackendError::Unauthorized(msg) => assert_eq!(msg, "invalid JWT"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_require_admin_checks_profile_role() {
    let server = MockServer::start().await;
    mount_user(&server, "admin-tok", "admin-1").await;
    mount_user(&server, "user-tok", "user-1").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.admin-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"role": "admin"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.user-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"role": "member"}])))
        .mount(&server)
        .await;

    let backend = client(&server).await;
    let admin = require_admin(&backend, "admin-tok").await.unwrap();
    assert_eq!(admin.id, "admin-1");
    assert_eq!(admin.role.as_deref(), Some("admin"));

    let err = require_admin(&backend, "user-tok").await.unwrap_err();
    assert!(matches!(err, BackendError::Forbidden(_)));
}

fn upload(name: &str, width: u32) -> VariantUpload {
    VariantUpload {
        name: name.into(),
        width,
        height: width / 2,
        content_type: "image/jpeg".into(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
    }
}

#[tokio::test]
async fn test_gallery_upload_records_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(wiremock::matchers::path_regex(r"^/storage/v1/object/site-images/site-7/[0-9a-f-]{36}/(thumb|large)\.jpg$"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "ok"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/site_images"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": "row"}])))
        .expect(1)
        .mount(&server)
        .await;

    let image = store_gallery_image(&client(&server).await, "site-7", "admin-1", vec![upload("thumb", 320), upload("large", 1920)])
        .await
        .unwrap();
    assert_eq!(image.site_id, "site-7");
    assert_eq!(image.variants.len(), 2);
    assert!(image.variants[0].path.ends_with("/thumb.jpg"));
    assert_eq!(image.variants[1].bytes, 4);
}

#[tokio::test]
async fn test_gallery_insert_failure_removes_uploads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(wiremock::matchers::path_regex(r"^/storage/v1/object/site-images/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "ok"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/site_images"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "duplicate key"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/site-images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let err = store_gallery_image(&client(&server).await, "site-7", "admin-1", vec![upload("thumb", 320)])
        .await
        .unwrap_err();
    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "duplicate key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
