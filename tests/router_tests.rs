mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::{args, MockSimplyBook};
use serde_json::json;
use simplybook_mcp::envelope::AUTH_FAILED_MESSAGE;

const TTL: Duration = Duration::from_secs(3000);

fn pair(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

#[tokio::test]
async fn test_first_call_authenticates_second_reuses_token() {
    let mock = MockSimplyBook::start().await;
    let (session, registry) = mock.registry(TTL);

    let first = registry.call("get_bookings", args(json!({}))).await.unwrap();
    assert!(first.success, "{:?}", first.error);
    assert_eq!(mock.state.auth_calls(), 1);
    assert_eq!(mock.state.api_calls(), 1);

    let second = registry.call("get_services", args(json!({}))).await.unwrap();
    assert!(second.success, "{:?}", second.error);
    assert_eq!(mock.state.auth_calls(), 1);
    assert_eq!(mock.state.api_calls(), 2);

    let headers = session.get_auth_headers();
    assert_eq!(headers.company(), "acme");
    assert_eq!(headers.token(), Some("token-1"));
}

#[tokio::test]
async fn test_result_is_upstream_json_unmodified() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call("get_client", args(json!({"id": 12})))
        .await
        .unwrap();
    let result = envelope.result.unwrap();
    assert_eq!(result["path"], "/admin/clients/12");
    assert_eq!(result["method"], "GET");
    assert_eq!(result["data"], json!([{"id": 1}]));
    assert_eq!(result["metadata"]["items_count"], 1);
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_authentication() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);
    let registry = std::sync::Arc::new(registry);

    let calls = (0..10).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move { registry.call("get_providers", args(json!({}))).await })
    });
    for call in futures::future::join_all(calls).await {
        assert!(call.unwrap().unwrap().success);
    }

    assert_eq!(mock.state.auth_calls(), 1);
    assert_eq!(mock.state.api_calls(), 10);
}

#[tokio::test]
async fn test_rejected_credentials_never_reach_upstream() {
    let mock = MockSimplyBook::start().await;
    mock.state.reject_auth(true);
    let (session, registry) = mock.registry(TTL);

    let envelope = registry.call("get_clients", args(json!({}))).await.unwrap();
    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert!(error.starts_with(AUTH_FAILED_MESSAGE), "{error}");
    assert!(error.contains("Login or password is incorrect"), "{error}");
    assert!(envelope.result.is_none());
    assert_eq!(mock.state.api_calls(), 0);
    assert!(!session.is_authenticated());

    // The next call tries again.
    mock.state.reject_auth(false);
    let envelope = registry.call("get_clients", args(json!({}))).await.unwrap();
    assert!(envelope.success);
    assert_eq!(mock.state.auth_calls(), 2);
    assert_eq!(mock.state.api_calls(), 1);
}

#[tokio::test]
async fn test_two_factor_account_counts_as_auth_failure() {
    let mock = MockSimplyBook::start().await;
    mock.state.require_2fa(true);
    let (_, registry) = mock.registry(TTL);

    let envelope = registry.call("get_statistics", args(json!({}))).await.unwrap();
    let error = envelope.error.unwrap();
    assert!(error.starts_with(AUTH_FAILED_MESSAGE), "{error}");
    assert!(error.contains("two-factor"), "{error}");
    assert_eq!(mock.state.api_calls(), 0);
}

#[tokio::test]
async fn test_malformed_auth_response_surfaces_in_envelope() {
    let mock = MockSimplyBook::start().await;
    mock.state.omit_token(true);
    let (session, registry) = mock.registry(TTL);

    let envelope = registry.call("get_services", args(json!({}))).await.unwrap();
    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert!(error.starts_with(AUTH_FAILED_MESSAGE), "{error}");
    assert!(error.contains("Malformed SimplyBook response"), "{error}");
    assert!(!session.is_authenticated());
    assert_eq!(mock.state.api_calls(), 0);
}

#[tokio::test]
async fn test_upstream_error_message_surfaces_in_envelope() {
    let mock = MockSimplyBook::start().await;
    mock.state.fail_with(StatusCode::NOT_FOUND, "Booking not found");
    let (session, registry) = mock.registry(TTL);

    let envelope = registry
        .call("get_booking", args(json!({"id": 7})))
        .await
        .unwrap();
    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert!(error.starts_with("get_booking failed:"), "{error}");
    assert!(error.contains("Booking not found"), "{error}");
    assert!(error.contains("404"), "{error}");

    // Non-401 failures leave the session alone.
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_revoked_token_reauthenticates_on_next_call() {
    let mock = MockSimplyBook::start().await;
    let (session, registry) = mock.registry(TTL);

    assert!(registry.call("get_coupons", args(json!({}))).await.unwrap().success);
    mock.state.revoke_token();

    let envelope = registry.call("get_coupons", args(json!({}))).await.unwrap();
    assert!(!envelope.success);
    assert!(envelope.error.unwrap().contains("Token expired"));
    assert!(!session.is_authenticated());

    let envelope = registry.call("get_coupons", args(json!({}))).await.unwrap();
    assert!(envelope.success);
    assert_eq!(mock.state.auth_calls(), 2);
    assert_eq!(session.get_auth_headers().token(), Some("token-2"));
}

#[tokio::test]
async fn test_expired_ttl_reauthenticates() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(Duration::from_millis(100));

    assert!(registry.call("get_locations", args(json!({}))).await.unwrap().success);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(registry.call("get_locations", args(json!({}))).await.unwrap().success);

    assert_eq!(mock.state.auth_calls(), 2);
    assert_eq!(mock.state.current_token().as_deref(), Some("token-2"));
}

#[tokio::test]
async fn test_invalid_arguments_make_no_requests() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call("get_booking", args(json!({"id": {"nested": 1}})))
        .await
        .unwrap();
    assert!(!envelope.success);
    assert!(envelope
        .error
        .unwrap()
        .starts_with("Invalid arguments for get_booking"));

    let envelope = registry.call("create_booking", None).await.unwrap();
    assert!(!envelope.success);

    assert_eq!(mock.state.auth_calls(), 0);
    assert_eq!(mock.state.api_calls(), 0);
}

#[tokio::test]
async fn test_string_ids_are_accepted() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call("get_booking", args(json!({"id": "7"})))
        .await
        .unwrap();
    assert!(envelope.success, "{:?}", envelope.error);
    assert_eq!(mock.state.last_request().unwrap().path, "/admin/bookings/7");

    let envelope = registry
        .call(
            "create_booking",
            args(json!({
                "service_id": "1",
                "provider_id": "2",
                "client_id": 3,
                "start_datetime": "2026-03-01 10:00:00"
            })),
        )
        .await
        .unwrap();
    assert!(envelope.success, "{:?}", envelope.error);
    let body = mock.state.last_request().unwrap().body.unwrap();
    assert_eq!(body["service_id"], "1");
    assert_eq!(body["client_id"], 3);

    registry
        .call("get_invoices", args(json!({"client_id": "12"})))
        .await
        .unwrap();
    let request = mock.state.last_request().unwrap();
    assert_eq!(request.query, vec![pair("filter[client_id]", "12")]);
}

#[tokio::test]
async fn test_booking_filters_become_query_pairs() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call(
            "get_bookings",
            args(json!({
                "status": "confirmed",
                "upcoming_only": true,
                "services": ["3", "4"],
                "date_from": "2026-03-01",
                "page": 2,
                "on_page": 5
            })),
        )
        .await
        .unwrap();
    assert!(envelope.success);

    let request = mock.state.last_request().unwrap();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/admin/bookings");
    for expected in [
        pair("filter[status]", "confirmed"),
        pair("filter[upcoming_only]", "1"),
        pair("filter[services][]", "3"),
        pair("filter[services][]", "4"),
        pair("filter[date_from]", "2026-03-01"),
        pair("page", "2"),
        pair("on_page", "5"),
    ] {
        assert!(request.query.contains(&expected), "missing {expected:?}");
    }
    assert_eq!(request.query.len(), 7);
}

#[tokio::test]
async fn test_additional_fields_optional_service_filter() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    registry
        .call("get_additional_fields", args(json!({})))
        .await
        .unwrap();
    let request = mock.state.last_request().unwrap();
    assert_eq!(request.path, "/admin/additional-fields");
    assert!(request.query.is_empty());

    registry
        .call("get_additional_fields", args(json!({"service_id": "9"})))
        .await
        .unwrap();
    let request = mock.state.last_request().unwrap();
    assert_eq!(request.query, vec![pair("filter[service_id]", "9")]);
}

#[tokio::test]
async fn test_create_booking_posts_only_given_fields() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call(
            "create_booking",
            args(json!({
                "service_id": 1,
                "provider_id": 2,
                "client_id": 3,
                "start_datetime": "2026-03-01 10:00:00",
                "additional_fields": [{"field": "abc123", "value": "Email"}]
            })),
        )
        .await
        .unwrap();
    assert!(envelope.success);

    let request = mock.state.last_request().unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/admin/bookings");
    assert_eq!(
        request.body.unwrap(),
        json!({
            "service_id": 1,
            "provider_id": 2,
            "client_id": 3,
            "start_datetime": "2026-03-01 10:00:00",
            "additional_fields": [{"field": "abc123", "value": "Email"}]
        })
    );
}

#[tokio::test]
async fn test_cancel_booking_with_empty_body() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    let envelope = registry
        .call("cancel_booking", args(json!({"id": 5})))
        .await
        .unwrap();
    assert_eq!(envelope.to_value(), json!({"success": true, "result": null}));

    let request = mock.state.last_request().unwrap();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "/admin/bookings/5");
}

#[tokio::test]
async fn test_accept_payment_defaults_processor() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    registry
        .call("accept_payment", args(json!({"id": 30})))
        .await
        .unwrap();
    let request = mock.state.last_request().unwrap();
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/admin/invoices/30/accept-payment");
    assert_eq!(request.body.unwrap(), json!({"payment_processor": "manual"}));
}

#[tokio::test]
async fn test_ticket_code_is_path_encoded() {
    let mock = MockSimplyBook::start().await;
    let (_, registry) = mock.registry(TTL);

    registry
        .call("get_ticket", args(json!({"code": "A/1"})))
        .await
        .unwrap();
    let request = mock.state.last_request().unwrap();
    assert_eq!(request.path, "/admin/tickets/A%2F1");
}
