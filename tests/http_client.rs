//! Tests for the HTTP resource client against a mock SGM API.

#![cfg(feature = "http")]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sgm_workflow::{
    AllowAll, HttpResourceClient, ResourceClient, SgmError, StockItem, StockItemStatus,
    TransitionController, WorkflowRecord, WorkflowState,
};

fn client_for(server: &MockServer, token: Option<&str>) -> HttpResourceClient {
    HttpResourceClient::new(
        &format!("{}/api/", server.uri()),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/estoque"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status_estoque": "Disponivel"},
            {"id": 2, "status_estoque": "Reservado"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("t0k3n"));
    let items = client.list("estoque").await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["status_estoque"], "Reservado");
}

#[tokio::test]
async fn test_wrapped_list_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analises-quimicas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "analises": [{"id": 5, "status_analise": "Coletada"}]
        })))
        .mount(&server)
        .await;

    let items = client_for(&server, None)
        .list("analises-quimicas")
        .await
        .unwrap();
    assert_eq!(items, vec![json!({"id": 5, "status_analise": "Coletada"})]);
}

#[tokio::test]
async fn test_transition_posts_to_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/estoque/1/reservar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client_for(&server, None)
        .apply_transition("estoque", "1", "reservar")
        .await
        .unwrap();
    assert_eq!(body["message"], "ok");
}

#[tokio::test]
async fn test_text_id_stays_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/estoque/EQ%2F07/reservar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None)
        .apply_transition("estoque", "EQ/07", "reservar")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_key_wins_over_other_arrays() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/estoque"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alertas": [{"tipo": "garantia"}],
            "itens": [{"id": 1, "status_estoque": "Disponivel"}]
        })))
        .mount(&server)
        .await;

    let items = client_for(&server, None).list("estoque").await.unwrap();
    assert_eq!(items, vec![json!({"id": 1, "status_estoque": "Disponivel"})]);
}

#[tokio::test]
async fn test_create_update_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/usuarios"))
        .and(body_json(json!({"nome": "Ana"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9, "nome": "Ana"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/usuarios/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9, "nome": "Ana M."})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/usuarios/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let created = client.create("usuarios", &json!({"nome": "Ana"})).await.unwrap();
    assert_eq!(created["id"], 9);

    let updated = client
        .update("usuarios", "9", &json!({"nome": "Ana M."}))
        .await
        .unwrap();
    assert_eq!(updated["nome"], "Ana M.");

    client.delete("usuarios", "9").await.unwrap();
}

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/estoque/99/reservar"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .apply_transition("estoque", "99", "reservar")
        .await
        .unwrap_err();
    assert!(matches!(err, SgmError::NotFound(ref p) if p == "/api/estoque/99/reservar"));
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/controle-mudancas/3/aprovada-nivel-2"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Aprovação nível 1 ausente"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .apply_transition("controle-mudancas", "3", "aprovada-nivel-2")
        .await
        .unwrap_err();
    match err {
        SgmError::RequestFailed { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Aprovação nível 1 ausente");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let client =
        HttpResourceClient::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
    let err = client.list("estoque").await.unwrap_err();
    assert!(matches!(err, SgmError::Network(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_controller_over_http_refetches_after_transition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/estoque"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "status_estoque": "Disponivel"}])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/estoque"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "status_estoque": "Reservado"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/estoque/1/reservar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Reservado"})))
        .expect(1)
        .mount(&server)
        .await;

    let controller = TransitionController::new(client_for(&server, Some("abc")), AllowAll);
    let item = controller.refresh::<StockItem>().await.unwrap().remove(0);
    assert_eq!(item.state(), StockItemStatus::Available);

    let item = controller
        .transition(&item, StockItemStatus::Reserved)
        .await
        .unwrap();
    assert_eq!(item.state(), StockItemStatus::Reserved);
    assert_eq!(StockItemStatus::definition().unwrap().successors(item.state()), vec![StockItemStatus::Available]);
}
