//! HTTP-level tests for generated CRUD routers
//!
//! Each test mounts a generated router under a prefix and drives it through
//! axum-test, checking status codes and the `{error, payload}` bodies.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use crudify::prelude::*;

fn articles_model() -> InMemoryModel {
    InMemoryModel::new()
        .with_required("title")
        .with_default("views", json!(0))
        .with_default("secret", json!("some secret"))
}

fn mount(prefix: &str, built: Crudified) -> TestServer {
    TestServer::new(built.mount(prefix))
}

fn username() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-username"),
        HeaderValue::from_static("ryo"),
    )
}

// =============================================================================
// Article flow with hooks
// =============================================================================

mod article_flow {
    use super::*;

    fn ensure_login() -> SharedMiddleware {
        from_fn(|ctx: RequestContext| async move {
            if ctx.header("x-username") != Some("ryo") {
                return Flow::respond(StatusCode::UNAUTHORIZED);
            }
            Flow::Next(ctx)
        })
    }

    fn update_view_count(model: InMemoryModel) -> SharedMiddleware {
        from_fn(move |mut ctx: RequestContext| {
            let model = model.clone();
            async move {
                let Some(envelope) = ctx.envelope_mut() else {
                    return Flow::respond(StatusCode::INTERNAL_SERVER_ERROR);
                };
                if envelope.is_err() {
                    return Flow::json(json!({ "error": "woops" }));
                }
                let Some(Value::Object(article)) = envelope.payload.as_mut() else {
                    return Flow::json(json!({ "payload": null }));
                };

                let views = article.get("views").and_then(Value::as_i64).unwrap_or(0);
                article.insert("views".to_string(), json!(views + 1));
                if model.save(article.clone()).await.is_err() {
                    return Flow::json(json!({ "error": "woops" }));
                }

                Flow::Next(ctx)
            }
        })
    }

    fn hide_fields() -> SharedMiddleware {
        from_fn(|mut ctx: RequestContext| async move {
            let mut envelope = ctx.take_envelope().unwrap_or_default();
            if let Some(Value::Object(article)) = envelope.payload.as_mut() {
                article.remove("secret");
            }
            Flow::respond(envelope)
        })
    }

    fn server() -> (TestServer, InMemoryModel) {
        let model = articles_model();
        let built = CrudBuilder::new()
            .with_model(model.clone())
            .before(HookDeclaration::new(vec![ensure_login()]).except([Action::List, Action::Read]))
            .after(
                HookDeclaration::new(vec![update_view_count(model.clone()), hide_fields()])
                    .only([Action::Read]),
            )
            .build()
            .unwrap();

        (mount("/articles", built), model)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (server, model) = server();
        let (name, value) = username();

        let response = server.get("/articles").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "payload": [] }));

        let response = server
            .post("/articles")
            .json(&json!({ "title": "title1" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(model.count().unwrap(), 0);

        let response = server
            .post("/articles")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": "title1" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body.get("error").is_none());
        let id = body["payload"]["_id"].as_str().unwrap().to_string();

        let body: Value = server.get(&format!("/articles/{id}")).await.json();
        assert_eq!(body["payload"]["_id"], id.as_str());
        assert_eq!(body["payload"]["views"], 1);

        let body: Value = server.get(&format!("/articles/{id}")).await.json();
        assert_eq!(body["payload"]["views"], 2);
        assert!(body["payload"].get("secret").is_none());

        let body: Value = server.get("/articles").await.json();
        assert_eq!(body["payload"].as_array().unwrap().len(), 1);

        let response = server
            .put(&format!("/articles/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": "changed" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["payload"]["title"], "changed");
        assert_eq!(body["payload"]["views"], 2);

        let response = server
            .delete(&format!("/articles/{id}"))
            .add_header(name, value)
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({}));

        let body: Value = server.get("/articles").await.json();
        assert_eq!(body["payload"], json!([]));
    }

    #[tokio::test]
    async fn test_read_missing_passes_null_to_hooks() {
        let (server, _model) = server();

        let response = server.get("/articles/nope").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "payload": null }));
    }

    #[tokio::test]
    async fn test_model_errors_reach_the_body() {
        let (server, _model) = server();
        let (name, value) = username();

        let response = server
            .post("/articles")
            .add_header(name, value)
            .json(&json!({ "body": "no title" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body.get("payload").is_none());
    }
}

// =============================================================================
// Body whitelisting
// =============================================================================

mod whitelisting {
    use super::*;

    fn server() -> (TestServer, InMemoryModel) {
        let model = InMemoryModel::new();
        let built = CrudBuilder::new()
            .with_model(model.clone())
            .sanitise_body("+title,body")
            .build()
            .unwrap();
        (mount("/articles", built), model)
    }

    #[tokio::test]
    async fn test_missing_required_key_is_rejected() {
        let (server, model) = server();

        let response = server
            .post("/articles")
            .json(&json!({ "body": "text" }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "error": { "required": ["title"], "invalid": [] } }));
        assert_eq!(model.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_required_key_is_rejected() {
        let (server, model) = server();

        let body: Value = server
            .post("/articles")
            .json(&json!({ "title": "   " }))
            .await
            .json();
        assert_eq!(body["error"]["required"], json!(["title"]));
        assert_eq!(model.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unlisted_keys_are_dropped() {
        let (server, _model) = server();

        let body: Value = server
            .post("/articles")
            .json(&json!({ "title": "t", "body": "b", "admin": true }))
            .await
            .json();
        assert_eq!(body["payload"]["title"], "t");
        assert_eq!(body["payload"]["body"], "b");
        assert!(body["payload"].get("admin").is_none());
    }

    #[tokio::test]
    async fn test_update_is_whitelisted_too() {
        let (server, model) = server();
        let created = model
            .insert(json!({ "_id": "a1", "title": "t" }).as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(created["_id"], "a1");

        let body: Value = server
            .put("/articles/a1")
            .json(&json!({ "title": "new", "admin": true }))
            .await
            .json();
        assert_eq!(body["payload"]["title"], "new");
        assert!(body["payload"].get("admin").is_none());
    }
}

mod empty_whitelist {
    use super::*;

    #[tokio::test]
    async fn test_blank_whitelist_keeps_body() {
        let settings = CrudSettings::from_yaml_str("sanitise_body:\n  whitelist_keys: \"\"").unwrap();
        let built = CrudBuilder::from_settings(settings)
            .with_model(InMemoryModel::new())
            .build()
            .unwrap();
        let server = mount("/articles", built);

        let body: Value = server
            .post("/articles")
            .json(&json!({ "title": "t", "body": "b" }))
            .await
            .json();
        assert_eq!(body["payload"]["title"], "t");
        assert_eq!(body["payload"]["body"], "b");
    }
}

// =============================================================================
// Updates
// =============================================================================

mod updates {
    use super::*;

    #[tokio::test]
    async fn test_body_cannot_move_record_to_another_id() {
        let model = InMemoryModel::new();
        model
            .insert(json!({ "_id": "a1", "title": "t" }).as_object().unwrap().clone())
            .await
            .unwrap();
        let built = CrudBuilder::new()
            .with_model(model.clone())
            .build()
            .unwrap();
        let server = mount("/articles", built);

        let body: Value = server
            .put("/articles/a1")
            .json(&json!({ "_id": "b2", "title": "x" }))
            .await
            .json();
        assert_eq!(body["payload"], json!({ "_id": "a1", "title": "x" }));
        assert_eq!(model.count().unwrap(), 1);

        let stored = model.find_by_id("a1", None).await.unwrap().unwrap();
        assert_eq!(stored["title"], "x");
    }
}

// =============================================================================
// Overrides
// =============================================================================

mod overrides {
    use super::*;

    #[tokio::test]
    async fn test_suppressed_action_is_not_routed() {
        let model = InMemoryModel::new();
        model
            .insert(json!({ "_id": "a1" }).as_object().unwrap().clone())
            .await
            .unwrap();
        let built = CrudBuilder::new()
            .with_model(model.clone())
            .suppress([Action::Delete])
            .build()
            .unwrap();
        let server = mount("/articles", built);

        let response = server.delete("/articles/a1").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(model.count().unwrap(), 1);

        server.get("/articles/a1").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_replaced_handler_runs_between_hooks() {
        let stamp = from_fn(|mut ctx: RequestContext| async move {
            ctx.set_envelope(ResultEnvelope::ok(json!("before")));
            Flow::Next(ctx)
        });
        let replacement = from_fn(|ctx: RequestContext| async move {
            let seen = ctx
                .envelope()
                .and_then(|e| e.payload.clone())
                .unwrap_or(Value::Null);
            Flow::json(json!({ "payload": { "custom": true, "seen": seen } }))
        });

        let built = CrudBuilder::new()
            .with_model(InMemoryModel::new())
            .replace(Action::List, replacement)
            .before(HookDeclaration::new(vec![stamp]).only([Action::List]))
            .build()
            .unwrap();
        let server = mount("/articles", built);

        let body: Value = server.get("/articles").await.json();
        assert_eq!(body, json!({ "payload": { "custom": true, "seen": "before" } }));
    }
}

// =============================================================================
// Result passing
// =============================================================================

mod result_passing {
    use super::*;

    #[tokio::test]
    async fn test_handle_result_without_after_hooks_falls_through() {
        let built = CrudBuilder::new()
            .with_model(InMemoryModel::new())
            .handle_result_for([Action::List])
            .build()
            .unwrap();
        let server = mount("/articles", built);

        server
            .get("/articles")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server.delete("/articles").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_after_hook_sees_envelope() {
        let respond = from_fn(|mut ctx: RequestContext| async move {
            let envelope = ctx.take_envelope().unwrap_or_default();
            Flow::json(json!({ "wrapped": envelope }))
        });
        let built = CrudBuilder::new()
            .with_model(InMemoryModel::new())
            .after(HookDeclaration::new(vec![respond]).only([Action::Create]))
            .build()
            .unwrap();
        let server = mount("/articles", built);

        let body: Value = server
            .post("/articles")
            .json(&json!({ "title": "t" }))
            .await
            .json();
        assert_eq!(body["wrapped"]["payload"]["title"], "t");
    }
}

// =============================================================================
// Request handling
// =============================================================================

mod requests {
    use super::*;

    async fn seeded() -> (TestServer, InMemoryModel) {
        let model = articles_model();
        for (id, tag) in [("a1", "rust"), ("a2", "js"), ("a3", "rust")] {
            model
                .insert(
                    json!({ "_id": id, "title": id, "tag": tag })
                        .as_object()
                        .unwrap()
                        .clone(),
                )
                .await
                .unwrap();
        }
        let built = CrudBuilder::new()
            .with_model(model.clone())
            .select_fields("-secret")
            .build()
            .unwrap();
        (mount("/articles", built), model)
    }

    #[tokio::test]
    async fn test_list_filters_by_query() {
        let (server, _model) = seeded().await;

        let body: Value = server.get("/articles").add_query_param("tag", "rust").await.json();
        let ids: Vec<_> = body["payload"]
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[tokio::test]
    async fn test_select_fields_hides_secret() {
        let (server, _model) = seeded().await;

        let body: Value = server.get("/articles").await.json();
        assert!(body["payload"][0].get("secret").is_none());

        let body: Value = server.get("/articles/a2").await.json();
        assert_eq!(body["payload"]["tag"], "js");
        assert!(body["payload"].get("secret").is_none());
    }

    #[tokio::test]
    async fn test_delete_all_respects_conditions() {
        let (server, model) = seeded().await;

        let response = server.delete("/articles").add_query_param("tag", "rust").await;
        response.assert_json(&json!({}));
        assert_eq!(model.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let (server, model) = seeded().await;

        let response = server
            .post("/articles")
            .text("{oops")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "INVALID_JSON");
        assert_eq!(model.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trailing_slash_when_not_strict() {
        let (server, _model) = seeded().await;

        let body: Value = server.get("/articles/a1/").await.json();
        assert_eq!(body["payload"]["_id"], "a1");
    }

    #[tokio::test]
    async fn test_collection_trailing_slash_when_not_strict() {
        let (server, model) = seeded().await;

        let body: Value = server.get("/articles/").await.json();
        assert_eq!(body["payload"].as_array().unwrap().len(), 3);

        let body: Value = server
            .post("/articles/")
            .json(&json!({ "title": "slashed" }))
            .await
            .json();
        assert_eq!(body["payload"]["title"], "slashed");

        server
            .delete("/articles/")
            .await
            .assert_json(&json!({}));
        assert_eq!(model.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_strict_rejects_trailing_slash() {
        let built = CrudBuilder::new()
            .with_model(InMemoryModel::new())
            .router_options(RouterOptions {
                strict: true,
                ..RouterOptions::default()
            })
            .build()
            .unwrap();
        let server = mount("/articles", built);

        server
            .get("/articles/a1/")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/articles/")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Nested routers
// =============================================================================

mod nesting {
    use super::*;

    async fn server(merge_params: bool) -> TestServer {
        let model = InMemoryModel::new();
        for (id, user) in [("a1", "u1"), ("a2", "u2")] {
            model
                .insert(json!({ "_id": id, "user_id": user }).as_object().unwrap().clone())
                .await
                .unwrap();
        }
        let built = CrudBuilder::new()
            .with_model(model)
            .router_options(RouterOptions {
                merge_params,
                ..RouterOptions::default()
            })
            .build()
            .unwrap();
        mount("/users/{user_id}/articles", built)
    }

    #[tokio::test]
    async fn test_parent_params_hidden_by_default() {
        let server = server(false).await;

        let body: Value = server.get("/users/u1/articles").await.json();
        assert_eq!(body["payload"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_merged_params_become_conditions() {
        let server = server(true).await;

        let body: Value = server.get("/users/u1/articles").await.json();
        let docs = body["payload"].as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["_id"], "a1");
    }
}
