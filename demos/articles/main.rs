//! Article API served by a generated CRUD router
//!
//! This example demonstrates:
//! - Loading router settings from YAML
//! - A before-hook guarding writes behind an `X-USERNAME` header
//! - After-hooks on `read` counting views and hiding a field
//! - Mounting the generated router under `/articles`

use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use crudify::prelude::*;

const SETTINGS: &str = r#"
identifying_key: _id
sanitise_body:
  whitelist_keys: "+title,body"
suppress: [deleteAll]
"#;

fn ensure_login() -> SharedMiddleware {
    from_fn(|ctx: RequestContext| async move {
        if ctx.header("x-username") != Some("ryo") {
            tracing::info!(uri = %ctx.uri, "rejected anonymous write");
            return Flow::respond(StatusCode::UNAUTHORIZED);
        }
        Flow::Next(ctx)
    })
}

fn update_view_count(model: InMemoryModel) -> SharedMiddleware {
    from_fn(move |mut ctx: RequestContext| {
        let model = model.clone();
        async move {
            if let Some(ResultEnvelope {
                error: None,
                payload: Some(Value::Object(article)),
            }) = ctx.envelope_mut()
            {
                let views = article.get("views").and_then(Value::as_i64).unwrap_or(0);
                article.insert("views".to_string(), json!(views + 1));
                if let Err(err) = model.save(article.clone()).await {
                    tracing::warn!(error = %err, "failed to store view count");
                }
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

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,crudify=debug")),
        )
        .init();

    let settings = CrudSettings::from_yaml_str(SETTINGS)?;
    let model = InMemoryModel::new()
        .with_required("title")
        .with_default("views", json!(0))
        .with_default("secret", json!("some secret"));

    let articles = CrudBuilder::from_settings(settings)
        .with_model(model.clone())
        .before(HookDeclaration::new(vec![ensure_login()]).except([Action::List, Action::Read]))
        .after(
            HookDeclaration::new(vec![update_view_count(model), hide_fields()])
                .only([Action::Read]),
        )
        .build()?;

    println!("📖 Available endpoints:");
    for route in &articles.routes {
        println!("   {:<6} /articles{}  ({})", route.method.as_str(), route.path, route.action);
    }
    println!();

    let app = articles
        .mount("/articles")
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("🌐 Server listening on http://{addr}");
    println!("   curl -H 'X-USERNAME: ryo' -H 'Content-Type: application/json' \\");
    println!("        -d '{{\"title\":\"hello\"}}' http://{addr}/articles");

    axum::serve(listener, app).await?;

    Ok(())
}
