//! Events demo binary
//!
//! Mounts the events and disclaimer pages against the live CMS, switches the
//! language, and shows which endpoint is refetched.

use endpoint_store_core::environment::{Clock, HttpClient, SystemClock};
use endpoint_store_runtime::metrics::MetricsRecorder;
use endpoint_store_runtime::{
    EndpointContext, FetcherBuilder, HttpConfig, Injected, Render, ReqwestClient,
};
use events_demo::{AppAction, AppState, Disclaimer, Event, RouteParams, app_store, registry, route_params};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_API_BASE: &str = "https://cms.integreat-app.de";

fn event_list(props: Injected<'_, Vec<Event>>) -> String {
    let mut out = format!("{} ({} upcoming)", props.name, props.data.len());
    for event in props.data.iter().take(5) {
        out.push_str(&format!("\n    {} | {}", event.date.start.format("%Y-%m-%d %H:%M"), event.title));
    }
    out
}

fn disclaimer_page(props: Injected<'_, Disclaimer>) -> String {
    format!("{}: {}", props.name, props.data.title)
}

fn show(label: &str, render: Render<String>) {
    match render {
        Render::Content(view) | Render::Failure(view) => println!("  [{label}] {view}"),
        Render::Error(message) => println!("  [{label}] failed: {message}"),
        Render::Loading => println!("  [{label}] loading..."),
        Render::Nothing => println!("  [{label}] (nothing)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "events_demo=debug,endpoint_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsRecorder::new();
    metrics.install()?;

    println!("=== Events Demo: endpoint-store ===\n");

    let base_url = std::env::var("EVENTS_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&HttpConfig::from_env())?);
    let context = EndpointContext::new(
        Arc::new(registry(&base_url, Arc::clone(&clock))?),
        http,
        clock,
    );

    let store = app_store(AppState::new(RouteParams::new("augsburg", "de")));

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&updates);
    let _subscription = store.subscribe(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let mut events = FetcherBuilder::<RouteParams, String>::new("events")
        .failure_component(|message| format!("Could not load events: {message}"))
        .with_context(context.clone())
        .mount(store.clone(), route_params)?;
    let mut disclaimer = FetcherBuilder::<RouteParams, String>::new("disclaimer")
        .hide_spinner(true)
        .with_context(context)
        .mount(store.clone(), route_params)?;

    println!(">>> Mount at augsburg/de");
    let mut pending = vec![events.update().await?, disclaimer.update().await?];
    show("events", events.render(event_list).await?);
    show("disclaimer", disclaimer.render(disclaimer_page).await?);
    for evaluation in &mut pending {
        evaluation.wait().await;
    }
    show("events", events.render(event_list).await?);
    show("disclaimer", disclaimer.render(disclaimer_page).await?);

    println!("\n>>> Navigate to augsburg/en");
    store
        .send(AppAction::Navigate(RouteParams::new("augsburg", "en")))
        .await?;
    let mut pending = vec![events.update().await?, disclaimer.update().await?];
    for evaluation in &pending {
        println!("  decision: {:?}", evaluation.decision);
    }
    for evaluation in &mut pending {
        evaluation.wait().await;
    }
    show("events", events.render(event_list).await?);
    show("disclaimer", disclaimer.render(disclaimer_page).await?);

    store.shutdown_default().await?;

    println!("\nStore updates observed: {}", updates.load(Ordering::Relaxed));
    if let Some(text) = metrics.render() {
        println!("\n--- metrics ---\n{text}");
    }

    Ok(())
}
