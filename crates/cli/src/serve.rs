//! Adapter construction and the HTTP server loop.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use gcloud::{
    ApplicationDefaultCredentials, ArtifactRegistryImages, BigQueryEventStore, PubSubTopicAdmin,
    TableId,
};
use handlers::{EventHandler, KueueDispatch, ServiceRegistry, TopicSweeper};
use kueue::KueueDispatcher;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{EventHandlerArgs, HelperArgs, ServiceRegistryArgs};

pub async fn event_handler(args: EventHandlerArgs) -> Result<Router> {
    let credentials = ApplicationDefaultCredentials::discover().await?;

    let default_project = match &args.project_id {
        Some(project) => Some(project.clone()),
        None => match credentials.project_id().await {
            Ok(project) => Some(project),
            Err(error) => {
                warn!(%error, "Credentials carry no project; the events table must name one.");
                None
            }
        },
    };
    let table = TableId::parse(&args.events_table, default_project.as_deref())?;
    let store = BigQueryEventStore::new(table, Arc::new(credentials))?;
    info!(table = %store.table(), "Event store configured.");

    let mut handler = EventHandler::new(Arc::new(store));

    match args.job_settings()? {
        Some(settings) => {
            let dispatcher = KueueDispatcher::connect(args.kube_context.as_deref(), &args.namespace)
                .await
                .context("failed to connect to the Kubernetes cluster")?;
            info!(
                namespace = dispatcher.namespace(),
                context = args.kube_context.as_deref(),
                queue = %settings.queue_name,
                "Kueue dispatch enabled."
            );
            handler = handler.with_dispatch(KueueDispatch {
                dispatcher: Arc::new(dispatcher),
                settings,
            });
        }
        None => warn!("Kueue dispatch disabled; questions will only be stored."),
    }

    Ok(listener::event_handler_router(Arc::new(handler)))
}

pub async fn helper(args: HelperArgs) -> Result<Router> {
    let credentials = ApplicationDefaultCredentials::discover().await?;
    let topics = PubSubTopicAdmin::new(&args.project_id, Arc::new(credentials))?;
    let policy = args.sweep_policy();

    info!(
        project = %args.project_id,
        retention_seconds = policy.retention.as_secs_f64(),
        legacy_action = %policy.legacy_action,
        "Topic sweeper configured."
    );

    Ok(listener::helper_router(Arc::new(TopicSweeper::new(
        Arc::new(topics),
        policy,
    ))))
}

pub async fn service_registry(args: ServiceRegistryArgs) -> Result<Router> {
    let credentials = ApplicationDefaultCredentials::discover().await?;
    let images = ArtifactRegistryImages::new(&args.repository_id, Arc::new(credentials))?;
    info!(repository = %args.repository_id, "Service registry configured.");

    Ok(listener::service_registry_router(Arc::new(ServiceRegistry::new(
        Arc::new(images),
    ))))
}

/// Serves `router` until SIGINT or SIGTERM.
pub async fn run(router: Router, port: u16, function: &'static str) -> Result<()> {
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    info!(%address, function, "Listening.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "Failed to listen for Ctrl-C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
