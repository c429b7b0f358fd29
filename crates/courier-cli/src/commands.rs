//! Command implementations
//!
//! Both commands run the engine against the in-memory collaborators from
//! `courier_runtime::memory`, so they need no external services.

use std::sync::Arc;

use courier_core::{AckEnvelope, NewMessage};
use courier_runtime::memory::{
    InMemoryMessageStore, InMemorySessionRegistry, InMemoryUserDirectory,
};
use courier_runtime::{MessageService, TrackerStats};
use futures::future::join_all;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// In-memory Deployment
// ----------------------------------------------------------------------------

struct Deployment {
    service: MessageService,
    users: Arc<InMemoryUserDirectory>,
    sessions: Arc<InMemorySessionRegistry>,
    store: Arc<InMemoryMessageStore>,
}

impl Deployment {
    fn new(config: &AppConfig) -> Result<Self> {
        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());

        let service = MessageService::builder(users.clone(), sessions.clone(), store.clone())
            .with_config(config.delivery.clone())
            .build()?;

        Ok(Self {
            service,
            users,
            sessions,
            store,
        })
    }
}

// ----------------------------------------------------------------------------
// Command Dispatcher
// ----------------------------------------------------------------------------

pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Run the parsed command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Demo { recipient } => {
                let recipient = recipient.unwrap_or_else(|| config.cli.demo_recipient.clone());
                run_demo(&config, &recipient).await
            }
            Commands::Load {
                recipients,
                messages,
            } => run_load(&config, recipients, messages).await,
        }
    }
}

// ----------------------------------------------------------------------------
// Demo
// ----------------------------------------------------------------------------

async fn run_demo(config: &AppConfig, recipient: &str) -> Result<()> {
    let deployment = Deployment::new(config)?;
    let service = &deployment.service;
    let user = deployment.users.register(recipient);

    let outcome = service
        .send_message(NewMessage::new("nobody", "Hi", "hello"))
        .await?;
    println!("send to unknown recipient: {:?}", outcome);

    let outcome = service
        .send_message(NewMessage::new(recipient, "Hi", "hello"))
        .await?;
    println!("send while {} is offline: {:?}", recipient, outcome);

    let mut inbox = deployment.sessions.connect(&user);
    let summary = service.on_recipient_connected(&user).await?;
    println!(
        "{} connected, replayed {} message(s)",
        recipient,
        summary.replayed()
    );

    let push = inbox
        .recv()
        .await
        .ok_or_else(|| CliError::Config("session closed before replay arrived".to_string()))?;
    println!(
        "{} received push id={} type={} title={:?} content={:?}",
        recipient, push.id, push.kind, push.title, push.content
    );

    let ack = AckEnvelope::for_push(&push);
    println!("first ack: {:?}", service.handle_ack(&ack).await?);
    println!("duplicate ack: {:?}", service.handle_ack(&ack).await?);

    print_stats(
        &service.tracker_stats(),
        deployment.store.confirmed_count().await,
    );
    Ok(())
}

// ----------------------------------------------------------------------------
// Load
// ----------------------------------------------------------------------------

async fn run_load(config: &AppConfig, recipients: usize, messages: usize) -> Result<()> {
    let deployment = Deployment::new(config)?;
    info!(recipients, messages, "Starting load run");

    // One acking client per recipient
    let mut clients = Vec::with_capacity(recipients);
    for i in 0..recipients {
        let user = deployment.users.register(format!("user-{}", i));
        let mut inbox = deployment.sessions.connect(&user);
        let service = deployment.service.clone();
        clients.push(tokio::spawn(async move {
            let mut acked = 0usize;
            while acked < messages {
                let Some(push) = inbox.recv().await else {
                    break;
                };
                service.handle_ack(&AckEnvelope::for_push(&push)).await?;
                acked += 1;
            }
            Ok::<usize, courier_core::CourierError>(acked)
        }));
    }

    let sends = (0..recipients).flat_map(|i| {
        let deployment = &deployment;
        (0..messages).map(move |n| {
            let service = deployment.service.clone();
            tokio::spawn(async move {
                service
                    .send_message(NewMessage::new(
                        format!("user-{}", i),
                        format!("message {}", n),
                        "load",
                    ))
                    .await
            })
        })
    });
    for joined in join_all(sends).await {
        joined??;
    }

    let mut acked = 0usize;
    for joined in join_all(clients).await {
        acked += joined??;
    }

    println!("acknowledged {} push(es)", acked);
    print_stats(
        &deployment.service.tracker_stats(),
        deployment.store.confirmed_count().await,
    );
    Ok(())
}

fn print_stats(stats: &TrackerStats, confirmed: usize) {
    println!(
        "tracker: live={} registered={} retired={} purged={} ack_rate={:.2}",
        stats.live,
        stats.registered,
        stats.retired,
        stats.purged,
        stats.ack_rate()
    );
    println!("confirmed messages: {}", confirmed);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
