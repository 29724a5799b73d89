//! Replays recorded gateway traffic through the component dispatcher.
//!
//! Reads one JSON gateway envelope per line from the file named on the
//! command line (or stdin), dispatches it, and answers every component
//! interaction that comes out: button presses get an ephemeral
//! acknowledgement, selections get a reply listing the chosen values.
//!
//! With `DISCORD_TOKEN` and `DISCORD_APPLICATION_ID` set (a `.env` file works
//! too), the answers go to Discord. Otherwise the requests are only logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use discord_components::dispatch::{ComponentEvent, Dispatcher};
use discord_components::http::{
    DiscordHttpClient, HttpConfig, HttpError, RequestBody, Route, SharedTransport, Transport,
};
use discord_components::payload::{MessagePayload, PayloadBuilder};
use discord_components::types::{AllowedMentions, GatewayPayload};
use discord_components::InteractionError;

/// Logs every request instead of sending it.
struct DryRunTransport {
    next_id: AtomicU64,
}

impl DryRunTransport {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn request(&self, route: Route, body: RequestBody) -> Result<Option<Value>, HttpError> {
        info!(
            %route,
            body = %body.json.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            files = body.files.len(),
            "dry run"
        );
        match route {
            Route::CreateFollowUp { .. } | Route::CreateMessage { .. } => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let mut message = body.json.unwrap_or_else(|| json!({}));
                if let Some(obj) = message.as_object_mut() {
                    obj.insert("id".into(), Value::String(id.to_string()));
                    obj.entry("channel_id").or_insert_with(|| Value::String("0".into()));
                }
                Ok(Some(message))
            }
            _ => Ok(None),
        }
    }
}

fn transport() -> Result<SharedTransport, HttpError> {
    if std::env::var("DISCORD_TOKEN").is_err() {
        warn!("DISCORD_TOKEN not set, requests will only be logged");
        return Ok(Arc::new(DryRunTransport::new()));
    }
    let config = HttpConfig::from_env()?;
    Ok(Arc::new(DiscordHttpClient::new(config)))
}

async fn answer(event: ComponentEvent) -> Result<(), InteractionError> {
    let name = event.name();
    let (reply, mut ctx) = match event {
        ComponentEvent::ButtonPress(ctx) => {
            let reply = MessagePayload::new()
                .content(format!("{} pressed `{}`", ctx.mention(), ctx.custom_id))
                .ephemeral(true);
            (reply, ctx)
        }
        ComponentEvent::Selection(ctx) => {
            let chosen = if ctx.values.is_empty() {
                "nothing".to_string()
            } else {
                ctx.values.join(", ")
            };
            let reply = MessagePayload::new().content(format!("You selected: **{chosen}**"));
            (reply, ctx)
        }
    };
    info!(
        event = name,
        custom_id = %ctx.custom_id,
        member = %ctx.member_id,
        interaction = %ctx.interaction_id,
        "component interaction"
    );

    ctx.respond(reply).await?;
    Ok(())
}

async fn replay<R>(dispatcher: &Dispatcher, events: &async_channel::Receiver<ComponentEvent>, input: R)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut line_no = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let payload: GatewayPayload = match serde_json::from_str(&line) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed envelope");
                continue;
            }
        };

        if !dispatcher.handle(payload).await {
            continue;
        }
        while let Ok(event) = events.try_recv() {
            if let Err(e) = answer(event).await {
                error!(line = line_no, error = %e, "failed to answer interaction");
            }
        }
    }
    info!(lines = line_no, "replay finished");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv::dotenv().ok();

    let transport = match transport() {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let payloads = PayloadBuilder::new().with_allowed_mentions(AllowedMentions::none());
    let (dispatcher, events) = Dispatcher::new(transport, payloads);

    match std::env::args().nth(1) {
        Some(path) => match tokio::fs::File::open(&path).await {
            Ok(file) => replay(&dispatcher, &events, BufReader::new(file)).await,
            Err(e) => {
                error!(path = %path, error = %e, "failed to open input");
                std::process::exit(1);
            }
        },
        None => replay(&dispatcher, &events, BufReader::new(tokio::io::stdin())).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use discord_components::interaction::{InteractionContext, InteractionSource};
    use discord_components::message::{PartialMessage, SourceMessage};
    use discord_components::types::{ComponentType, Id, MessageFlags};

    #[derive(Default)]
    struct Bodies(Mutex<Vec<Value>>);

    #[async_trait]
    impl Transport for Bodies {
        async fn request(&self, _: Route, body: RequestBody) -> Result<Option<Value>, HttpError> {
            self.0.lock().unwrap().extend(body.json);
            Ok(None)
        }
    }

    fn context(transport: Arc<Bodies>, kind: ComponentType) -> InteractionContext {
        InteractionContext::new(
            InteractionSource {
                interaction_id: Id::new(1),
                token: "token".to_string(),
                member_id: Id::new(7),
                message: SourceMessage::Partial(PartialMessage::new(Id::new(50), MessageFlags::empty())),
                custom_id: "pick".to_string(),
                component_type: kind,
            },
            transport,
            Arc::new(PayloadBuilder::new()),
        )
    }

    #[tokio::test]
    async fn empty_selection_is_answered_as_a_selection() {
        let transport = Arc::new(Bodies::default());
        let ctx = context(transport.clone(), ComponentType::SelectMenu);

        answer(ComponentEvent::Selection(ctx)).await.unwrap();

        let bodies = transport.0.lock().unwrap();
        assert_eq!(bodies[0]["data"]["content"], "You selected: **nothing**");
        assert!(bodies[0]["data"].get("flags").is_none());
    }

    #[tokio::test]
    async fn button_press_is_acknowledged_privately() {
        let transport = Arc::new(Bodies::default());
        let ctx = context(transport.clone(), ComponentType::Button);

        answer(ComponentEvent::ButtonPress(ctx)).await.unwrap();

        let bodies = transport.0.lock().unwrap();
        assert_eq!(bodies[0]["data"]["content"], "<@7> pressed `pick`");
        assert_eq!(bodies[0]["data"]["flags"], 64);
    }
}
