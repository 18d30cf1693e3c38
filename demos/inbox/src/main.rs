use futures_util::TryStreamExt;
use parley::client::MemoryPlatform;
use parley::prelude::*;

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

/// Seeds a small support desk: the default identity is an agent with three
/// customer threads.
fn seed(agent: &str) -> MemoryPlatform {
    let platform = MemoryPlatform::new(2);

    let late = platform.add_conversation("order-1042", &[agent, "dana"], 0);
    platform.post_message(&late, "dana", "my order hasn't arrived", 1_700_000_000_000);
    platform.post_message(&late, agent, "let me check the carrier", 1_700_000_060_000);
    platform.post_message(&late, agent, "it ships tomorrow", 1_700_000_120_000);

    let refund = platform.add_conversation("refund-88", &[agent, "eli"], 0);
    platform.post_message(&refund, "eli", "refund please", 1_700_000_030_000);

    platform.add_conversation("welcome", &[agent, "fay"], 1_699_000_000_000);
    platform.add_conversation("escalations", &["supervisor"], 1_700_000_500_000);
    platform
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// Drives one session through the consumer interface and returns what a
/// console would show.
async fn run(config: SessionConfig) -> Result<Vec<String>, ParleyError> {
    let agent = config.default_identity.clone();
    let platform = seed(agent.as_str());
    let ctx = SessionContext::new(config, platform.clone(), platform.clone());
    let mut out = Vec::new();

    ctx.connect(None).await?;
    out.push(format!("signed in as {agent}"));

    let inbox: Vec<Conversation> = ctx.conversations().try_collect().await?;
    for conversation in &inbox {
        out.push(format!(
            "  {} (last activity {})",
            conversation.id, conversation.last_activity
        ));
    }

    // The platform expires every credential the agent holds. The next
    // fetch fails once, the session renews, and the fetch succeeds.
    platform.revoke_all(&agent);
    tracing::info!(identity = %agent, "credentials revoked");

    let first = &inbox[0];
    let history: Vec<Message> = ctx.messages(&first.id).try_collect().await?;
    out.push(format!("{} messages in {}:", history.len(), first.id));
    for message in &history {
        out.push(format!("  {}: {}", message.author, message.body));
    }
    out.push(format!("credentials issued: {}", platform.tokens_issued()));

    if let Some(latest) = history.last() {
        match serde_json::to_string(latest) {
            Ok(json) => out.push(json),
            Err(e) => tracing::warn!(error = %e, id = %latest.id, "could not serialize latest message"),
        }
    }

    ctx.close().await;
    out.push(format!("session closed: {:?}", ctx.state()));
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<(), ParleyError> {
    parley::logging::init("info");
    let config = parley::config::from_env()?;

    for line in run(config).await? {
        println!("{line}");
    }
    Ok(())
}
