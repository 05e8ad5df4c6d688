use anyhow::{anyhow, Context, Result};
use killswitch_core::cloud::Connector;
use killswitch_core::{AwsConnector, Engine, Settings};
use killswitch_protocol::Request;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()
        .await
        .context("Failed to load killswitch settings")?;
    info!("Loaded settings: {:?}", settings);

    // apply_scp is the only action that needs the policy; the others keep working without it
    let switch_config = match settings.policy_source.load().await {
        Ok(config) => {
            info!(
                "Loaded switch config version {}",
                config.switch_config_version
            );
            Some(config)
        }
        Err(e) => {
            warn!("No SCP policy available, apply_scp will be rejected: {}", e);
            None
        }
    };

    let engine = Engine::new(AwsConnector::new(settings.max_attempts))
        .with_switch_config(switch_config)
        .with_revoke_concurrency(settings.revoke_concurrency);
    let engine = &engine;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Request>| async move {
        handle_request(engine, event).await
    }))
    .await
    .map_err(|e| anyhow!("Lambda runtime failed: {}", e))
}

async fn handle_request<C: Connector>(
    engine: &Engine<C>,
    event: LambdaEvent<Request>,
) -> Result<String, Error> {
    let (request, context) = event.into_parts();
    info!(
        "Invocation {} requested {} on account {}",
        context.request_id, request.action, request.target_account_id
    );

    match engine.handle(&request).await {
        Ok(result) => {
            info!("Invocation {} succeeded", context.request_id);
            Ok(result)
        }
        Err(e) => {
            error!("Invocation {} failed: {}", context.request_id, e);
            Err(e.into())
        }
    }
}
