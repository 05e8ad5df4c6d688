use anyhow::{anyhow, bail, Context, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use killswitch_protocol::Request;
use serde::Deserialize;
use tracing::info;

#[derive(Debug)]
pub struct Invocation {
    pub function_name: String,
    pub region: Option<String>,
    pub request: Request,
}

/// Error body the Lambda runtime returns alongside `FunctionError`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionErrorPayload {
    error_message: String,
}

pub async fn invoke_function(invocation: &Invocation) -> Result<String> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &invocation.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let config = loader.load().await;
    let client = aws_sdk_lambda::Client::new(&config);

    let payload = serde_json::to_vec(&invocation.request)
        .context("Error marshalling the lambda payload")?;

    info!(
        "Invoking {} with action {}",
        invocation.function_name, invocation.request.action
    );
    let output = client
        .invoke()
        .function_name(&invocation.function_name)
        .invocation_type(InvocationType::RequestResponse)
        .payload(Blob::new(payload))
        .send()
        .await
        .map_err(|e| anyhow!("Error invoking Lambda function: {}", DisplayErrorContext(e)))?;

    let payload = output.payload().map(|p| p.as_ref()).unwrap_or_default();
    decode_result(output.function_error(), payload)
}

/// The function answers with a JSON string on success.
pub fn decode_result(function_error: Option<&str>, payload: &[u8]) -> Result<String> {
    if let Some(kind) = function_error {
        let detail = serde_json::from_slice::<FunctionErrorPayload>(payload)
            .map(|e| e.error_message)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned());
        bail!("Lambda function failed ({}): {}", kind, detail);
    }

    serde_json::from_slice::<String>(payload).context("Error unmarshalling Lambda result")
}
