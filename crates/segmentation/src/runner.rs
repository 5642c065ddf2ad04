use anyhow::{Context, Result};
use dsf_client::{CancelToken, CodeInterceptor};
use shared::domain::{Code, Message, MessageType};
use tracing::{debug, info, warn};

use crate::interpolator::{Decision, InterpolationStats, Interpolator, PassReason, Replacement};

/// Feeds intercepted codes through `interpolator` until `cancel` fires.
///
/// Each code runs through its complete decision before the next one is
/// requested. Cancellation is only observed between codes and while waiting
/// for one. Any transport error ends the loop.
pub async fn run_interception<T>(
    transport: &mut T,
    interpolator: &mut Interpolator,
    cancel: &CancelToken,
) -> Result<InterpolationStats>
where
    T: CodeInterceptor + ?Sized,
{
    while !cancel.is_cancelled() {
        let Some(code) = transport
            .receive_code(cancel)
            .await
            .context("failed to receive intercepted code")?
        else {
            break;
        };

        match interpolator.process(&code) {
            Decision::PassThrough(reason) => {
                match reason {
                    PassReason::Irrelevant => {}
                    PassReason::NewStream => {
                        debug!(code = %code, "potentially first move, skipping")
                    }
                    PassReason::NothingToInterpolate => {
                        debug!(code = %code, "nothing to interpolate")
                    }
                }
                transport
                    .ignore_code()
                    .await
                    .context("failed to pass code through")?;
            }
            Decision::Replace(replacement) => {
                replace_code(transport, &code, replacement).await?;
            }
        }
    }

    let stats = interpolator.stats();
    info!(
        total = stats.total(),
        interpolated = stats.interpolated,
        baselines = stats.baselines,
        irrelevant = stats.irrelevant,
        uninterpolated = stats.uninterpolated,
        "interception stopped"
    );
    Ok(stats)
}

async fn replace_code<T>(transport: &mut T, original: &Code, replacement: Replacement) -> Result<()>
where
    T: CodeInterceptor + ?Sized,
{
    debug!(
        original = %original,
        midpoint = %replacement.midpoint,
        restore = %replacement.restore,
        "sending interpolated code"
    );

    let result = transport
        .perform_code(&replacement.midpoint)
        .await
        .context("failed to perform interpolated code")?;
    report_result("midpoint", &replacement.midpoint, result);

    let result = transport
        .perform_code(&replacement.restore)
        .await
        .context("failed to perform restored code")?;
    report_result("restore", &replacement.restore, result);

    transport
        .resolve_code(MessageType::Success, "")
        .await
        .context("failed to resolve intercepted code")
}

fn report_result(stage: &str, code: &Code, result: Option<Message>) {
    let Some(message) = result else {
        return;
    };
    match message.kind {
        MessageType::Success if message.content.is_empty() => {}
        MessageType::Success => debug!(stage, code = %code, reply = %message.content, "code reply"),
        MessageType::Warning => info!(stage, code = %code, reply = %message.content, "code warning"),
        MessageType::Error => warn!(stage, code = %code, reply = %message.content, "code failed"),
    }
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
