//! `--test`: render the current message once and print it.

use std::sync::Arc;

use calsign_core::{COLOR_ESCAPE, MessageRenderer, RenderedMessage};
use calsign_server::writer::truncate_chars;
use calsign_server::{DisplaySession, RefreshScheduler};

use crate::config::SignConfig;
use crate::error::{ClientError, ClientResult};
use crate::source::build_source;

/// Fetches, renders and prints the message the sign would show.
pub async fn run(config: &SignConfig) -> ClientResult<()> {
    config.validate_limits().map_err(ClientError::Config)?;

    let scheduler = RefreshScheduler::new(
        build_source(&config.calendar),
        MessageRenderer::new(config.render_options()),
        DisplaySession::dry_run(),
        config.scheduler_config(),
    )
    .with_clock(Arc::new(config.clock()));

    let message = scheduler.compute().await;
    print!("{}", describe(&message, config.display.max_message_length));
    Ok(())
}

/// A human-readable report of `message`.
///
/// Color escapes are shown as `^` so the control codes stay visible.
pub fn describe(message: &RenderedMessage, max_len: usize) -> String {
    let mut out = format!("state: {}\n", message.state.kind());
    if let Some(reason) = message.state.no_data_reason() {
        out.push_str(&format!("reason: {}\n", reason.as_str()));
    }
    let (shown, truncated) = truncate_chars(&message.text, max_len);
    out.push_str(&format!("text: {}\n", visible(shown)));
    if truncated {
        out.push_str(&format!(
            "truncated: {} of {} characters\n",
            max_len,
            message.text.chars().count()
        ));
    }
    out
}

fn visible(text: &str) -> String {
    text.replace(COLOR_ESCAPE, "^")
}
