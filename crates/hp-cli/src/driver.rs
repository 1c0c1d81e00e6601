//! Line-driven popup session

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use hp_popup::PopupController;

use crate::commands::{execute, Command, Flow};

/// Feed commands from `input` to `popup` until `quit`, end of input, or
/// the popup window closing (`closed` cancelled)
///
/// Before returning, waits for outstanding derivations and any copy or
/// fill-in already requested, then shuts the popup down.
pub async fn run<R>(popup: &PopupController, input: R, closed: CancellationToken) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            _ = closed.cancelled() => break,
            line = lines.next_line() => line.context("failed to read command")?,
        };
        let Some(line) = line else {
            tracing::debug!("end of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match execute(popup, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    popup.wait_settled().await;
    popup.shutdown();
    Ok(())
}
