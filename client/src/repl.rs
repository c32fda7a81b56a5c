//! Interactive command loop.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::api::RatesClient;
use crate::command::{self, Command, HELP};

/// Read commands from `input` until `quit` or end of input, writing
/// prompts and responses to `out`.
pub async fn run<R, W>(client: &RatesClient, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "Client started. Now you can send commands. Send \"help\" to get full list of commands."
    )?;
    writeln!(out, "{HELP}")?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let cmd = command::parse(&line);
        debug!(?cmd, "Parsed command");

        let result = match cmd {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            Command::Invalid(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
            Command::GetById(id) => client.get_by_id(id).await,
            Command::GetByPair(pair) => client.get_by_pair(&pair).await,
            Command::Post(body) => client.post_update(&body).await,
        };

        match result {
            Ok(response) => writeln!(out, "{response}")?,
            Err(e) => writeln!(out, "Request error: {e:#}")?,
        }
    }

    Ok(())
}
