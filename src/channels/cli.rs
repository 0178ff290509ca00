//! CLI channel — stdin/stdout REPL for local use.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Line typed to end the session.
pub const QUIT_COMMAND: &str = "/quit";

const PROMPT: &str = "> ";

/// Reads one message per stdin line and prints replies to stdout.
///
/// Blank lines are forwarded as-is; the flow treats them as answers.
pub struct CliChannel {
    user_id: String,
    conversation_id: String,
}

impl CliChannel {
    pub fn new(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id.clone();
        let conversation_id = self.conversation_id.clone();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("{PROMPT}");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim() == QUIT_COMMAND {
                            break;
                        }
                        let msg = IncomingMessage::new("cli", &user_id, &conversation_id, Some(line));
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("{}", response.content);
        Ok(())
    }

    async fn end_turn(&self, _msg: &IncomingMessage) -> Result<(), ChannelError> {
        eprint!("{PROMPT}");
        Ok(())
    }
}
