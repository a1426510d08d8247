use anyhow::Result;
use bat::PrettyPrinter;
use cliclack::{input, spinner};
use console::style;

use heron::agent::Agent;
use heron::models::message::Message;

/// An interactive chat session. History lives in memory for the lifetime of
/// the session and is resubmitted whole on every turn.
pub struct Session {
    agent: Agent,
    messages: Vec<Message>,
}

impl Session {
    pub fn new(agent: Agent) -> Self {
        Session {
            agent,
            messages: Vec::new(),
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        loop {
            let message_text: String = input("Message:").placeholder("").multiline().interact()?;

            if message_text.trim().eq_ignore_ascii_case("exit") {
                break;
            }

            self.messages.push(Message::user().with_text(message_text));

            let spin = spinner();
            spin.start("awaiting reply");

            match self.agent.respond(&self.messages).await {
                Ok(response) => {
                    spin.stop("");
                    render(&response.text()).await;
                    self.messages.push(response);
                }
                Err(e) => {
                    spin.stop("");
                    // Keep the session alive, drop the failed turn from history
                    self.messages.pop();
                    eprintln!("{}", style(format!("Error: {}", e)).red());
                }
            }

            println!();
        }

        Ok(())
    }
}

async fn render(content: &str) {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .unwrap();
}
