use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{Conversation, Role};
use crate::services::{
    ChatManager, FeedbackService, MessageDispatcher, SessionResolver, SubmitOutcome,
};
use crate::ui::typewriter::{self, RevealEvent, DEFAULT_INTERVAL};

const HELP: &str = "\
Commands:
  /new               start a fresh conversation
  /chats             list saved conversations
  /open <n>          open a saved conversation
  /delete <n>        delete a saved conversation
  /login <code>      sign in with an authorization code
  /logout            sign out
  /feedback <1-5> [text]   rate this session
  /quit              exit
Anything else is sent to the counsellor.";

/// Thin terminal surface over the dispatcher. Holds no conversation state of
/// its own; everything it prints comes from the store.
pub struct Repl {
    dispatcher: MessageDispatcher,
    resolver: Arc<SessionResolver>,
    chats: Arc<ChatManager>,
    feedback: FeedbackService,
}

impl Repl {
    pub fn new(
        dispatcher: MessageDispatcher,
        resolver: Arc<SessionResolver>,
        chats: Arc<ChatManager>,
        feedback: FeedbackService,
    ) -> Self {
        Self {
            dispatcher,
            resolver,
            chats,
            feedback,
        }
    }

    pub async fn run(&self) -> Result<()> {
        println!("{}", HELP);
        println!();
        self.render_history();

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("you> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim().to_string();

            if let Some(command) = line.strip_prefix('/') {
                if !self.handle_command(command).await? {
                    break;
                }
                continue;
            }

            match self.dispatcher.submit(&line).await {
                SubmitOutcome::Ignored => {}
                SubmitOutcome::Completed | SubmitOutcome::Failed(_) => {
                    self.render_reply().await;
                }
            }
        }

        Ok(())
    }

    /// Returns false when the loop should exit.
    async fn handle_command(&self, command: &str) -> Result<bool> {
        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim();

        match name {
            "help" => println!("{}", HELP),
            "quit" | "exit" => return Ok(false),
            "new" => {
                self.dispatcher.reset().await?;
                self.render_history();
            }
            "chats" => {
                for (i, chat) in self.listed_chats().await?.iter().enumerate() {
                    println!("  {}. {}", i + 1, chat.title);
                }
            }
            "open" => {
                if let Some(chat) = self.nth_chat(rest).await? {
                    self.chats.select(&chat.id, self.dispatcher.store()).await?;
                    self.render_history();
                }
            }
            "delete" => {
                if let Some(chat) = self.nth_chat(rest).await? {
                    self.chats.delete(&chat.id, self.dispatcher.store()).await?;
                    println!("Deleted \"{}\"", chat.title);
                }
            }
            "login" => {
                if rest.is_empty() {
                    println!("Usage: /login <code>");
                } else {
                    match self.resolver.sign_in(rest).await {
                        Ok(identity) => {
                            println!("Signed in as {}", identity.scope_id());
                            self.dispatcher.restore_view().await?;
                            self.render_history();
                        }
                        Err(e) => println!("Sign-in failed: {}", e),
                    }
                }
            }
            "logout" => {
                self.resolver.sign_out().await?;
                self.dispatcher.restore_view().await?;
                println!("Signed out");
                self.render_history();
            }
            "feedback" => {
                let mut words = rest.splitn(2, char::is_whitespace);
                let rating = words.next().and_then(|w| w.parse::<i64>().ok());
                let body = words.next().filter(|s| !s.trim().is_empty());
                match self.feedback.submit(body, rating).await {
                    Ok(_) => println!("Thank you for the feedback."),
                    Err(e) => println!("{}", e),
                }
            }
            _ => println!("Unknown command; /help lists them"),
        }
        Ok(true)
    }

    async fn listed_chats(&self) -> Result<Vec<Conversation>> {
        let chats = self.chats.list().await?;
        if chats.is_empty() {
            println!("No saved conversations. Sign in and send a message to start one.");
        }
        Ok(chats)
    }

    async fn nth_chat(&self, arg: &str) -> Result<Option<Conversation>> {
        let mut chats = self.chats.list().await?;
        let index = arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1 && *n <= chats.len());
        match index {
            Some(n) => Ok(Some(chats.remove(n - 1))),
            None => {
                println!("Pick a number from /chats");
                Ok(None)
            }
        }
    }

    /// Re-print the whole sequence without animation (history already seen).
    fn render_history(&self) {
        let store = self.dispatcher.store().lock().unwrap();
        for message in store.messages() {
            println!("{} {}", Self::prefix(message.role), message.content);
        }
    }

    /// Print the newest entry, animating only the reply the store marked.
    async fn render_reply(&self) {
        let (content, animate) = {
            let store = self.dispatcher.store().lock().unwrap();
            let Some(last) = store.messages().last() else {
                return;
            };
            (last.content.clone(), store.should_animate(&last.id))
        };

        print!("{} ", Self::prefix(Role::Bot));
        std::io::stdout().flush().ok();

        let (tx, mut rx) = mpsc::channel(64);
        let reveal = tokio::spawn(async move {
            typewriter::run(&content, animate, DEFAULT_INTERVAL, CancellationToken::new(), tx).await
        });

        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::Chunk(chunk) => {
                    print!("{}", chunk);
                    std::io::stdout().flush().ok();
                }
                RevealEvent::Done => println!(),
            }
        }
        reveal.await.ok();
    }

    fn prefix(role: Role) -> &'static str {
        match role {
            Role::User => "you>",
            Role::Bot => "solace>",
        }
    }
}
