// Conversational shell
// Keeps the transcript of a chat session and drives the interactive question loop


use std::fmt::{self, Write as _};
use std::io;

use console::style;
use dialoguer::Input;
use tracing::{debug, error};

use crate::RagError;
use crate::query::{Answer, QueryPipeline, SourceChunk};

/// Recorded as the assistant turn whenever a question cannot be answered
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I couldn't process your request. Please try again.";

pub const PROMPT: &str = "Ask me about the documents...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "You"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Append-only record of a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
        });
    }
}

/// Outcome of one question
#[derive(Debug)]
pub enum Reply {
    Answered(Answer),
    Failed { error: RagError },
}

/// A chat session: the query pipeline plus the conversation so far
pub struct ChatSession {
    pipeline: QueryPipeline,
    transcript: Transcript,
}

impl ChatSession {
    #[inline]
    pub fn new(pipeline: QueryPipeline) -> Self {
        Self {
            pipeline,
            transcript: Transcript::default(),
        }
    }

    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Ask one question. The user turn is recorded before the pipeline runs;
    /// failures record [`FALLBACK_ANSWER`] as the assistant turn.
    #[inline]
    pub async fn ask(&mut self, question: &str) -> Reply {
        self.transcript.push(Role::User, question);

        match self.pipeline.answer(question).await {
            Ok(answer) => {
                self.transcript.push(Role::Assistant, answer.text.as_str());
                Reply::Answered(answer)
            }
            Err(error) => {
                error!("Failed to answer question: {}", error);
                self.transcript.push(Role::Assistant, FALLBACK_ANSWER);
                Reply::Failed { error }
            }
        }
    }
}

/// A line typed into the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Question(String),
    History,
    Exit,
    Empty,
}

impl ShellInput {
    #[inline]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            return Self::Exit;
        }
        if trimmed == "/history" {
            return Self::History;
        }
        Self::Question(trimmed.to_string())
    }
}

/// Run the interactive loop until `exit`, `quit` or end of input
#[inline]
pub async fn run_interactive(session: &mut ChatSession) -> anyhow::Result<()> {
    println!("{}", style("💬 Document Q&A").bold().cyan());
    println!(
        "{}",
        style("Type a question, /history to review the conversation, or exit to quit.").dim()
    );
    println!();

    let interactive = console::user_attended();

    loop {
        let Some(line) = read_line(interactive)? else {
            debug!("End of input, closing chat session");
            break;
        };

        match ShellInput::parse(&line) {
            ShellInput::Empty => {}
            ShellInput::Exit => break,
            ShellInput::History => print!("{}", render_transcript(session.transcript())),
            ShellInput::Question(question) => {
                if !interactive {
                    println!("{} {}", style("You:").bold(), question);
                }
                let reply = session.ask(&question).await;
                print!("{}", render_reply(&reply));
            }
        }
    }

    println!("{}", style("Goodbye!").dim());
    Ok(())
}

fn read_line(interactive: bool) -> anyhow::Result<Option<String>> {
    if interactive {
        return match Input::<String>::new()
            .with_prompt(PROMPT)
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        };
    }

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Format an answer and its numbered sources, or the error and fallback text on failure
#[inline]
pub fn render_reply(reply: &Reply) -> String {
    let mut out = String::new();
    match reply {
        Reply::Answered(answer) => {
            let _ = writeln!(out, "{} {}", style("Assistant:").bold().green(), answer.text);
            if !answer.sources.is_empty() {
                out.push('\n');
                out.push_str(&render_sources(&answer.sources));
            }
        }
        Reply::Failed { error } => {
            let _ = writeln!(out, "{}", style(format!("Error: {}", error)).red());
            let _ = writeln!(out, "{} {}", style("Assistant:").bold().red(), FALLBACK_ANSWER);
        }
    }
    out.push('\n');
    out
}

#[inline]
pub fn render_sources(sources: &[SourceChunk]) -> String {
    let mut out = format!("{}\n", style("Sources:").bold().yellow());
    for (number, source) in sources.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", number + 1, source.preview());
        let location = match source.metadata.page {
            Some(page) => format!("{} (page {})", source.metadata.source, page),
            None => source.metadata.source.clone(),
        };
        let _ = writeln!(
            out,
            "   {}",
            style(format!("source: {}, score: {:.4}", location, source.score)).dim()
        );
    }
    out
}

#[inline]
pub fn render_transcript(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return format!("{}\n\n", style("No conversation yet.").dim());
    }

    let mut out = format!("{}\n", style("Conversation so far:").bold().cyan());
    for turn in transcript.turns() {
        let label = match turn.role {
            Role::User => style(format!("{}:", turn.role)).bold(),
            Role::Assistant => style(format!("{}:", turn.role)).bold().green(),
        };
        let _ = writeln!(out, "{} {}", label, turn.text);
    }
    out.push('\n');
    out
}
