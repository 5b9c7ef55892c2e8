//! Transcript rendering
//!
//! The turn controller hands the full message list to a [`Renderer`] after
//! every store change and calls [`Renderer::finish`] once a turn is over.
//! The terminal renderer turns those snapshots into incremental output:
//! streamed text is printed as it grows, and the search activity trail is
//! printed one phase at a time.

use crate::conversation::{Activity, Author, Message, MessageId, Phase};
use std::collections::HashMap;
use std::io::{self, Write};

pub trait Renderer {
    fn render(&mut self, messages: &[Message]);

    /// No further updates will arrive for `id`
    fn finish(&mut self, id: MessageId);
}

/// How much of a message has already been written out
#[derive(Debug, Default)]
struct Printed {
    header: bool,
    text_len: usize,
    phases: usize,
    /// Output stopped in the middle of a line of streamed text
    mid_line: bool,
    done: bool,
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    printed: HashMap<MessageId, Printed>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_message(out: &mut W, printed: &mut Printed, message: &Message) -> io::Result<()> {
        if let Some(activity) = &message.activity {
            for phase in activity.phases.iter().skip(printed.phases) {
                Self::header(out, printed)?;
                if printed.mid_line {
                    writeln!(out)?;
                    printed.mid_line = false;
                }
                Self::write_phase(out, *phase, activity)?;
            }
            printed.phases = activity.phases.len();
        }

        match message.text.get(printed.text_len..) {
            Some(fresh) if !fresh.is_empty() => {
                Self::header(out, printed)?;
                write!(out, "{fresh}")?;
                printed.mid_line = true;
            }
            Some(_) => {}
            // Text was replaced rather than extended
            None => {
                Self::header(out, printed)?;
                write!(out, "\n{}", message.text)?;
                printed.mid_line = true;
            }
        }
        printed.text_len = message.text.len();
        Ok(())
    }

    fn end_message(out: &mut W, printed: &mut Printed) -> io::Result<()> {
        if printed.mid_line {
            writeln!(out)?;
            printed.mid_line = false;
        }
        printed.done = true;
        Ok(())
    }

    fn header(out: &mut W, printed: &mut Printed) -> io::Result<()> {
        if !printed.header {
            write!(out, "assistant> ")?;
            printed.header = true;
        }
        Ok(())
    }

    fn write_phase(out: &mut W, phase: Phase, activity: &Activity) -> io::Result<()> {
        match phase {
            Phase::Searching => writeln!(out, "[searching: {}]", activity.query)?,
            Phase::Reading => {
                writeln!(out, "[reading {} sources]", activity.sources.len())?;
                for source in &activity.sources {
                    writeln!(out, "  - {source}")?;
                }
            }
            Phase::Writing => writeln!(out, "[writing]")?,
            Phase::Error => writeln!(
                out,
                "[search failed: {}]",
                activity.failure.as_deref().unwrap_or("unknown error")
            )?,
        }
        Ok(())
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::error!(error = %e, "Failed to flush transcript");
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, messages: &[Message]) {
        for message in messages {
            let first_seen = !self.printed.contains_key(&message.id);
            let printed = self.printed.entry(message.id).or_default();
            if printed.done {
                continue;
            }
            // The user typed their own line; only replies are echoed
            if message.author == Author::User {
                printed.done = true;
                continue;
            }
            let mut result = Self::write_message(&mut self.out, printed, message);
            // Only a message that starts out loading keeps streaming;
            // anything else arrives complete
            if result.is_ok() && first_seen && !message.pending {
                result = Self::end_message(&mut self.out, printed);
            }
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to write transcript");
                return;
            }
        }
        self.flush();
    }

    fn finish(&mut self, id: MessageId) {
        let Some(printed) = self.printed.get_mut(&id) else {
            return;
        };
        if printed.done {
            return;
        }
        if let Err(e) = Self::end_message(&mut self.out, printed) {
            tracing::error!(error = %e, "Failed to write transcript");
            return;
        }
        self.flush();
    }
}

/// Keeps every snapshot it is handed
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub snapshots: Vec<Vec<Message>>,
    pub finished: Vec<MessageId>,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn render(&mut self, messages: &[Message]) {
        self.snapshots.push(messages.to_vec());
    }

    fn finish(&mut self, id: MessageId) {
        self.finished.push(id);
    }
}
