//! Message scripts for `notices replay`.
//!
//! One command per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! post warning "Disk almost full" delay=2s
//! confirm "Delete issue ISS-12?" title="Delete issue" confirm=Delete emphasis=danger
//! wait 500ms
//! accept 2
//! list kind=error dismissed=false
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::model::{Emphasis, MessageId, MessageKind};
use crate::ops::{ConfirmOptions, MessageFilter, PostOptions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    /// 1-based
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum Command {
    Post {
        kind: MessageKind,
        text: String,
        options: PostOptions,
    },
    Confirm {
        text: String,
        options: ConfirmOptions,
    },
    Accept(MessageId),
    Reject(MessageId),
    Dismiss(MessageId),
    Clear,
    Wait(Duration),
    ApiError {
        operation: String,
        error: String,
    },
    List(MessageFilter),
    Counts,
}

/// A command and the line it came from
#[derive(Debug, Clone)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Pair(String, String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => w.clone(),
            Token::Quoted(s) => format!("{s:?}"),
            Token::Pair(k, v) => format!("{k}={v}"),
        }
    }
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    let mut commands = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fail = |message: String| ScriptError { line, message };
        let tokens = tokenize(trimmed).map_err(fail)?;
        let command = parse_command(tokens).map_err(fail)?;
        commands.push(ScriptLine { line, command });
    }
    Ok(commands)
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&c) = chars.peek() else {
            break;
        };
        if c == '#' {
            break;
        }
        if c == '"' {
            chars.next();
            tokens.push(Token::Quoted(read_quoted(&mut chars)?));
            continue;
        }
        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            word.push(c);
        }
        if chars.next_if_eq(&'=').is_some() {
            if word.is_empty() {
                return Err("option without a name".into());
            }
            let value = if chars.next_if_eq(&'"').is_some() {
                read_quoted(&mut chars)?
            } else {
                let mut value = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
                value
            };
            tokens.push(Token::Pair(word, value));
        } else {
            tokens.push(Token::Word(word));
        }
    }
    Ok(tokens)
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, String> {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err("unterminated string".into())
}

/// Tokens after the command word
struct Args {
    positional: Vec<Token>,
    options: Vec<(String, String)>,
}

impl Args {
    fn split(tokens: Vec<Token>) -> Args {
        let mut positional = Vec::new();
        let mut options = Vec::new();
        for token in tokens {
            match token {
                Token::Pair(k, v) => options.push((k, v)),
                other => positional.push(other),
            }
        }
        Args {
            positional,
            options,
        }
    }

    fn expect_count(&self, command: &str, count: usize) -> Result<(), String> {
        if self.positional.len() > count {
            return Err(format!(
                "unexpected argument to {command}: {}",
                self.positional[count].describe()
            ));
        }
        if self.positional.len() < count {
            return Err(format!("{command} needs {count} argument(s)"));
        }
        Ok(())
    }

    fn text(&self, idx: usize) -> Result<String, String> {
        match &self.positional[idx] {
            Token::Quoted(s) => Ok(s.clone()),
            other => Err(format!("expected a quoted string, got {}", other.describe())),
        }
    }

    fn word(&self, idx: usize) -> Result<&str, String> {
        match &self.positional[idx] {
            Token::Word(w) => Ok(w),
            other => Err(format!("expected a word, got {}", other.describe())),
        }
    }

    fn no_options(&self, command: &str) -> Result<(), String> {
        match self.options.first() {
            Some((k, _)) => Err(format!("{command} takes no option {k}")),
            None => Ok(()),
        }
    }
}

fn parse_command(tokens: Vec<Token>) -> Result<Command, String> {
    let mut tokens = tokens.into_iter();
    let name = match tokens.next() {
        Some(Token::Word(w)) => w,
        Some(other) => return Err(format!("expected a command, got {}", other.describe())),
        None => return Err("empty command".into()),
    };
    let args = Args::split(tokens.collect());

    match name.as_str() {
        "post" => {
            args.expect_count("post", 2)?;
            let kind_word = args.word(0)?;
            let kind = MessageKind::parse(kind_word)
                .filter(|k| *k != MessageKind::Confirmation)
                .ok_or_else(|| format!("unknown message kind: {kind_word}"))?;
            let mut options = PostOptions::default();
            for (key, value) in &args.options {
                match key.as_str() {
                    "title" => options.title = Some(value.clone()),
                    "delay" => options.dismiss_delay = Some(duration_option(key, value)?),
                    "auto_dismiss" => options.auto_dismiss = Some(bool_option(key, value)?),
                    "icon" => options.icon = Some(value.clone()),
                    "color" => options.color = Some(value.clone()),
                    _ => return Err(format!("unknown option for post: {key}")),
                }
            }
            Ok(Command::Post {
                kind,
                text: args.text(1)?,
                options,
            })
        }
        "confirm" => {
            args.expect_count("confirm", 1)?;
            let mut options = ConfirmOptions::default();
            for (key, value) in &args.options {
                match key.as_str() {
                    "title" => options.title = Some(value.clone()),
                    "confirm" => options.confirm_label = value.clone(),
                    "cancel" => options.cancel_label = value.clone(),
                    "emphasis" => {
                        options.emphasis = match value.as_str() {
                            "normal" => Emphasis::Normal,
                            "danger" => Emphasis::Danger,
                            _ => return Err(format!("invalid emphasis: {value}")),
                        }
                    }
                    "timeout" => options.timeout = Some(duration_option(key, value)?),
                    _ => return Err(format!("unknown option for confirm: {key}")),
                }
            }
            Ok(Command::Confirm {
                text: args.text(0)?,
                options,
            })
        }
        "accept" | "reject" | "dismiss" => {
            args.expect_count(&name, 1)?;
            args.no_options(&name)?;
            let raw = args.word(0)?;
            let id = raw
                .parse::<u64>()
                .map(MessageId)
                .map_err(|_| format!("invalid message id: {raw}"))?;
            Ok(match name.as_str() {
                "accept" => Command::Accept(id),
                "reject" => Command::Reject(id),
                _ => Command::Dismiss(id),
            })
        }
        "clear" => {
            args.expect_count("clear", 0)?;
            args.no_options("clear")?;
            Ok(Command::Clear)
        }
        "counts" => {
            args.expect_count("counts", 0)?;
            args.no_options("counts")?;
            Ok(Command::Counts)
        }
        "wait" => {
            args.expect_count("wait", 1)?;
            args.no_options("wait")?;
            let raw = args.word(0)?;
            let d = parse_duration(raw).ok_or_else(|| format!("invalid duration: {raw}"))?;
            Ok(Command::Wait(d))
        }
        "api-error" => {
            args.expect_count("api-error", 2)?;
            args.no_options("api-error")?;
            Ok(Command::ApiError {
                operation: args.text(0)?,
                error: args.text(1)?,
            })
        }
        "list" => {
            args.expect_count("list", 0)?;
            let mut filter = MessageFilter::all();
            for (key, value) in &args.options {
                match key.as_str() {
                    "kind" => {
                        filter.kind = Some(
                            MessageKind::parse(value)
                                .ok_or_else(|| format!("unknown message kind: {value}"))?,
                        )
                    }
                    "dismissed" => filter.dismissed = Some(bool_option(key, value)?),
                    _ => return Err(format!("unknown option for list: {key}")),
                }
            }
            Ok(Command::List(filter))
        }
        other => Err(format!("unknown command: {other}")),
    }
}

fn duration_option(key: &str, value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| format!("invalid duration for {key}: {value}"))
}

fn bool_option(key: &str, value: &str) -> Result<bool, String> {
    value
        .parse()
        .map_err(|_| format!("{key} must be true or false, got {value}"))
}

/// `250ms`, `10s`, `2m`. A bare number is milliseconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().ok()?;
    match unit {
        "" | "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n.checked_mul(60)?)),
        _ => None,
    }
}
