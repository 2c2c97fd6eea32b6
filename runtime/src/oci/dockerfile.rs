//! Dockerfile parser.
//!
//! Parses a Dockerfile into an ordered sequence of instructions. Each
//! instruction keeps its keyword, its flags, its argument tokens, and the
//! original source text (continuations joined), so the sequence can be
//! rewritten in place and rendered back to Dockerfile text.
//!
//! Parsing is lexical only: instruction semantics are not validated, and
//! instructions with an unknown keyword are kept verbatim.

use std::collections::HashMap;

use scratchbuild_core::error::{Result, ScratchError};

/// Dockerfile instruction keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    From,
    Run,
    Cmd,
    Label,
    Maintainer,
    Expose,
    Env,
    Add,
    Copy,
    Entrypoint,
    Volume,
    User,
    Workdir,
    Arg,
    Onbuild,
    Stopsignal,
    Healthcheck,
    Shell,
    /// Keyword this parser does not know; the instruction is kept as text
    Unknown,
}

impl Keyword {
    /// Canonical upper-case spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::From => "FROM",
            Keyword::Run => "RUN",
            Keyword::Cmd => "CMD",
            Keyword::Label => "LABEL",
            Keyword::Maintainer => "MAINTAINER",
            Keyword::Expose => "EXPOSE",
            Keyword::Env => "ENV",
            Keyword::Add => "ADD",
            Keyword::Copy => "COPY",
            Keyword::Entrypoint => "ENTRYPOINT",
            Keyword::Volume => "VOLUME",
            Keyword::User => "USER",
            Keyword::Workdir => "WORKDIR",
            Keyword::Arg => "ARG",
            Keyword::Onbuild => "ONBUILD",
            Keyword::Stopsignal => "STOPSIGNAL",
            Keyword::Healthcheck => "HEALTHCHECK",
            Keyword::Shell => "SHELL",
            Keyword::Unknown => "UNKNOWN",
        }
    }

    fn parse(word: &str) -> Option<Self> {
        let keyword = match word.to_uppercase().as_str() {
            "FROM" => Keyword::From,
            "RUN" => Keyword::Run,
            "CMD" => Keyword::Cmd,
            "LABEL" => Keyword::Label,
            "MAINTAINER" => Keyword::Maintainer,
            "EXPOSE" => Keyword::Expose,
            "ENV" => Keyword::Env,
            "ADD" => Keyword::Add,
            "COPY" => Keyword::Copy,
            "ENTRYPOINT" => Keyword::Entrypoint,
            "VOLUME" => Keyword::Volume,
            "USER" => Keyword::User,
            "WORKDIR" => Keyword::Workdir,
            "ARG" => Keyword::Arg,
            "ONBUILD" => Keyword::Onbuild,
            "STOPSIGNAL" => Keyword::Stopsignal,
            "HEALTHCHECK" => Keyword::Healthcheck,
            "SHELL" => Keyword::Shell,
            _ => return None,
        };
        Some(keyword)
    }

    /// Instructions whose arguments may be a JSON string array.
    fn accepts_exec_form(&self) -> bool {
        matches!(
            self,
            Keyword::Run | Keyword::Cmd | Keyword::Entrypoint | Keyword::Shell | Keyword::Volume
        )
    }

    /// Instructions whose shell form is one opaque command string.
    fn is_shell_command(&self) -> bool {
        matches!(
            self,
            Keyword::Run
                | Keyword::Cmd
                | Keyword::Entrypoint
                | Keyword::Onbuild
                | Keyword::Healthcheck
                | Keyword::Unknown
        )
    }

    /// Instructions that take leading `--name=value` flags.
    fn takes_flags(&self) -> bool {
        matches!(
            self,
            Keyword::From | Keyword::Run | Keyword::Add | Keyword::Copy | Keyword::Healthcheck
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single Dockerfile instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub keyword: Keyword,
    /// Leading flags such as `--platform=linux/arm64`
    pub flags: Vec<String>,
    /// Argument tokens after the flags
    pub arguments: Vec<String>,
    /// Source text of the logical line
    pub original: String,
    /// 1-based line number where the instruction starts
    pub line: usize,
}

impl Instruction {
    /// First argument token, if any.
    pub fn argument(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    /// Replace the arguments with `value` and regenerate the original text.
    ///
    /// Flags are dropped; the instruction becomes `KEYWORD value`.
    pub fn set_argument(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.flags.clear();
        self.original = format!("{} {}", self.keyword, value);
        self.arguments = vec![value];
    }
}

/// Parsed Dockerfile: a list of instructions in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dockerfile {
    pub instructions: Vec<Instruction>,
}

impl Dockerfile {
    /// Parse a Dockerfile from its text content.
    pub fn parse(content: &str) -> Result<Self> {
        let mut instructions = Vec::new();

        for (line_num, line) in join_continuation_lines(content) {
            let trimmed = line.trim();

            // Skip empty lines, comments and parser directives
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            instructions.push(parse_instruction(trimmed, line_num)?);
        }

        Ok(Dockerfile { instructions })
    }

    /// Index of the first `FROM` instruction.
    pub fn first_from_index(&self) -> Option<usize> {
        self.instructions
            .iter()
            .position(|i| i.keyword == Keyword::From)
    }

    /// The first `FROM` instruction, mutably.
    pub fn first_from_mut(&mut self) -> Option<&mut Instruction> {
        self.instructions
            .iter_mut()
            .find(|i| i.keyword == Keyword::From)
    }

    /// `ARG` values declared before instruction `index`, defaults only.
    ///
    /// Later declarations of the same name win; declarations without a
    /// default are skipped and expand to nothing.
    pub fn args_before(&self, index: usize) -> HashMap<String, String> {
        let mut args = HashMap::new();
        for instruction in self.instructions.iter().take(index) {
            if instruction.keyword != Keyword::Arg {
                continue;
            }
            for token in &instruction.arguments {
                if let Some((name, default)) = token.split_once('=') {
                    args.insert(name.to_string(), unquote(default));
                }
            }
        }
        args
    }

    /// Render the instructions back to Dockerfile text, one per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            out.push_str(&instruction.original);
            out.push('\n');
        }
        out
    }
}

/// Join lines ending with `\` into single logical lines.
///
/// Returns each logical line with the 1-based number of its first physical
/// line. Comment and blank lines inside a continuation are dropped.
fn join_continuation_lines(content: &str) -> Vec<(usize, String)> {
    let mut logical_lines = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (idx, line) in content.lines().enumerate() {
        let continuing = !current.is_empty();
        if continuing {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
        } else {
            start = idx + 1;
        }

        let piece = if continuing { line.trim_start() } else { line };
        if let Some(stripped) = piece.strip_suffix('\\') {
            // Remove trailing backslash and append
            current.push_str(stripped.trim_end());
            current.push(' ');
        } else {
            current.push_str(piece);
            logical_lines.push((start, current.clone()));
            current.clear();
        }
    }

    // Handle trailing continuation without final line
    if !current.is_empty() {
        logical_lines.push((start, current.trim_end().to_string()));
    }

    logical_lines
}

/// Parse a single logical line into an Instruction.
fn parse_instruction(line: &str, line_num: usize) -> Result<Instruction> {
    let (word, rest) = split_first_word(line);
    let keyword = Keyword::parse(word).unwrap_or_else(|| {
        tracing::debug!(line = line_num, instruction = word, "Keeping unknown instruction");
        Keyword::Unknown
    });

    let mut flags = Vec::new();
    let mut rest = rest;
    if keyword.takes_flags() {
        while rest.starts_with("--") {
            let (flag, after) = split_first_word(rest);
            flags.push(flag.to_string());
            rest = after;
        }
    }

    let arguments = if rest.is_empty() {
        Vec::new()
    } else if keyword.accepts_exec_form() && rest.starts_with('[') {
        parse_json_array(rest, line_num)?
    } else if keyword.is_shell_command() {
        vec![rest.to_string()]
    } else {
        shell_split(rest)
    };

    Ok(Instruction {
        keyword,
        flags,
        arguments,
        original: line.to_string(),
        line: line_num,
    })
}

/// Split a string into the first word and the rest.
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

/// Parse a JSON array string like `["a", "b", "c"]` into a Vec<String>.
fn parse_json_array(s: &str, line_num: usize) -> Result<Vec<String>> {
    serde_json::from_str(s).map_err(|e| {
        ScratchError::DockerfileParse(format!(
            "Line {}: Invalid JSON array '{}': {}",
            line_num, s, e
        ))
    })
}

/// Remove surrounding quotes from a string.
fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Whitespace split that keeps quoted strings together.
fn shell_split(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in s.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Expand `${VAR}` and `$VAR` references in a string using build args.
///
/// Names run to the first character outside `[A-Za-z0-9_]`; unset names
/// expand to nothing. `${VAR:-word}` and `${VAR:+word}` are supported. A
/// `$` not followed by a name is kept.
pub fn expand_args(s: &str, args: &HashMap<String, String>) -> String {
    let lookup = |name: &str| args.get(name).map(String::as_str).filter(|v| !v.is_empty());

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some((expr, tail)) = after.strip_prefix('{').and_then(|b| b.split_once('}')) {
            let value = match expr.split_once(":-") {
                Some((name, word)) => lookup(name).unwrap_or(word),
                None => match expr.split_once(":+") {
                    Some((name, word)) => lookup(name).map_or("", |_| word),
                    None => lookup(expr).unwrap_or(""),
                },
            };
            result.push_str(value);
            rest = tail;
            continue;
        }

        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            result.push('$');
        } else {
            result.push_str(lookup(&after[..len]).unwrap_or(""));
        }
        rest = &after[len..];
    }
    result.push_str(rest);
    result
}
