//! Script parser for the RCON scripting language.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].
//!
//! ```text
//! LOGIN <host>:<port>
//! RCONCFG[PORT=<rconPort>,PWD=<password>]
//!
//! LOOP <name>(freq=<N>) {
//!     EXEC <name> {
//!         "<command>"
//!         # comment
//!     }
//!     WAIT <seconds>
//! }
//! ```

use crate::error::ParseError;
use crate::script::{ExecModule, LoginConfig, LoopFunction, Module, ScriptDefinition, WaitModule};
use anyhow::{Context as _, Result};
use std::ops::Range;
use std::path::Path;

/// Parse a script from a string slice.
///
/// `LOGIN` and `RCONCFG` may appear anywhere, in any order. `LOOP` blocks are
/// collected in declaration order and the `EXEC`/`WAIT` entries inside each
/// loop keep their textual order.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first missing or malformed construct.
///
/// # Example
///
/// ```
/// use rconctl::parse_str;
///
/// let script = parse_str(
///     "LOGIN localhost:25565\nRCONCFG[PORT=25575,PWD=secret]\n\
///      LOOP main(freq=2) { EXEC a { \"say hi\" } WAIT 1 }",
/// )
/// .unwrap();
/// assert_eq!(script.loops[0].repeat_count, 2);
/// assert_eq!(script.loops[0].modules.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<ScriptDefinition, ParseError> {
    let (login, headers) = parse_login(content)?;
    let loops = parse_loops(content, &headers)?;
    Ok(ScriptDefinition { login, loops })
}

/// Parse a script from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or if the script is malformed.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ScriptDefinition> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content).with_context(|| format!("Failed to parse script: {}", path.display()))
}

/// Also returns the byte spans of the matched header lines, which the loop
/// scan must not look inside.
fn parse_login(content: &str) -> Result<(LoginConfig, [Range<usize>; 2]), ParseError> {
    let (host, game_port, login_span) = keyword_positions(content, "LOGIN")
        .find_map(|at| login_at(content, at).map(|(h, p, end)| (h, p, at..end)))
        .ok_or(ParseError::MissingLogin)?;
    let (rcon_port, password, rcon_span) = keyword_positions(content, "RCONCFG")
        .find_map(|at| rcon_config_at(content, at).map(|(p, pwd, end)| (p, pwd, at..end)))
        .ok_or(ParseError::MissingRconConfig)?;

    let login = LoginConfig {
        host: host.to_string(),
        game_port: parse_port("game", game_port)?,
        rcon_port: parse_port("RCON", rcon_port)?,
        password: password.to_string(),
    };
    Ok((login, [login_span, rcon_span]))
}

/// `LOGIN <host>:<digits>`
fn login_at(content: &str, at: usize) -> Option<(&str, &str, usize)> {
    let mut cur = Cursor::new(content, at + "LOGIN".len());
    if !cur.skip_ws() {
        return None;
    }
    let host = cur.take_while(|b| b != b':' && !b.is_ascii_whitespace());
    if host.is_empty() || !cur.eat(":") {
        return None;
    }
    let port = cur.take_while(|b| b.is_ascii_digit());
    (!port.is_empty()).then_some((host, port, cur.pos))
}

/// `RCONCFG[PORT=<digits>,PWD=<anything but ]>]`
fn rcon_config_at(content: &str, at: usize) -> Option<(&str, &str, usize)> {
    let mut cur = Cursor::new(content, at + "RCONCFG".len());
    cur.skip_ws();
    if !cur.eat("[PORT=") {
        return None;
    }
    let port = cur.take_while(|b| b.is_ascii_digit());
    if port.is_empty() || !cur.eat(",PWD=") {
        return None;
    }
    let password = cur.take_while(|b| b != b']');
    (!password.is_empty() && cur.eat("]")).then_some((port, password, cur.pos))
}

fn parse_port(field: &'static str, digits: &str) -> Result<u16, ParseError> {
    match digits.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseError::InvalidPort {
            field,
            value: digits.to_string(),
        }),
    }
}

/// Whole-second waits above this no longer survive the trip through `f64`.
const MAX_EXACT_SECONDS: u64 = 1 << 53;

/// Collect every top-level `LOOP name(freq=n) { ... }` block.
fn parse_loops(content: &str, headers: &[Range<usize>]) -> Result<Vec<LoopFunction>, ParseError> {
    let mut loops = Vec::new();
    let mut pos = 0;
    while let Some(at) = keyword_positions(content, "LOOP")
        .find(|&at| at >= pos && !headers.iter().any(|span| span.contains(&at)))
    {
        let malformed = ParseError::Malformed {
            keyword: "LOOP",
            offset: at,
        };
        let mut cur = Cursor::new(content, at + "LOOP".len());
        if !cur.skip_ws() {
            return Err(malformed);
        }
        let name = cur.take_word();
        cur.skip_ws();
        if name.is_empty() || !cur.eat("(freq=") {
            return Err(malformed);
        }
        let freq = cur.take_while(|b| b != b')' && b != b'{' && b != b'\n');
        if !cur.eat(")") {
            return Err(malformed);
        }
        let repeat_count = match freq.trim().parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                return Err(ParseError::InvalidFrequency {
                    name: name.to_string(),
                    value: freq.to_string(),
                });
            }
        };
        cur.skip_ws();
        if cur.peek() != Some(b'{') {
            return Err(malformed);
        }
        let open = cur.pos;
        let (body, end) =
            extract_block(content, open).ok_or_else(|| ParseError::UnterminatedBlock {
                name: name.to_string(),
                offset: open,
            })?;

        loops.push(LoopFunction {
            name: name.to_string(),
            repeat_count,
            modules: parse_loop_body(body, open + 1)?,
        });
        pos = end;
    }
    Ok(loops)
}

/// Scan a loop body left to right so `EXEC` and `WAIT` come out in textual
/// order. `base` is the body's offset in the full script, for error reporting.
fn parse_loop_body(body: &str, base: usize) -> Result<Vec<Module>, ParseError> {
    let mut modules = Vec::new();
    let mut pos = 0;
    loop {
        let next_exec = keyword_positions(body, "EXEC").find(|&at| at >= pos);
        let next_wait = keyword_positions(body, "WAIT").find(|&at| at >= pos);
        let (at, is_exec) = match (next_exec, next_wait) {
            (None, None) => break,
            (Some(e), Some(w)) if w < e => (w, false),
            (Some(e), _) => (e, true),
            (None, Some(w)) => (w, false),
        };

        if is_exec {
            let mut cur = Cursor::new(body, at + "EXEC".len());
            let name = if cur.skip_ws() { cur.take_word() } else { "" };
            cur.skip_ws();
            if name.is_empty() || cur.peek() != Some(b'{') {
                return Err(ParseError::Malformed {
                    keyword: "EXEC",
                    offset: base + at,
                });
            }
            let open = cur.pos;
            let (block, end) =
                extract_block(body, open).ok_or_else(|| ParseError::UnterminatedBlock {
                    name: name.to_string(),
                    offset: base + open,
                })?;
            let commands = parse_exec_commands(block);
            if !commands.is_empty() {
                modules.push(Module::Exec(ExecModule::new(name, commands)));
            }
            pos = end;
        } else {
            let mut cur = Cursor::new(body, at + "WAIT".len());
            if !cur.skip_ws() {
                return Err(ParseError::Malformed {
                    keyword: "WAIT",
                    offset: base + at,
                });
            }
            let value = cur.take_while(|b| !b.is_ascii_whitespace() && b != b'}' && b != b'{');
            let wait = value
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| value.parse::<u64>().ok())
                .flatten()
                .filter(|&secs| secs <= MAX_EXACT_SECONDS)
                .and_then(|secs| WaitModule::new(secs as f64))
                .ok_or_else(|| ParseError::InvalidWait {
                    value: value.to_string(),
                    offset: base + at,
                })?;
            modules.push(Module::Wait(wait));
            pos = cur.pos;
        }
    }
    Ok(modules)
}

/// Split an EXEC body into commands, dropping blanks and `#` comments and
/// stripping surrounding quotes.
fn parse_exec_commands(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_matches(|c| c == '"' || c == '\''))
        .filter(|cmd| !cmd.is_empty())
        .map(str::to_string)
        .collect()
}

/// Given the offset of a `{`, return the text between it and its matching
/// `}` plus the offset just past the closing brace.
fn extract_block(text: &str, open: usize) -> Option<(&str, usize)> {
    if text.as_bytes().get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..i], i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Offsets of `keyword` where it stands as a whole word.
fn keyword_positions<'a>(text: &'a str, keyword: &'a str) -> impl Iterator<Item = usize> + 'a {
    let bytes = text.as_bytes();
    text.match_indices(keyword).map(|(i, _)| i).filter(move |&i| {
        let before = i.checked_sub(1).map(|p| bytes[p]);
        let after = bytes.get(i + keyword.len()).copied();
        !before.is_some_and(is_word_byte) && !after.is_some_and(is_word_byte)
    })
}

/// A byte cursor over ASCII syntax. Every predicate either accepts or rejects
/// all non-ASCII bytes, so positions stay on char boundaries.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Skip whitespace; returns whether any was skipped.
    fn skip_ws(&mut self) -> bool {
        !self.take_while(|b| b.is_ascii_whitespace()).is_empty()
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn take_word(&mut self) -> &'a str {
        self.take_while(is_word_byte)
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.text[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }
}
