//! Translation of Minecraft `§` formatting codes into ANSI escape sequences.

/// ANSI escape sequences used for terminal output.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const PURPLE: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Map a single formatting code (the character after `§`) to its escape.
///
/// Codes are case-insensitive. Obfuscation (`k`) and unknown codes map to
/// nothing.
fn code_to_ansi(code: char) -> &'static str {
    match code.to_ascii_lowercase() {
        '0' => "\x1b[30m",
        '1' => "\x1b[34m",
        '2' => "\x1b[32m",
        '3' => "\x1b[36m",
        '4' => "\x1b[31m",
        '5' => "\x1b[35m",
        '6' => "\x1b[33m",
        '7' => "\x1b[37m",
        '8' => "\x1b[90m",
        '9' => "\x1b[94m",
        'a' => "\x1b[92m",
        'b' => "\x1b[96m",
        'c' => "\x1b[91m",
        'd' => "\x1b[95m",
        'e' => "\x1b[93m",
        'f' => "\x1b[97m",
        'l' => "\x1b[1m",
        'm' => "\x1b[9m",
        'n' => "\x1b[4m",
        'o' => "\x1b[3m",
        'r' => ansi::RESET,
        _ => "",
    }
}

/// Translate `§`-prefixed codes in `raw` into ANSI escapes.
///
/// Every code pair is consumed, including unknown ones. A trailing lone `§`
/// is kept as-is. This never fails.
///
/// ```
/// use rconctl::markup::translate;
///
/// assert_eq!(translate("§aok§r"), "\x1b[92mok\x1b[0m");
/// ```
pub fn translate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '§' {
            if let Some(code) = chars.next() {
                out.push_str(code_to_ansi(code));
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Remove `§` codes entirely, for output that must stay plain.
pub fn strip(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '§' && chars.next().is_some() {
            continue;
        }
        out.push(ch);
    }
    out
}
