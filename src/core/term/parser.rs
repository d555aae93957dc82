//! Escape sequence tokenizer
//!
//! Splits console output into printable text, cursor control characters and
//! escape sequences. A sequence left unfinished at the end of a chunk is kept
//! and prepended to the next chunk.

use tracing::{debug, trace};

use super::hyperlink::Hyperlink;

/// Default upper bound for an unfinished sequence carried between chunks
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Cursor control characters the console interprets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// `\r`
    CarriageReturn,
    /// `\b`
    Backspace,
    /// `\n`
    Newline,
    /// `\f`
    FormFeed,
}

impl Control {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '\r' => Some(Control::CarriageReturn),
            '\x08' => Some(Control::Backspace),
            '\n' => Some(Control::Newline),
            '\x0c' => Some(Control::FormFeed),
            _ => None,
        }
    }
}

/// A unit of tokenized output
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Printable run of text
    Text(String),
    /// Cursor control character
    Control(Control),
    /// Complete SGR sequence, introducer and final `m` included
    Sgr(String),
    /// DEC line attribute (`ESC # n`)
    DecLine(u8),
    /// OSC 8 hyperlink; `None` closes the open link
    Hyperlink(Option<Hyperlink>),
    /// Any other complete sequence
    Ignored(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    OscString,
    EscapeInOsc, // ESC received within OSC, waiting for backslash
}

/// Incremental escape sequence tokenizer
#[derive(Debug)]
pub struct EscapeParser {
    state: ParserState,
    /// Raw text of the sequence being parsed
    seq: String,
    intermediates: Vec<char>,
    osc_string: String,
    text: String,
    tokens: Vec<Token>,
    /// Unfinished sequence from the previous chunk
    pending: Option<String>,
    max_pending: usize,
}

impl Default for EscapeParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl EscapeParser {
    pub fn new(max_pending: usize) -> Self {
        Self {
            state: ParserState::Ground,
            seq: String::new(),
            intermediates: Vec::with_capacity(4),
            osc_string: String::new(),
            text: String::new(),
            tokens: Vec::new(),
            pending: None,
            max_pending,
        }
    }

    /// Whether the last chunk ended inside an escape sequence
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any buffered partial sequence
    pub fn reset(&mut self) {
        self.pending = None;
        self.state = ParserState::Ground;
        self.seq.clear();
        self.text.clear();
    }

    /// Tokenize a chunk of output.
    pub fn feed(&mut self, input: &str) -> Vec<Token> {
        let data = match self.pending.take() {
            Some(mut pending) => {
                pending.push_str(input);
                pending
            }
            None => input.to_string(),
        };

        self.state = ParserState::Ground;
        for ch in data.chars() {
            self.step(ch);
        }
        self.flush_text();

        if self.state != ParserState::Ground {
            let raw = std::mem::take(&mut self.seq);
            if raw.chars().count() <= self.max_pending {
                trace!("Holding partial escape sequence: {:?}", raw);
                self.pending = Some(raw);
            } else {
                debug!("Discarding unterminated escape sequence ({} chars)", raw.len());
            }
            self.state = ParserState::Ground;
        }

        std::mem::take(&mut self.tokens)
    }

    fn step(&mut self, ch: char) {
        match self.state {
            ParserState::Ground => self.ground(ch),
            ParserState::OscString => self.osc_string_state(ch),
            ParserState::EscapeInOsc => self.escape_in_osc(ch),
            // Controls and new introducers interrupt an unfinished sequence
            _ if is_interrupt(ch) => self.abort(ch),
            ParserState::Escape => self.escape(ch),
            ParserState::EscapeIntermediate => self.escape_intermediate(ch),
            ParserState::CsiEntry => self.csi_entry(ch),
            ParserState::CsiParam => self.csi_param(ch),
            ParserState::CsiIntermediate => self.csi_intermediate(ch),
        }
    }

    fn ground(&mut self, ch: char) {
        match ch {
            '\x1b' => {
                self.flush_text();
                self.enter(ch, ParserState::Escape);
            }
            '\u{9b}' => {
                self.flush_text();
                self.enter(ch, ParserState::CsiEntry);
            }
            _ => match Control::from_char(ch) {
                Some(control) => {
                    self.flush_text();
                    self.tokens.push(Token::Control(control));
                }
                // BEL, NUL, SUB and the other non-printing C0 codes
                None if ch < ' ' && ch != '\t' => {}
                None => self.text.push(ch),
            },
        }
    }

    fn enter(&mut self, ch: char, state: ParserState) {
        self.state = state;
        self.seq.clear();
        self.seq.push(ch);
        self.intermediates.clear();
        self.osc_string.clear();
    }

    /// Drop a malformed sequence and reprocess `ch` from the ground state
    fn abort(&mut self, ch: char) {
        debug!("Malformed escape sequence dropped: {:?}", self.seq);
        self.seq.clear();
        self.state = ParserState::Ground;
        self.ground(ch);
    }

    fn escape(&mut self, ch: char) {
        self.seq.push(ch);
        match ch {
            '[' => self.state = ParserState::CsiEntry,
            ']' => {
                self.state = ParserState::OscString;
                self.osc_string.clear();
            }
            '\x20'..='\x2f' => {
                // Intermediate bytes
                self.intermediates.push(ch);
                self.state = ParserState::EscapeIntermediate;
            }
            '\x30'..='\x7e' => {
                // Two-byte sequence (save cursor, reset, keypad modes...)
                self.finish(None);
            }
            _ => {
                debug!("Unrecognized escape introducer: {:?}", self.seq);
                self.seq.clear();
                self.state = ParserState::Ground;
            }
        }
    }

    fn escape_intermediate(&mut self, ch: char) {
        self.seq.push(ch);
        match ch {
            '\x20'..='\x2f' => self.intermediates.push(ch),
            '\x30'..='\x7e' => {
                let token = match (self.intermediates.as_slice(), ch) {
                    (['#'], '3'..='6') => Some(Token::DecLine(ch as u8 - b'0')),
                    // Most of these are charset selections which we ignore
                    _ => None,
                };
                self.finish(token);
            }
            _ => {
                debug!("Malformed escape sequence dropped: {:?}", self.seq);
                self.seq.clear();
                self.state = ParserState::Ground;
            }
        }
    }

    fn csi_entry(&mut self, ch: char) {
        match ch {
            '0'..='9' | ';' | ':' => {
                self.seq.push(ch);
                self.state = ParserState::CsiParam;
            }
            '?' | '>' | '<' | '=' | '!' => {
                self.seq.push(ch);
                self.intermediates.push(ch);
            }
            // Linux console style `CSI [ x`; the next byte is the final one
            '[' if self.intermediates.is_empty() => {
                self.seq.push(ch);
                self.intermediates.push(ch);
            }
            '\x20'..='\x2f' => {
                self.seq.push(ch);
                self.intermediates.push(ch);
                self.state = ParserState::CsiIntermediate;
            }
            '\x40'..='\x7e' => self.execute_csi(ch),
            _ => self.abort(ch),
        }
    }

    fn csi_param(&mut self, ch: char) {
        match ch {
            '0'..='9' | ';' | ':' => self.seq.push(ch),
            '\x20'..='\x2f' => {
                self.seq.push(ch);
                self.intermediates.push(ch);
                self.state = ParserState::CsiIntermediate;
            }
            '\x40'..='\x7e' => self.execute_csi(ch),
            _ => self.abort(ch),
        }
    }

    fn csi_intermediate(&mut self, ch: char) {
        match ch {
            '\x20'..='\x2f' => {
                self.seq.push(ch);
                self.intermediates.push(ch);
            }
            '\x40'..='\x7e' => self.execute_csi(ch),
            _ => self.abort(ch),
        }
    }

    fn execute_csi(&mut self, final_char: char) {
        self.seq.push(final_char);
        if final_char == 'm' && self.intermediates.is_empty() {
            let code = std::mem::take(&mut self.seq);
            self.tokens.push(Token::Sgr(code));
            self.state = ParserState::Ground;
        } else {
            self.finish(None);
        }
    }

    fn osc_string_state(&mut self, ch: char) {
        match ch {
            '\x07' | '\u{9c}' => {
                // BEL or ST terminates OSC
                self.seq.push(ch);
                self.execute_osc();
            }
            '\x1b' => {
                // Could be ST (ESC \)
                self.seq.push(ch);
                self.state = ParserState::EscapeInOsc;
            }
            _ if Control::from_char(ch).is_some() => self.abort(ch),
            _ => {
                self.seq.push(ch);
                self.osc_string.push(ch);
            }
        }
    }

    fn escape_in_osc(&mut self, ch: char) {
        if ch == '\\' {
            self.seq.push(ch);
            self.execute_osc();
        } else {
            // Not ST: the ESC ends the OSC and starts a new sequence
            self.seq.pop();
            self.execute_osc();
            self.enter('\x1b', ParserState::Escape);
            self.step(ch);
        }
    }

    fn execute_osc(&mut self) {
        let token = self
            .osc_string
            .strip_prefix("8;")
            .map(|body| Token::Hyperlink(Hyperlink::parse(body)));
        self.finish(token);
    }

    /// Complete the current sequence, emitting `token` or an `Ignored` one
    fn finish(&mut self, token: Option<Token>) {
        let raw = std::mem::take(&mut self.seq);
        let token = token.unwrap_or_else(|| {
            trace!("Ignoring escape sequence: {:?}", raw);
            Token::Ignored(raw)
        });
        self.tokens.push(token);
        self.state = ParserState::Ground;
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token::Text(std::mem::take(&mut self.text)));
        }
    }
}

fn is_interrupt(ch: char) -> bool {
    ch == '\x1b' || ch == '\u{9b}' || Control::from_char(ch).is_some()
}

/// Split text on control characters only, leaving escape characters as text
pub fn split_controls(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    for ch in input.chars() {
        match Control::from_char(ch) {
            Some(control) => {
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(Token::Control(control));
            }
            None => text.push(ch),
        }
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}
