use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use tracing::info;

use crate::errors::ConfigError;

pub const REPLACEMENT: char = '?';

/// Encodings a stdout stream may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Cp1252,
}

impl OutputEncoding {
    pub fn label(self) -> &'static str {
        match self {
            OutputEncoding::Utf8 => "utf-8",
            OutputEncoding::Ascii => "ascii",
            OutputEncoding::Latin1 => "iso-8859-1",
            OutputEncoding::Cp1252 => "cp1252",
        }
    }

    pub fn can_encode(self, ch: char) -> bool {
        match self {
            OutputEncoding::Utf8 => true,
            OutputEncoding::Ascii => ch.is_ascii(),
            OutputEncoding::Latin1 => (ch as u32) <= 0xFF,
            OutputEncoding::Cp1252 => {
                let code = ch as u32;
                code < 0x80 || (0xA0..=0xFF).contains(&code) || CP1252_HIGH.contains(&ch)
            }
        }
    }
}

/// Code points windows-1252 places in 0x80..=0x9F.
const CP1252_HIGH: [char; 27] = [
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

impl FromStr for OutputEncoding {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            "ascii" | "us-ascii" | "ansi-x3.4-1968" => Ok(OutputEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(OutputEncoding::Latin1),
            "cp1252" | "windows-1252" => Ok(OutputEncoding::Cp1252),
            _ => Err(ConfigError::UnknownEncoding(raw.to_string())),
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Make `text` writable to a stream declaring `encoding`.
///
/// Text that encodes cleanly is returned borrowed and unchanged. Otherwise
/// every code point the encoding cannot represent becomes [`REPLACEMENT`].
/// This is lossy: callers needing exact text must keep the original.
pub fn sanitize(text: &str, encoding: OutputEncoding) -> Cow<'_, str> {
    if text.chars().all(|ch| encoding.can_encode(ch)) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.chars()
            .map(|ch| if encoding.can_encode(ch) { ch } else { REPLACEMENT })
            .collect(),
    )
}

/// Stdout handle that sanitizes everything it prints.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    encoding: OutputEncoding,
}

impl Console {
    pub fn new(encoding: OutputEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> OutputEncoding {
        self.encoding
    }

    pub fn print(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", sanitize(text, self.encoding))?;
        stdout.flush()
    }
}

/// Startup step: settle the stdout encoding once, before any agent output.
/// Rust writes UTF-8 bytes, so an undeclared stream is treated as UTF-8.
pub fn init(declared: Option<&str>) -> Result<Console, ConfigError> {
    let encoding = match declared {
        Some(label) if !label.trim().is_empty() => label.parse()?,
        _ => OutputEncoding::default(),
    };
    info!(encoding = %encoding, "stdout configured");
    Ok(Console::new(encoding))
}
