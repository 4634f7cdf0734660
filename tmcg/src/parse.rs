//! The delimited textual grammar and line-oriented stream transfer
//!
//! Every record is `magic` followed by delimited fields, with a trailing
//! delimiter after the last field. Parsing is strict: the magic must
//! match, every field must be present, and integer fields must consume
//! their whole text.

use crate::{constants::IO_BASE, error::Error, Result};
use rug::Integer;
use std::{
    fmt::Display,
    io::{BufRead, Write},
    str::FromStr,
};

/// A cursor over the fields of one record.
pub(crate) struct Scanner<'a> {
    s: &'a str,
    delim: char,
}

impl<'a> Scanner<'a> {
    /// Opens a record, consuming its magic field.
    pub fn new(s: &'a str, magic: &'static str, delim: char) -> Result<Self> {
        let mut scanner = Self { s, delim };
        let tag = scanner.field()?;
        if tag != magic {
            return Err(Error::Parse("bad magic"));
        }
        Ok(scanner)
    }

    /// Takes the next field, advancing past its delimiter.
    pub fn field(&mut self) -> Result<&'a str> {
        match self.s.find(self.delim) {
            Some(i) => {
                let f = &self.s[..i];
                self.s = &self.s[i + 1..];
                Ok(f)
            }
            None => Err(Error::Parse("missing field")),
        }
    }

    /// Takes the next field, requiring it to be non-empty.
    pub fn nonempty_field(&mut self) -> Result<&'a str> {
        let f = self.field()?;
        if f.is_empty() {
            return Err(Error::Parse("empty field"));
        }
        Ok(f)
    }

    /// Takes the next field as a decimal size.
    pub fn size_field(&mut self) -> Result<usize> {
        self.nonempty_field()?
            .parse()
            .map_err(|_| Error::Parse("bad size field"))
    }

    /// Takes the next field as a wire-base integer.
    pub fn integer_field(&mut self) -> Result<Integer> {
        let f = self.nonempty_field()?;
        Integer::from_str_radix(f, IO_BASE).map_err(|_| Error::Parse("bad integer field"))
    }

    /// Hands back everything after the fields consumed so far.
    pub fn rest(self) -> &'a str {
        self.s
    }

    /// Requires that no input remains.
    pub fn finish(self) -> Result<()> {
        if self.s.is_empty() {
            Ok(())
        } else {
            Err(Error::Parse("trailing input"))
        }
    }
}

/// Formats an integer in the wire base.
pub(crate) fn radix(x: &Integer) -> String {
    x.to_string_radix(IO_BASE)
}

/// Reads one newline-terminated line, failing past `cap` bytes.
pub(crate) fn read_line_capped(r: &mut dyn BufRead, cap: usize) -> Result<String> {
    let mut line = Vec::new();
    loop {
        let buf = r.fill_buf()?;
        if buf.is_empty() {
            return Err(Error::Parse("unexpected end of stream"));
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(i) => {
                if line.len() + i > cap {
                    return Err(Error::Parse("oversized record"));
                }
                line.extend_from_slice(&buf[..i]);
                r.consume(i + 1);
                break;
            }
            None => {
                if line.len() + buf.len() > cap {
                    return Err(Error::Parse("oversized record"));
                }
                line.extend_from_slice(buf);
                let n = buf.len();
                r.consume(n);
            }
        }
    }
    String::from_utf8(line).map_err(|_| Error::Parse("non-ascii record"))
}

/// Sends one record as a line and flushes it out.
pub(crate) fn send<T: Display + ?Sized>(w: &mut dyn Write, t: &T) -> Result<()> {
    writeln!(w, "{}", t)?;
    w.flush()?;
    Ok(())
}

/// Receives one record from a line.
pub(crate) fn recv<T>(r: &mut dyn BufRead, cap: usize) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    read_line_capped(r, cap)?.parse()
}

/// Sends one integer as a line in the wire base.
pub(crate) fn send_integer(w: &mut dyn Write, x: &Integer) -> Result<()> {
    send(w, &radix(x))
}

/// Receives one integer from a line in the wire base.
pub(crate) fn recv_integer(r: &mut dyn BufRead, cap: usize) -> Result<Integer> {
    let line = read_line_capped(r, cap)?;
    Integer::from_str_radix(&line, IO_BASE).map_err(|_| Error::Parse("bad integer line"))
}

/// Receives one challenge bit from a line.
pub(crate) fn recv_bit(r: &mut dyn BufRead) -> Result<bool> {
    match read_line_capped(r, 8)?.as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Error::Parse("bad challenge bit")),
    }
}

/// Sends one challenge bit as a line.
pub(crate) fn send_bit(w: &mut dyn Write, b: bool) -> Result<()> {
    send(w, if b { "1" } else { "0" })
}
