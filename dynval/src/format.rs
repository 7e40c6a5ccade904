//! Debug rendering of Values as JSON-shaped text.
//!
//! Output shape: `null`, `true`/`false`, integer literals, floats in C `%g`
//! style, strings as `"` + raw bytes + `"`, arrays as `[a, b]`, maps as
//! `{"k": v}` in bucket-scan order.
//!
//! This is a debugging aid, not a serializer: string bytes are written
//! verbatim with no escaping, so a string containing `"` renders as
//! malformed JSON.

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter, Write};

use crate::string::write_lossy;
use crate::value::Value;

/// Significant digits used for float output.
const FLOAT_PRECISION: i32 = 6;

/// Destination for rendered output.
trait Sink: Write {
    fn write_bytes(&mut self, bytes: &[u8]) -> fmt::Result;
}

/// Collects the exact rendered bytes.
struct ByteSink(Vec<u8>);

impl Write for ByteSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

impl Sink for ByteSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        self.0.extend_from_slice(bytes);
        Ok(())
    }
}

/// Forwards to a formatter, decoding string bytes lossily.
struct TextSink<'a, 'b>(&'a mut Formatter<'b>);

impl Write for TextSink<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s)
    }
}

impl Sink for TextSink<'_, '_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        write_lossy(self.0, bytes)
    }
}

/// Small fixed buffer so float formatting never allocates.
struct StackBuf {
    buf: [u8; 48],
    len: usize,
}

impl StackBuf {
    const fn new() -> Self {
        Self {
            buf: [0; 48],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        // Only `write_str` fills the buffer, and it copies whole `&str`s
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }
}

impl Write for StackBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        let dst = self.buf.get_mut(self.len..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Strips trailing fractional zeros, and the point if nothing follows it.
fn trim_fraction(digits: &str) -> &str {
    if !digits.contains('.') {
        return digits;
    }
    digits.trim_end_matches('0').trim_end_matches('.')
}

/// Writes `x` the way C's `%g` does.
fn write_general(out: &mut dyn Write, x: f64) -> fmt::Result {
    if x.is_nan() {
        return out.write_str(if x.is_sign_negative() { "-nan" } else { "nan" });
    }
    if x.is_infinite() {
        return out.write_str(if x < 0.0 { "-inf" } else { "inf" });
    }
    if x == 0.0 {
        return out.write_str(if x.is_sign_negative() { "-0" } else { "0" });
    }

    // Round to the target precision first; the exponent after rounding
    // decides between fixed and scientific notation.
    let mut sci = StackBuf::new();
    write!(sci, "{:.*e}", (FLOAT_PRECISION - 1) as usize, x)?;
    let (mantissa, exponent) = sci.as_str().split_once('e').ok_or(fmt::Error)?;
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;

    if exponent < -4 || exponent >= FLOAT_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(
            out,
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let mut fixed = StackBuf::new();
        let decimals = (FLOAT_PRECISION - 1 - exponent) as usize;
        write!(fixed, "{x:.decimals$}")?;
        out.write_str(trim_fraction(fixed.as_str()))
    }
}

fn render_into(out: &mut dyn Sink, value: &Value) -> fmt::Result {
    match value {
        Value::Null => out.write_str("null"),
        Value::Bool(b) => out.write_str(if *b { "true" } else { "false" }),
        Value::I32(n) => write!(out, "{n}"),
        Value::I64(n) => write!(out, "{n}"),
        Value::F32(x) => write_general(out, f64::from(*x)),
        Value::F64(x) => write_general(out, *x),
        Value::String(s) => {
            out.write_char('"')?;
            out.write_bytes(s.as_bytes())?;
            out.write_char('"')
        }
        Value::Array(arr) => {
            out.write_char('[')?;
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                render_into(out, item)?;
            }
            out.write_char(']')
        }
        Value::Map(map) => {
            out.write_char('{')?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                out.write_char('"')?;
                out.write_bytes(key.as_bytes())?;
                out.write_str("\": ")?;
                render_into(out, item)?;
            }
            out.write_char('}')
        }
    }
}

/// Renders `value` to its exact bytes.
#[must_use]
pub fn format_value(value: &Value) -> Vec<u8> {
    let mut sink = ByteSink(Vec::new());
    // ByteSink never reports an error
    let _ = render_into(&mut sink, value);
    sink.0
}

impl Value {
    /// Renders this value to its exact bytes. See [`format_value`].
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        format_value(self)
    }

    /// Writes the rendering to `out`.
    #[cfg(feature = "std")]
    pub fn render_to<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.render())
    }

    /// Writes the rendering and a newline to standard output.
    #[cfg(feature = "std")]
    pub fn print(&self) -> std::io::Result<()> {
        use std::io::Write;

        let mut stdout = std::io::stdout().lock();
        self.render_to(&mut stdout)?;
        stdout.write_all(b"\n")?;
        stdout.flush()
    }
}

/// Same shape as [`Value::render`], with non-UTF-8 bytes replaced by U+FFFD.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        render_into(&mut TextSink(f), self)
    }
}
