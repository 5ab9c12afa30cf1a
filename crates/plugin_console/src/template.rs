//! Positional message templates (`"Order {0} completed with total: {1}"`).
//!
//! Compile-time formatting through [`std::fmt::Arguments`] is the preferred path; templates exist
//! for messages whose shape is only known at runtime. A malformed template is a caller bug and is
//! reported as a [`TemplateError`] rather than being swallowed like transport failures.

use std::fmt::{Display, Write};

use crate::TemplateError;

/// Widest padding a placeholder may request.
const MAX_ALIGNMENT: u64 = u16::MAX as u64;

/// Renders `{index[,alignment][:format]}` placeholders against `args`.
///
/// `{{` and `}}` produce literal braces. A positive alignment right-aligns the value in that many
/// columns, a negative one left-aligns it. Format strings are accepted but not interpreted: the
/// argument's `Display` output is used as-is.
pub fn render_template(template: &str, args: &[&dyn Display]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' => {
                if chars.next_if(|(_, next)| *next == '{').is_some() {
                    out.push('{');
                    continue;
                }
                let mut body = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    body.push(inner);
                }
                if !closed {
                    return Err(TemplateError::UnclosedPlaceholder { position });
                }
                let placeholder = Placeholder::parse(&body, position)?;
                let value = args.get(placeholder.index).ok_or(TemplateError::IndexOutOfRange {
                    index: placeholder.index,
                    len: args.len(),
                })?;
                placeholder.write(&mut out, value);
            }
            '}' => {
                if chars.next_if(|(_, next)| *next == '}').is_some() {
                    out.push('}');
                } else {
                    return Err(TemplateError::UnexpectedCloseBrace { position });
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

struct Placeholder {
    index: usize,
    alignment: Option<i64>,
}

impl Placeholder {
    fn parse(body: &str, position: usize) -> Result<Self, TemplateError> {
        let invalid = || TemplateError::InvalidIndex { position };
        let head = body.split_once(':').map_or(body, |(head, _format)| head);
        let (index, alignment) = match head.split_once(',') {
            Some((index, alignment)) => (index, Some(alignment)),
            None => (head, None),
        };

        let index = index.trim();
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index = index.parse::<usize>().map_err(|_| invalid())?;
        let alignment = alignment
            .map(|raw| raw.trim().parse::<i64>().map_err(|_| invalid()))
            .transpose()?;
        if let Some(width) = alignment.filter(|width| width.unsigned_abs() > MAX_ALIGNMENT) {
            return Err(TemplateError::AlignmentOutOfRange {
                position,
                alignment: width,
            });
        }

        Ok(Self { index, alignment })
    }

    fn write(&self, out: &mut String, value: &dyn Display) {
        // Writing into a String cannot fail.
        let _ = match self.alignment {
            Some(width) if width < 0 => {
                write!(out, "{:<width$}", value.to_string(), width = width.unsigned_abs() as usize)
            }
            Some(width) => write!(out, "{:>width$}", value.to_string(), width = width as usize),
            None => write!(out, "{value}"),
        };
    }
}
