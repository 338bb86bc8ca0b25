use crate::error::{ErrorContext, LockyardError};

pub fn format_error_chain(error: &LockyardError) -> String {
    let context = ErrorContext::new(error);
    context.to_string()
}

struct Palette {
    error: &'static str,
    name: &'static str,
    hint: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(use_color: bool) -> Self {
        if use_color {
            Self {
                error: "\x1b[1;31m",
                name: "\x1b[1m",
                hint: "\x1b[33m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                error: "",
                name: "",
                hint: "",
                reset: "",
            }
        }
    }
}

/// Terminal rendering: the error line, the lock names involved, then hints.
pub fn format_error_with_color(error: &LockyardError, use_color: bool) -> String {
    let palette = Palette::new(use_color);
    let context = ErrorContext::new(error);
    let mut output = format!("{}error:{} {error}\n", palette.error, palette.reset);

    match error {
        LockyardError::Unrecoverable { names, details } => {
            output.push_str("\nstill held in the backend:\n");
            for name in names {
                output.push_str(&format!("  {}{name}{}\n", palette.name, palette.reset));
            }
            output.push_str(&format!("\ncause: {details}\n"));
        }
        LockyardError::LockContended { name, waited_secs } => {
            output.push_str(&format!(
                "\n{}{name}{} stayed locked for {waited_secs:.1}s\n",
                palette.name, palette.reset
            ));
        }
        _ => {
            if let Some(details) = &context.details {
                output.push_str(&format!("\n{details}\n"));
            }
        }
    }

    if let Some(suggestion) = &context.suggestion {
        output.push_str(&format!(
            "\n{}hint:{} {suggestion}\n",
            palette.hint, palette.reset
        ));
    }

    output
}
