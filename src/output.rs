//! Output formatting for query traces

use crate::index::types::{Token, EOS};
use crate::query::{NextToken, Trace};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Render a token id, showing `EOS` by name
pub fn format_token(token: Token) -> String {
    if token == EOS {
        "<eos>".to_string()
    } else {
        token.to_string()
    }
}

/// Print one line per query token: token, matched length, count, and the
/// optional entropy and next-token columns
pub fn print_trace(tokens: &[Token], trace: &Trace, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    for (i, &token) in tokens.iter().enumerate() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        write!(stdout, "{:>10}", format_token(token))?;
        stdout.reset()?;

        write!(stdout, "  len ")?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "{:<6}", trace.lengths[i])?;
        stdout.reset()?;

        write!(stdout, " count ")?;
        match trace.counts[i] {
            Some(count) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
                write!(stdout, "{:<10}", count)?;
            }
            None => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
                write!(stdout, "{:<10}", "-")?;
            }
        }
        stdout.reset()?;

        if let Some(entropies) = &trace.entropies {
            write!(stdout, " H {:.4}", entropies[i])?;
        }

        if let Some(next) = &trace.next_tokens {
            write!(stdout, "  next ")?;
            print_next_tokens(&mut stdout, &next[i])?;
        }

        writeln!(stdout)?;
    }

    Ok(())
}

fn print_next_tokens(stdout: &mut StandardStream, next: &[NextToken]) -> io::Result<()> {
    for (i, n) in next.iter().enumerate() {
        if i > 0 {
            write!(stdout, ", ")?;
        }
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(stdout, "{}", format_token(n.token))?;
        stdout.reset()?;
        write!(stdout, ":{} ({:.3})", n.count, n.probability)?;
    }
    Ok(())
}

/// Print an arity histogram as `arity<TAB>nodes` lines
pub fn print_census(census: &[(usize, usize)], color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    for &(arity, nodes) in census {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "{}", arity)?;
        stdout.reset()?;
        writeln!(stdout, "\t{}", nodes)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token() {
        assert_eq!(format_token(42), "42");
        assert_eq!(format_token(EOS), "<eos>");
    }
}
