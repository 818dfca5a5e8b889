//! Interactive input, read by the coordinator only.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Print `label`, then parse one trimmed line from `input`.
pub fn prompt<T, R, W>(input: &mut R, output: &mut W, label: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{label}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::InvalidInput(format!("no answer to {label:?}")));
    }
    let answer = line.trim();
    answer
        .parse()
        .map_err(|e| Error::InvalidInput(format!("{answer:?}: {e}")))
}

/// [`prompt`] on the terminal
pub fn prompt_stdin<T>(label: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    prompt(&mut io::stdin().lock(), &mut io::stdout(), label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parses_trimmed_line() {
        let mut input = Cursor::new("  60.5 \n10\n");
        let mut output = Vec::new();

        let degrees: f64 = prompt(&mut input, &mut output, "Angle:").unwrap();
        let iterations: u32 = prompt(&mut input, &mut output, "Iterations:").unwrap();

        assert_eq!(degrees, 60.5);
        assert_eq!(iterations, 10);
        assert_eq!(String::from_utf8(output).unwrap(), "Angle:\nIterations:\n");
    }

    #[test]
    fn test_rejects_garbage() {
        let mut input = Cursor::new("sixty\n");
        let result: Result<f64> = prompt(&mut input, &mut Vec::new(), "Angle:");
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("sixty")));
    }

    #[test]
    fn test_end_of_input() {
        let mut input = Cursor::new("");
        let result: Result<u32> = prompt(&mut input, &mut Vec::new(), "Iterations:");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
