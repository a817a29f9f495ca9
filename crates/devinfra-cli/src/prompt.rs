use std::io::{BufRead, Write};

/// Ask a yes/no question on stderr and read the answer from stdin.
/// An empty answer (or closed stdin) picks `default_yes`.
pub fn confirm(question: &str, default_yes: bool) -> anyhow::Result<bool> {
    let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
    eprint!("{question} {hint} ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_answer(&answer, default_yes))
}

fn parse_answer(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_takes_default() {
        assert!(parse_answer("\n", true));
        assert!(!parse_answer("", false));
    }

    #[test]
    fn explicit_answers() {
        assert!(parse_answer("Y\n", false));
        assert!(parse_answer("yes", false));
        assert!(!parse_answer("n", true));
        assert!(!parse_answer("maybe", true));
    }
}
