//! Interactive merge prompt
//!
//! Drives a [`MergeSession`] from line-oriented input. At each difference the operator
//! can look at either version, look at the highlighted differences, keep one of the
//! two measures, or quit:
//!
//! | Command | Action |
//! |---|---|
//! | `s1` | show the measure from score 1 |
//! | `s2` | show the measure from score 2 |
//! | `n` | show the differences, highlighted |
//! | `c1` | keep the measure from score 1 |
//! | `c2` | keep the measure from score 2 |
//! | `q` | quit; decisions made so far are kept |
//!
//! Commands are trimmed and case-insensitive. End of input counts as `q`.

use crate::error::MergeError;
use crate::preview::Preview;
use crate::session::{Materialization, MergeSession, SessionState, Source};
use std::io::{BufRead, Write};

const MENU: &str = "Options:
  s1 - Show measure from score1
  s2 - Show measure from score2
  n  - Show differences (highlighted)
  c1 - Keep measure from score1
  c2 - Keep measure from score2
  q  - Quit merging
Choose an option: ";

/// How an interactive merge ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Every difference was decided (or there were none)
    Completed,
    /// The operator quit, or input ran out, before the end
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show(Source),
    ShowDifferences,
    Keep(Source),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "s1" => Some(Command::Show(Source::First)),
            "s2" => Some(Command::Show(Source::Second)),
            "n" => Some(Command::ShowDifferences),
            "c1" => Some(Command::Keep(Source::First)),
            "c2" => Some(Command::Keep(Source::Second)),
            "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Run the prompt until the session finishes
///
/// A failing preview is reported to the operator and the prompt carries on.
///
/// # Errors
/// I/O errors on `input` or `output`.
pub fn run_prompt<R: BufRead, W: Write>(
    session: &mut MergeSession<'_>,
    preview: &dyn Preview,
    mut input: R,
    mut output: W,
) -> Result<PromptOutcome, MergeError> {
    let out_err = |e: std::io::Error| MergeError::io("<output>", e);

    if session.state() == SessionState::Complete && session.counter() == 0 {
        writeln!(output, "No differences found. Scores are identical.").map_err(out_err)?;
        return Ok(PromptOutcome::Completed);
    }

    let mut current_part: Option<String> = None;
    let mut line = String::new();

    while session.state() == SessionState::AwaitingInput {
        let (part_name, measure_number, counter, total) = match session.position() {
            Some(p) => (p.part_name.to_string(), p.measure_number, p.counter, p.total),
            None => break,
        };

        if current_part.as_deref() != Some(part_name.as_str()) {
            writeln!(output, "\nChecking part: {}", part_name).map_err(out_err)?;
            current_part = Some(part_name.clone());
        }
        writeln!(
            output,
            "\nMeasure {}: Differences detected. ({} of {})",
            measure_number, counter, total
        )
        .map_err(out_err)?;

        loop {
            write!(output, "{}", MENU).map_err(out_err)?;
            output.flush().map_err(out_err)?;

            line.clear();
            let read = input
                .read_line(&mut line)
                .map_err(|e| MergeError::io("<input>", e))?;
            let command = if read == 0 {
                writeln!(output).map_err(out_err)?;
                Command::Quit
            } else {
                match Command::parse(&line) {
                    Some(command) => command,
                    None => {
                        writeln!(output, "Invalid option. Try again.").map_err(out_err)?;
                        continue;
                    }
                }
            };

            match command {
                Command::Show(source) => {
                    let measure = session.query(source)?;
                    let caption = format!("{} (score {})", part_name, source_number(source));
                    report_preview(&mut output, preview.show(&caption, measure))?;
                }
                Command::ShowDifferences => {
                    let measure = session.highlighted()?;
                    let caption = format!("{} (differences)", part_name);
                    report_preview(&mut output, preview.show(&caption, &measure))?;
                }
                Command::Keep(source) => {
                    let written = match session.decide(source)? {
                        Materialization::Missed => writeln!(
                            output,
                            "Measure {} not found in merged score; keeping score1.",
                            measure_number
                        ),
                        _ => writeln!(
                            output,
                            "Keeping measure {} from score{}.",
                            measure_number,
                            source_number(source)
                        ),
                    };
                    written.map_err(out_err)?;
                    break;
                }
                Command::Quit => {
                    session.cancel();
                    writeln!(output, "Quitting merge early.").map_err(out_err)?;
                    return Ok(PromptOutcome::Cancelled);
                }
            }
        }
    }

    match session.state() {
        SessionState::Cancelled => Ok(PromptOutcome::Cancelled),
        _ => {
            writeln!(output, "\nMerge complete!").map_err(out_err)?;
            Ok(PromptOutcome::Completed)
        }
    }
}

fn source_number(source: Source) -> u8 {
    match source {
        Source::First => 1,
        Source::Second => 2,
    }
}

fn report_preview<W: Write>(output: &mut W, shown: Result<(), MergeError>) -> Result<(), MergeError> {
    if let Err(e) = shown {
        tracing::warn!(error = %e, "preview failed");
        writeln!(output, "{}", e).map_err(|e| MergeError::io("<output>", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::preview::TextPreview;
    use crate::score_diff::compare;
    use std::io::Cursor;

    fn quarter(step: NoteName) -> Event {
        Event::Note(Note::new(Pitch::natural(step, 4), Duration::of(NoteType::Quarter, 0)))
    }

    fn score(steps: &[NoteName]) -> Score {
        let mut part = Part::new("P1", "Flute");
        part.measures = steps
            .iter()
            .enumerate()
            .map(|(i, s)| Measure::with_events(i as u32 + 1, vec![quarter(*s)]))
            .collect();
        Score {
            metadata: Metadata::default(),
            parts: vec![part],
        }
    }

    fn run(a: &Score, b: &Score, input: &str) -> (PromptOutcome, Score, String, String) {
        let report = compare(a, b).unwrap();
        let mut session = MergeSession::new(a, report);
        let preview = TextPreview::new(Vec::new());
        let mut output = Vec::new();
        let outcome = run_prompt(&mut session, &preview, Cursor::new(input), &mut output).unwrap();
        let shown = String::from_utf8(preview.into_inner()).unwrap();
        (
            outcome,
            session.into_merged(),
            String::from_utf8(output).unwrap(),
            shown,
        )
    }

    #[test]
    fn test_keep_choices_apply_in_order() {
        let a = score(&[NoteName::C, NoteName::D, NoteName::E]);
        let b = score(&[NoteName::G, NoteName::D, NoteName::A]);
        let (outcome, merged, output, _) = run(&a, &b, "c2\nc1\n");

        assert_eq!(outcome, PromptOutcome::Completed);
        assert_eq!(merged.parts[0].measures[0].events, vec![quarter(NoteName::G)]);
        assert_eq!(merged.parts[0].measures[2].events, vec![quarter(NoteName::E)]);
        assert!(output.contains("Checking part: Flute"));
        assert!(output.contains("Measure 1: Differences detected. (1 of 2)"));
        assert!(output.contains("Keeping measure 1 from score2."));
        assert!(output.contains("Keeping measure 3 from score1."));
        assert!(output.contains("Merge complete!"));
    }

    #[test]
    fn test_show_commands_do_not_decide() {
        let a = score(&[NoteName::C]);
        let b = score(&[NoteName::D]);
        let (outcome, merged, _, shown) = run(&a, &b, "s1\nS2\n n \nc1\n");

        assert_eq!(outcome, PromptOutcome::Completed);
        assert_eq!(merged, a);
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Flute (score 1): m.1 | C4 1 |",
                "Flute (score 2): m.1 | D4 1 |",
                "Flute (differences): m.1 | C4 1 [major] |",
            ]
        );
    }

    #[test]
    fn test_invalid_input_reprompts() {
        let a = score(&[NoteName::C]);
        let b = score(&[NoteName::D]);
        let (outcome, merged, output, _) = run(&a, &b, "x\n\nc2\n");

        assert_eq!(outcome, PromptOutcome::Completed);
        assert_eq!(output.matches("Invalid option. Try again.").count(), 2);
        assert_eq!(merged, b);
    }

    #[test]
    fn test_quit_keeps_earlier_decisions() {
        let a = score(&[NoteName::C, NoteName::D]);
        let b = score(&[NoteName::E, NoteName::F]);
        let (outcome, merged, output, _) = run(&a, &b, "c2\nq\n");

        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert_eq!(merged.parts[0].measures[0].events, vec![quarter(NoteName::E)]);
        assert_eq!(merged.parts[0].measures[1].events, vec![quarter(NoteName::D)]);
        assert!(output.contains("Quitting merge early."));
    }

    #[test]
    fn test_end_of_input_cancels() {
        let a = score(&[NoteName::C]);
        let b = score(&[NoteName::D]);
        let (outcome, merged, _, _) = run(&a, &b, "s1\n");
        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert_eq!(merged, a);
    }

    #[test]
    fn test_identical_scores_finish_immediately() {
        let a = score(&[NoteName::C]);
        let (outcome, merged, output, _) = run(&a, &a.clone(), "");
        assert_eq!(outcome, PromptOutcome::Completed);
        assert_eq!(merged, a);
        assert!(output.contains("No differences found"));
    }
}
