//! Line-oriented study loop over stdin/stdout.

use std::io::Write;
use std::sync::Arc;

use mcq_core::model::{QuestionId, SessionQuestion};
use services::explanation::request_for_current;
use services::session::{
    Direction, ExplanationTicket, FilterMode, SelectionOutcome, SessionError, SessionState,
};
use services::{ExplanationClient, ExplanationError, StudyError, StudyService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinHandle};

type PendingExplanation = (ExplanationTicket, JoinHandle<Result<String, ExplanationError>>);

enum Input {
    Line(Option<String>),
    Explanation(Result<Result<String, ExplanationError>, JoinError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Next,
    Previous,
    Jump(usize),
    Answer(usize),
    Bookmark,
    Filter,
    List,
    Map,
    Explain,
    Status,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl Action {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let action = match head.to_ascii_lowercase().as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" => Self::Previous,
            "g" | "go" => match rest.trim().parse::<usize>() {
                Ok(position) if position > 0 => Self::Jump(position - 1),
                _ => Self::Unknown(line.to_string()),
            },
            "b" | "bookmark" => Self::Bookmark,
            "f" | "filter" => Self::Filter,
            "l" | "list" => Self::List,
            "m" | "map" => Self::Map,
            "e" | "explain" => Self::Explain,
            "s" | "status" => Self::Status,
            "reset" => Self::Reset,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" => Self::Quit,
            single if single.len() == 1 => {
                let letter = single.as_bytes()[0];
                if (b'1'..=b'6').contains(&letter) {
                    Self::Answer(usize::from(letter - b'1'))
                } else {
                    Self::Unknown(line.to_string())
                }
            }
            _ => Self::Unknown(line.to_string()),
        };
        Some(action)
    }
}

fn print_help() {
    println!("Commands:");
    println!("  1-6        answer with option A-F");
    println!("  n / p      next / previous question");
    println!("  g <n>      go to question n");
    println!("  b          toggle bookmark");
    println!("  f          switch between all and bookmarked questions");
    println!("  l          list questions");
    println!("  m          question map");
    println!("  e          explain your last answer");
    println!("  s          progress");
    println!("  reset      clear progress and reshuffle");
    println!("  q          quit");
}

fn render_question(state: &SessionState) {
    let Some(question) = state.current_question() else {
        println!("No questions in this view.");
        return;
    };
    let total = state.filtered_questions().len();
    let marker = if state.bookmarked().contains(&question.id()) {
        " [bookmarked]"
    } else {
        ""
    };
    let filter = match state.filter_mode() {
        FilterMode::All => "",
        FilterMode::BookmarkedOnly => " (bookmarked only)",
    };
    println!();
    println!("Question {}/{total}{filter}{marker}", state.current_index() + 1);
    println!("{}", question.prompt());

    let revealed = state.is_revealed(question.id());
    let attempted = state.attempts().attempted(question.id());
    for (index, option) in question.options().iter().enumerate() {
        let note = if revealed && index == question.correct_answer_index() {
            "  <- correct"
        } else if attempted.contains(&index) {
            "  x"
        } else {
            ""
        };
        println!("  {}{note}", option.labeled());
    }
    if revealed {
        print_explanation(question);
    }
}

fn print_explanation(question: &SessionQuestion) {
    if !question.explanation().is_empty() {
        println!("Explanation: {}", question.explanation());
    }
}

fn render_list(state: &SessionState) {
    for entry in state.list_view() {
        let marker = if entry.bookmarked { " *" } else { "" };
        println!("{}. {}{marker}", entry.position + 1, entry.prompt);
        for (index, option) in entry.options.iter().enumerate() {
            let correct = if entry.correct_index == Some(index) { "  <- correct" } else { "" };
            println!("     {option}{correct}");
        }
    }
}

fn render_map(state: &SessionState) {
    let cells: Vec<String> = state
        .navigator()
        .iter()
        .map(|cell| {
            let mut text = (cell.position + 1).to_string();
            if cell.bookmarked {
                text.push('*');
            }
            if cell.revealed {
                text.push('+');
            } else if cell.viewed {
                text.push('.');
            }
            if cell.current {
                text = format!("[{text}]");
            }
            text
        })
        .collect();
    println!("{}", cells.join(" "));
}

fn render_status(state: &SessionState) {
    let progress = state.progress();
    println!(
        "{} of {} answered, {} viewed, {} to go",
        progress.answered, progress.total, progress.viewed, progress.remaining
    );
}

/// Run commands against `state` until the learner quits or stdin closes.
///
/// # Errors
///
/// Returns an error when stdin fails or progress cannot be persisted.
pub async fn run_session(
    study: &StudyService,
    explainer: Arc<dyn ExplanationClient>,
    mut state: SessionState,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<PendingExplanation> = None;
    let mut last_selected: Option<(QuestionId, usize)> = None;

    if state.is_review() {
        println!("Review mode: {} missed question(s).", state.questions().len());
    }
    study.view_current(&mut state).await?;
    render_question(&state);
    print_help();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let input = if let Some((_, handle)) = pending.as_mut() {
            tokio::select! {
                line = lines.next_line() => Input::Line(line?),
                done = handle => Input::Explanation(done),
            }
        } else {
            Input::Line(lines.next_line().await?)
        };

        let line = match input {
            Input::Line(Some(line)) => line,
            Input::Line(None) => break,
            Input::Explanation(done) => {
                if let Some((ticket, _)) = pending.take() {
                    show_explanation(&state, ticket, done);
                }
                continue;
            }
        };
        let Some(action) = Action::parse(&line) else {
            continue;
        };

        match action {
            Action::Quit => break,
            Action::Help => print_help(),
            Action::Next | Action::Previous => {
                let direction = if action == Action::Next {
                    Direction::Next
                } else {
                    Direction::Previous
                };
                if state.navigate(direction) {
                    last_selected = None;
                    study.view_current(&mut state).await?;
                    render_question(&state);
                } else {
                    println!("No more questions that way.");
                }
            }
            Action::Jump(index) => match state.jump_to(index) {
                Ok(()) => {
                    last_selected = None;
                    study.view_current(&mut state).await?;
                    render_question(&state);
                }
                Err(err) => println!("{err}"),
            },
            Action::Answer(index) => match study.select_option(&mut state, index).await {
                Ok(selection) => {
                    last_selected = state.current_question().map(|q| (q.id(), index));
                    report_selection(&state, selection.outcome);
                }
                Err(StudyError::Session(err)) => println!("{err}"),
                Err(err) => return Err(err.into()),
            },
            Action::Bookmark => match study.toggle_bookmark(&mut state).await {
                Ok(true) => println!("Bookmarked."),
                Ok(false) => {
                    println!("Bookmark removed.");
                    if state.filter_mode() == FilterMode::BookmarkedOnly {
                        last_selected = None;
                        render_question(&state);
                    }
                }
                Err(StudyError::Session(err)) => println!("{err}"),
                Err(err) => return Err(err.into()),
            },
            Action::Filter => match state.toggle_filter_mode() {
                Ok(_) => {
                    last_selected = None;
                    study.view_current(&mut state).await?;
                    render_question(&state);
                }
                Err(SessionError::NoBookmarks) => {
                    println!("No bookmarked questions yet. Use `b` to bookmark one.");
                }
                Err(err) => println!("{err}"),
            },
            Action::List => render_list(&state),
            Action::Map => render_map(&state),
            Action::Status => render_status(&state),
            Action::Explain => {
                if pending.is_some() {
                    println!("Still waiting for the previous explanation.");
                } else if let Some(selected) = answer_on_screen(&state, last_selected) {
                    match request_for_current(&state, selected) {
                        Some((ticket, request)) => {
                            let client = Arc::clone(&explainer);
                            let handle =
                                tokio::spawn(async move { client.explain(&request).await });
                            pending = Some((ticket, handle));
                            println!("Asking for an explanation...");
                        }
                        None => println!("No question is displayed."),
                    }
                } else {
                    println!("Answer the question first.");
                }
            }
            Action::Reset => {
                study.reset_session(&mut state).await?;
                last_selected = None;
                println!("Progress cleared; questions reshuffled.");
                study.view_current(&mut state).await?;
                render_question(&state);
            }
            Action::Unknown(raw) => println!("Unknown command: {raw} (h for help)"),
        }
    }

    if let Some((_, handle)) = pending.take() {
        handle.abort();
    }
    render_status(&state);
    Ok(())
}

/// The learner's last pick, if it belongs to the question now displayed.
fn answer_on_screen(state: &SessionState, last: Option<(QuestionId, usize)>) -> Option<usize> {
    let (id, selected) = last?;
    (state.current_question()?.id() == id).then_some(selected)
}

fn report_selection(state: &SessionState, outcome: SelectionOutcome) {
    match outcome {
        SelectionOutcome::Correct {
            first_attempt,
            completion,
        } => {
            if first_attempt {
                println!("Correct!");
            } else {
                println!("Correct, after a retry.");
            }
            if let Some(question) = state.current_question() {
                print_explanation(question);
            }
            if completion.complete {
                println!(
                    "All {} questions answered; {} right on the first try.",
                    completion.total, completion.correct_first_attempt
                );
            }
        }
        SelectionOutcome::Incorrect {
            feedback,
            remaining,
        } => {
            println!("Not quite. {remaining} option(s) left to try.");
            if let Some(feedback) = feedback {
                println!("{feedback}");
            }
        }
        SelectionOutcome::AlreadyRevealed => println!("Already answered."),
        SelectionOutcome::AlreadyAttempted => println!("You already tried that one."),
    }
}

fn show_explanation(
    state: &SessionState,
    ticket: ExplanationTicket,
    done: Result<Result<String, ExplanationError>, JoinError>,
) {
    if !state.accepts(ticket) {
        tracing::debug!(question = %ticket.question_id(), "discarding late explanation");
        return;
    }
    println!();
    match done {
        Ok(Ok(text)) => println!("AI explanation: {text}"),
        Ok(Err(ExplanationError::Disabled)) => {
            println!("Explanations are not configured (set MCQ_EXPLAIN_URL).");
        }
        Ok(Err(err)) => println!("Explanation unavailable: {err}"),
        Err(err) => println!("Explanation unavailable: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mcq_core::model::{LockedShuffle, QuestionDraft, TestId, TopicId};
    use mcq_core::time::fixed_now;

    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Action::parse("  "), None);
        assert_eq!(Action::parse("n"), Some(Action::Next));
        assert_eq!(Action::parse("2"), Some(Action::Answer(1)));
        assert_eq!(Action::parse("g 4"), Some(Action::Jump(3)));
        assert_eq!(Action::parse("g 0"), Some(Action::Unknown("g 0".into())));
        assert_eq!(Action::parse("7"), Some(Action::Unknown("7".into())));
        assert_eq!(Action::parse("RESET"), Some(Action::Reset));
    }

    #[test]
    fn explanation_needs_an_answer_to_the_displayed_question() {
        let questions = [1, 2]
            .into_iter()
            .map(|id| {
                let q = QuestionDraft {
                    id: QuestionId::new(id),
                    prompt: format!("Question {id}"),
                    options: vec!["yes".into(), "no".into()],
                    correct_answer: 0,
                    explanation: String::new(),
                    option_feedback: BTreeMap::new(),
                }
                .validate()
                .unwrap();
                SessionQuestion::in_source_order(&q)
            })
            .collect();
        let mut state = SessionState::practice(
            TopicId::new("ethics").unwrap(),
            TestId::new("p1").unwrap(),
            LockedShuffle::new(questions, fixed_now()),
            None,
        );
        for index in [0, 1] {
            state.jump_to(index).unwrap();
            state.toggle_bookmark().unwrap();
        }
        state.toggle_filter_mode().unwrap();
        state.jump_to(1).unwrap();
        let last = Some((QuestionId::new(2), 1));
        assert_eq!(answer_on_screen(&state, last), Some(1));

        // Unbookmarking the last question moves the view to question 1.
        state.toggle_bookmark().unwrap();
        assert_eq!(state.current_question().unwrap().id(), QuestionId::new(1));
        assert_eq!(answer_on_screen(&state, last), None);
        assert_eq!(answer_on_screen(&state, None), None);
    }
}
