use std::io::{self, BufRead};
use std::thread;

use quiz_core::model::{AnswerVerdict, Difficulty, Question, QuizSummary};
use services::{AnswerResult, AppServices, CancelToken, QuizSession};
use tokio::sync::mpsc;

type PlayResult<T> = Result<T, Box<dyn std::error::Error>>;

enum Input {
    Choice(usize),
    Quit,
    TimedOut,
}

/// Run one interactive round on stdin/stdout.
pub async fn run(
    services: &AppServices,
    count: usize,
    difficulty: Option<Difficulty>,
    cancel: &CancelToken,
) -> PlayResult<()> {
    let quiz_loop = services.quiz_loop();
    let mut round = quiz_loop.start_round(count, difficulty, cancel).await?;
    if let Some(notice) = round.notice() {
        println!("{notice}\n");
    }

    let mut lines = spawn_line_reader();
    let session = &mut round.session;

    loop {
        let Some(question) = session.current_question() else {
            break;
        };
        let progress = session.progress();
        print_question(progress.answered + 1, progress.total, question);
        let choice_count = question.choices().len();

        let result = match read_input(&mut lines, session, choice_count, cancel).await {
            Input::Choice(index) => quiz_loop.answer(session, index)?,
            Input::TimedOut => quiz_loop.expire(session)?,
            Input::Quit => {
                println!("\nStopped after {} answers.", session.progress().answered);
                return Ok(());
            }
        };
        print_result(session, &result);

        if let Some(summary) = quiz_loop.advance(session)?.summary {
            print_summary(&summary);
        }
    }
    Ok(())
}

/// Stdin lines from a dedicated thread; the channel closes on EOF.
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn read_input(
    lines: &mut mpsc::UnboundedReceiver<String>,
    session: &QuizSession,
    choice_count: usize,
    cancel: &CancelToken,
) -> Input {
    let deadline = session
        .time_remaining()
        .and_then(|left| left.to_std().ok())
        .map(|left| tokio::time::Instant::now() + left);

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            () = cancel.cancelled() => return Input::Quit,
            () = sleep_until(deadline) => return Input::TimedOut,
        };
        let Some(line) = line else {
            return Input::Quit;
        };

        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("q") {
            return Input::Quit;
        }
        match trimmed.parse::<usize>() {
            Ok(number) if (1..=choice_count).contains(&number) => {
                return Input::Choice(number - 1);
            }
            _ => println!("Enter a number from 1 to {choice_count}, or q to quit."),
        }
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn print_question(number: usize, total: usize, question: &Question) {
    println!("Question {number}/{total} [{}]", question.difficulty());
    if let Some(category) = question.category() {
        println!("{category}");
    }
    println!("{}", question.prompt());
    for (index, choice) in question.choices().iter().enumerate() {
        println!("  {}) {choice}", index + 1);
    }
}

fn print_result(session: &QuizSession, result: &AnswerResult) {
    let correct = session
        .current_question()
        .map_or("", Question::correct_choice);
    match result.outcome.verdict {
        AnswerVerdict::Correct => println!("Correct!"),
        AnswerVerdict::Incorrect => println!("Wrong, the answer was {correct}."),
        AnswerVerdict::TimedOut => println!("Out of time, the answer was {correct}."),
    }
    println!(
        "Score: {}/{}\n",
        result.progress.score, result.progress.answered
    );
}

fn print_summary(summary: &QuizSummary) {
    println!(
        "Finished: {}/{} correct ({:.0}%), {} wrong, {} timed out, in {}s.",
        summary.correct(),
        summary.total_questions(),
        summary.percentage(),
        summary.incorrect(),
        summary.timed_out(),
        summary.duration().num_seconds()
    );
}
