//! External engine invocation
//!
//! OCR and detection engines run as child processes that read the image on
//! stdin and print their result on stdout. The child is killed if the
//! calling future is dropped (e.g. by the recognition timeout).

use super::RecognizerFault;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried in a fault message
const STDERR_EXCERPT_CHARS: usize = 200;

/// Run `program args...` with `input` on stdin and return its stdout
///
/// A program that cannot be found is `Unavailable`; any other spawn error
/// or a non-zero exit status is `Failed`.
pub async fn run_with_stdin(
    program: &str,
    args: &[String],
    input: &[u8],
) -> Result<Vec<u8>, RecognizerFault> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RecognizerFault::Unavailable(format!("{} not found", program))
            } else {
                RecognizerFault::Failed(format!("failed to start {}: {}", program, e))
            }
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| RecognizerFault::Failed(format!("{} stdin not captured", program)))?;

    // Feed stdin while collecting output so a large image cannot deadlock
    // against a full stdout pipe.
    let feed = async move {
        if let Err(e) = stdin.write_all(input).await {
            debug!(program, "stdin write ended early: {}", e);
        }
        drop(stdin);
    };
    let (_, output) = tokio::join!(feed, child.wait_with_output());

    let output =
        output.map_err(|e| RecognizerFault::Failed(format!("{} did not complete: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
        return Err(RecognizerFault::Failed(format!(
            "{} exited with {}: {}",
            program, output.status, excerpt
        )));
    }

    Ok(output.stdout)
}

/// Whether `program` can be started at all
///
/// Runs it with `args` and empty stdin. Only a missing program counts as
/// unavailable; a failing run still proves the engine is installed.
pub async fn program_available(program: &str, args: &[String]) -> bool {
    !matches!(
        run_with_stdin(program, args, &[]).await,
        Err(RecognizerFault::Unavailable(_))
    )
}
