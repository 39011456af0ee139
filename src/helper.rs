// src/helper.rs
//! Subprocess bridge to the target runtime. The AST helper is embedded in
//! the binary and handed to the interpreter with `-c`, so the installed
//! tool carries no runtime data files.

use anyhow::{bail, Context, Result};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// The `parse`/`env`/`stdlib` helper, verbatim.
pub const HELPER_SOURCE: &str = include_str!("../python/parse_imports.py");

/// Default wall-clock budget for one helper invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the helper under `runtime` with one subcommand, feeding `stdin_data`
/// when given, and returns its stdout. The child is killed on timeout.
///
/// # Errors
/// Fails when the runtime cannot be spawned, exceeds the timeout, exits
/// non-zero, or produces unreadable output.
pub fn run(
    runtime: &str,
    subcommand: &str,
    stdin_data: Option<&str>,
    timeout: Duration,
) -> Result<String> {
    let mut child = Command::new(runtime)
        .arg("-c")
        .arg(HELPER_SOURCE)
        .arg(subcommand)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn runtime '{runtime}'"))?;

    // Feed stdin from its own thread; a large source file can outgrow the
    // pipe buffer and deadlock a single-threaded write-then-read.
    let stdin_handle = child.stdin.take();
    let payload = stdin_data.map(str::to_owned);
    let writer = thread::spawn(move || {
        if let (Some(mut pipe), Some(data)) = (stdin_handle, payload) {
            let _ = pipe.write_all(data.as_bytes());
        }
    });

    let mut stdout = child.stdout.take().context("helper stdout unavailable")?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        let res = stdout.read_to_string(&mut buf).map(|_| buf);
        let _ = tx.send(res);
    });

    let output = match rx.recv_timeout(timeout) {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            let _ = child.wait();
            let _ = writer.join();
            return Err(e).context("failed to read helper output");
        }
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = writer.join();
            bail!("runtime '{runtime}' timed out after {timeout:?} on '{subcommand}'");
        }
    };

    let status = child.wait().context("failed to await helper")?;
    let _ = writer.join();
    if !status.success() {
        bail!("runtime '{runtime}' exited with {status} on '{subcommand}'");
    }
    Ok(output)
}
