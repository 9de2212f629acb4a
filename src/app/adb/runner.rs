use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::app::error::AppError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::<u8>::new();
        let mut temp = [0u8; 4096];
        loop {
            match reader.read(&mut temp) {
                Ok(0) => break,
                Ok(count) => buffer.extend_from_slice(&temp[..count]),
                Err(_) => break,
            }
        }
        buffer
    })
}

/// Runs `program` to completion, killing it on timeout or when `cancel` is raised.
pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    cancel: &AtomicBool,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(AppError::cancelled(trace_id));
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::dependency(format!("Failed to spawn {program}: {err}"), trace_id))?;

    // Both pipes are drained concurrently; a full pipe buffer would otherwise stall the child.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;
    let stdout_handle = drain(stdout);
    let stderr_handle = drain(stderr);

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                let cancelled = cancel.load(Ordering::Relaxed);
                if cancelled || start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    if cancelled {
                        return Err(AppError::cancelled(trace_id));
                    }
                    return Err(AppError::dependency(
                        format!("Command timed out after {}s", timeout.as_secs()),
                        trace_id,
                    ));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    Ok(CommandOutput {
        stdout: stdout_handle.join().unwrap_or_default(),
        stderr: stderr_handle.join().unwrap_or_default(),
        exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn shell(script: &str) -> (String, Vec<String>) {
        if cfg!(windows) {
            ("cmd.exe".to_string(), vec!["/C".to_string(), script.to_string()])
        } else {
            ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
        }
    }

    #[test]
    fn captures_both_streams_and_exit_code() {
        let (program, args) = shell("echo out && echo err 1>&2 && exit 3");
        let cancel = AtomicBool::new(false);
        let output =
            run_command_with_timeout(&program, &args, Duration::from_secs(10), &cancel, "trace-io")
                .expect("command should run");

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.succeeded());
        assert!(output.stdout_text().contains("out"));
        assert!(output.stderr_text().contains("err"));
    }

    #[test]
    fn does_not_deadlock_on_large_stdout() {
        let script = if cfg!(windows) {
            "for /L %i in (1,1,100000) do @echo 1234567890"
        } else {
            "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done"
        };
        let (program, args) = shell(script);
        let cancel = AtomicBool::new(false);

        let output =
            run_command_with_timeout(&program, &args, Duration::from_secs(10), &cancel, "trace-big")
                .expect("expected large-output command to complete without timing out");

        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.len() >= 1_000_000);
    }

    #[test]
    fn cancellation_kills_the_child() {
        let script = if cfg!(windows) { "ping 127.0.0.1 -n 30" } else { "sleep 30" };
        let (program, args) = shell(script);
        let cancel = Arc::new(AtomicBool::new(false));

        let trigger = Arc::clone(&cancel);
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            trigger.store(true, Ordering::Relaxed);
        });

        let started = Instant::now();
        let err =
            run_command_with_timeout(&program, &args, Duration::from_secs(60), &cancel, "trace-cancel")
                .expect_err("expected cancellation");
        canceller.join().expect("join");

        assert!(err.is_cancelled());
        assert_eq!(err.trace_id, "trace-cancel");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn already_cancelled_flag_skips_spawn() {
        let cancel = AtomicBool::new(true);
        let err = run_command_with_timeout(
            "/this/program/does/not/exist",
            &[],
            Duration::from_secs(1),
            &cancel,
            "trace-pre",
        )
        .expect_err("expected cancellation");
        assert!(err.is_cancelled());
    }

    #[test]
    fn missing_program_is_a_dependency_error() {
        let cancel = AtomicBool::new(false);
        let err = run_command_with_timeout(
            "/this/program/does/not/exist",
            &[],
            Duration::from_secs(1),
            &cancel,
            "trace-missing",
        )
        .expect_err("expected spawn failure");
        assert_eq!(err.code, "ERR_DEPENDENCY");
    }
}
