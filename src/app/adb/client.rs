use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::adb::parse::{has_ready_device, mentions_device};
use crate::app::adb::runner::{run_command_with_timeout, CommandOutput};
use crate::app::config::{AdbSettings, ApkInstallSettings};
use crate::app::error::AppError;

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        args: &[String],
        timeout: Duration,
        cancel: &AtomicBool,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError>;
}

pub struct SystemExecutor {
    program: String,
}

impl SystemExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CommandExecutor for SystemExecutor {
    fn execute(
        &self,
        args: &[String],
        timeout: Duration,
        cancel: &AtomicBool,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        debug!(trace_id = %trace_id, program = %self.program, ?args, "running adb");
        run_command_with_timeout(&self.program, args, timeout, cancel, trace_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCheck {
    pub reachable: bool,
    pub ready: bool,
}

#[derive(Clone)]
pub struct AdbClient {
    executor: Arc<dyn CommandExecutor>,
    command_timeout: Duration,
    install_timeout: Duration,
    install: ApkInstallSettings,
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

impl AdbClient {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        settings: &AdbSettings,
        install: &ApkInstallSettings,
    ) -> Self {
        Self {
            executor,
            command_timeout: Duration::from_secs(settings.command_timeout_secs),
            install_timeout: Duration::from_secs(settings.install_timeout_secs),
            install: install.clone(),
        }
    }

    pub fn check_device(&self, cancel: &AtomicBool, trace_id: &str) -> Result<DeviceCheck, AppError> {
        info!(trace_id = %trace_id, "checking adb connection");
        let output =
            self.executor
                .execute(&to_args(&["devices"]), self.command_timeout, cancel, trace_id)?;
        let stdout = output.stdout_text();
        let check = DeviceCheck {
            reachable: mentions_device(&stdout),
            ready: has_ready_device(&stdout),
        };
        if check.ready {
            info!(trace_id = %trace_id, "adb device connected");
        } else {
            warn!(trace_id = %trace_id, reachable = check.reachable, "no adb device ready");
        }
        Ok(check)
    }

    pub fn list_third_party_packages(
        &self,
        cancel: &AtomicBool,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        self.executor.execute(
            &to_args(&["shell", "pm", "list", "packages", "-3"]),
            self.command_timeout,
            cancel,
            trace_id,
        )
    }

    pub fn uninstall(
        &self,
        package_name: &str,
        cancel: &AtomicBool,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        self.executor.execute(
            &to_args(&["uninstall", package_name]),
            self.command_timeout,
            cancel,
            trace_id,
        )
    }

    pub fn install(
        &self,
        apk_path: &Path,
        cancel: &AtomicBool,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        self.executor
            .execute(&self.install_args(apk_path), self.install_timeout, cancel, trace_id)
    }

    fn install_args(&self, apk_path: &Path) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if self.install.replace_existing {
            args.push("-r".to_string());
        }
        if self.install.allow_downgrade {
            args.push("-d".to_string());
        }
        if self.install.grant_permissions {
            args.push("-g".to_string());
        }
        args.push(apk_path.to_string_lossy().to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
        stdout: &'static str,
    }

    impl CommandExecutor for Recorder {
        fn execute(
            &self,
            args: &[String],
            _timeout: Duration,
            _cancel: &AtomicBool,
            _trace_id: &str,
        ) -> Result<CommandOutput, AppError> {
            self.calls.lock().expect("calls").push(args.to_vec());
            Ok(CommandOutput {
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
                exit_code: Some(0),
            })
        }
    }

    fn make_client(stdout: &'static str, install: ApkInstallSettings) -> (AdbClient, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
            stdout,
        });
        let client = AdbClient::new(recorder.clone(), &AdbSettings::default(), &install);
        (client, recorder)
    }

    #[test]
    fn builds_fixed_argument_vectors() {
        let (client, recorder) = make_client("", ApkInstallSettings::default());
        let cancel = AtomicBool::new(false);
        client.list_third_party_packages(&cancel, "t").expect("list");
        client.uninstall("com.example", &cancel, "t").expect("uninstall");
        client.install(Path::new("/tmp/app.apk"), &cancel, "t").expect("install");

        let calls = recorder.calls.lock().expect("calls");
        assert_eq!(calls[0], vec!["shell", "pm", "list", "packages", "-3"]);
        assert_eq!(calls[1], vec!["uninstall", "com.example"]);
        assert_eq!(calls[2], vec!["install", "/tmp/app.apk"]);
    }

    #[test]
    fn install_flags_follow_settings() {
        let install = ApkInstallSettings {
            replace_existing: true,
            allow_downgrade: false,
            grant_permissions: true,
        };
        let (client, recorder) = make_client("", install);
        let cancel = AtomicBool::new(false);
        client.install(Path::new("/tmp/app.apk"), &cancel, "t").expect("install");
        let calls = recorder.calls.lock().expect("calls");
        assert_eq!(calls[0], vec!["install", "-r", "-g", "/tmp/app.apk"]);
    }

    #[test]
    fn device_check_reads_device_rows() {
        let (client, _) = make_client("List of devices attached\nABC123\tdevice\n", ApkInstallSettings::default());
        let check = client.check_device(&AtomicBool::new(false), "t").expect("check");
        assert!(check.reachable);
        assert!(check.ready);

        let (client, _) = make_client("List of devices attached\n\n", ApkInstallSettings::default());
        let check = client.check_device(&AtomicBool::new(false), "t").expect("check");
        assert!(check.reachable);
        assert!(!check.ready);

        let (client, _) = make_client("", ApkInstallSettings::default());
        let check = client.check_device(&AtomicBool::new(false), "t").expect("check");
        assert!(!check.reachable);
        assert!(!check.ready);
    }
}
