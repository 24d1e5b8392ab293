//! Emulator and phone simulator command lines, and the process launcher

use std::path::{Path, PathBuf};
use std::process::Stdio;

use pbsdk_core::prelude::*;
use pbsdk_core::Platform;
use tokio::process::Command;

/// Emulator serial port carrying the bluetooth transport the phone simulator talks to
pub const QEMU_BT_PORT: u16 = 12344;
/// Emulator serial port carrying the firmware console
pub const QEMU_CONSOLE_PORT: u16 = 12345;
/// Port the phone simulator listens on for SDK tools
pub const PHONE_SIM_PORT: u16 = 12342;
/// Host the phone simulator listens on
pub const PHONE_SIM_HOST: &str = "localhost";

/// A fully-built command line for one managed process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Inherit stdout/stderr instead of discarding them
    pub inherit_output: bool,
}

impl LaunchCommand {
    fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inherit_output: false,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn arg_pair(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Space-joined command line for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Hardware emulator command line. Machine, CPU and the way the SPI flash is
/// attached differ per platform.
pub fn emulator_command(
    qemu: &Path,
    platform: Platform,
    micro_flash: &Path,
    spi_flash: &Path,
    inherit_output: bool,
) -> LaunchCommand {
    let cmd = LaunchCommand::new(qemu)
        .arg_pair("-rtc", "base=localtime")
        .arg("-s")
        .arg_pair("-serial", "file:/dev/null")
        .arg_pair("-serial", format!("tcp::{},server,nowait", QEMU_BT_PORT))
        .arg_pair("-serial", format!("tcp::{},server,nowait", QEMU_CONSOLE_PORT));

    let micro = micro_flash.display().to_string();
    let spi = spi_flash.display().to_string();
    let cmd = match platform {
        Platform::Basalt => cmd
            .arg_pair("-machine", "pebble-snowy-bb")
            .arg_pair("-cpu", "cortex-m4")
            .arg_pair("-pflash", micro)
            .arg_pair("-pflash", spi),
        Platform::Aplite => cmd
            .arg_pair("-machine", "pebble-bb2")
            .arg_pair("-cpu", "cortex-m3")
            .arg_pair("-pflash", micro)
            .arg_pair("-mtdblock", spi),
    };

    LaunchCommand {
        inherit_output,
        ..cmd
    }
}

/// Options for the phone simulator command line
#[derive(Debug, Clone, Copy)]
pub struct PhoneSimArgs<'a> {
    pub script: &'a Path,
    pub layout_file: &'a Path,
    pub persist_dir: &'a Path,
    pub oauth_token: Option<&'a str>,
    /// Pass `--debug` to the simulator itself
    pub verbose: bool,
    pub inherit_output: bool,
}

pub fn phone_sim_command(args: PhoneSimArgs<'_>) -> LaunchCommand {
    let mut cmd = LaunchCommand::new(args.script)
        .arg_pair("--qemu", format!("{}:{}", PHONE_SIM_HOST, QEMU_BT_PORT))
        .arg_pair("--port", PHONE_SIM_PORT.to_string())
        .arg_pair("--persist", args.persist_dir.display().to_string())
        .arg_pair("--layout", args.layout_file.display().to_string());

    if args.verbose {
        cmd = cmd.arg("--debug");
    }
    if let Some(token) = args.oauth_token {
        cmd = cmd.arg_pair("--oauth", token);
    }

    LaunchCommand {
        inherit_output: args.inherit_output,
        ..cmd
    }
}

/// Capability to start a detached process and report its PID
pub trait Launcher {
    fn launch(&self, command: &LaunchCommand) -> Result<u32>;
}

/// Launcher that spawns real OS processes.
///
/// Must be used from within a Tokio runtime. Children are not waited on and are
/// not killed when the handle drops; they outlive the invocation that started them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, command: &LaunchCommand) -> Result<u32> {
        debug!("Launching: {}", command.display());

        let (stdout, stderr) = if command.inherit_output {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| Error::launch_failure(&command.program, e))?;

        // Dropping the handle leaves the child running; tokio reaps it in the
        // background if it exits while this process is still alive.
        child
            .id()
            .ok_or_else(|| Error::launch_failure(&command.program, "process exited immediately"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_value<'a>(cmd: &'a LaunchCommand, flag: &str) -> Vec<&'a str> {
        cmd.args
            .windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn test_basalt_emulator_command() {
        let cmd = emulator_command(
            Path::new("/sdk/qemu"),
            Platform::Basalt,
            Path::new("/sdk/micro.bin"),
            Path::new("/persist/spi.bin"),
            false,
        );

        assert_eq!(cmd.program, PathBuf::from("/sdk/qemu"));
        assert_eq!(flag_value(&cmd, "-machine"), vec!["pebble-snowy-bb"]);
        assert_eq!(flag_value(&cmd, "-cpu"), vec!["cortex-m4"]);
        assert_eq!(
            flag_value(&cmd, "-pflash"),
            vec!["/sdk/micro.bin", "/persist/spi.bin"]
        );
        assert!(flag_value(&cmd, "-mtdblock").is_empty());
        assert!(!cmd.inherit_output);
    }

    #[test]
    fn test_aplite_emulator_command() {
        let cmd = emulator_command(
            Path::new("/sdk/qemu"),
            Platform::Aplite,
            Path::new("/sdk/micro.bin"),
            Path::new("/persist/spi.bin"),
            true,
        );

        assert_eq!(flag_value(&cmd, "-machine"), vec!["pebble-bb2"]);
        assert_eq!(flag_value(&cmd, "-cpu"), vec!["cortex-m3"]);
        assert_eq!(flag_value(&cmd, "-pflash"), vec!["/sdk/micro.bin"]);
        assert_eq!(flag_value(&cmd, "-mtdblock"), vec!["/persist/spi.bin"]);
        assert!(cmd.inherit_output);
    }

    #[test]
    fn test_emulator_serial_ports() {
        let cmd = emulator_command(
            Path::new("/sdk/qemu"),
            Platform::Basalt,
            Path::new("/m"),
            Path::new("/s"),
            false,
        );

        assert_eq!(
            flag_value(&cmd, "-serial"),
            vec![
                "file:/dev/null",
                "tcp::12344,server,nowait",
                "tcp::12345,server,nowait"
            ]
        );
    }

    #[test]
    fn test_phone_sim_command() {
        let cmd = phone_sim_command(PhoneSimArgs {
            script: Path::new("/sdk/phonesim.py"),
            layout_file: Path::new("/sdk/layouts.json"),
            persist_dir: Path::new("/persist/basalt/3.0"),
            oauth_token: Some("abc123"),
            verbose: true,
            inherit_output: false,
        });

        assert_eq!(flag_value(&cmd, "--qemu"), vec!["localhost:12344"]);
        assert_eq!(flag_value(&cmd, "--port"), vec!["12342"]);
        assert_eq!(flag_value(&cmd, "--persist"), vec!["/persist/basalt/3.0"]);
        assert_eq!(flag_value(&cmd, "--layout"), vec!["/sdk/layouts.json"]);
        assert_eq!(flag_value(&cmd, "--oauth"), vec!["abc123"]);
        assert!(cmd.args.contains(&"--debug".to_string()));
    }

    #[test]
    fn test_phone_sim_command_without_token() {
        let cmd = phone_sim_command(PhoneSimArgs {
            script: Path::new("/sdk/phonesim.py"),
            layout_file: Path::new("/sdk/layouts.json"),
            persist_dir: Path::new("/persist"),
            oauth_token: None,
            verbose: false,
            inherit_output: false,
        });

        assert!(!cmd.args.contains(&"--oauth".to_string()));
        assert!(!cmd.args.contains(&"--debug".to_string()));
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = LaunchCommand::new("/bin/qemu").arg("-s").arg_pair("-cpu", "cortex-m3");
        assert_eq!(cmd.display(), "/bin/qemu -s -cpu cortex-m3");
    }

    #[tokio::test]
    async fn test_system_launcher_missing_binary() {
        let cmd = LaunchCommand::new("/nonexistent/qemu-system-arm");
        let err = SystemLauncher.launch(&cmd).unwrap_err();
        assert!(matches!(err, Error::LaunchFailure { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_launcher_child_outlives_handle() {
        use crate::probe::{ProcessProbe, SystemProbe};

        let cmd = LaunchCommand::new("/bin/sh").arg("-c").arg("sleep 30");
        let pid = SystemLauncher.launch(&cmd).unwrap();

        assert!(SystemProbe.is_alive(pid).unwrap());
        SystemProbe.kill(pid).unwrap();
    }
}
