//! SDK distribution layout
//!
//! An installed SDK ships the emulator binaries and per-platform flash images
//! under a fixed directory convention:
//!
//! ```text
//! <sdk>/Pebble/common/qemu/qemu-system-arm_<OS>_<arch>
//! <sdk>/Pebble/common/phonesim/phonesim.py
//! <sdk>/Pebble/<platform>/qemu/qemu_micro_flash.bin
//! <sdk>/Pebble/<platform>/qemu/qemu_spi_flash.bin
//! <sdk>/Pebble/<platform>/qemu/layouts.json
//! ```

use std::path::{Path, PathBuf};

use crate::platform::Platform;

/// File name of the SPI flash image, both in the SDK and in the persistence store
pub const SPI_FLASH_FILENAME: &str = "qemu_spi_flash.bin";

const MICRO_FLASH_FILENAME: &str = "qemu_micro_flash.bin";
const LAYOUT_FILENAME: &str = "layouts.json";

/// Path conventions of an installed SDK distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkLayout {
    root: PathBuf,
}

impl SdkLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pebble_dir(&self) -> PathBuf {
        self.root.join("Pebble")
    }

    fn platform_qemu_dir(&self, platform: Platform) -> PathBuf {
        self.pebble_dir().join(platform.as_str()).join("qemu")
    }

    /// Plain-text file naming the installed SDK version
    pub fn version_file(&self) -> PathBuf {
        self.pebble_dir().join("VERSION")
    }

    /// QEMU binary built for the host OS and architecture
    pub fn emulator_binary(&self) -> PathBuf {
        self.pebble_dir()
            .join("common")
            .join("qemu")
            .join(format!("qemu-system-arm_{}", host_tag()))
    }

    /// Phone simulator entry point
    pub fn phone_sim_script(&self) -> PathBuf {
        self.pebble_dir()
            .join("common")
            .join("phonesim")
            .join("phonesim.py")
    }

    /// Read-only micro flash (firmware) image
    pub fn micro_flash(&self, platform: Platform) -> PathBuf {
        self.platform_qemu_dir(platform).join(MICRO_FLASH_FILENAME)
    }

    /// Pristine SPI flash image copied into the persistence store on first use
    pub fn spi_flash_template(&self, platform: Platform) -> PathBuf {
        self.platform_qemu_dir(platform).join(SPI_FLASH_FILENAME)
    }

    /// Screen layout description handed to the phone simulator
    pub fn layout_file(&self, platform: Platform) -> PathBuf {
        self.platform_qemu_dir(platform).join(LAYOUT_FILENAME)
    }
}

/// `<OS>_<arch>` suffix of the bundled QEMU binary, e.g. `Linux_x86_64` or `Darwin_arm64`
pub fn host_tag() -> String {
    host_tag_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn host_tag_for(os: &str, arch: &str) -> String {
    let os_name = match os {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    };

    // macOS reports Apple Silicon as arm64, everything else keeps Rust's name
    let machine = match (os, arch) {
        ("macos", "aarch64") => "arm64",
        (_, arch) => arch,
    };

    format!("{}_{}", os_name, machine)
}
