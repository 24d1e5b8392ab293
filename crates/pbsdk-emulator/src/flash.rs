//! Persistent SPI flash images
//!
//! The emulator boots from a writable SPI flash image that holds the watch's
//! persisted state (installed apps, settings). One image exists per
//! (platform, SDK version) pair:
//!
//! ```text
//! <persist-root>/<platform>/<sdk-version>/qemu_spi_flash.bin
//! ```
//!
//! Images start as a copy of the SDK's pristine template and survive emulator
//! restarts until wiped.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use pbsdk_core::prelude::*;
use pbsdk_core::sdk::SPI_FLASH_FILENAME;
use pbsdk_core::{Platform, SdkLayout};

/// Flash images for one SDK version
#[derive(Debug, Clone)]
pub struct FlashStore {
    root: PathBuf,
    sdk_version: String,
}

impl FlashStore {
    pub fn new(root: impl Into<PathBuf>, sdk_version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            sdk_version: sdk_version.into(),
        }
    }

    /// Directory holding all persisted state for a platform on this SDK version.
    /// The phone simulator persists into the same directory.
    pub fn persist_dir(&self, platform: Platform) -> PathBuf {
        self.root.join(platform.as_str()).join(&self.sdk_version)
    }

    pub fn image_path(&self, platform: Platform) -> PathBuf {
        self.persist_dir(platform).join(SPI_FLASH_FILENAME)
    }

    /// Return the image for `platform`, copying it from the SDK template first if needed.
    pub fn ensure_image(&self, sdk: &SdkLayout, platform: Platform) -> Result<PathBuf> {
        let image = self.image_path(platform);
        if image.exists() {
            return Ok(image);
        }

        let template = sdk.spi_flash_template(platform);
        debug!("Flash image not found: {:?}", image);
        if !template.exists() {
            debug!("Required QEMU file not found: {:?}", template);
            return Err(Error::unsupported_sdk(template));
        }

        let dir = self.persist_dir(platform);
        fs::create_dir_all(&dir).map_err(|e| Error::persistence_write(&dir, e))?;

        debug!("Copying {} SPI image to {:?}", platform, image);
        fs::copy(&template, &image).map_err(|e| Error::persistence_write(&image, e))?;

        Ok(image)
    }

    /// Delete the image for `platform`. Returns whether an image was removed.
    pub fn wipe(&self, platform: Platform) -> Result<bool> {
        let image = self.image_path(platform);
        match fs::remove_file(&image) {
            Ok(()) => {
                info!("Wiped {} flash image at {:?}", platform, image);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::persistence_write(&image, e)),
        }
    }

    /// Delete the images for `platform`, or for every known platform when `None`.
    /// Returns the paths actually removed.
    pub fn wipe_matching(&self, platform: Option<Platform>) -> Result<Vec<PathBuf>> {
        let platforms = match platform {
            Some(p) => vec![p],
            None => Platform::ALL.to_vec(),
        };

        let mut removed = Vec::new();
        for platform in platforms {
            if self.wipe(platform)? {
                removed.push(self.image_path(platform));
            }
        }
        Ok(removed)
    }
}
