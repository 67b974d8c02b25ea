//! Escalation Artifacts
//!
//! The escalation payload is a prebuilt shared library stored as text: `0x`
//! followed by the library bytes in hexadecimal. One file exists per supported
//! platform, and the platform table is closed: anything that does not map to one
//! of the four [`Platform`] variants is rejected.
//!
//! Payloads are validated when loaded, before any statement reaches the server.

use std::path::{Path, PathBuf};

use crate::error::{Result, UdfkitError};

/// Library base name written into the server's plugin directory
pub const LIBRARY_BASE_NAME: &str = "lib_mysqldudf_sys";

/// Operating-system family of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Linux,
}

impl OsFamily {
    /// Classify `@@version_compile_os`
    ///
    /// `Win32`, `Win64` and `Windows` are Windows; anything mentioning `linux`
    /// is Linux. Other values (`osx10.15`, `FreeBSD13.0`, ...) are not supported.
    #[must_use]
    pub fn detect(compile_os: &str) -> Option<Self> {
        let os = compile_os.trim().to_ascii_lowercase();
        if os.starts_with("win") {
            Some(Self::Windows)
        } else if os.contains("linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }

    /// Shared-library extension
    #[must_use]
    pub const fn library_extension(&self) -> &'static str {
        match self {
            Self::Windows => "dll",
            Self::Linux => "so",
        }
    }

    /// Path separator used on the target
    #[must_use]
    pub const fn separator(&self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Linux => '/',
        }
    }
}

/// Machine word width of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    X86,
}

impl Arch {
    /// Classify `@@version_compile_machine`: anything containing `64` is 64-bit
    #[must_use]
    pub fn detect(compile_machine: &str) -> Self {
        if compile_machine.contains("64") {
            Self::X64
        } else {
            Self::X86
        }
    }
}

/// The four platforms an artifact exists for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    WindowsX64,
    WindowsX86,
    LinuxX64,
    LinuxX86,
}

impl Platform {
    pub const ALL: [Self; 4] = [Self::WindowsX64, Self::WindowsX86, Self::LinuxX64, Self::LinuxX86];

    #[must_use]
    pub const fn from_parts(os: OsFamily, arch: Arch) -> Self {
        match (os, arch) {
            (OsFamily::Windows, Arch::X64) => Self::WindowsX64,
            (OsFamily::Windows, Arch::X86) => Self::WindowsX86,
            (OsFamily::Linux, Arch::X64) => Self::LinuxX64,
            (OsFamily::Linux, Arch::X86) => Self::LinuxX86,
        }
    }

    /// Select the platform for a fingerprinted server
    ///
    /// Returns `None` for an unrecognized OS family; there is no fallback.
    #[must_use]
    pub fn select(compile_os: &str, compile_machine: &str) -> Option<Self> {
        OsFamily::detect(compile_os).map(|os| Self::from_parts(os, Arch::detect(compile_machine)))
    }

    #[must_use]
    pub const fn os(&self) -> OsFamily {
        match self {
            Self::WindowsX64 | Self::WindowsX86 => OsFamily::Windows,
            Self::LinuxX64 | Self::LinuxX86 => OsFamily::Linux,
        }
    }

    #[must_use]
    pub const fn arch(&self) -> Arch {
        match self {
            Self::WindowsX64 | Self::LinuxX64 => Arch::X64,
            Self::WindowsX86 | Self::LinuxX86 => Arch::X86,
        }
    }

    /// Payload file name inside the artifact directory
    #[must_use]
    pub const fn payload_file(&self) -> &'static str {
        match self {
            Self::WindowsX64 => "udf_win64_hex.txt",
            Self::WindowsX86 => "udf_win32_hex.txt",
            Self::LinuxX64 => "udf_linux64_hex.txt",
            Self::LinuxX86 => "udf_linux32_hex.txt",
        }
    }

    /// Library file name on the target (`lib_mysqldudf_sys.so` / `.dll`)
    #[must_use]
    pub fn library_name(&self) -> String {
        format!("{LIBRARY_BASE_NAME}.{}", self.os().library_extension())
    }

    /// Destination of the library inside `plugin_dir`
    #[must_use]
    pub fn destination(&self, plugin_dir: &str) -> Destination {
        let separator = self.os().separator();
        let dir = plugin_dir.trim_end_matches(['/', '\\']);
        let native = format!("{dir}{separator}{}", self.library_name());
        let sql_path = native.replace('\\', "/");
        Destination { native, sql_path }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WindowsX64 => "windows-x64",
            Self::WindowsX86 => "windows-x86",
            Self::LinuxX64 => "linux-x64",
            Self::LinuxX86 => "linux-x86",
        };
        f.write_str(name)
    }
}

/// Where the library lands on the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Path with the target's own separator, for display
    pub native: String,
    /// Forward-slash path used inside SQL
    pub sql_path: String,
}

/// A validated payload, ready to be inlined as a hex literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayload {
    literal: String,
}

impl ArtifactPayload {
    /// Validate payload text: `0x` followed by an even number of hex digits
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| UdfkitError::artifact_error("payload does not start with 0x"))?;

        if digits.is_empty() {
            return Err(UdfkitError::artifact_error("payload is empty"));
        }

        hex::decode(digits)
            .map_err(|e| UdfkitError::artifact_error(format!("payload is not valid hex: {e}")))?;

        Ok(Self { literal: text.to_string() })
    }

    /// The `0x...` literal
    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Size of the decoded library in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        (self.literal.len() - 2) / 2
    }
}

/// Directory holding one payload file per platform
///
/// Read-only once constructed; safe to share across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, platform: Platform) -> PathBuf {
        self.root.join(platform.payload_file())
    }

    /// Read and validate the payload for `platform`
    pub fn load(&self, platform: Platform) -> Result<ArtifactPayload> {
        let path = self.path_for(platform);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            UdfkitError::artifact_error(format!("could not read {}: {e}", path.display()))
        })?;
        ArtifactPayload::parse(&text).map_err(|e| match e {
            UdfkitError::ArtifactError(detail) => {
                UdfkitError::artifact_error(format!("{}: {detail}", path.display()))
            }
            other => other,
        })
    }
}
