// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers shared by the build scripts in this workspace.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};

/// M-profile architecture version of the target.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MProfile {
    V6,
    V7,
    V8,
}

/// Exposes the CPU's M-profile architecture version. This isn't available in
/// rustc's standard environment.
///
/// This sets one of `cfg(armv6m)`, `cfg(armv7m)`, or `cfg(armv8m)` depending
/// on the `TARGET` environment variable, and returns the version. Any other
/// target is treated as a hosted build, gets none of them, and returns
/// `None`.
pub fn expose_m_profile() -> Result<Option<MProfile>> {
    println!("cargo::rustc-check-cfg=cfg(armv6m, armv7m, armv8m)");

    let target = env::var("TARGET").context("TARGET not set")?;
    let profile = if target.starts_with("thumbv6m") {
        Some(MProfile::V6)
    } else if target.starts_with("thumbv7m") || target.starts_with("thumbv7em")
    {
        Some(MProfile::V7)
    } else if target.starts_with("thumbv8m") {
        Some(MProfile::V8)
    } else if target.starts_with("thumb") {
        anyhow::bail!("don't know the M-profile version of {target}");
    } else {
        None
    };
    match profile {
        Some(MProfile::V6) => println!("cargo:rustc-cfg=armv6m"),
        Some(MProfile::V7) => println!("cargo:rustc-cfg=armv7m"),
        Some(MProfile::V8) => println!("cargo:rustc-cfg=armv8m"),
        None => {}
    }
    Ok(profile)
}

/// Loads a TOML configuration file.
///
/// The path comes from the environment variable `var` if it is set, or else
/// `default` (relative to the crate being built). Cargo is told to rerun the
/// build script when either the variable or the file changes.
pub fn toml_from_env_or<T: DeserializeOwned>(
    var: &str,
    default: impl AsRef<Path>,
) -> Result<T> {
    println!("cargo:rerun-if-env-changed={var}");

    let path = match env::var_os(var) {
        Some(p) => PathBuf::from(p),
        None => {
            let dir = env::var("CARGO_MANIFEST_DIR")
                .context("CARGO_MANIFEST_DIR not set")?;
            Path::new(&dir).join(default)
        }
    };
    println!("cargo:rerun-if-changed={}", path.display());

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Writes `contents` to `name` in `OUT_DIR`, for pulling in with `include!`.
pub fn write_generated(name: &str, contents: &str) -> Result<()> {
    let out = env::var("OUT_DIR").context("OUT_DIR not set")?;
    let path = Path::new(&out).join(name);
    std::fs::write(&path, contents)
        .with_context(|| format!("writing {}", path.display()))
}
