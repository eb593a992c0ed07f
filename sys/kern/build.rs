// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Write;

use anyhow::{bail, Result};
use build_util::MProfile;
use serde::Deserialize;

/// Region granularity of the MPU, in bytes.
const GRANULE: u64 = 32;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MemoryMap {
    kernel_flash: Area,
    kernel_ram: Area,
    peripherals: Area,
    boardcaps: Area,
    bootloader: Area,
    bootargs: Area,
    otp: Area,
    flash_ob: Area,
    secret: Area,
    storage1: Area,
    storage2: Area,
    assets: Area,
    unused_flash: Area,
    #[serde(default)]
    saes: Area,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Area {
    start: u64,
    size: u64,
}

impl MemoryMap {
    fn areas(&self) -> [(&'static str, &Area); 14] {
        [
            ("kernel_flash", &self.kernel_flash),
            ("kernel_ram", &self.kernel_ram),
            ("peripherals", &self.peripherals),
            ("boardcaps", &self.boardcaps),
            ("bootloader", &self.bootloader),
            ("bootargs", &self.bootargs),
            ("otp", &self.otp),
            ("flash_ob", &self.flash_ob),
            ("secret", &self.secret),
            ("storage1", &self.storage1),
            ("storage2", &self.storage2),
            ("assets", &self.assets),
            ("unused_flash", &self.unused_flash),
            ("saes", &self.saes),
        ]
    }
}

impl Area {
    fn is_present(&self) -> bool {
        self.start != 0 && self.size != 0
    }

    fn end(&self) -> u64 {
        self.start + self.size
    }

    /// A power of two on a multiple of itself, the only shape an ARMv7-M
    /// region can take.
    fn is_natural(&self) -> bool {
        self.size.is_power_of_two() && self.start % self.size == 0
    }
}

fn check(map: &MemoryMap, profile: Option<MProfile>) -> Result<()> {
    let areas = map.areas();
    for (name, area) in areas {
        if area.start % GRANULE != 0 || area.size % GRANULE != 0 {
            bail!("{name}: {:#x}+{:#x} is not {GRANULE}-byte aligned",
                area.start, area.size);
        }
        if area.end() > 1 << 32 {
            bail!("{name}: runs off the end of the address space");
        }
        if profile == Some(MProfile::V7)
            && area.is_present()
            && !area.is_natural()
        {
            bail!("{name}: {:#x}+{:#x} can't be mapped by an ARMv7-M MPU",
                area.start, area.size);
        }
    }

    let present = areas.iter().filter(|(_, a)| a.is_present());
    for (i, (name, a)) in present.clone().enumerate() {
        for (other, b) in present.clone().skip(i + 1) {
            if a.start < b.end() && b.start < a.end() {
                bail!("{name} and {other} overlap");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let profile = build_util::expose_m_profile()?;

    let map: MemoryMap =
        build_util::toml_from_env_or("KERN_MEMORY_MAP", "memory.toml")?;
    check(&map, profile)?;

    let mut out = String::new();
    writeln!(out, "/// Memory map of the board this kernel was built for.")?;
    writeln!(out, "pub const BOARD_MEMORY: MemoryMap = MemoryMap {{")?;
    for (name, area) in map.areas() {
        writeln!(
            out,
            "    {name}: Area::new({:#x}, {:#x}),",
            area.start, area.size
        )?;
    }
    writeln!(out, "}};")?;

    build_util::write_generated("memory_map.rs", &out)
}
