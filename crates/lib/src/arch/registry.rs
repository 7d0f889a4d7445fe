//! Known architecture variants, CPU variants and features.
//!
//! Sub-block names under `arch.<type>` are the normalised forms of these
//! names, with `-` and `.` replaced by `_`.

use super::types::ArchType;

pub fn arch_variants(arch: ArchType) -> &'static [&'static str] {
  match arch {
    ArchType::Arm => &[
      "armv7-a",
      "armv7-a-neon",
      "armv8-a",
      "armv8-2a",
      "cortex-a7",
      "cortex-a8",
      "cortex-a9",
      "cortex-a15",
      "cortex-a53",
      "cortex-a53.a57",
      "cortex-a55",
      "cortex-a73",
      "cortex-a75",
      "krait",
      "kryo",
      "exynos-m1",
      "exynos-m2",
      "denver",
    ],
    ArchType::Arm64 => &[
      "armv8_a",
      "armv8_2a",
      "cortex-a53",
      "cortex-a55",
      "cortex-a73",
      "cortex-a75",
      "kryo",
      "exynos-m1",
      "exynos-m2",
      "denver64",
    ],
    ArchType::Mips => &[
      "mips32_fp",
      "mips32r2_fp",
      "mips32r2_fp_xburst",
      "mips32r2dsp_fp",
      "mips32r2dspr2_fp",
      "mips32r6",
    ],
    ArchType::Mips64 => &["mips64r2", "mips64r6"],
    ArchType::X86 => &["atom", "haswell", "ivybridge", "sandybridge", "silvermont", "x86_64"],
    ArchType::X86_64 => &["haswell", "ivybridge", "sandybridge", "silvermont"],
    ArchType::Common => &[],
  }
}

pub fn arch_features(arch: ArchType) -> &'static [&'static str] {
  match arch {
    ArchType::Arm => &["neon"],
    ArchType::Mips => &["dspr2", "rev6", "msa"],
    ArchType::Mips64 => &["rev6", "msa"],
    ArchType::X86 => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt", "movbe"],
    ArchType::X86_64 => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt"],
    ArchType::Arm64 | ArchType::Common => &[],
  }
}

const X86_64_BASELINE: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "popcnt"];

/// Features implied by an arch variant; `""` is the baseline.
pub fn features_for_variant(arch: ArchType, variant: &str) -> &'static [&'static str] {
  match (arch, variant) {
    (ArchType::Arm, "armv7-a-neon" | "armv8-a" | "armv8-2a") => &["neon"],
    (ArchType::Mips, "mips32r2dspr2_fp") => &["dspr2"],
    (ArchType::Mips, "mips32r6") | (ArchType::Mips64, "mips64r6") => &["rev6"],
    (ArchType::X86, "atom") => &["ssse3", "movbe"],
    (ArchType::X86, "haswell") => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt", "movbe"],
    (ArchType::X86, "ivybridge") | (ArchType::X86_64, "ivybridge") | (ArchType::X86_64, "haswell") => {
      &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt"]
    }
    (ArchType::X86, "sandybridge") | (ArchType::X86_64, "sandybridge") => {
      &["ssse3", "sse4", "sse4_1", "sse4_2", "popcnt"]
    }
    (ArchType::X86, "silvermont") => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"],
    (ArchType::X86_64, "silvermont") => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt"],
    (ArchType::X86, "x86_64") | (ArchType::X86_64, "") => X86_64_BASELINE,
    _ => &[],
  }
}

/// Normalises a variant or feature name into a property sub-block name.
pub fn variant_block_name(name: &str) -> String {
  name.replace(['-', '.'], "_")
}

/// Every sub-block name accepted under `arch.<arch>`.
pub fn arch_sub_blocks(arch: ArchType) -> Vec<String> {
  let mut names: Vec<String> = arch_variants(arch)
    .iter()
    .chain(arch_features(arch))
    .map(|name| variant_block_name(name))
    .collect();
  names.sort();
  names.dedup();
  names
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn block_names_are_normalised() {
    assert_eq!(variant_block_name("armv7-a-neon"), "armv7_a_neon");
    assert_eq!(variant_block_name("cortex-a53.a57"), "cortex_a53_a57");
  }

  #[test]
  fn sub_blocks_cover_variants_and_features() {
    let blocks = arch_sub_blocks(ArchType::Arm);
    assert!(blocks.contains(&"armv7_a_neon".to_string()));
    assert!(blocks.contains(&"neon".to_string()));
    assert!(arch_sub_blocks(ArchType::Common).is_empty());
  }

  #[test]
  fn variant_features() {
    assert_eq!(features_for_variant(ArchType::Arm, "armv7-a-neon"), &["neon"]);
    assert_eq!(features_for_variant(ArchType::X86_64, ""), X86_64_BASELINE);
    assert!(features_for_variant(ArchType::Arm64, "").is_empty());
  }
}
