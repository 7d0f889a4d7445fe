//! The image axis: core and vendor variants of device modules.
//!
//! Only split when a VNDK version is configured. Core variants carry an
//! empty image value, vendor variants `vendor`.

use super::CcKind;
use crate::arch::OsType;
use crate::consts::{LLNDK_LIBRARY_SUFFIX, PREBUILT_PREFIX};
use crate::module::{Axis, Module};
use crate::mutator::{Mutator, Phase, SharedRecord};
use crate::props::{ExtendPropertyError, Properties, Schema, compose_image, get_bool, lookup};

pub const CORE: &str = "";
pub const VENDOR: &str = "vendor";

/// Records LL-NDK and VNDK library names in the shared tables.
pub fn vndk_mutator() -> Mutator {
  Mutator::new("vndk", Phase::ImageSplit, |ctx| {
    let module = ctx.module();
    let Some(cc) = module.cc() else {
      return;
    };
    let vendor_available = get_bool(&module.props, "vendor_available").unwrap_or(false);
    let mut records = Vec::new();
    if cc.kind == CcKind::LlndkStub {
      let name = module.name.trim_end_matches(LLNDK_LIBRARY_SUFFIX).to_string();
      if !vendor_available {
        records.push(SharedRecord::VndkPrivate(name.clone()));
      }
      records.push(SharedRecord::Llndk(name));
    } else if cc.is_shared_library() && get_bool(&module.props, "vndk.enabled").unwrap_or(false) {
      let name = module.name.trim_start_matches(PREBUILT_PREFIX).to_string();
      if !vendor_available {
        records.push(SharedRecord::VndkPrivate(name.clone()));
      }
      if get_bool(&module.props, "vndk.support_system_process").unwrap_or(false) {
        records.push(SharedRecord::VndkSp(name));
      } else {
        records.push(SharedRecord::VndkCore(name));
      }
    }
    for record in records {
      ctx.record(record);
    }
  })
}

/// Whether the module is placed on the vendor partition.
fn soc_specific(props: &Properties) -> bool {
  get_bool(props, "vendor").unwrap_or(false) || get_bool(props, "proprietary").unwrap_or(false)
}

fn compose(module: &mut Module, schema: &Schema, vendor: bool) -> Result<(), ExtendPropertyError> {
  if vendor && lookup(&module.props, "target.vendor.export_include_dirs").is_some() {
    module.props.remove("export_include_dirs");
  }
  compose_image(&mut module.props, schema, vendor)?;
  if vendor && let Some(cc) = module.cc_mut() {
    cc.use_vndk = true;
  }
  Ok(())
}

/// Validates the vendor properties and creates the image variants.
pub fn image_mutator() -> Mutator {
  Mutator::new("image", Phase::ImageSplit, |ctx| {
    let module = ctx.module();
    let Some(cc) = module.cc() else {
      return;
    };
    let Some(schema) = ctx.types().schema(&module.module_type) else {
      return;
    };
    let kind = cc.kind;
    let props = &module.props;
    let vendor_available = get_bool(props, "vendor_available");
    let vndk_enabled = get_bool(props, "vndk.enabled").unwrap_or(false);
    let vndk_sp = get_bool(props, "vndk.support_system_process").unwrap_or(false);
    let soc = soc_specific(props);
    let no_sdk = props.get("sdk_version").and_then(|v| v.as_str()).is_none_or(str::is_empty);
    let android = module.os() == Some(OsType::Android);

    let images: Vec<&str> = if !android || ctx.config().vndk_version().is_none() {
      Vec::new()
    } else if kind == CcKind::LlndkStub {
      vec![VENDOR]
    } else if vendor_available == Some(true) {
      vec![CORE, VENDOR]
    } else if soc && no_sdk {
      vec![VENDOR]
    } else {
      vec![CORE]
    };

    if android && kind != CcKind::LlndkStub {
      if vendor_available.is_some() && soc {
        ctx.property_error(
          "vendor_available",
          "doesn't make sense at the same time as `vendor: true` or `proprietary: true`",
        );
        return;
      }
      if vndk_enabled && vendor_available.is_none() {
        ctx.property_error("vndk", "has to define `vendor_available: true` to enable vndk");
        return;
      }
      if !vndk_enabled && vndk_sp {
        ctx.property_error("vndk", "must set `enabled: true` to set `support_system_process: true`");
        return;
      }
    }

    let mut failures = Vec::new();
    if images.is_empty() {
      if let Err(err) = compose(ctx.module_mut(), &schema, false) {
        failures.push(err);
      }
    } else {
      let variants = ctx.create_variations(Axis::Image, &images);
      for (m, image) in variants.iter_mut().zip(&images) {
        if let Err(err) = compose(m, &schema, *image == VENDOR) {
          failures.push(err);
        }
      }
    }
    for err in failures {
      ctx.property_error(&err.property, err.kind.to_string());
    }
  })
}
