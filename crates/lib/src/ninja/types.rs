use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The rules the pipeline emits edges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
  Cc,
  Ld,
  PartialLd,
  Ar,
  DarwinAr,
  DarwinAppendAr,
  Strip,
  DarwinStrip,
  PrefixSymbols,
  Toc,
  ClangTidy,
  Yasm,
  #[serde(rename = "sAbiDump")]
  SAbiDump,
  #[serde(rename = "sAbiLink")]
  SAbiLink,
  #[serde(rename = "sAbiDiff")]
  SAbiDiff,
  #[serde(rename = "unzipRefSAbiDump")]
  UnzipRefSAbiDump,
  CopyGccLib,
  Yacc,
  Lex,
  Aidl,
  Proto,
  RsCpp,
  Cp,
  EmptyFile,
  NdkStubGen,
  Genrule,
  Error,
}

/// The declaration of a rule in the Ninja file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDef {
  pub command: &'static str,
  pub depfile: Option<&'static str>,
  pub deps_gcc: bool,
  pub rspfile: Option<&'static str>,
  pub rspfile_content: Option<&'static str>,
  pub restat: bool,
}

impl RuleDef {
  const fn cmd(command: &'static str) -> Self {
    Self {
      command,
      depfile: None,
      deps_gcc: false,
      rspfile: None,
      rspfile_content: None,
      restat: false,
    }
  }

  const fn gcc_deps(mut self, depfile: &'static str) -> Self {
    self.depfile = Some(depfile);
    self.deps_gcc = true;
    self
  }

  const fn rsp(mut self) -> Self {
    self.rspfile = Some("${out}.rsp");
    self.rspfile_content = Some("${in}");
    self
  }

  const fn restat(mut self) -> Self {
    self.restat = true;
    self
  }
}

impl Rule {
  pub fn name(&self) -> &'static str {
    match self {
      Rule::Cc => "cc",
      Rule::Ld => "ld",
      Rule::PartialLd => "partialLd",
      Rule::Ar => "ar",
      Rule::DarwinAr => "darwinAr",
      Rule::DarwinAppendAr => "darwinAppendAr",
      Rule::Strip => "strip",
      Rule::DarwinStrip => "darwinStrip",
      Rule::PrefixSymbols => "prefixSymbols",
      Rule::Toc => "toc",
      Rule::ClangTidy => "clangTidy",
      Rule::Yasm => "yasm",
      Rule::SAbiDump => "sAbiDump",
      Rule::SAbiLink => "sAbiLink",
      Rule::SAbiDiff => "sAbiDiff",
      Rule::UnzipRefSAbiDump => "unzipRefSAbiDump",
      Rule::CopyGccLib => "copyGccLib",
      Rule::Yacc => "yacc",
      Rule::Lex => "lex",
      Rule::Aidl => "aidl",
      Rule::Proto => "proto",
      Rule::RsCpp => "rsCpp",
      Rule::Cp => "cp",
      Rule::EmptyFile => "emptyFile",
      Rule::NdkStubGen => "ndkStubGen",
      Rule::Genrule => "genrule",
      Rule::Error => "error",
    }
  }

  pub fn definition(&self) -> RuleDef {
    match self {
      Rule::Cc => RuleDef::cmd("$ccCmd -c $cFlags -MD -MF ${out}.d -o $out $in").gcc_deps("${out}.d"),
      Rule::Ld => RuleDef::cmd("$ldCmd ${crtBegin} @${out}.rsp ${libFlags} ${crtEnd} -o ${out} ${ldFlags}").rsp(),
      Rule::PartialLd => RuleDef::cmd("$ldCmd -nostdlib -Wl,-r @${out}.rsp -o ${out} ${ldFlags}").rsp(),
      Rule::Ar => RuleDef::cmd("rm -f ${out} && ${arCmd} ${arFlags} ${out} @${out}.rsp").rsp(),
      Rule::DarwinAr => RuleDef::cmd("rm -f ${out} && ${arCmd} ${arFlags} ${out} ${in}"),
      Rule::DarwinAppendAr => {
        RuleDef::cmd("cp -f ${inAr} ${out}.tmp && ${arCmd} ${arFlags} ${out}.tmp ${in} && mv ${out}.tmp ${out}")
      }
      Rule::Strip => {
        RuleDef::cmd("CROSS_COMPILE=$crossCompile ${stripPath} ${args} -i ${in} -o ${out} -d ${out}.d")
          .gcc_deps("${out}.d")
      }
      Rule::DarwinStrip => RuleDef::cmd("${stripCmd} -u -r -o ${out} ${in}"),
      Rule::PrefixSymbols => RuleDef::cmd("${objcopyCmd} --prefix-symbols=${prefix} ${in} ${out}"),
      Rule::Toc => RuleDef::cmd("CROSS_COMPILE=$crossCompile ${tocPath} -i ${in} -o ${out} -d ${out}.d")
        .gcc_deps("${out}.d")
        .restat(),
      Rule::ClangTidy => RuleDef::cmd("rm -f ${out} && ${tidyCmd} ${tidyFlags} ${in} -- ${cFlags} && touch ${out}"),
      Rule::Yasm => RuleDef::cmd("${yasmCmd} ${asFlags} -o ${out} ${in} && ${yasmCmd} ${asFlags} -M ${in} >${out}.d")
        .gcc_deps("${out}.d"),
      Rule::SAbiDump => RuleDef::cmd("rm -f ${out} && ${sAbiDumper} -o ${out} ${in} ${exportDirs} -- ${cFlags} -w"),
      Rule::SAbiLink => {
        RuleDef::cmd("${sAbiLinker} -o ${out} ${symbolFilter} -arch ${arch} ${exportedHeaderFlags} @${out}.rsp").rsp()
      }
      Rule::SAbiDiff => RuleDef::cmd(
        "${sAbiDiffer} ${allowFlags} -lib ${libName} -arch ${arch} -check-all-apis -o ${out} -new ${in} -old ${referenceDump}",
      ),
      Rule::UnzipRefSAbiDump => RuleDef::cmd("gunzip -c ${in} > ${out}"),
      Rule::CopyGccLib => {
        RuleDef::cmd("rm -f ${out} && cp -f `${ccCmd} ${cFlags} -print-file-name=${libName}` ${out}")
      }
      Rule::Yacc => RuleDef::cmd("${yaccCmd} -d ${yaccFlags} --defines=${hFile} -o ${out} ${in}"),
      Rule::Lex => RuleDef::cmd("${lexCmd} -o${out} ${in}"),
      Rule::Aidl => RuleDef::cmd("${aidlCmd} -d${out}.d -o ${outDir} ${aidlFlags} ${in}").gcc_deps("${out}.d"),
      Rule::Proto => RuleDef::cmd("${protocCmd} --cpp_out=${outDir} ${protoFlags} ${in}"),
      Rule::RsCpp => {
        RuleDef::cmd("${rsCmd} -o ${outDir} -d ${outDir} -a ${out} -MD -reflect-c++ ${rsFlags} ${in}")
          .gcc_deps("${out}.d")
      }
      Rule::Cp => RuleDef::cmd("cp -f ${in} ${out}"),
      Rule::EmptyFile => RuleDef::cmd("rm -f ${out} && touch ${out}"),
      Rule::NdkStubGen => RuleDef::cmd("${toolPath} --arch ${arch} --api ${apiLevel} ${vndk} ${in} ${out}"),
      Rule::Genrule => RuleDef::cmd("${cmd}").restat(),
      Rule::Error => RuleDef::cmd("echo \"${error}\" && false"),
    }
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// One build step handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEdge {
  pub rule: Rule,
  pub outputs: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub implicit_outputs: Vec<String>,
  pub inputs: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub implicits: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub order_only: Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub optional: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub depfile: Option<String>,
}

impl BuildEdge {
  pub fn new(rule: Rule) -> Self {
    Self {
      rule,
      outputs: Vec::new(),
      implicit_outputs: Vec::new(),
      inputs: Vec::new(),
      implicits: Vec::new(),
      order_only: Vec::new(),
      args: BTreeMap::new(),
      description: None,
      optional: false,
      depfile: None,
    }
  }

  pub fn output(mut self, path: impl Into<String>) -> Self {
    self.outputs.push(path.into());
    self
  }

  pub fn implicit_output(mut self, path: impl Into<String>) -> Self {
    self.implicit_outputs.push(path.into());
    self
  }

  pub fn input(mut self, path: impl Into<String>) -> Self {
    self.inputs.push(path.into());
    self
  }

  pub fn inputs<I, S>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.inputs.extend(paths.into_iter().map(Into::into));
    self
  }

  pub fn implicits<I, S>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.implicits.extend(paths.into_iter().map(Into::into));
    self
  }

  pub fn order_only<I, S>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.order_only.extend(paths.into_iter().map(Into::into));
    self
  }

  pub fn arg(mut self, key: &str, value: impl Into<String>) -> Self {
    self.args.insert(key.to_string(), value.into());
    self
  }

  pub fn description(mut self, text: impl Into<String>) -> Self {
    self.description = Some(text.into());
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn with_depfile(mut self, path: impl Into<String>) -> Self {
    self.depfile = Some(path.into());
    self
  }

  /// An edge producing the same outputs that fails with `message` when
  /// anything asks for them.
  pub fn into_error(self, message: &str) -> BuildEdge {
    BuildEdge {
      rule: Rule::Error,
      outputs: self.outputs,
      implicit_outputs: self.implicit_outputs,
      description: self.description,
      optional: self.optional,
      ..BuildEdge::new(Rule::Error)
    }
    .arg("error", message)
  }
}
