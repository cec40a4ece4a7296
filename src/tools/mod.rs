//! Vendor tool flows
//!
//! Each flow owns its settings, run directory, script buffer, and a runner
//! handle; its steps are free functions over that state, so the pipeline
//! can sequence and checkpoint them without knowing the vendor.

pub mod cadence;
pub mod genus;
pub mod innovus;
pub mod joules;
pub mod xcelium;

pub use genus::Genus;
pub use innovus::Innovus;
pub use joules::Joules;
pub use xcelium::Xcelium;

use crate::core::Settings;

/// The flow families this binary can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Par,
    Synthesis,
    Power,
    Sim,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ToolKind::Par => "par",
            ToolKind::Synthesis => "synthesis",
            ToolKind::Power => "power",
            ToolKind::Sim => "sim",
        };
        write!(f, "{}", name)
    }
}

impl ToolKind {
    /// Step names for a flow family, in execution order. These are the
    /// valid `--from-step` resume targets.
    pub fn step_names(&self) -> Vec<String> {
        match self {
            ToolKind::Par => Innovus::steps().iter().map(|s| s.name().to_string()).collect(),
            ToolKind::Synthesis => Genus::steps().iter().map(|s| s.name().to_string()).collect(),
            ToolKind::Power => Joules::steps().iter().map(|s| s.name().to_string()).collect(),
            ToolKind::Sim => Xcelium::steps().iter().map(|s| s.name().to_string()).collect(),
        }
    }

    /// Parse a tool name as written in a flow config's `tool` field.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "par" => Some(ToolKind::Par),
            "synthesis" | "syn" => Some(ToolKind::Synthesis),
            "power" => Some(ToolKind::Power),
            "sim" => Some(ToolKind::Sim),
            _ => None,
        }
    }

    /// Settings every flow of this family reads unconditionally. Validation
    /// checks these up front so a missing key fails before any script is
    /// generated, not three steps into a run.
    pub fn required_settings(&self) -> &'static [&'static str] {
        match self {
            ToolKind::Par => &[
                "cadence.CDS_LIC_FILE",
                "cadence.cadence_home",
                "par.innovus.innovus_bin",
                "par.inputs.top_module",
                "par.inputs.input_files",
                "vlsi.core.node",
                "vlsi.core.max_threads",
                "vlsi.technology.lef_files",
            ],
            ToolKind::Synthesis => &[
                "cadence.CDS_LIC_FILE",
                "cadence.cadence_home",
                "synthesis.genus.genus_bin",
                "synthesis.inputs.top_module",
                "synthesis.inputs.input_files",
                "vlsi.core.max_threads",
                "vlsi.technology.lef_files",
            ],
            ToolKind::Power => &[
                "cadence.CDS_LIC_FILE",
                "cadence.cadence_home",
                "power.joules.joules_bin",
                "power.inputs.level",
                "power.inputs.top_module",
                "power.inputs.tb_name",
                "power.inputs.tb_dut",
                "power.inputs.input_files",
                "vlsi.inputs.mmmc_corners",
                "vlsi.inputs.power_spec_type",
            ],
            ToolKind::Sim => &[
                "cadence.CDS_LIC_FILE",
                "cadence.cadence_home",
                "sim.xcelium.xcelium_bin",
                "sim.inputs.tb_name",
                "sim.inputs.input_files",
            ],
        }
    }

    /// Required settings absent from `settings`, in declaration order.
    pub fn missing_settings(&self, settings: &Settings) -> Vec<&'static str> {
        self.required_settings()
            .iter()
            .copied()
            .filter(|key| !settings.contains(key))
            .collect()
    }
}

/// Reject input files with unsupported extensions before any tool sees them.
pub(crate) fn check_input_files(files: &[String], allowed_ext: &[&str]) -> anyhow::Result<()> {
    for file in files {
        if !allowed_ext.iter().any(|ext| file.ends_with(ext)) {
            anyhow::bail!(
                "input file `{}` does not match supported extensions {:?}",
                file,
                allowed_ext
            );
        }
    }
    Ok(())
}

/// Tools run from their own working directory, so relative inputs are
/// anchored to where the flow was launched.
pub(crate) fn absolute_input_paths(files: &[String]) -> std::io::Result<Vec<String>> {
    let cwd = std::env::current_dir()?;
    Ok(files
        .iter()
        .map(|f| {
            let path = std::path::Path::new(f);
            if path.is_absolute() {
                f.clone()
            } else {
                cwd.join(path).display().to_string()
            }
        })
        .collect())
}
