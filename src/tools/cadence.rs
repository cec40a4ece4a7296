//! Helpers shared by the Cadence-family tool flows

use crate::core::{Settings, SettingsError};
use indoc::{formatdoc, indoc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variables every Cadence tool invocation needs: user extras
/// first, then the common license/home variables on top.
pub fn cadence_env_vars(settings: &Settings) -> Result<Vec<(String, String)>, SettingsError> {
    let mut vars: Vec<(String, String)> = Vec::new();

    let extras: Vec<BTreeMap<String, String>> =
        settings.get_section_or_default("cadence.extra_env_vars")?;
    for map in extras {
        vars.extend(map.into_iter());
    }

    vars.push(("CDS_LIC_FILE".to_string(), settings.get_str("cadence.CDS_LIC_FILE")?));
    vars.push(("CADENCE_HOME".to_string(), settings.get_str("cadence.cadence_home")?));
    Ok(vars)
}

/// Orders versions shaped like `MAJOR_ISRMINOR` (fewer than 100 minor
/// releases assumed), e.g. `version_number("211_ISR3") == 21103`.
pub fn version_number(version: &str) -> u32 {
    let mut parts = version.split('_');
    let major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u32 = parts
        .next()
        .and_then(|p| p.strip_prefix("ISR"))
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    major * 100 + minor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerKind {
    Setup,
    Hold,
}

/// One analysis corner for multi-mode multi-corner setup.
#[derive(Debug, Clone, Deserialize)]
pub struct MmmcCorner {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CornerKind,
    pub voltage: f64,
    pub temp: f64,
    pub timing_libs: Vec<String>,
    #[serde(default)]
    pub qrc_tech: Option<String>,
}

pub fn mmmc_corners(settings: &Settings) -> Result<Vec<MmmcCorner>, SettingsError> {
    settings.get_section_or_default("vlsi.inputs.mmmc_corners")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConstraint {
    pub name: String,
    pub period_ns: f64,
    #[serde(default)]
    pub uncertainty_ns: Option<f64>,
}

pub fn clocks(settings: &Settings) -> Result<Vec<ClockConstraint>, SettingsError> {
    settings.get_section_or_default("vlsi.inputs.clocks")
}

/// SDC fragment constraining the configured clocks.
pub fn sdc_clock_constraints(settings: &Settings) -> Result<String, SettingsError> {
    let mut out = Vec::new();
    for clock in clocks(settings)? {
        out.push(format!(
            "create_clock {name} -name {name} -period {period}",
            name = clock.name,
            period = clock.period_ns
        ));
        if let Some(uncertainty) = clock.uncertainty_ns {
            out.push(format!(
                "set_clock_uncertainty {} [get_clocks {}]",
                uncertainty, clock.name
            ));
        }
    }
    Ok(out.join("\n"))
}

/// SDC fragment with default port constraints against the first clock.
pub fn sdc_pin_constraints(settings: &Settings) -> Result<String, SettingsError> {
    let clocks = clocks(settings)?;
    let Some(first) = clocks.first() else {
        return Ok(String::new());
    };
    Ok(formatdoc!(
        r#"set_load 1.0 [all_outputs]
           set_input_delay -clock {clk} 0 [all_inputs]
           set_output_delay -clock {clk} 0 [all_outputs]"#,
        clk = first.name
    ))
}

/// Contents of the `mmmc.tcl` analysis-view script.
///
/// Constraint-mode SDC fragments are written into `run_dir` as a side
/// effect; the timing script itself has to live in its own file because
/// `init_design` reads it separately from the main flow script.
pub fn generate_mmmc_script(settings: &Settings, run_dir: &Path) -> anyhow::Result<String> {
    let mut output: Vec<String> = Vec::new();
    let constraint_mode = "my_constraint_mode";

    let mut sdc_files: Vec<String> = Vec::new();
    let clock_frag = sdc_clock_constraints(settings)?;
    if !clock_frag.is_empty() {
        let path = run_dir.join("clock_constraints_fragment.sdc");
        std::fs::write(&path, clock_frag)?;
        sdc_files.push(path.display().to_string());
    }
    let pin_frag = sdc_pin_constraints(settings)?;
    if !pin_frag.is_empty() {
        let path = run_dir.join("pin_constraints_fragment.sdc");
        std::fs::write(&path, pin_frag)?;
        sdc_files.push(path.display().to_string());
    }
    sdc_files.extend(settings.get_str_list_or_empty("vlsi.inputs.custom_sdc_files")?);

    if sdc_files.is_empty() {
        // The constraint mode requires at least one SDC file.
        let blank = run_dir.join("blank.sdc");
        std::fs::write(&blank, "")?;
        sdc_files.push(blank.display().to_string());
    }
    output.push(format!(
        "create_constraint_mode -name {} -sdc_files [list {}]",
        constraint_mode,
        sdc_files.join(" ")
    ));

    let corners = mmmc_corners(settings)?;
    if !corners.is_empty() {
        // One setup and one hold corner; extras beyond the first of each
        // kind are ignored.
        let setup = corners.iter().find(|c| c.kind == CornerKind::Setup).unwrap_or(&corners[0]);
        let hold = corners.iter().find(|c| c.kind == CornerKind::Hold).unwrap_or(&corners[0]);

        for (corner, suffix) in [(setup, "setup"), (hold, "hold")] {
            output.push(format!(
                "create_library_set -name {n}.{s}_set -timing [list {libs}]",
                n = corner.name,
                s = suffix,
                libs = corner.timing_libs.join(" ")
            ));
            output.push(format!(
                "create_timing_condition -name {n}.{s}_cond -library_sets [list {n}.{s}_set]",
                n = corner.name,
                s = suffix
            ));
            let qrc = corner
                .qrc_tech
                .as_deref()
                .map(|q| format!(" -qrc_tech {}", q))
                .unwrap_or_default();
            output.push(format!(
                "create_rc_corner -name {n}.{s}_rc -temperature {temp}{qrc}",
                n = corner.name,
                s = suffix,
                temp = corner.temp,
                qrc = qrc
            ));
            output.push(format!(
                "create_delay_corner -name {n}.{s}_delay -timing_condition {n}.{s}_cond -rc_corner {n}.{s}_rc",
                n = corner.name,
                s = suffix
            ));
            output.push(format!(
                "create_analysis_view -name {n}.{s}_view -delay_corner {n}.{s}_delay -constraint_mode {mode}",
                n = corner.name,
                s = suffix,
                mode = constraint_mode
            ));
        }
        output.push(format!(
            "set_analysis_view -setup {{ {setup}.setup_view }} -hold {{ {hold}.hold_view }}",
            setup = setup.name,
            hold = hold.name
        ));
    } else {
        // No corners configured: single library set and view from the
        // technology-wide timing libraries.
        let timing_libs = settings.get_str_list_or_empty("vlsi.technology.timing_libs")?;
        output.push(format!(
            "create_library_set -name my_lib_set -timing [list {}]",
            timing_libs.join(" ")
        ));
        output.push("create_timing_condition -name my_timing_condition -library_sets [list my_lib_set]".to_string());
        output.push(format!(
            "create_rc_corner -name rc_cond -temperature {}",
            settings.get_str_or("vlsi.technology.default_temperature", "120")
        ));
        output.push(
            "create_delay_corner -name my_delay_corner -timing_condition my_timing_condition -rc_corner rc_cond"
                .to_string(),
        );
        output.push(format!(
            "create_analysis_view -name my_view -delay_corner my_delay_corner -constraint_mode {}",
            constraint_mode
        ));
        output.push("set_analysis_view -setup { my_view } -hold { my_view }".to_string());
    }

    Ok(output.join("\n"))
}

/// The analysis view `write_sdc` should target: the setup corner's view if
/// corners are configured, the cornerless fallback view otherwise.
pub fn setup_view_name(settings: &Settings) -> Result<String, SettingsError> {
    let corners = mmmc_corners(settings)?;
    Ok(corners
        .iter()
        .find(|c| c.kind == CornerKind::Setup)
        .map(|c| format!("{}.setup_view", c.name))
        .unwrap_or_else(|| "my_view".to_string()))
}

/// Guarded `set_dont_use` commands for the configured cell list. Each cell
/// is checked for existence first so a stale list does not error the tool.
pub fn dont_use_commands(settings: &Settings) -> Result<Vec<String>, SettingsError> {
    let cells = settings.get_str_list_or_empty("vlsi.inputs.dont_use_list")?;
    Ok(cells
        .iter()
        .map(|cell| {
            // "*/" scopes the expression for "get_db lib_cells".
            let mapped = if cell.starts_with("*/") { cell.clone() } else { format!("*/{}", cell) };
            let get_db = format!("[get_db lib_cells {}]", mapped);
            let escaped = get_db.replace('[', "\\[").replace(']', "\\]");
            formatdoc!(
                r#"puts "set_dont_use {escaped}"
                   if {{ {get_db} ne "" }} {{
                       set_dont_use {get_db}
                   }} else {{
                       puts "WARNING: cell {mapped} was not found for set_dont_use"
                   }}"#
            )
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerSpecType {
    Cpf,
    Upf,
}

/// Commands that load a power specification, writing the spec contents to a
/// file in `run_dir` first. Returns no commands in `empty` mode.
pub fn power_spec_commands(settings: &Settings, run_dir: &Path) -> anyhow::Result<Vec<String>> {
    let spec_type = match settings.get_str("vlsi.inputs.power_spec_type")?.as_str() {
        "cpf" => PowerSpecType::Cpf,
        "upf" => PowerSpecType::Upf,
        other => anyhow::bail!("invalid power specification type `{}`; only `cpf` or `upf` supported", other),
    };

    let mode = settings.get_str_or("vlsi.inputs.power_spec_mode", "empty");
    let contents = match mode.as_str() {
        "empty" => return Ok(Vec::new()),
        "manual" => settings.get_str("vlsi.inputs.power_spec_contents")?,
        "auto" => match spec_type {
            PowerSpecType::Cpf => auto_cpf_spec(settings)?,
            PowerSpecType::Upf => {
                anyhow::bail!("auto power spec generation supports cpf only; provide upf contents in manual mode")
            }
        },
        other => anyhow::bail!("invalid power specification mode `{}`", other),
    };

    let (ext, arg) = match spec_type {
        PowerSpecType::Cpf => ("cpf", "cpf"),
        PowerSpecType::Upf => ("upf", "1801"),
    };
    let spec_file = run_dir.join(format!("power_spec.{}", ext));
    std::fs::write(&spec_file, contents)?;

    Ok(vec![
        format!("read_power_intent -{} {}", arg, spec_file.display()),
        "commit_power_intent".to_string(),
    ])
}

/// Minimal single-domain CPF from the configured supply nets.
fn auto_cpf_spec(settings: &Settings) -> anyhow::Result<String> {
    let top = settings.get_str("vlsi.inputs.top_module")?;
    let power = settings.get_str_or("vlsi.inputs.supplies.power", "VDD");
    let ground = settings.get_str_or("vlsi.inputs.supplies.ground", "VSS");
    Ok(formatdoc!(
        r#"set_cpf_version 1.0e
           set_hierarchy_separator /
           set_design {top}
           create_power_nets -nets {power}
           create_ground_nets -nets {ground}
           create_power_domain -name AO -default
           update_power_domain -name AO -primary_power_net {power} -primary_ground_net {ground}
           end_design"#
    ))
}

/// TCL block that dumps sequential cells and register paths to
/// `find_regs.json` for downstream register forcing.
pub fn write_regs_tcl() -> &'static str {
    indoc! {r#"
        set write_regs_ir "./find_regs.json"
        set write_regs_ir [open $write_regs_ir "w"]
        puts $write_regs_ir "\{"
        puts $write_regs_ir {   "seq_cells" : [}

        set refs [get_db [get_db lib_cells -if .is_flop==true] .base_name]

        set len [llength $refs]

        for {set i 0} {$i < [llength $refs]} {incr i} {
            if {$i == $len - 1} {
                puts $write_regs_ir "    \"[lindex $refs $i]\""
            } else {
                puts $write_regs_ir "    \"[lindex $refs $i]\","
            }
        }

        puts $write_regs_ir "  \],"
        puts $write_regs_ir {   "reg_paths" : [}

        set regs [get_db [all_registers -edge_triggered -output_pins] .name]

        set len [llength $regs]

        for {set i 0} {$i < [llength $regs]} {incr i} {
            set myreg [lindex $regs $i]
            if {$i == $len - 1} {
                puts $write_regs_ir "    \"$myreg\""
            } else {
                puts $write_regs_ir "    \"$myreg\","
            }
        }

        puts $write_regs_ir "  \]"

        puts $write_regs_ir "\}"
        close $write_regs_ir
    "#}
}
