//! Power-analysis flow for Cadence Joules

use crate::core::{CheckpointIo, EmitsCommands, NoCheckpoints, ScriptBuffer, Settings, Step};
use crate::execution::{Finalize, OutputStyle, PipelineError, ToolRunner};
use crate::tools::cadence::{self, CornerKind};
use async_trait::async_trait;
use indoc::formatdoc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Power level the inputs are analyzed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowLevel {
    Rtl,
    Gate,
}

/// A toggle-bounded report window from `power.inputs.reports`.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerReportConfig {
    pub num_toggles: usize,
    pub toggle_signal: String,
    pub levels: usize,
}

pub struct Joules {
    settings: Settings,
    run_dir: PathBuf,
    script: ScriptBuffer,
    runner: Arc<dyn ToolRunner>,
    joules_bin: String,
    env: Vec<(String, String)>,
}

impl EmitsCommands for Joules {
    fn script(&mut self) -> &mut ScriptBuffer {
        &mut self.script
    }
}

impl Joules {
    pub fn new(
        settings: Settings,
        run_dir: PathBuf,
        runner: Arc<dyn ToolRunner>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&run_dir)?;
        let joules_bin = settings.get_str("power.joules.joules_bin")?;
        let mut env = cadence::cadence_env_vars(&settings)?;
        env.push(("JOULES_BIN".to_string(), joules_bin.clone()));

        Ok(Self {
            settings,
            run_dir,
            script: ScriptBuffer::new(),
            runner,
            joules_bin,
            env,
        })
    }

    pub fn steps() -> Vec<Step<Self>> {
        vec![
            Step::new("init_technology", Self::init_technology),
            Step::new("init_design", Self::init_design),
        ]
    }

    pub fn checkpoints() -> Box<dyn CheckpointIo<Self>> {
        // Joules runs are short; the flow re-runs from scratch rather than
        // checkpointing the power database.
        Box::new(NoCheckpoints)
    }

    fn level(&self) -> anyhow::Result<FlowLevel> {
        Ok(self.settings.get_section("power.inputs.level")?)
    }

    fn init_technology(&mut self) -> anyhow::Result<()> {
        let corners = cadence::mmmc_corners(&self.settings)?;
        if corners.is_empty() {
            anyhow::bail!("power analysis requires at least one corner in vlsi.inputs.mmmc_corners");
        }
        let setup = corners.iter().find(|c| c.kind == CornerKind::Setup).unwrap_or(&corners[0]);
        let hold = corners.iter().find(|c| c.kind == CornerKind::Hold).unwrap_or(&corners[0]);

        self.script.verbose_append(format!(
            "read_libs {} {}",
            hold.timing_libs.join(" "),
            setup.timing_libs.join(" ")
        ));
        Ok(())
    }

    fn init_design(&mut self) -> anyhow::Result<()> {
        let top_module = self.settings.get_str("power.inputs.top_module")?;
        let tb_name = self.settings.get_str("power.inputs.tb_name")?;
        // Dotted instance paths may arrive from the sim flow.
        let tb_dut = self.settings.get_str("power.inputs.tb_dut")?.replace('.', "/");
        let level = self.level()?;

        if level == FlowLevel::Rtl {
            let input_files = self.settings.get_str_list("power.inputs.input_files")?;
            self.script.verbose_append(format!("read_hdl {}", input_files.join(" ")));
        }

        // Power intent is scoped to the analyzed module here, unlike the
        // implementation flows.
        for cmd in cadence::power_spec_commands(&self.settings, &self.run_dir)? {
            if let Some(rest) = cmd.strip_prefix("read_power_intent") {
                self.script
                    .verbose_append(format!("read_power_intent{} -module {}", rest, top_module));
            } else {
                self.script.verbose_append(cmd);
            }
        }

        self.script.verbose_append("set_db leakage_power_effort low");
        self.script.verbose_append("set_db lp_insert_clock_gating true");

        match level {
            FlowLevel::Rtl => {
                self.script.verbose_append(format!("elaborate {}", top_module));

                let clock_sdc = cadence::sdc_clock_constraints(&self.settings)?;
                if !clock_sdc.is_empty() {
                    let sdc_path = self.run_dir.join("power_constraints.sdc");
                    std::fs::write(&sdc_path, clock_sdc)?;
                    self.script.verbose_append(format!("read_sdc {}", sdc_path.display()));
                }

                self.script
                    .verbose_append(format!("power_map -root {} -effort low", top_module));
            }
            FlowLevel::Gate => {
                let input_files = self.settings.get_str_list("power.inputs.input_files")?;
                self.script.verbose_append(format!("read_netlist {}", input_files.join(" ")));
                self.script
                    .verbose_append(format!("read_sdc {}", self.settings.get_str("power.inputs.sdc")?));
            }
        }

        let mut stims: Vec<String> = Vec::new();

        let reports: Vec<PowerReportConfig> =
            self.settings.get_section_or_default("power.inputs.reports")?;
        let waveforms = self.settings.get_str_list_or_empty("power.inputs.waveforms")?;
        let start_times: Vec<f64> =
            self.settings.get_section_or_default("power.inputs.start_times_ns")?;

        for (i, wave) in waveforms.iter().enumerate() {
            let wave_basename = basename(wave);
            stims.push(wave_basename.clone());

            let start = start_times
                .get(i)
                .map(|ns| format!(" -start {}ns", ns))
                .unwrap_or_default();

            // General waveform report.
            self.script.verbose_append(format!(
                "read_stimulus {wave} -dut_instance {tb}/{dut}{start} -format vcd -alias {name} -append",
                wave = wave,
                tb = tb_name,
                dut = tb_dut,
                start = start,
                name = wave_basename
            ));

            // Toggle-bounded windows for the configured reports.
            for (num, report) in reports.iter().enumerate() {
                self.script.verbose_append(format!(
                    "read_stimulus {wave} -dut_instance {tb}/{dut}{start} -format vcd -cycles {count} {signal} -alias {name}_{num} -append",
                    wave = wave,
                    tb = tb_name,
                    dut = tb_dut,
                    start = start,
                    count = report.num_toggles,
                    signal = report.toggle_signal,
                    name = wave_basename,
                    num = num
                ));
            }
        }

        for saif in self.settings.get_str_list_or_empty("power.inputs.saifs")? {
            let saif_basename = basename(&saif);
            stims.push(saif_basename.clone());
            self.script.verbose_append(format!(
                "read_stimulus {saif} -dut_instance {tb}/{dut} -format saif -alias {name} -append",
                saif = saif,
                tb = tb_name,
                dut = tb_dut,
                name = saif_basename
            ));
        }

        self.script.verbose_append("compute_power -mode time_based");

        for stim in &stims {
            self.script.verbose_append(format!(
                "report_power -stims {stim} -by_hierarchy -levels 3 -indent_inst -unit mW -out {stim}.report",
                stim = stim
            ));

            for (num, report) in reports.iter().enumerate() {
                self.script.verbose_append(format!(
                    "set num_frames [get_sdb_frames -stims {}_{} -count]",
                    stim, num
                ));
                self.script.append(formatdoc!(
                    r#"for {{set i 0}} {{$i < $num_frames}} {{incr i}} {{
                           report_power -by_hierarchy -levels {levels} -cols total -indent_inst -frames /{stim}_{num}/frame#$i -unit mW -out {stim}_{num}.report -append
                       }}"#,
                    levels = report.levels,
                    stim = stim,
                    num = num
                ));
            }
        }

        Ok(())
    }
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[async_trait]
impl Finalize for Joules {
    async fn finalize(&mut self) -> Result<(), PipelineError> {
        // Quit Joules.
        self.script.verbose_append("exit");

        let joules_tcl = self.run_dir.join("joules.tcl");
        self.script.write_to(&joules_tcl)?;

        let args = vec![
            self.joules_bin.clone(),
            "-files".to_string(),
            joules_tcl.display().to_string(),
            "-common_ui".to_string(),
        ];
        self.runner
            .run(&args, &self.run_dir, &self.env, OutputStyle::plain())
            .await?;
        Ok(())
    }
}
