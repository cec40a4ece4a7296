//! Synthesis flow for Cadence Genus

use crate::core::{CheckpointIo, DbCheckpoints, EmitsCommands, ScriptBuffer, Settings, Step};
use crate::execution::{Finalize, OutputStyle, PipelineError, ToolRunner};
use crate::tools::{absolute_input_paths, cadence, check_input_files};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct Genus {
    settings: Settings,
    run_dir: PathBuf,
    script: ScriptBuffer,
    runner: Arc<dyn ToolRunner>,
    genus_bin: String,
    version: String,
    top_module: String,
    env: Vec<(String, String)>,

    /// Set by the `write_outputs` step; the post-run artifact check is
    /// meaningless for partial runs that stopped before it.
    wrote_outputs: bool,
}

impl EmitsCommands for Genus {
    fn script(&mut self) -> &mut ScriptBuffer {
        &mut self.script
    }
}

impl Genus {
    pub fn new(
        settings: Settings,
        run_dir: PathBuf,
        runner: Arc<dyn ToolRunner>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&run_dir)?;
        let genus_bin = settings.get_str("synthesis.genus.genus_bin")?;
        let version = settings.get_str_or("synthesis.genus.version", "191");
        let top_module = settings.get_str("synthesis.inputs.top_module")?;
        let mut env = cadence::cadence_env_vars(&settings)?;
        env.push(("GENUS_BIN".to_string(), genus_bin.clone()));

        Ok(Self {
            settings,
            run_dir,
            script: ScriptBuffer::new(),
            runner,
            genus_bin,
            version,
            top_module,
            env,
            wrote_outputs: false,
        })
    }

    pub fn steps() -> Vec<Step<Self>> {
        vec![
            Step::new("init_environment", Self::init_environment),
            Step::new("syn_generic", Self::syn_generic),
            Step::new("syn_map", Self::syn_map),
            Step::new("write_regs", Self::write_regs),
            Step::new("generate_reports", Self::generate_reports),
            Step::new("write_outputs", Self::write_outputs),
        ]
    }

    pub fn checkpoints() -> Box<dyn CheckpointIo<Self>> {
        Box::new(DbCheckpoints::new("read_db", "write_db -to_file"))
    }

    fn mapped_v_path(&self) -> PathBuf {
        self.run_dir.join(format!("{}.mapped.v", self.top_module))
    }

    fn mapped_sdc_path(&self) -> PathBuf {
        self.run_dir.join(format!("{}.mapped.sdc", self.top_module))
    }

    fn mapped_all_regs_path(&self) -> PathBuf {
        self.run_dir.join("find_regs.json")
    }

    fn output_sdf_path(&self) -> PathBuf {
        self.run_dir.join(format!("{}.mapped.sdf", self.top_module))
    }

    fn init_environment(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("set_db hdl_error_on_blackbox true");
        self.script.verbose_append(format!(
            "set_db max_cpus_per_server {}",
            self.settings.get_usize("vlsi.core.max_threads")?
        ));

        // Clock gating setup. Gated instances get the CLKGATE prefix so the
        // P&R flow can recognize them.
        if self.settings.get_str_or("synthesis.clock_gating_mode", "auto") == "auto" {
            self.script.verbose_append("set_db lp_clock_gating_infer_enable  true");
            self.script.verbose_append("set_db lp_clock_gating_prefix  {CLKGATE}");
            self.script.verbose_append("set_db lp_insert_clock_gating  true");
            self.script.verbose_append("set_db lp_clock_gating_hierarchical true");
            self.script.verbose_append("set_db lp_insert_clock_gating_incremental true");
            self.script.verbose_append("set_db lp_clock_gating_register_aware true");
        }

        // Timing libraries.
        let mmmc_path = self.run_dir.join("mmmc.tcl");
        std::fs::write(&mmmc_path, cadence::generate_mmmc_script(&self.settings, &self.run_dir)?)?;
        self.script.verbose_append(format!("read_mmmc {}", mmmc_path.display()));

        let lef_files = self.settings.get_str_list("vlsi.technology.lef_files")?;
        self.script
            .verbose_append(format!("read_physical -lef {{ {} }}", lef_files.join(" ")));

        let input_files = self.settings.get_str_list("synthesis.inputs.input_files")?;
        check_input_files(&input_files, &[".v", ".sv"])?;
        let abspaths = absolute_input_paths(&input_files)?;
        self.script.verbose_append(format!("read_hdl {{ {} }}", abspaths.join(" ")));

        self.script.verbose_append(format!("elaborate {}", self.top_module));
        self.script.verbose_append(format!("init_design -top {}", self.top_module));

        // Keep floorplanning targets findable by instance path.
        self.script.verbose_append("set_db root: .auto_ungroup none");

        // Units must be set after elaboration.
        self.script.verbose_append("set_units -capacitance 1.0pF");
        self.script.verbose_append("set_load_unit -picofarads 1");
        self.script.verbose_append(format!(
            "set_units -time 1.0{}",
            self.settings.get_str_or("vlsi.core.time_unit", "ns")
        ));

        for cmd in cadence::dont_use_commands(&self.settings)? {
            self.script.append(cmd);
        }

        Ok(())
    }

    fn syn_generic(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("syn_generic");
        Ok(())
    }

    fn syn_map(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("syn_map");
        Ok(())
    }

    /// Dump register info to be read in for simulation register forcing.
    fn write_regs(&mut self) -> anyhow::Result<()> {
        self.script.append(cadence::write_regs_tcl());
        Ok(())
    }

    fn generate_reports(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("write_reports -directory reports -tag final");
        Ok(())
    }

    fn write_outputs(&mut self) -> anyhow::Result<()> {
        self.script
            .verbose_append(format!("write_hdl > {}", self.mapped_v_path().display()));
        self.script
            .verbose_append(format!("write_script > {}.mapped.scr", self.top_module));

        let view_name = cadence::setup_view_name(&self.settings)?;
        self.script.verbose_append(format!(
            "write_sdc -view {} > {}",
            view_name,
            self.mapped_sdc_path().display()
        ));

        // Genus 19.1 renamed the physical-interchange flavor.
        let flavor = if cadence::version_number(&self.version) >= 19100 {
            "-innovus"
        } else {
            "-encounter"
        };
        self.script.verbose_append(format!(
            "write_design {} -gzip_files {}",
            flavor, self.top_module
        ));

        self.script
            .verbose_append(format!("write_sdf > {}", self.output_sdf_path().display()));

        self.wrote_outputs = true;
        Ok(())
    }

    /// Verify the artifacts the synthesis script promises to produce.
    fn check_output_artifacts(&self) -> Result<(), PipelineError> {
        if !self.wrote_outputs {
            info!("did not run write_outputs; skipping artifact check");
            return Ok(());
        }
        for path in [
            self.mapped_v_path(),
            self.mapped_sdc_path(),
            self.mapped_all_regs_path(),
            self.output_sdf_path(),
        ] {
            if !path.is_file() {
                return Err(PipelineError::MissingArtifact(path));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Finalize for Genus {
    async fn finalize(&mut self) -> Result<(), PipelineError> {
        // Quit Genus.
        self.script.verbose_append("quit");

        let syn_tcl = self.run_dir.join("syn.tcl");
        self.script.write_to(&syn_tcl)?;

        let args = vec![
            self.genus_bin.clone(),
            "-f".to_string(),
            syn_tcl.display().to_string(),
            "-no_gui".to_string(),
        ];

        if self.settings.get_bool_or("synthesis.genus.generate_only", false) {
            info!("generate-only mode: command-line is {}", args.join(" "));
            return Ok(());
        }

        self.runner
            .run(&args, &self.run_dir, &self.env, OutputStyle::plain())
            .await?;

        self.check_output_artifacts()
    }
}
