//! Simulation flow for Cadence Xcelium (xrun)
//!
//! A single-step flow: the command buffer holds an xrun argument file
//! rather than TCL, and there is nothing to checkpoint.

use crate::core::{CheckpointIo, EmitsCommands, NoCheckpoints, ScriptBuffer, Settings, Step};
use crate::execution::{Finalize, OutputStyle, PipelineError, ToolRunner};
use crate::tools::{absolute_input_paths, cadence, check_input_files};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Xcelium {
    settings: Settings,
    run_dir: PathBuf,
    script: ScriptBuffer,
    runner: Arc<dyn ToolRunner>,
    xcelium_bin: String,
    env: Vec<(String, String)>,
}

impl EmitsCommands for Xcelium {
    fn script(&mut self) -> &mut ScriptBuffer {
        &mut self.script
    }
}

/// Input extensions xrun accepts, including compressed variants.
fn xcelium_extensions() -> Vec<String> {
    let verilog = [".v", ".V", ".VS", ".vp", ".VP"];
    let sverilog = [".sv", ".SV", ".svp", ".SVP", ".svi", ".svh", ".vlib", ".VLIB"];
    let c_cxx = [".c", ".cc", ".cpp"];

    let mut exts: Vec<String> = Vec::new();
    exts.extend(verilog.iter().map(|e| e.to_string()));
    exts.extend(sverilog.iter().map(|e| e.to_string()));
    exts.extend(c_cxx.iter().map(|e| e.to_string()));
    for ext in verilog.iter().chain(sverilog.iter()) {
        exts.push(format!("{}.gz", ext));
        exts.push(format!("{}.z", ext));
    }
    exts
}

impl Xcelium {
    pub fn new(
        settings: Settings,
        run_dir: PathBuf,
        runner: Arc<dyn ToolRunner>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&run_dir)?;
        let xcelium_bin = settings.get_str("sim.xcelium.xcelium_bin")?;
        let mut env = cadence::cadence_env_vars(&settings)?;
        env.push(("XCELIUM_BIN".to_string(), xcelium_bin.clone()));

        Ok(Self {
            settings,
            run_dir,
            script: ScriptBuffer::new(),
            runner,
            xcelium_bin,
            env,
        })
    }

    pub fn steps() -> Vec<Step<Self>> {
        vec![Step::new("run_simulation", Self::run_simulation)]
    }

    pub fn checkpoints() -> Box<dyn CheckpointIo<Self>> {
        Box::new(NoCheckpoints)
    }

    fn run_simulation(&mut self) -> anyhow::Result<()> {
        if !Path::new(&self.xcelium_bin).is_file() {
            anyhow::bail!("xcelium (xrun) binary not found at {}", self.xcelium_bin);
        }

        let input_files = self.settings.get_str_list("sim.inputs.input_files")?;
        let allowed = xcelium_extensions();
        let allowed_refs: Vec<&str> = allowed.iter().map(String::as_str).collect();
        check_input_files(&input_files, &allowed_refs)?;
        let abspaths = absolute_input_paths(&input_files)?;

        let tb_name = self.settings.get_str("sim.inputs.tb_name")?;
        let mut options = vec![format!("-top {}", tb_name)];

        if let Ok(timescale) = self.settings.get_str("sim.inputs.timescale") {
            options.push(format!("-timescale {}", timescale));
        }
        if self.settings.get_bool_or("sim.xcelium.enhanced_recompile", false) {
            options.push("-fast_recompilation".to_string());
        }
        if let Ok(dirname) = self.settings.get_str("sim.xcelium.xmlibdirname") {
            options.push(format!("-xmlibdirname {}", dirname));
        }
        if let Ok(dirpath) = self.settings.get_str("sim.xcelium.xmlibdirpath") {
            options.push(format!("-xmlibdirpath {}", dirpath));
        }

        let banner = "#".repeat(40);
        self.script.append(&banner);
        self.script.append("# GENERATED ARGUMENT FILE");
        self.script
            .append(format!("# CREATED AT {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        self.script.append(&banner);

        self.script.append("# XRUN INPUT FILES:");
        self.script.append_lines(abspaths);

        self.script.append("");
        self.script.append("# XRUN OPTIONS:");
        self.script.append_lines(options);

        Ok(())
    }
}

#[async_trait]
impl Finalize for Xcelium {
    async fn finalize(&mut self) -> Result<(), PipelineError> {
        let arg_file = self.run_dir.join("xrun.args");
        self.script.write_to(&arg_file)?;

        let args = vec![
            self.xcelium_bin.clone(),
            "-f".to_string(),
            arg_file.display().to_string(),
        ];
        self.runner
            .run(&args, &self.run_dir, &self.env, OutputStyle::plain())
            .await?;
        Ok(())
    }
}
