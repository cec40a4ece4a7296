//! Place-and-route flow for Cadence Innovus
//!
//! Only snake_case (common UI) commands are emitted; the camelCase legacy
//! syntax is deprecated.

use crate::core::{CheckpointIo, DbCheckpoints, EmitsCommands, ScriptBuffer, Settings, Step};
use crate::execution::{Finalize, OutputStyle, PipelineError, ToolRunner};
use crate::tools::{absolute_input_paths, cadence, check_input_files};
use async_trait::async_trait;
use indoc::formatdoc;
use serde::Deserialize;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    Toplevel,
    Placement,
    Hardmacro,
    Hierarchical,
    Dummy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// One floorplan element from `vlsi.inputs.placement_constraints`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementConstraint {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: PlacementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub margins: Option<Margins>,
}

pub struct Innovus {
    settings: Settings,
    run_dir: PathBuf,
    script: ScriptBuffer,
    runner: Arc<dyn ToolRunner>,
    innovus_bin: String,
    top_module: String,
    env: Vec<(String, String)>,
}

impl EmitsCommands for Innovus {
    fn script(&mut self) -> &mut ScriptBuffer {
        &mut self.script
    }
}

impl Innovus {
    pub fn new(
        settings: Settings,
        run_dir: PathBuf,
        runner: Arc<dyn ToolRunner>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&run_dir)?;
        let innovus_bin = settings.get_str("par.innovus.innovus_bin")?;
        let top_module = settings.get_str("par.inputs.top_module")?;
        let mut env = cadence::cadence_env_vars(&settings)?;
        env.push(("INNOVUS_BIN".to_string(), innovus_bin.clone()));

        Ok(Self {
            settings,
            run_dir,
            script: ScriptBuffer::new(),
            runner,
            innovus_bin,
            top_module,
            env,
        })
    }

    pub fn steps() -> Vec<Step<Self>> {
        vec![
            Step::new("init_design", Self::init_design),
            Step::new("floorplan_design", Self::floorplan_design),
            Step::new("power_straps", Self::power_straps),
            Step::new("place_opt_design", Self::place_opt_design),
            Step::new("route_design", Self::route_design),
            Step::new("opt_design", Self::opt_design),
            Step::new("write_design", Self::write_design),
        ]
    }

    pub fn checkpoints() -> Box<dyn CheckpointIo<Self>> {
        Box::new(DbCheckpoints::new("read_db", "write_db"))
    }

    fn init_design(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append(format!(
            "set_db design_process_node {}",
            self.settings.get_str("vlsi.core.node")?
        ));
        self.script.verbose_append(format!(
            "set_multi_cpu_usage -local_cpu {}",
            self.settings.get_usize("vlsi.core.max_threads")?
        ));

        let lef_files = self.settings.get_str_list("vlsi.technology.lef_files")?;
        self.script
            .verbose_append(format!("read_physical -lef {{ {} }}", lef_files.join(" ")));

        // init_design requires the timing setup in a separate script.
        let mmmc_path = self.run_dir.join("mmmc.tcl");
        std::fs::write(&mmmc_path, cadence::generate_mmmc_script(&self.settings, &self.run_dir)?)?;
        self.script.verbose_append(format!("read_mmmc {}", mmmc_path.display()));

        // Innovus only accepts structural Verilog for the netlist.
        let input_files = self.settings.get_str_list("par.inputs.input_files")?;
        check_input_files(&input_files, &[".v"])?;
        let abspaths = absolute_input_paths(&input_files)?;
        self.script.verbose_append(format!(
            "read_netlist {{ {} }} -top {}",
            abspaths.join(" "),
            self.top_module
        ));

        self.script.verbose_append("init_design");

        self.script.verbose_append(format!(
            "set_db design_flow_effort {}",
            self.settings.get_str_or("par.innovus.design_flow_effort", "standard")
        ));
        Ok(())
    }

    fn floorplan_design(&mut self) -> anyhow::Result<()> {
        let floorplan_tcl = self.run_dir.join("floorplan.tcl");
        std::fs::write(&floorplan_tcl, self.create_floorplan_tcl()?.join("\n"))?;
        self.script
            .verbose_append(format!("source -echo -verbose {}", floorplan_tcl.display()));
        Ok(())
    }

    fn power_straps(&mut self) -> anyhow::Result<()> {
        let power_straps_tcl = self.run_dir.join("power_straps.tcl");
        std::fs::write(&power_straps_tcl, self.create_power_straps_tcl()?.join("\n"))?;
        self.script
            .verbose_append(format!("source -echo -verbose {}", power_straps_tcl.display()));
        Ok(())
    }

    /// Place the design and do pre-routing optimization.
    fn place_opt_design(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("place_opt_design");
        Ok(())
    }

    fn route_design(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("route_design");
        Ok(())
    }

    /// Post-route optimization, fixing setup and hold violations.
    fn opt_design(&mut self) -> anyhow::Result<()> {
        self.script.verbose_append("opt_design -post_route -setup -hold");
        Ok(())
    }

    fn output_lib_name(&self) -> String {
        format!("{}_FINAL", self.top_module)
    }

    fn write_design(&mut self) -> anyhow::Result<()> {
        self.script
            .verbose_append(format!("write_db {} -def -verilog", self.output_lib_name()));

        // GDS streamout.
        self.script
            .verbose_append("write_stream -output_macros -mode ALL -unit 1000 gds_file");

        // Convenience script to reopen the finished database interactively.
        let scripts_dir = self.run_dir.join("generated-scripts");
        std::fs::create_dir_all(&scripts_dir)?;

        std::fs::write(
            scripts_dir.join("open_chip.tcl"),
            format!("read_db {}\n", self.output_lib_name()),
        )?;

        let open_chip = scripts_dir.join("open_chip");
        std::fs::write(
            &open_chip,
            formatdoc!(
                r#"cd {run_dir}
                   {bin} -common_ui -win -files generated-scripts/open_chip.tcl
                "#,
                run_dir = self.run_dir.display(),
                bin = self.innovus_bin
            ),
        )?;
        std::fs::set_permissions(&open_chip, std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    fn create_floorplan_tcl(&self) -> anyhow::Result<Vec<String>> {
        let mut output: Vec<String> = Vec::new();

        let mode = self.settings.get_str_or("par.innovus.floorplan_mode", "blank");
        match mode.as_str() {
            "manual" => {
                let contents = self.settings.get_str("par.innovus.floorplan_script_contents")?;
                output.push("# Floorplan manually specified in flow settings".to_string());
                output.extend(contents.lines().map(String::from));
            }
            "generate" => output.extend(self.generate_floorplan_tcl()?),
            other => {
                if other != "blank" {
                    error!("invalid floorplan_mode `{}`; using blank floorplan", other);
                }
                output.push("# Blank floorplan".to_string());
            }
        }
        Ok(output)
    }

    /// Floorplan generated from placement constraints: a top-level die-size
    /// command followed by guides and macro placements.
    fn generate_floorplan_tcl(&self) -> anyhow::Result<Vec<String>> {
        let mut output: Vec<String> = Vec::new();
        output.push("# Floorplan automatically generated from placement constraints".to_string());

        // Fallback die size if no top-level constraint is provided.
        let mut chip_size_constraint =
            Self::chip_size_constraint(1000.0, 1000.0, 100.0, 100.0, 100.0, 100.0, None);

        let constraints: Vec<PlacementConstraint> = self
            .settings
            .get_section_or_default("vlsi.inputs.placement_constraints")?;
        for constraint in &constraints {
            // Instance paths drop the top-level module component.
            let new_path = constraint.path.split('/').skip(1).collect::<Vec<_>>().join("/");

            if new_path.is_empty() {
                if constraint.kind != PlacementKind::Toplevel {
                    anyhow::bail!("`{}` must be a top-level chip size constraint", constraint.path);
                }
                let margins = constraint
                    .margins
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("top-level constraint requires margins"))?;
                let site = self.settings.get_str_or("vlsi.technology.placement_site", "");
                chip_size_constraint = Self::chip_size_constraint(
                    constraint.width,
                    constraint.height,
                    margins.left,
                    margins.bottom,
                    margins.right,
                    margins.top,
                    if site.is_empty() { None } else { Some(&site) },
                );
            } else {
                match constraint.kind {
                    PlacementKind::Dummy => {}
                    PlacementKind::Placement => output.push(format!(
                        "create_guide -name {name} -area {x1} {y1} {x2} {y2}",
                        name = new_path,
                        x1 = constraint.x,
                        y1 = constraint.y,
                        x2 = constraint.x + constraint.width,
                        y2 = constraint.y + constraint.height
                    )),
                    PlacementKind::Hardmacro => output.push(format!(
                        "place_inst {inst} {x} {y} {orientation}",
                        inst = new_path,
                        x = constraint.x,
                        y = constraint.y,
                        orientation = constraint.orientation.as_deref().unwrap_or("r0")
                    )),
                    PlacementKind::Hierarchical => {
                        anyhow::bail!("hierarchical placement constraints are not supported")
                    }
                    PlacementKind::Toplevel => {
                        anyhow::bail!("top-level constraint `{}` must have an empty path", constraint.path)
                    }
                }
            }
        }

        let mut result = vec![chip_size_constraint];
        result.extend(output);
        Ok(result)
    }

    /// Innovus floorplan command for the given die size and margins.
    /// `-flip f` lets standard cell rows flip during place-and-route.
    fn chip_size_constraint(
        width: f64,
        height: f64,
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
        site: Option<&str>,
    ) -> String {
        let site_str = site.map(|s| format!("-site {} ", s)).unwrap_or_default();
        format!(
            "create_floorplan -core_margins_by die -flip f -die_size_by_io_height max {site}-die_size {{ {width} {height} {left} {bottom} {right} {top} }}",
            site = site_str,
        )
    }

    fn create_power_straps_tcl(&self) -> anyhow::Result<Vec<String>> {
        let mut output: Vec<String> = Vec::new();

        let mode = self.settings.get_str_or("par.innovus.power_straps_mode", "blank");
        match mode.as_str() {
            "manual" => {
                let contents = self.settings.get_str("par.innovus.power_straps_script_contents")?;
                output.push("# Power straps script manually specified in flow settings".to_string());
                output.extend(contents.lines().map(String::from));
            }
            "generate" => anyhow::bail!("power strap generation is not implemented; use manual mode"),
            other => {
                if other != "blank" {
                    error!("invalid power_straps_mode `{}`; using blank power straps script", other);
                }
                output.push("# Blank power straps script".to_string());
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl Finalize for Innovus {
    async fn finalize(&mut self) -> Result<(), PipelineError> {
        // Quit Innovus.
        self.script.verbose_append("exit");

        let par_tcl = self.run_dir.join("par.tcl");
        self.script.write_to(&par_tcl)?;

        let args = vec![
            self.innovus_bin.clone(),
            "-nowin".to_string(), // no GUI popping up
            "-common_ui".to_string(),
            "-files".to_string(),
            par_tcl.display().to_string(),
        ];
        self.runner
            .run(&args, &self.run_dir, &self.env, OutputStyle::plain())
            .await?;
        Ok(())
    }
}
