// src/tools.rs

//! External tool invocations. Builders only describe a command; a
//! [`ToolRunner`] executes it, so the pipeline can be driven by a fake in tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::config::{PipelineConfig, SampleConfig};
use crate::error::{PipelineError, Result};

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Short name used in logs and errors.
    pub tool: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// File that receives the command's stdout.
    pub stdout_to: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new<P: Into<PathBuf>>(tool: &'static str, program: P) -> Self {
        ToolInvocation {
            tool,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdout_to: None,
        }
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        let arg = path.as_ref().display().to_string();
        self.arg(arg)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn stdout_to<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Printable command line.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(out) = &self.stdout_to {
            line.push_str(" > ");
            line.push_str(&out.display().to_string());
        }
        line
    }
}

pub trait ToolRunner {
    /// Runs the command to completion. Returns its stdout, or an empty string
    /// when stdout was redirected to a file.
    fn run(&self, invocation: &ToolInvocation) -> Result<String>;
}

/// Runs commands as child processes and waits for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<String> {
        info!("Running {}", invocation.tool);
        debug!("{}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|source| PipelineError::ToolLaunch {
            tool: invocation.tool.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::ToolFailed {
                tool: invocation.tool.to_string(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        match &invocation.stdout_to {
            Some(path) => {
                fs::write(path, &output.stdout)?;
                Ok(String::new())
            }
            None => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        }
    }
}

/// Gene-screening databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreeningDb {
    Resistance,
    Virulence,
    Plasmid,
}

impl ScreeningDb {
    pub fn name(self) -> &'static str {
        match self {
            ScreeningDb::Resistance => "resfinder",
            ScreeningDb::Virulence => "vfdb",
            ScreeningDb::Plasmid => "plasmidfinder",
        }
    }
}

pub fn assemble(config: &PipelineConfig, sample: &SampleConfig) -> ToolInvocation {
    ToolInvocation::new("unicycler", &config.unicycler)
        .arg("-1")
        .path_arg(&sample.read1)
        .arg("-2")
        .path_arg(&sample.read2)
        .arg("-o")
        .path_arg(sample.assembly_dir())
        .args(["--min_fasta_length", "500", "--mode", "conservative", "-t"])
        .arg(config.threads.to_string())
}

pub fn annotate(config: &PipelineConfig, sample: &SampleConfig) -> ToolInvocation {
    ToolInvocation::new("prokka", &config.prokka)
        .arg("--outdir")
        .path_arg(sample.annotation_dir())
        .args(["--prefix", "genome"])
        .path_arg(sample.assembly())
        .args(["--force", "--cpus", "0"])
}

pub fn quality_lineage(config: &PipelineConfig, sample: &SampleConfig) -> ToolInvocation {
    ToolInvocation::new("checkm lineage_wf", &config.checkm)
        .args(["lineage_wf", "-x", "fasta"])
        .path_arg(sample.quality_dir())
        .path_arg(sample.quality_dir())
        .arg("--threads")
        .arg(config.threads.to_string())
}

pub fn quality_report(config: &PipelineConfig, sample: &SampleConfig) -> ToolInvocation {
    ToolInvocation::new("checkm qa", &config.checkm)
        .args(["qa", "-o", "2", "-f"])
        .path_arg(sample.quality_table())
        .arg("--tab_table")
        .path_arg(sample.quality_dir().join("lineage.ms"))
        .path_arg(sample.quality_dir())
        .arg("--threads")
        .arg(config.threads.to_string())
}

pub fn classify_reads(config: &PipelineConfig, sample: &SampleConfig) -> ToolInvocation {
    ToolInvocation::new("kraken2", config.kraken2_bin())
        .arg("--db")
        .path_arg(&config.kraken_db)
        .args(["--use-names", "--paired"])
        .path_arg(&sample.read1)
        .path_arg(&sample.read2)
        .arg("--output")
        .path_arg(sample.classifier_output())
        .arg("--threads")
        .arg(config.threads.to_string())
}

/// Screens `input` against one database, writing the report to `output`.
pub fn screen_genes(
    config: &PipelineConfig,
    db: ScreeningDb,
    input: &Path,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new("abricate", &config.abricate)
        .args(["--db", db.name()])
        .path_arg(input)
        .arg("--threads")
        .arg(config.threads.to_string())
        .stdout_to(output)
}

/// Translated search of the assembly against a protein database.
pub fn protein_search(
    config: &PipelineConfig,
    database: &Path,
    query: &Path,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new("blastx", &config.blastx)
        .arg("-db")
        .path_arg(database)
        .arg("-query")
        .path_arg(query)
        .args(["-evalue", "0.001", "-out"])
        .path_arg(output)
}

pub fn genome_distance(
    config: &PipelineConfig,
    sample: &SampleConfig,
    reference_list: &Path,
) -> ToolInvocation {
    ToolInvocation::new("fastANI", &config.fastani)
        .arg("-q")
        .path_arg(sample.assembly())
        .arg("--rl")
        .path_arg(reference_list)
        .arg("-o")
        .path_arg(sample.distance_output())
        .arg("--threads")
        .arg(config.threads.to_string())
}

/// The strain typer runs in a container with the assembly directory mounted
/// as its working directory; it writes `data.json` there.
pub fn strain_typing(config: &PipelineConfig, sample: &SampleConfig, scheme: &str) -> ToolInvocation {
    let database = config.mlst_install.join("mlst_db");
    ToolInvocation::new("mlst", "docker")
        .args(["run", "--rm", "-i", "-v"])
        .arg(format!("{}:/database", database.display()))
        .arg("-v")
        .arg(format!("{}:/workdir", sample.assembly_dir().display()))
        .args(["mlst", "-i", "assembly.fasta", "-o", ".", "-s", scheme])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_THREADS;
    use tempfile::tempdir;

    fn config() -> PipelineConfig {
        PipelineConfig {
            abricate: "/opt/abricate/bin/abricate".into(),
            mlst_install: "/opt/mlst".into(),
            polymyxin_db: "/db/poli".into(),
            others_db: "/db/others".into(),
            kraken2_install: "/opt/kraken2".into(),
            kraken_db: "/db/kraken".into(),
            unicycler: "unicycler".into(),
            fastani: "fastANI".into(),
            fastani_db: "/db/fastani".into(),
            prokka: "prokka".into(),
            checkm: "checkm".into(),
            blastx: "blastx".into(),
            threads: DEFAULT_THREADS,
        }
    }

    fn sample() -> SampleConfig {
        SampleConfig::new("27563_S12", "/reads/R1.fastq.gz", "/reads/R2.fastq.gz", "/out")
    }

    #[test]
    fn test_screening_command() {
        let inv = screen_genes(
            &config(),
            ScreeningDb::Plasmid,
            Path::new("/out/27563/unicycler/assembly.fasta"),
            Path::new("/out/27563/27563_outAbricatePlasmid"),
        );
        assert_eq!(
            inv.command_line(),
            "/opt/abricate/bin/abricate --db plasmidfinder /out/27563/unicycler/assembly.fasta --threads 16 > /out/27563/27563_outAbricatePlasmid"
        );
    }

    #[test]
    fn test_classifier_and_typing_commands() {
        let inv = classify_reads(&config(), &sample());
        assert_eq!(inv.program, PathBuf::from("/opt/kraken2/kraken2"));
        assert_eq!(
            inv.args,
            vec![
                "--db", "/db/kraken", "--use-names", "--paired", "/reads/R1.fastq.gz",
                "/reads/R2.fastq.gz", "--output", "/out/27563/out_kraken", "--threads", "16",
            ]
        );

        let inv = strain_typing(&config(), &sample(), "kpneumoniae");
        assert_eq!(
            inv.command_line(),
            "docker run --rm -i -v /opt/mlst/mlst_db:/database -v /out/27563/unicycler:/workdir mlst -i assembly.fasta -o . -s kpneumoniae"
        );
    }

    #[test]
    fn test_system_runner_captures_stdout() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("stdout.txt");
        let inv = ToolInvocation::new("sh", "sh")
            .args(["-c", "echo hello"])
            .stdout_to(&out);

        assert_eq!(SystemRunner.run(&inv).unwrap(), "");
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");

        let inv = ToolInvocation::new("sh", "sh").args(["-c", "printf abc"]);
        assert_eq!(SystemRunner.run(&inv).unwrap(), "abc");
    }

    #[test]
    fn test_system_runner_failures() {
        let inv = ToolInvocation::new("sh", "sh").args(["-c", "echo broken >&2; exit 3"]);
        match SystemRunner.run(&inv) {
            Err(PipelineError::ToolFailed { tool, code, stderr }) => {
                assert_eq!(tool, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let inv = ToolInvocation::new("missing", "/nonexistent/bin/tool");
        assert!(matches!(
            SystemRunner.run(&inv),
            Err(PipelineError::ToolLaunch { .. })
        ));
    }
}
