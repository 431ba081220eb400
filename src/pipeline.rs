// src/pipeline.rs

//! Sequential per-sample driver. Each stage runs its tools, parses their
//! output and only then writes its fields to the result store, so a failed
//! stage leaves no partial fields behind and later stages never run.

use std::fmt;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::abricate::{format_plasmids, format_virulence, read_hits};
use crate::checkm::read_quality;
use crate::config::{PipelineConfig, SampleConfig};
use crate::error::{read_input, PipelineError, Result};
use crate::kraken::count_votes;
use crate::mlst::{read_strain_type, StrainType};
use crate::mutations::{scan_mutation_dumps, MutationReport};
use crate::reads::{estimate_coverage, read_stats};
use crate::resistance::{classify_hits, ResistanceReport};
use crate::species::{displayed_species, resolve_species, GenomeDistance, SpeciesDecision};
use crate::store::{join_lines, ResultField, ResultStore};
use crate::tools::{self, ScreeningDb, ToolRunner};
use crate::types::{GeneHit, GenomeQuality, TaxonomyVote};
use crate::SampleResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Assembly,
    Annotation,
    Quality,
    Taxonomy,
    Species,
    GeneScreening,
    MutationScan,
    StrainTyping,
    Coverage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Assembly => "assembly",
            Stage::Annotation => "annotation",
            Stage::Quality => "assembly quality",
            Stage::Taxonomy => "taxonomic classification",
            Stage::Species => "species resolution",
            Stage::GeneScreening => "gene screening",
            Stage::MutationScan => "mutation scan",
            Stage::StrainTyping => "strain typing",
            Stage::Coverage => "coverage",
        };
        f.write_str(name)
    }
}

pub(crate) fn quality_fields(sample: &str, quality: &GenomeQuality) -> Vec<(ResultField, String)> {
    vec![
        (ResultField::Completeness, quality.completeness.clone()),
        (ResultField::Contamination, quality.contamination.clone()),
        (ResultField::GenomeSize, quality.genome_size.clone()),
        (ResultField::Contigs, quality.contigs.clone()),
        (ResultField::Sample, sample.to_string()),
    ]
}

pub(crate) fn screening_fields(
    resistance: &ResistanceReport,
    virulence: &[String],
    plasmids: &[String],
) -> Vec<(ResultField, String)> {
    vec![
        (ResultField::Genes, join_lines(&resistance.genes)),
        (ResultField::Resfinder, join_lines(&resistance.identifications)),
        (ResultField::Virulence, join_lines(virulence)),
        (ResultField::Plasmid, join_lines(plasmids)),
    ]
}

pub(crate) fn mutation_fields(mutations: &MutationReport) -> Vec<(ResultField, String)> {
    vec![
        (ResultField::PolymyxinMutations, join_lines(&mutations.polymyxin_lines())),
        (ResultField::OtherMutations, join_lines(&mutations.others_lines())),
    ]
}

pub(crate) fn format_coverage(coverage: f64) -> String {
    format!("{coverage:.2}")
}

/// Distance search through the configured tool, reading its output file.
struct ToolDistance<'a, R: ?Sized> {
    runner: &'a R,
    config: &'a PipelineConfig,
    sample: &'a SampleConfig,
}

impl<R: ToolRunner + ?Sized> GenomeDistance for ToolDistance<'_, R> {
    fn nearest_references(&self, reference_list: &Path) -> Result<String> {
        self.runner
            .run(&tools::genome_distance(self.config, self.sample, reference_list))?;
        read_input(self.sample.distance_output())
    }
}

pub struct SamplePipeline<'a, R: ?Sized, S: ?Sized> {
    config: &'a PipelineConfig,
    runner: &'a R,
    store: &'a S,
}

impl<'a, R, S> SamplePipeline<'a, R, S>
where
    R: ToolRunner + ?Sized,
    S: ResultStore + ?Sized,
{
    pub fn new(config: &'a PipelineConfig, runner: &'a R, store: &'a S) -> Self {
        SamplePipeline {
            config,
            runner,
            store,
        }
    }

    pub fn run(&self, sample: &SampleConfig) -> Result<SampleResult> {
        self.run_with_progress(sample, |_| {})
    }

    /// Runs every stage in order, calling `on_stage` as each one starts.
    pub fn run_with_progress<F>(&self, sample: &SampleConfig, mut on_stage: F) -> Result<SampleResult>
    where
        F: FnMut(Stage),
    {
        sample.validate()?;
        let id = sample.sample_id().to_string();
        fs::create_dir_all(sample.sample_dir())?;
        info!("Sample {} ({})", sample.sample, id);

        on_stage(Stage::Assembly);
        self.runner.run(&tools::assemble(self.config, sample))?;

        on_stage(Stage::Annotation);
        self.runner.run(&tools::annotate(self.config, sample))?;

        on_stage(Stage::Quality);
        let quality = self.assess_quality(sample)?;
        self.commit(&id, quality_fields(&id, &quality))?;

        on_stage(Stage::Taxonomy);
        self.runner.run(&tools::classify_reads(self.config, sample))?;
        let vote = count_votes(sample.classifier_output())?;

        on_stage(Stage::Species);
        let species = self.resolve(sample, &vote)?;
        let shown = displayed_species(&species, &vote, &quality);
        self.commit(&id, vec![(ResultField::Species, shown.clone())])?;

        on_stage(Stage::GeneScreening);
        let (resistance, virulence, plasmids) = self.screen_genes(sample)?;
        self.commit(&id, screening_fields(&resistance, &virulence, &plasmids))?;

        on_stage(Stage::MutationScan);
        let mutations = self.scan_mutations(sample, &species)?;
        self.commit(&id, mutation_fields(&mutations))?;

        on_stage(Stage::StrainTyping);
        let strain_type = self.type_strain(sample, &species)?;
        self.commit(&id, vec![(ResultField::StrainType, strain_type.to_string())])?;

        on_stage(Stage::Coverage);
        let coverage = self.coverage(sample, &quality)?;
        self.commit(&id, vec![(ResultField::Coverage, format_coverage(coverage))])?;

        Ok(SampleResult {
            sample: id,
            quality,
            vote,
            species,
            displayed_species: shown,
            resistance,
            virulence,
            plasmids,
            strain_type,
            mutations,
            coverage,
        })
    }

    fn commit(&self, sample: &str, fields: Vec<(ResultField, String)>) -> Result<()> {
        for (field, value) in fields {
            self.store.upsert(sample, field, &value)?;
        }
        Ok(())
    }

    fn assess_quality(&self, sample: &SampleConfig) -> Result<GenomeQuality> {
        let bins = sample.quality_dir();
        fs::create_dir_all(&bins)?;

        let assembly = sample.assembly();
        if !assembly.exists() {
            return Err(PipelineError::MissingInput { path: assembly });
        }
        let staged = bins.join("assembly.fasta");
        fs::copy(&assembly, &staged)?;

        self.runner.run(&tools::quality_lineage(self.config, sample))?;
        self.runner.run(&tools::quality_report(self.config, sample))?;
        let quality = read_quality(sample.quality_table())?;

        // intermediate files of the lineage workflow
        for dir in ["bins", "storage"] {
            let _ = fs::remove_dir_all(bins.join(dir));
        }
        for file in ["assembly.fasta", "lineage.ms", "checkm.log"] {
            let _ = fs::remove_file(bins.join(file));
        }
        Ok(quality)
    }

    fn resolve(&self, sample: &SampleConfig, vote: &TaxonomyVote) -> Result<SpeciesDecision> {
        let distance = ToolDistance {
            runner: self.runner,
            config: self.config,
            sample,
        };
        resolve_species(&vote.majority, &self.config.database_dirs(), &distance)
    }

    fn screen(&self, db: ScreeningDb, input: &Path, output: &Path) -> Result<Vec<GeneHit>> {
        self.runner
            .run(&tools::screen_genes(self.config, db, input, output))?;
        read_hits(output)
    }

    fn screen_genes(&self, sample: &SampleConfig) -> Result<(ResistanceReport, Vec<String>, Vec<String>)> {
        let genes = sample.annotated_genes();

        let resistance = classify_hits(&self.screen(
            ScreeningDb::Resistance,
            &genes,
            &sample.resistance_hits(),
        )?);
        let virulence = format_virulence(&self.screen(
            ScreeningDb::Virulence,
            &genes,
            &sample.virulence_hits(),
        )?);
        let plasmids = format_plasmids(&self.screen(
            ScreeningDb::Plasmid,
            &sample.assembly(),
            &sample.plasmid_hits(),
        )?);

        for path in [sample.virulence_hits(), sample.plasmid_hits()] {
            let _ = fs::remove_file(path);
        }
        info!(
            "Gene screening: {} resistance, {} virulence, {} plasmid line(s)",
            resistance.genes.len(),
            virulence.len(),
            plasmids.len()
        );
        Ok((resistance, virulence, plasmids))
    }

    fn scan_mutations(&self, sample: &SampleConfig, species: &SpeciesDecision) -> Result<MutationReport> {
        let Some(dbs) = &species.mutation_dbs else {
            info!("No mutation databases for {}", species.display_name);
            return Ok(MutationReport::default());
        };
        let assembly = sample.assembly();
        self.runner.run(&tools::protein_search(
            self.config,
            &dbs.others,
            &assembly,
            &sample.others_dump(),
        ))?;
        self.runner.run(&tools::protein_search(
            self.config,
            &dbs.polymyxin,
            &assembly,
            &sample.polymyxin_dump(),
        ))?;
        scan_mutation_dumps(sample.others_dump(), sample.polymyxin_dump(), dbs.panels)
    }

    fn type_strain(&self, sample: &SampleConfig, species: &SpeciesDecision) -> Result<StrainType> {
        if let Some(scheme) = species.typing_scheme.name() {
            self.runner
                .run(&tools::strain_typing(self.config, sample, scheme))?;
        }
        read_strain_type(sample.typing_result(), &species.typing_scheme)
    }

    fn coverage(&self, sample: &SampleConfig, quality: &GenomeQuality) -> Result<f64> {
        let r1 = read_stats(&sample.read1)?;
        let r2 = read_stats(&sample.read2)?;
        if r1.reads != r2.reads {
            warn!("Mate files differ in size: {} vs {} reads", r1.reads, r2.reads);
        }
        let coverage = estimate_coverage(&r1, &r2, quality.genome_size_bp());
        info!("Coverage: {coverage:.2}x");
        Ok(coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_THREADS;
    use crate::store::MemoryStore;
    use crate::test_utils::DumpBuilder;
    use crate::tools::ToolInvocation;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    const CHECKM_HEADER: &str = "Bin Id\tMarker lineage\t# genomes\t# markers\t# marker sets\tCompleteness\tContamination\tStrain heterogeneity\tGenome size (bp)\t# ambiguous bases\t# scaffolds\t# contigs\tN50 (scaffolds)";
    const ABRICATE_HEADER: &str = "#FILE\tSEQUENCE\tSTART\tEND\tSTRAND\tGENE\tCOVERAGE\tCOVERAGE_MAP\tGAPS\t%COVERAGE\t%IDENTITY\tDATABASE\tACCESSION\tPRODUCT\tRESISTANCE";

    /// Writes canned tool outputs where the real tools would, and records
    /// every invocation. Fails the first invocation of `fail_on`, if set.
    struct FakeRunner {
        species_label: &'static str,
        contamination: &'static str,
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    impl FakeRunner {
        fn new(species_label: &'static str) -> Self {
            FakeRunner {
                species_label,
                contamination: "1.20",
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn tools(&self) -> Vec<&'static str> {
            self.calls.lock().iter().map(|c| c.tool).collect()
        }
    }

    fn arg_after<'a>(inv: &'a ToolInvocation, flag: &str) -> &'a str {
        let i = inv.args.iter().position(|a| a == flag).unwrap();
        &inv.args[i + 1]
    }

    fn abricate_row(seq: &str, gene: &str, product: &str) -> String {
        format!("genome.ffn\t{seq}\t1\t861\t+\t{gene}\t1-861/861\t===============\t0/0\t100.00\t99.88\tdb\tAB000001\t{product}\t")
    }

    fn substitution_dump(gene: &str, len: usize, index: usize, from: char, to: char) -> String {
        let mut reference = "A".repeat(len);
        reference.replace_range(index..index + 1, &from.to_string());
        let mut query = reference.clone();
        query.replace_range(index..index + 1, &to.to_string());
        DumpBuilder::new()
            .block(gene, len, 99, &query, &reference, 1, false)
            .build()
    }

    impl ToolRunner for FakeRunner {
        fn run(&self, inv: &ToolInvocation) -> Result<String> {
            self.calls.lock().push(inv.clone());
            if self.fail_on == Some(inv.tool) {
                return Err(PipelineError::ToolFailed {
                    tool: inv.tool.to_string(),
                    code: Some(1),
                    stderr: "simulated failure".into(),
                });
            }
            match inv.tool {
                "unicycler" => {
                    let dir = PathBuf::from(arg_after(inv, "-o"));
                    fs::create_dir_all(&dir)?;
                    fs::write(dir.join("assembly.fasta"), ">1 length=5000\nACGT\n")?;
                }
                "checkm qa" => {
                    let row = format!(
                        "assembly\tg__Klebsiella (UID4)\t68\t1227\t97\t99.91\t{}\t25.00\t5000\t0\t87\t87\t198765",
                        self.contamination
                    );
                    fs::write(arg_after(inv, "-f"), format!("{CHECKM_HEADER}\n{row}\n"))?;
                }
                "kraken2" => {
                    let rows: String = (0..5)
                        .map(|i| format!("C\tread{i}\t{} (taxid 1)\t150|150\t1:116\n", self.species_label))
                        .chain((5..7).map(|i| format!("C\tread{i}\tEscherichia coli (taxid 562)\t150|150\t562:116\n")))
                        .collect();
                    fs::write(arg_after(inv, "--output"), rows)?;
                }
                "fastANI" => {
                    fs::write(
                        arg_after(inv, "-o"),
                        "assembly.fasta\t/db/fastani/fastANI_acineto/Acinetobacter_baumannii.fna\t98.7\t1500\t1530\n",
                    )?;
                }
                "abricate" => {
                    let rows = match arg_after(inv, "--db") {
                        "resfinder" => vec![
                            abricate_row("contig_1", "blaKPC-2", "KPC-2"),
                            abricate_row("contig_2", "aac(6')-Ib-cr", "aminoglycoside"),
                        ],
                        "vfdb" => vec![abricate_row("contig_3", "fimH", "type 1 fimbriae")],
                        _ => Vec::new(),
                    };
                    let mut text = ABRICATE_HEADER.to_string();
                    for row in rows {
                        text.push('\n');
                        text.push_str(&row);
                    }
                    if let Some(out) = &inv.stdout_to {
                        fs::write(out, text)?;
                    }
                }
                "blastx" => {
                    let dump = if arg_after(inv, "-db").ends_with("_poli.fasta") {
                        substitution_dump("PmrB", 365, 255, 'R', 'G')
                    } else {
                        substitution_dump("GyrA", 200, 82, 'S', 'L')
                    };
                    fs::write(arg_after(inv, "-out"), dump)?;
                }
                "mlst" => {
                    let workdir = inv
                        .args
                        .iter()
                        .find_map(|a| a.strip_suffix(":/workdir"))
                        .unwrap();
                    fs::write(
                        Path::new(workdir).join("data.json"),
                        r#"{"mlst": {"results": {"sequence_type": "258", "nearest_sts": ""}}}"#,
                    )?;
                }
                _ => {}
            }
            Ok(String::new())
        }
    }

    fn fastq(reads: usize, len: usize) -> String {
        (0..reads)
            .map(|i| format!("@r{i}\n{}\n+\n{}\n", "A".repeat(len), "I".repeat(len)))
            .collect()
    }

    fn setup() -> (TempDir, PipelineConfig, SampleConfig) {
        let dir = tempdir().unwrap();
        let r1 = dir.path().join("S_R1.fastq");
        let r2 = dir.path().join("S_R2.fastq");
        fs::write(&r1, fastq(50, 100)).unwrap();
        fs::write(&r2, fastq(50, 100)).unwrap();

        let config = PipelineConfig {
            abricate: "abricate".into(),
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
        };
        let sample = SampleConfig::new("27563_S12", r1, r2, dir.path().join("out"));
        (dir, config, sample)
    }

    #[test]
    fn test_klebsiella_sample_end_to_end() {
        let (_dir, config, sample) = setup();
        let runner = FakeRunner::new("Klebsiella pneumoniae");
        let store = MemoryStore::new();

        let mut stages = Vec::new();
        let result = SamplePipeline::new(&config, &runner, &store)
            .run_with_progress(&sample, |s| stages.push(s))
            .unwrap();

        assert_eq!(stages.first(), Some(&Stage::Assembly));
        assert_eq!(stages.last(), Some(&Stage::Coverage));
        assert!(!runner.tools().contains(&"fastANI"));

        let record = store.load("27563").unwrap().unwrap();
        assert_eq!(record.get(ResultField::Sample), Some("27563"));
        assert_eq!(record.get(ResultField::Contamination), Some("1.20"));
        assert_eq!(record.get(ResultField::Species), Some("Klebsiella pneumoniae"));
        assert_eq!(
            record.get(ResultField::Genes),
            Some("blaKPC-2 (carbapenemase) (allele confidence 99.88)<br>aac(6')-Ib-cr (resistance to aminoglycosides and fluoroquinolones) (allele confidence 99.88)")
        );
        assert_eq!(record.get(ResultField::Plasmid), Some("Not found"));
        assert_eq!(
            record.get(ResultField::PolymyxinMutations),
            Some("PmrB:R256G(deleterious)")
        );
        assert_eq!(record.get(ResultField::OtherMutations), Some("GyrA:S83L"));
        assert_eq!(record.get(ResultField::StrainType), Some("258"));
        // 100 bp × 100 reads / 5000 bp
        assert_eq!(record.get(ResultField::Coverage), Some("2.00"));

        assert_eq!(result.strain_type, StrainType::Sequence("258".into()));
        assert_eq!(result.fields().len(), record.fields.len());
    }

    #[test]
    fn test_contaminated_acinetobacter_sample() {
        let (_dir, config, sample) = setup();
        let mut runner = FakeRunner::new("Acinetobacter pittii");
        runner.contamination = "14.00";
        let store = MemoryStore::new();

        let result = SamplePipeline::new(&config, &runner, &store).run(&sample).unwrap();

        assert!(runner.tools().contains(&"fastANI"));
        assert_eq!(result.species.display_name, "Acinetobacter_baumannii");
        assert_eq!(
            store.load("27563").unwrap().unwrap().get(ResultField::Species),
            Some("Contamination: Acinetobacter pittii 5 Escherichia coli 2")
        );
        // the refined decision still drives the scan
        assert!(result.species.mutation_dbs.is_some());
    }

    #[test]
    fn test_failed_stage_stops_the_sample() {
        let (_dir, config, sample) = setup();
        let mut runner = FakeRunner::new("Klebsiella pneumoniae");
        runner.fail_on = Some("kraken2");
        let store = MemoryStore::new();

        let err = SamplePipeline::new(&config, &runner, &store)
            .run(&sample)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ToolFailed { .. }));

        let record = store.load("27563").unwrap().unwrap();
        assert_eq!(record.get(ResultField::Completeness), Some("99.91"));
        assert_eq!(record.get(ResultField::Species), None);
        assert!(!runner.tools().contains(&"abricate"));
    }

    #[test]
    fn test_unknown_species_skips_scan_and_typing() {
        let (_dir, config, sample) = setup();
        let runner = FakeRunner::new("Serratia marcescens");
        let store = MemoryStore::new();

        let result = SamplePipeline::new(&config, &runner, &store).run(&sample).unwrap();
        let tools = runner.tools();
        assert!(!tools.contains(&"blastx"));
        assert!(!tools.contains(&"mlst"));

        let record = store.load("27563").unwrap().unwrap();
        assert_eq!(record.get(ResultField::StrainType), Some("Not available for this species"));
        assert_eq!(record.get(ResultField::PolymyxinMutations), Some(""));
        assert!(result.mutations.others.is_empty());
    }
}
