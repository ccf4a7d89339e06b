use crate::config::{load_config, RunSpecification};
use crate::errors::{PipelineError, Result};
use crate::utils::{absolute_path, disk_usage, list_entries};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Index files written next to the reference FASTA: samtools faidx, bwa and bwa-mem2.
const REFERENCE_INDEX_SUFFIXES: &[&str] = &[
    "fai", "amb", "ann", "bwt", "pac", "sa", "0123", "bwt.2bit.64",
];

/// Paths a delete run would remove, or did remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub dry_run: bool,
    pub planned: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Bytes held by the planned paths when the plan was made.
    pub planned_bytes: u64,
    /// Bytes held by the deleted paths just before they were removed.
    pub deleted_bytes: u64,
}

/// Removes everything the workflow generated for the config at `config_path`.
///
/// With `dry_run` nothing is touched and only `planned` is filled in. Paths
/// that are already gone are skipped, so repeating a deletion is a no-op.
pub fn delete_all_output(dry_run: bool, config_path: &Path) -> Result<DeletionReport> {
    let spec = load_config(config_path)?;
    let planned = artifact_paths(&spec, config_path)?;
    let sizes: Vec<u64> = planned.iter().map(disk_usage).collect();

    let mut report = DeletionReport {
        dry_run,
        planned,
        planned_bytes: sizes.iter().sum(),
        ..Default::default()
    };
    if dry_run {
        for path in &report.planned {
            log::info!("would delete {}", path.display());
        }
        return Ok(report);
    }

    for (path, size) in report.planned.iter().zip(sizes) {
        if remove_path(path).map_err(|e| PipelineError::io(path, e))? {
            log::info!("deleted {}", path.display());
            report.deleted.push(path.clone());
            report.deleted_bytes += size;
        }
    }
    Ok(report)
}

/// The generated artifacts of `spec` that currently exist, sorted.
///
/// These are the top-level entries of the output directory (the directory
/// itself stays) and the reference indices derived from the FASTA. Entries
/// that are, contain or lie inside the FASTQ directory, the reference or the
/// config file are never part of the set.
pub fn artifact_paths(spec: &RunSpecification, config_path: &Path) -> Result<Vec<PathBuf>> {
    let output_dir = spec.output_dir();
    check_output_dir(output_dir)?;

    let protected: Vec<PathBuf> = [spec.fastq_dir(), spec.reference_fasta(), config_path]
        .iter()
        .map(|p| absolute_path(p))
        .collect();

    let mut candidates =
        list_entries(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
    candidates.extend(reference_indices(spec.reference_fasta()));

    let mut paths: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| fs::symlink_metadata(p).is_ok())
        .filter(|p| {
            let abs = absolute_path(p);
            let keep = !protected
                .iter()
                .any(|guarded| guarded.starts_with(&abs) || abs.starts_with(guarded));
            if !keep {
                log::warn!("not deleting {}: it holds run inputs", p.display());
            }
            keep
        })
        .collect();
    paths.sort_unstable();
    paths.dedup();
    Ok(paths)
}

/// Index file names derived from a reference FASTA, whether or not they exist.
pub fn reference_indices(reference_fasta: &Path) -> Vec<PathBuf> {
    let mut indices: Vec<PathBuf> = REFERENCE_INDEX_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = reference_fasta.as_os_str().to_os_string();
            name.push(".");
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect();
    // picard replaces the extension: ref.fa -> ref.dict
    indices.push(reference_fasta.with_extension("dict"));
    indices
}

fn check_output_dir(output_dir: &Path) -> Result<()> {
    let abs = absolute_path(output_dir);
    let home = std::env::var_os("HOME").map(|h| absolute_path(Path::new(&h)));
    if abs.parent().is_none() || home.as_deref() == Some(abs.as_path()) {
        return Err(PipelineError::OutputPathError {
            path: output_dir.to_path_buf(),
            reason: "refusing to clear a filesystem root or home directory".to_string(),
        });
    }
    Ok(())
}

/// Removes a file, symlink or directory tree. Returns false when nothing was there.
fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let res = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match res {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::create_config;
    use crate::config::tests::inputs_in;
    use tempfile::TempDir;

    fn finished_run(dir: &Path) -> PathBuf {
        let inputs = inputs_in(dir, "s1,s2", "s3,s4");
        let config = dir.join("cfg.yaml");
        create_config(&inputs, &config).unwrap();

        let out = dir.join("out");
        fs::create_dir_all(out.join("bam")).unwrap();
        fs::write(out.join("bam").join("s1.bam"), b"bam").unwrap();
        fs::write(out.join("diff_table.tsv"), b"gene\tlog2fc\n").unwrap();
        fs::write(dir.join("ref.fa.fai"), b"chr1\t4\n").unwrap();
        fs::write(dir.join("ref.fa.bwt"), b"..").unwrap();
        fs::write(dir.join("ref.dict"), b"@HD\n").unwrap();
        config
    }

    #[test]
    fn test_reference_indices() {
        let indices = reference_indices(Path::new("/data/hg38.fa"));
        assert!(indices.contains(&PathBuf::from("/data/hg38.fa.fai")));
        assert!(indices.contains(&PathBuf::from("/data/hg38.fa.bwt.2bit.64")));
        assert!(indices.contains(&PathBuf::from("/data/hg38.dict")));
        assert!(!indices.contains(&PathBuf::from("/data/hg38.fa")));
    }

    #[test]
    fn test_preview_then_delete_then_noop() {
        let dir = TempDir::new().unwrap();
        let config = finished_run(dir.path());
        let root = absolute_path(dir.path());
        let expected = vec![
            root.join("out").join("bam"),
            root.join("out").join("diff_table.tsv"),
            root.join("ref.dict"),
            root.join("ref.fa.bwt"),
            root.join("ref.fa.fai"),
        ];

        let preview = delete_all_output(true, &config).unwrap();
        assert!(preview.dry_run);
        assert_eq!(preview.planned, expected);
        assert!(preview.deleted.is_empty());
        assert!(preview.planned_bytes > 0);
        assert_eq!(preview.deleted_bytes, 0);
        assert!(expected.iter().all(|p| p.exists()));

        let report = delete_all_output(false, &config).unwrap();
        assert_eq!(report.deleted, preview.planned);
        assert_eq!(report.deleted_bytes, preview.planned_bytes);
        assert!(expected.iter().all(|p| !p.exists()));

        // inputs, config and the output directory itself survive
        assert!(dir.path().join("ref.fa").is_file());
        assert!(dir.path().join("fq").is_dir());
        assert!(dir.path().join("out").is_dir());
        assert!(config.is_file());

        let again = delete_all_output(false, &config).unwrap();
        assert!(again.planned.is_empty());
        assert!(again.deleted.is_empty());
    }

    #[test]
    fn test_inputs_inside_output_dir_are_kept() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut inputs = inputs_in(dir.path(), "s1", "s2");
        inputs.fastq_dir = out.join("fq");
        inputs.reference_fasta = out.join("ref").join("ref.fa");
        fs::create_dir_all(&inputs.fastq_dir).unwrap();
        fs::create_dir_all(out.join("ref")).unwrap();
        fs::write(&inputs.reference_fasta, ">chr1\nA\n").unwrap();
        fs::write(out.join("ref").join("ref.fa.fai"), b"chr1\t1\n").unwrap();
        let config = out.join("cfg.yaml");
        create_config(&inputs, &config).unwrap();
        fs::write(out.join("counts.tsv"), b"x").unwrap();

        let report = delete_all_output(false, &config).unwrap();
        let out = absolute_path(&out);
        assert_eq!(
            report.deleted,
            vec![out.join("counts.tsv"), out.join("ref").join("ref.fa.fai")]
        );
        assert!(inputs.fastq_dir.is_dir());
        assert!(inputs.reference_fasta.is_file());
        assert!(config.is_file());
    }

    #[test]
    fn test_reads_are_kept_when_output_dir_is_the_fastq_dir() {
        let dir = TempDir::new().unwrap();
        let fq = dir.path().join("fq");
        fs::create_dir_all(&fq).unwrap();
        fs::write(fq.join("s1_R1.fastq.gz"), b"@r1\n").unwrap();
        fs::write(fq.join("s2_R1.fastq.gz"), b"@r2\n").unwrap();
        fs::write(dir.path().join("ref.fa"), b">chr1\nA\n").unwrap();

        // hand-written config, create_config refuses this layout
        let config = dir.path().join("cfg.yaml");
        fs::write(
            &config,
            format!(
                "genome_build: hg38\ncores_per_job: 1\nfastq_dir: {fq}\n\
                 reference_fasta: {dir}/ref.fa\noutput_dir: {fq}\n\
                 group1: [s1]\ngroup2: [s2]\n",
                fq = fq.display(),
                dir = dir.path().display()
            ),
        )
        .unwrap();

        let preview = delete_all_output(true, &config).unwrap();
        assert!(preview.planned.is_empty());
        let report = delete_all_output(false, &config).unwrap();
        assert!(report.deleted.is_empty());
        assert!(fq.join("s1_R1.fastq.gz").is_file());
        assert!(fq.join("s2_R1.fastq.gz").is_file());
    }

    #[test]
    fn test_missing_config() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            delete_all_output(true, &dir.path().join("cfg.yaml")),
            Err(PipelineError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_missing_output_dir_is_empty_plan() {
        let dir = TempDir::new().unwrap();
        let config = finished_run(dir.path());
        fs::remove_dir_all(dir.path().join("out")).unwrap();

        let report = delete_all_output(true, &config).unwrap();
        assert_eq!(report.planned.len(), 3);
        let root = absolute_path(dir.path());
        assert!(report.planned.iter().all(|p| p.starts_with(&root)));
    }
}
