//! Container jobs for the alignment and differential expression workflows.
//!
//! The image runs this pipeline's own CLI against mounted host data; the
//! artifacts are then pulled out and moved to the host output directory.

use std::path::{Path, PathBuf};

use super::types::{ContainerJob, MountSpec};
use crate::command::Invocation;
use crate::config::Settings;
use crate::models::{ArtifactPaths, ReplicateGroup};

/// Host-side inputs for aligning one sample in a container.
#[derive(Debug, Clone)]
pub struct ContainerAlignment {
    pub basename: String,
    pub host_input_dir: PathBuf,
    pub organism: String,
    pub host_indexes_dir: PathBuf,
    /// Host staging directory for extracted artifacts.
    pub local_dir: PathBuf,
    pub host_output_dir: PathBuf,
    pub threads: u32,
    pub trim3: u32,
}

/// Reads and indexes mounted read-only; `<b>.bam`, `<b>.gff` and `<b>/`
/// come back out.
pub fn alignment_job(settings: &Settings, request: &ContainerAlignment) -> ContainerJob {
    let c = &settings.container;
    let artifacts = ArtifactPaths::new(&c.output_path, &request.basename).final_artifact_names();

    let inner = Invocation::new(&c.inner_program)
        .arg("align")
        .arg(&request.basename)
        .arg(&c.reads_mount)
        .arg(&request.organism)
        .arg(&c.indexes_mount)
        .arg(&c.output_path)
        .arg("--threads")
        .arg(request.threads.to_string())
        .arg("--trim3")
        .arg(request.trim3.to_string());

    ContainerJob {
        purpose: "align".to_string(),
        image: c.image.clone(),
        mounts: vec![
            MountSpec::read_only(&request.host_input_dir, &c.reads_mount),
            MountSpec::read_only(&request.host_indexes_dir, &c.indexes_mount),
        ],
        inner,
        container_output_dir: c.output_path.clone(),
        artifacts,
        staging_dir: request.local_dir.clone(),
        destination_dir: request.host_output_dir.clone(),
    }
}

/// Host-side inputs for a two-condition comparison in a container.
#[derive(Debug, Clone)]
pub struct ContainerDiffExpression {
    /// Replicate alignment files on the host.
    pub group_a: ReplicateGroup,
    pub group_b: ReplicateGroup,
    pub organism: String,
    pub host_indexes_dir: PathBuf,
    pub local_dir: PathBuf,
    pub host_output_dir: PathBuf,
}

impl ContainerDiffExpression {
    /// Output directory name, `<a>_vs_<b>`.
    pub fn output_name(&self) -> String {
        format!("{}_vs_{}", self.group_a.name, self.group_b.name)
    }
}

/// Each replicate's directory is mounted read-only under its own path
/// below the reads mount; the output directory comes back out.
pub fn diff_expression_job(settings: &Settings, request: &ContainerDiffExpression) -> ContainerJob {
    let c = &settings.container;
    let reads_root = c.reads_mount.trim_end_matches('/');
    let mut mounts = Vec::new();

    let mut project = |group: &ReplicateGroup| -> Vec<String> {
        group
            .replicates
            .iter()
            .enumerate()
            .map(|(i, host_file)| {
                let mount_dir = format!("{}/{}_{}", reads_root, group.name, i + 1);
                let host_dir = host_file.parent().unwrap_or(Path::new("."));
                mounts.push(MountSpec::read_only(host_dir, &mount_dir));
                let file_name = host_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}", mount_dir, file_name)
            })
            .collect()
    };
    let inner_a = project(&request.group_a);
    let inner_b = project(&request.group_b);
    mounts.push(MountSpec::read_only(&request.host_indexes_dir, &c.indexes_mount));

    let output_name = request.output_name();
    let inner_output = format!("{}/{}", c.output_path.trim_end_matches('/'), output_name);

    let mut inner = Invocation::new(&c.inner_program).arg("diff");
    for file in &inner_a {
        inner = inner.arg("--group-a").arg(file);
    }
    for file in &inner_b {
        inner = inner.arg("--group-b").arg(file);
    }
    let inner = inner
        .arg("--indexes-dir")
        .arg(&c.indexes_mount)
        .arg(&request.group_a.name)
        .arg(&request.group_b.name)
        .arg(&request.organism)
        .arg(inner_output);

    ContainerJob {
        purpose: "diff".to_string(),
        image: c.image.clone(),
        mounts,
        inner,
        container_output_dir: c.output_path.clone(),
        artifacts: vec![output_name],
        staging_dir: request.local_dir.clone(),
        destination_dir: request.host_output_dir.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MountMode;

    #[test]
    fn alignment_job_mounts_and_inner_command() {
        let settings = Settings::default();
        let job = alignment_job(
            &settings,
            &ContainerAlignment {
                basename: "S1".to_string(),
                host_input_dir: PathBuf::from("/data/fastq"),
                organism: "ecoli".to_string(),
                host_indexes_dir: PathBuf::from("/data/indexes"),
                local_dir: PathBuf::from("/tmp/stage"),
                host_output_dir: PathBuf::from("/data/out"),
                threads: 16,
                trim3: 2,
            },
        );

        assert_eq!(job.purpose, "align");
        assert_eq!(job.image, "dmccloskey/sequencing_utilities");
        assert_eq!(job.mounts.len(), 2);
        assert!(job.mounts.iter().all(|m| m.mode == MountMode::ReadOnly));
        assert_eq!(job.mounts[0].container_path, "/media/Resequencing_RNA/fastq/");
        assert_eq!(job.artifacts, vec!["S1.bam", "S1.gff", "S1"]);
        assert_eq!(
            job.inner.argv(),
            vec![
                "rnaseq-pipeline", "align", "S1", "/media/Resequencing_RNA/fastq/", "ecoli",
                "/media/Resequencing_RNA/indexes/", "/home/user/Resequencing_RNA/output/",
                "--threads", "16", "--trim3", "2",
            ]
        );
    }

    #[test]
    fn diff_job_mounts_each_replicate() {
        let settings = Settings::default();
        let request = ContainerDiffExpression {
            group_a: ReplicateGroup::new(
                "wt",
                vec![PathBuf::from("/data/wt1/wt1.bam"), PathBuf::from("/data/wt2/wt2.bam")],
            ),
            group_b: ReplicateGroup::new("mt", vec![PathBuf::from("/data/mt1/mt1.bam")]),
            organism: "ecoli".to_string(),
            host_indexes_dir: PathBuf::from("/data/indexes"),
            local_dir: PathBuf::from("/tmp/stage"),
            host_output_dir: PathBuf::from("/data/out"),
        };
        let job = diff_expression_job(&settings, &request);

        assert_eq!(job.mounts.len(), 4);
        assert_eq!(
            job.mounts[1].volume_arg(),
            "/data/wt2:/media/Resequencing_RNA/fastq/wt_2:ro"
        );
        assert_eq!(job.artifacts, vec!["wt_vs_mt"]);
        let argv = job.inner.argv();
        assert!(argv.contains(&"/media/Resequencing_RNA/fastq/mt_1/mt1.bam".to_string()));
        assert_eq!(
            argv.last().map(String::as_str),
            Some("/home/user/Resequencing_RNA/output/wt_vs_mt")
        );
    }
}
