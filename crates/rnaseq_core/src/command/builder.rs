//! Stage command construction.
//!
//! Every function here is pure: the same inputs always give the same
//! argument vector, and nothing touches the filesystem.

use std::path::{Path, PathBuf};

use super::errors::{ConfigurationError, ConfigurationResult};
use super::invocation::Invocation;
use crate::config::{PipelineConfig, ToolPaths};
use crate::models::{ArtifactPaths, IndexType, ReplicateGroup, SampleSet};

/// Aligner index prefix: `indexes_dir` + `organism`.
pub fn aligner_index(indexes_dir: &str, organism: &str) -> String {
    format!("{}{}", indexes_dir, organism)
}

/// Annotation index: `indexes_dir` + `organism` + `index_type`.
pub fn annotation_index(
    indexes_dir: &str,
    organism: &str,
    index_type: &str,
) -> ConfigurationResult<String> {
    let index_type = IndexType::from_extension(index_type)
        .ok_or_else(|| ConfigurationError::unsupported_index_type(index_type))?;
    Ok(format!("{}{}{}", indexes_dir, organism, index_type.extension()))
}

/// Builds the commands of every stage from one configuration.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    config: &'a PipelineConfig,
    tools: &'a ToolPaths,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a PipelineConfig, tools: &'a ToolPaths) -> Self {
        Self { config, tools }
    }

    /// Read alignment into `<out>/<b>.sam`.
    pub fn align(&self, sample: &SampleSet, index_prefix: &str, paths: &ArtifactPaths) -> Invocation {
        let c = self.config;
        let inv = Invocation::new(&self.tools.aligner);

        let inv = if sample.is_paired() {
            inv.arg("-X")
                .arg(c.insert_size.to_string())
                .arg("-p")
                .arg(c.threads.to_string())
                .arg("-3")
                .arg(c.trim3.to_string())
                .arg("-x")
                .arg(index_prefix)
                .arg("-1")
                .arg(join_paths(&sample.mate1_files))
                .arg("-2")
                .arg(join_paths(&sample.mate2_files))
        } else {
            inv.arg("-p")
                .arg(c.threads.to_string())
                .arg("-3")
                .arg(c.trim3.to_string())
                .arg("-x")
                .arg(index_prefix)
                .arg("-U")
                .arg(join_paths(&sample.unpaired_files))
        };

        inv.arg("-S").arg(path_arg(&paths.sam()))
    }

    /// Sort the raw alignment into `<out>/<b>.bam`.
    pub fn sort(&self, paths: &ArtifactPaths) -> Invocation {
        Invocation::new(&self.tools.samtools)
            .arg("sort")
            .arg("-@")
            .arg(self.config.threads.to_string())
            .arg("-o")
            .arg(path_arg(&paths.bam()))
            .arg(path_arg(&paths.sam()))
    }

    /// Transcript assembly and quantification into `<out>/<b>/`.
    pub fn quantify(&self, annotation: &str, paths: &ArtifactPaths) -> Invocation {
        Invocation::new(&self.tools.quantifier)
            .arg("--library-type")
            .arg(self.config.library_type.as_flag())
            .arg("-p")
            .arg(self.config.threads.to_string())
            .arg("-G")
            .arg(annotation)
            .arg("-o")
            .arg(format!("{}/", paths.quant_dir().display()))
            .arg(path_arg(&paths.bam()))
    }

    /// Sorted alignment to `<out>/<b>.gff`.
    pub fn annotate(&self, paths: &ArtifactPaths) -> Invocation {
        Invocation::new(&self.tools.annotation_converter)
            .arg("--flip")
            .arg("--separate-strand")
            .arg(path_arg(&paths.bam()))
            .arg(path_arg(&paths.gff()))
    }

    /// Differential expression between two replicate groups.
    pub fn diff_expression(
        &self,
        group_a: &ReplicateGroup,
        group_b: &ReplicateGroup,
        annotation: &str,
        output_dir: &Path,
    ) -> ConfigurationResult<Invocation> {
        check_group(group_a)?;
        check_group(group_b)?;

        let c = self.config;
        Ok(Invocation::new(&self.tools.diff_expression)
            .arg("--library-type")
            .arg(c.library_type.as_flag())
            .arg("--library-norm-method")
            .arg(c.library_norm_method.as_flag())
            .arg("--FDR")
            .arg(c.fdr.to_string())
            .arg("--num-threads")
            .arg(c.threads.to_string())
            .args(c.extra_tokens())
            .arg("-o")
            .arg(path_arg(output_dir))
            .arg("-L")
            .arg(format!("{},{}", group_a.name, group_b.name))
            .arg(annotation)
            .arg(join_paths(&group_a.replicates))
            .arg(join_paths(&group_b.replicates)))
    }

    /// Normalized expression tables across any number of groups.
    pub fn normalize(
        &self,
        groups: &[ReplicateGroup],
        annotation: &str,
        output_dir: &Path,
    ) -> ConfigurationResult<Invocation> {
        if groups.len() < 2 {
            return Err(ConfigurationError::invalid_value(
                "groups",
                format!("at least 2 groups required, got {}", groups.len()),
            ));
        }
        for group in groups {
            check_group(group)?;
        }

        let c = self.config;
        let labels = groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(",");

        Ok(Invocation::new(&self.tools.normalizer)
            .arg("--library-type")
            .arg(c.library_type.as_flag())
            .arg("--library-norm-method")
            .arg(c.library_norm_method.as_flag())
            .arg("--num-threads")
            .arg(c.threads.to_string())
            .args(c.extra_tokens())
            .arg("-o")
            .arg(path_arg(output_dir))
            .arg("-L")
            .arg(labels)
            .arg(annotation)
            .args(groups.iter().map(|g| join_paths(&g.replicates))))
    }
}

/// Pair group names with replicate lists, e.g. from `"a1,a2|b1,b2"`.
///
/// Fails when the counts differ or a group is empty.
pub fn replicate_groups(names: &[String], groups: &[Vec<PathBuf>]) -> ConfigurationResult<Vec<ReplicateGroup>> {
    if names.len() != groups.len() {
        return Err(ConfigurationError::invalid_value(
            "names",
            format!("{} name(s) for {} group(s)", names.len(), groups.len()),
        ));
    }
    let groups: Vec<ReplicateGroup> = names
        .iter()
        .zip(groups)
        .map(|(name, reps)| ReplicateGroup::new(name.clone(), reps.clone()))
        .collect();
    for group in &groups {
        check_group(group)?;
    }
    Ok(groups)
}

fn check_group(group: &ReplicateGroup) -> ConfigurationResult<()> {
    if group.name.is_empty() {
        return Err(ConfigurationError::invalid_value("groups", "group name is empty"));
    }
    if group.replicates.is_empty() {
        return Err(ConfigurationError::invalid_value(
            "groups",
            format!("group '{}' has no replicates", group.name),
        ));
    }
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| path_arg(p))
        .collect::<Vec<_>>()
        .join(",")
}
