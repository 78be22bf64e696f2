use crate::error::{RelgraphError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for generated template files
pub trait ArtifactSink {
    /// Write one artifact; any failure aborts the run
    fn write(&mut self, name: &str, contents: &str) -> Result<()>;

    /// Publish everything written so far as one complete set
    fn finish(&mut self) -> Result<()>;
}

/// Writes artifacts into a staging directory and swaps it onto the output
/// directory in `finish`. A run that fails midway leaves the previous output
/// untouched.
pub struct DirectorySink {
    output: PathBuf,
    staging: PathBuf,
    /// Where the previous output waits while the new set is moved in
    backup: PathBuf,
    finished: bool,
}

impl DirectorySink {
    pub fn new(output: impl AsRef<Path>) -> Result<Self> {
        let output = output.as_ref().to_path_buf();
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RelgraphError::Config(format!(
                    "Output directory '{}' has no final component",
                    output.display()
                ))
            })?;
        let staging = output.with_file_name(format!(".{}.partial", name));
        let backup = output.with_file_name(format!(".{}.previous", name));

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        Ok(Self {
            output,
            staging,
            backup,
            finished: false,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.staging.join(name);
        fs::write(&path, contents).map_err(|source| RelgraphError::TemplateWrite {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let publish_error = |source| RelgraphError::TemplateWrite {
            path: self.output.display().to_string(),
            source,
        };

        if self.backup.exists() {
            fs::remove_dir_all(&self.backup)?;
        }
        let replacing = self.output.exists();
        if replacing {
            fs::rename(&self.output, &self.backup).map_err(publish_error)?;
        }

        if let Err(source) = fs::rename(&self.staging, &self.output) {
            if replacing {
                if let Err(e) = fs::rename(&self.backup, &self.output) {
                    tracing::error!(
                        "Failed to restore previous output from {}: {}",
                        self.backup.display(),
                        e
                    );
                }
            }
            return Err(publish_error(source));
        }
        self.finished = true;

        if replacing {
            if let Err(e) = fs::remove_dir_all(&self.backup) {
                tracing::warn!("Failed to remove {}: {}", self.backup.display(), e);
            }
        }
        Ok(())
    }
}

impl Drop for DirectorySink {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: BTreeMap<String, String>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        self.files.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// One resolver as referenced by a deployment descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolverResource {
    pub type_name: String,
    pub field_name: String,
    pub data_source_name: String,
    pub request_mapping_template: String,
    pub response_mapping_template: String,
}

impl ResolverResource {
    /// `<Entity><Operation>Resolver`, e.g. `DogCreateResolver`
    pub fn logical_id(entity: &str, operation: &str) -> String {
        format!("{}{}Resolver", entity, operation)
    }
}

/// Template file name: `<RootType>.<field>.<req|res>.vtl`
pub fn template_file_name(type_name: &str, field_name: &str, request: bool) -> String {
    format!(
        "{}.{}.{}.vtl",
        type_name,
        field_name,
        if request { "req" } else { "res" }
    )
}

/// Resources keyed by logical id, in generation order
pub type ResolverResources = IndexMap<String, ResolverResource>;
