//! Access to compiled contracts in the Hardhat artifact layout.
//!
//! An artifact lives at `<root>/<sourceName>/<ContractName>.json`. The sibling
//! `<ContractName>.dbg.json` points to the build info file that holds the full compiler output.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use ethers::{abi::Abi, types::Bytes};
use serde::{de::DeserializeOwned, Deserialize};
use walkdir::WalkDir;

const BUILD_INFO_DIR: &str = "build-info";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact for contract `{0}` not found")]
    NotFound(String),
    #[error("Contract name `{name}` matches {count} artifacts; use the fully qualified name")]
    Ambiguous { name: String, count: usize },
    #[error("Failed reading artifact file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed parsing artifact file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Build info does not contain output for `{0}`")]
    MissingBuildOutput(String),
}

/// Compiled contract as produced by the build step.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: Abi,
    /// ABI in the exact JSON form emitted by the compiler.
    pub abi_json: serde_json::Value,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifactFile {
    contract_name: String,
    source_name: String,
    abi: serde_json::Value,
    bytecode: Bytes,
}

impl TryFrom<HardhatArtifactFile> for ContractArtifact {
    type Error = serde_json::Error;

    fn try_from(file: HardhatArtifactFile) -> Result<Self, Self::Error> {
        Ok(Self {
            contract_name: file.contract_name,
            source_name: file.source_name,
            abi: serde_json::from_value(file.abi.clone())?,
            abi_json: file.abi,
            bytecode: file.bytecode,
        })
    }
}

/// Low-level compiler output for a single contract.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractBuildInfo {
    #[serde(default)]
    pub evm: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub storage_layout: serde_json::Value,
}

/// Read access to compiled contracts.
pub trait ArtifactRepository: 'static + fmt::Debug + Send + Sync {
    /// Reads an artifact by its contract name or fully qualified name (`source.sol:Name`).
    fn read_artifact(&self, name: &str) -> Result<ContractArtifact, ArtifactError>;

    /// Returns the compiler output for a fully qualified contract name.
    fn build_info(&self, fully_qualified_name: &str) -> Result<ContractBuildInfo, ArtifactError>;
}

fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once(':')
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Artifacts stored on disk by Hardhat.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        if let Some((source, contract)) = split_qualified_name(name) {
            let path = self.root.join(source).join(format!("{contract}.json"));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(ArtifactError::NotFound(name.to_owned()))
            };
        }

        let file_name = format!("{name}.json");
        let build_info_dir = self.root.join(BUILD_INFO_DIR);
        let mut candidates: Vec<_> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.path() != build_info_dir)
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name.as_str())
            .map(walkdir::DirEntry::into_path)
            .collect();
        match candidates.len() {
            0 => Err(ArtifactError::NotFound(name.to_owned())),
            1 => Ok(candidates.remove(0)),
            count => Err(ArtifactError::Ambiguous {
                name: name.to_owned(),
                count,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BuildInfoFile {
    output: BuildOutput,
}

#[derive(Debug, Deserialize)]
struct BuildOutput {
    contracts: HashMap<String, HashMap<String, ContractBuildInfo>>,
}

impl ArtifactRepository for HardhatArtifacts {
    fn read_artifact(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let path = self.artifact_path(name)?;
        let file: HardhatArtifactFile = read_json(&path)?;
        ContractArtifact::try_from(file).map_err(|source| ArtifactError::Json { path, source })
    }

    fn build_info(&self, fully_qualified_name: &str) -> Result<ContractBuildInfo, ArtifactError> {
        let (source, contract) = split_qualified_name(fully_qualified_name)
            .ok_or_else(|| ArtifactError::NotFound(fully_qualified_name.to_owned()))?;
        let source_dir = self.root.join(source);
        let debug_file: DebugFile = read_json(&source_dir.join(format!("{contract}.dbg.json")))?;
        let build_info: BuildInfoFile = read_json(&source_dir.join(debug_file.build_info))?;

        build_info
            .output
            .contracts
            .get(source)
            .and_then(|contracts| contracts.get(contract))
            .cloned()
            .ok_or_else(|| ArtifactError::MissingBuildOutput(fully_qualified_name.to_owned()))
    }
}

/// In-memory artifact repository.
#[derive(Debug, Default)]
pub struct InMemoryArtifacts {
    contracts: HashMap<String, (ContractArtifact, ContractBuildInfo)>,
}

impl InMemoryArtifacts {
    pub fn insert(&mut self, artifact: ContractArtifact, build_info: ContractBuildInfo) {
        self.contracts
            .insert(artifact.fully_qualified_name(), (artifact, build_info));
    }

    pub fn with(mut self, artifact: ContractArtifact, build_info: ContractBuildInfo) -> Self {
        self.insert(artifact, build_info);
        self
    }

    fn find(&self, name: &str) -> Result<&(ContractArtifact, ContractBuildInfo), ArtifactError> {
        if split_qualified_name(name).is_some() {
            return self
                .contracts
                .get(name)
                .ok_or_else(|| ArtifactError::NotFound(name.to_owned()));
        }
        let mut matches = self
            .contracts
            .values()
            .filter(|(artifact, _)| artifact.contract_name == name);
        let found = matches
            .next()
            .ok_or_else(|| ArtifactError::NotFound(name.to_owned()))?;
        let rest = matches.count();
        if rest > 0 {
            return Err(ArtifactError::Ambiguous {
                name: name.to_owned(),
                count: rest + 1,
            });
        }
        Ok(found)
    }
}

impl ArtifactRepository for InMemoryArtifacts {
    fn read_artifact(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        Ok(self.find(name)?.0.clone())
    }

    fn build_info(&self, fully_qualified_name: &str) -> Result<ContractBuildInfo, ArtifactError> {
        Ok(self.find(fully_qualified_name)?.1.clone())
    }
}
