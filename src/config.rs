use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Feed, Species};
use crate::error::XrefError;

pub const DEFAULT_CONFIG_FILE: &str = "rnac-xref.json";

/// GenBank nucleotide, searched when a RefSeq accession has no transcript.
pub const DEFAULT_REFSEQ_FALLBACK_XDB_KEY: i32 = 1;
pub const DEFAULT_ENSEMBL_XDB_KEY: i32 = 20;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub pipeline_name: Option<String>,
    #[serde(default)]
    pub xdb_key: Option<i32>,
    #[serde(default)]
    pub refseq_fallback_xdb_key: Option<i32>,
    #[serde(default)]
    pub ensembl_xdb_key: Option<i32>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub species: Vec<SpeciesEntry>,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpeciesEntry {
    Shorthand(String),
    Detailed(SpeciesEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SpeciesEntryObject {
    pub name: String,
    pub taxon_id: u32,
    #[serde(default)]
    pub searchable: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FeedEntry {
    pub feed: Feed,
    pub location: String,
    #[serde(default)]
    pub species: Option<Vec<String>>,
}

/// A feed as the run sees it: where to read it and which species may use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSpec {
    pub feed: Feed,
    pub location: String,
    pub species: Option<Vec<String>>,
}

impl FeedSpec {
    pub fn applies_to(&self, species: &Species) -> bool {
        match &self.species {
            Some(names) => names.iter().any(|name| name.eq_ignore_ascii_case(&species.name)),
            None => true,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub pipeline_name: String,
    pub xdb_key: i32,
    pub refseq_fallback_xdb_key: i32,
    pub ensembl_xdb_key: i32,
    pub threads: usize,
    pub data_dir: Utf8PathBuf,
    pub store: Utf8PathBuf,
    pub species: Vec<Species>,
    pub feeds: Vec<FeedSpec>,
}

impl ResolvedConfig {
    /// Species this pipeline runs for, in configured order.
    pub fn eligible_species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter().filter(|species| species.searchable)
    }

    /// Feeds for `species`, local-authority feed first.
    pub fn feeds_for(&self, species: &Species) -> Vec<&FeedSpec> {
        let mut feeds: Vec<&FeedSpec> = self
            .feeds
            .iter()
            .filter(|spec| spec.applies_to(species))
            .collect();
        feeds.sort_by_key(|spec| spec.feed);
        feeds
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, XrefError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Err(XrefError::MissingConfig);
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| XrefError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| XrefError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, XrefError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let pipeline_name = config
            .pipeline_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(XrefError::MissingSetting("pipeline_name"))?;
        let xdb_key = config.xdb_key.ok_or(XrefError::MissingSetting("xdb_key"))?;
        let store = config
            .store
            .filter(|store| !store.trim().is_empty())
            .map(Utf8PathBuf::from)
            .ok_or(XrefError::MissingSetting("store"))?;

        if config.feeds.is_empty() {
            return Err(XrefError::MissingSetting("feeds"));
        }

        let species = if config.species.is_empty() {
            default_species()
        } else {
            config
                .species
                .into_iter()
                .map(|entry| match entry {
                    SpeciesEntry::Shorthand(name) => known_species(&name),
                    SpeciesEntry::Detailed(obj) => Ok(Species {
                        name: obj.name,
                        taxon_id: obj.taxon_id,
                        searchable: obj.searchable.unwrap_or(true),
                    }),
                })
                .collect::<Result<Vec<_>, XrefError>>()?
        };

        let feeds = config
            .feeds
            .into_iter()
            .map(|entry| {
                if entry.location.trim().is_empty() {
                    return Err(XrefError::InvalidSetting {
                        name: "feeds",
                        message: format!("empty location for {} feed", entry.feed),
                    });
                }
                if let Some(names) = &entry.species {
                    if let Some(unknown) = names
                        .iter()
                        .find(|name| !species.iter().any(|s| s.name.eq_ignore_ascii_case(name)))
                    {
                        return Err(XrefError::UnknownSpecies(unknown.clone()));
                    }
                }
                Ok(FeedSpec {
                    feed: entry.feed,
                    location: entry.location,
                    species: entry.species,
                })
            })
            .collect::<Result<Vec<_>, XrefError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            pipeline_name,
            xdb_key,
            refseq_fallback_xdb_key: config
                .refseq_fallback_xdb_key
                .unwrap_or(DEFAULT_REFSEQ_FALLBACK_XDB_KEY),
            ensembl_xdb_key: config.ensembl_xdb_key.unwrap_or(DEFAULT_ENSEMBL_XDB_KEY),
            threads: config.threads.unwrap_or(0),
            data_dir: Utf8PathBuf::from(config.data_dir.unwrap_or_else(|| "data".to_string())),
            store,
            species,
            feeds,
        })
    }
}

pub fn default_species() -> Vec<Species> {
    ["rat", "mouse", "human"]
        .into_iter()
        .filter_map(|name| known_species(name).ok())
        .collect()
}

fn known_species(name: &str) -> Result<Species, XrefError> {
    let taxon_id = match name.trim().to_ascii_lowercase().as_str() {
        "human" => 9606,
        "mouse" => 10090,
        "rat" => 10116,
        "dog" => 9615,
        "pig" => 9823,
        "bonobo" => 9597,
        "chinchilla" => 34839,
        _ => return Err(XrefError::UnknownSpecies(name.to_string())),
    };
    Ok(Species {
        name: name.trim().to_ascii_lowercase(),
        taxon_id,
        searchable: true,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn minimal() -> Config {
        Config {
            schema_version: None,
            pipeline_name: Some("RNACentral".to_string()),
            xdb_key: Some(71),
            refseq_fallback_xdb_key: None,
            ensembl_xdb_key: None,
            threads: None,
            data_dir: None,
            store: Some("store.json".to_string()),
            species: Vec::new(),
            feeds: vec![FeedEntry {
                feed: Feed::RefSeq,
                location: "refseq.tsv".to_string(),
                species: None,
            }],
        }
    }

    #[test]
    fn defaults_applied() {
        let resolved = ConfigLoader::resolve_config(minimal()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.refseq_fallback_xdb_key, DEFAULT_REFSEQ_FALLBACK_XDB_KEY);
        assert_eq!(resolved.threads, 0);
        assert_eq!(resolved.data_dir, Utf8PathBuf::from("data"));
        assert_eq!(resolved.species, default_species());
    }

    #[test]
    fn missing_pipeline_name() {
        let mut config = minimal();
        config.pipeline_name = Some("  ".to_string());
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(XrefError::MissingSetting("pipeline_name"))
        );
    }

    #[test]
    fn feed_restricted_to_unknown_species() {
        let mut config = minimal();
        config.feeds[0].species = Some(vec!["yeast".to_string()]);
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(XrefError::UnknownSpecies(_))
        );
    }
}
