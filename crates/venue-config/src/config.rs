use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};
use tracing::{debug, info};
use venue_query::{is_valid_field, FeaturePolicy, ParsePolicy, ProjectionPolicy, SortKey};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "VENUES_CONFIG";

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;
const DEFAULT_SORT: &str = "-createdAt";

/// Configuration of the venues directory query layer
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Page size used when a request does not give `limit`.
    /// Default: 10
    pub default_limit: Option<u64>,

    /// Largest page size a request may ask for; larger values are clamped.
    /// Default: 100
    pub max_limit: Option<u64>,

    /// Ordering used when a request does not give `sort`.
    /// Comma-separated fields, `-` prefix for descending.
    /// Default: "-createdAt"
    pub default_sort: Option<String>,

    /// Reject malformed query parameters instead of ignoring them.
    /// Default: false
    pub strict: Option<bool>,

    /// Attributes left out of responses unless a request selects them.
    /// Default: ["__v", "password"]
    pub hidden_fields: Option<Vec<String>>,

    /// Also strip hidden attributes when a request selects them explicitly.
    /// Default: false
    pub strip_hidden_on_select: Option<bool>,

    /// Per-collection settings, keyed by collection name.
    /// Built-in collections left out here keep their default settings.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

/// Settings for one collection.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct CollectionConfig {
    /// Fields matched by the free-text `q` parameter.
    /// An empty list disables search for the collection.
    #[serde(default)]
    pub search_fields: Vec<String>,

    /// Overrides the global `hidden_fields` for this collection.
    pub hidden_fields: Option<Vec<String>>,
}

impl CollectionConfig {
    fn searching(fields: &[&str]) -> Self {
        Self {
            search_fields: fields.iter().map(|f| f.to_string()).collect(),
            hidden_fields: None,
        }
    }
}

/// Location of the configuration file: `$VENUES_CONFIG`, or
/// `venues/config.toml` under the XDG config directory.
pub fn config_path() -> PathBuf {
    match env::var(CONFIG_ENV) {
        Ok(path) => PathBuf::from(path),
        Err(_) => xdg_config_home().join("venues").join("config.toml"),
    }
}

fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".config")
        })
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn default_config() -> Self {
        let collections = [
            ("venues", CollectionConfig::searching(&["name", "address", "description"])),
            ("blogs", CollectionConfig::searching(&["title", "body"])),
            ("users", CollectionConfig::searching(&["name", "email"])),
            ("companies", CollectionConfig::searching(&["name"])),
            ("newsletters", CollectionConfig::searching(&["title"])),
            ("subscribers", CollectionConfig::searching(&["email"])),
            ("ratings", CollectionConfig::default()),
            ("favorites", CollectionConfig::default()),
        ]
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect();

        Self {
            default_limit: Some(DEFAULT_LIMIT),
            max_limit: Some(MAX_LIMIT),
            default_sort: Some(DEFAULT_SORT.to_string()),
            strict: Some(false),
            hidden_fields: Some(ProjectionPolicy::default().hidden),
            strip_hidden_on_select: Some(false),
            collections,
        }
    }

    /// Loads the configuration from [`config_path`].
    pub fn new() -> Result<Self> {
        Self::load(config_path())
    }

    /// Loads the configuration from `path`. A missing file yields the
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading configuration");
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;
        Ok(config)
    }

    /// Validates the configuration and fills unset values with defaults.
    pub fn resolve(&mut self) -> Result<()> {
        let default_limit = *self.default_limit.get_or_insert(DEFAULT_LIMIT);
        if default_limit == 0 {
            return Err(ConfigError::InvalidDefaultLimit(default_limit));
        }

        let max_limit = *self.max_limit.get_or_insert(MAX_LIMIT);
        if max_limit < default_limit {
            return Err(ConfigError::InvalidMaxLimit {
                max: max_limit,
                default: default_limit,
            });
        }

        let sort = self.default_sort.get_or_insert_with(|| DEFAULT_SORT.to_string());
        for token in sort.split(',') {
            match SortKey::parse(token) {
                Some(key) if is_valid_field(&key.field) => {}
                _ => return Err(ConfigError::InvalidSort(sort.clone())),
            }
        }

        self.strict.get_or_insert(false);
        self.strip_hidden_on_select.get_or_insert(false);
        let hidden = self
            .hidden_fields
            .get_or_insert_with(|| ProjectionPolicy::default().hidden);
        if let Some(field) = hidden.iter().find(|field| !is_valid_field(field)) {
            return Err(ConfigError::InvalidHiddenField(field.clone()));
        }

        for (name, builtin) in Self::default_config().collections {
            self.collections.entry(name).or_insert(builtin);
        }

        for (name, collection) in &self.collections {
            if name.contains('.') || !is_valid_field(name) {
                return Err(ConfigError::InvalidCollection(name.clone()));
            }
            let fields = collection
                .search_fields
                .iter()
                .chain(collection.hidden_fields.iter().flatten());
            for field in fields {
                if !is_valid_field(field) {
                    return Err(ConfigError::InvalidField {
                        collection: name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn parse_policy(&self) -> ParsePolicy {
        ParsePolicy {
            strict: self.strict.unwrap_or(false),
        }
    }

    /// Fields searched by `q` in `collection`. Unknown collections have none.
    pub fn search_fields(&self, collection: &str) -> &[String] {
        self.collections
            .get(collection)
            .map(|c| c.search_fields.as_slice())
            .unwrap_or_default()
    }

    pub fn hidden_fields(&self, collection: &str) -> Vec<String> {
        self.collections
            .get(collection)
            .and_then(|c| c.hidden_fields.clone())
            .or_else(|| self.hidden_fields.clone())
            .unwrap_or_else(|| ProjectionPolicy::default().hidden)
    }

    pub fn default_sort(&self) -> Vec<SortKey> {
        self.default_sort
            .as_deref()
            .unwrap_or(DEFAULT_SORT)
            .split(',')
            .filter_map(SortKey::parse)
            .collect()
    }

    /// Builder defaults for `collection`.
    pub fn feature_policy(&self, collection: &str) -> FeaturePolicy {
        FeaturePolicy {
            default_limit: self.default_limit.unwrap_or(DEFAULT_LIMIT),
            max_limit: Some(self.max_limit.unwrap_or(MAX_LIMIT)),
            default_sort: self.default_sort(),
            projection: ProjectionPolicy {
                hidden: self.hidden_fields(collection),
                strip_on_select: self.strip_hidden_on_select.unwrap_or(false),
            },
        }
    }

    /// Renders the configuration as TOML with field docs as comments.
    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(collections) = doc.get_mut("collections").and_then(Item::as_table_mut) {
            for (_name, item) in collections.iter_mut() {
                if let Item::Table(table) = item {
                    annotate_toml_table::<CollectionConfig>(table, false)?;
                }
            }
        }

        Ok(doc)
    }

    /// Writes the annotated default configuration to `path`.
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let doc = Self::default_config().to_annotated_document()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, doc.to_string())?;
        info!("Default configuration written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::with_env;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();

        assert_eq!(config.default_limit, Some(10));
        assert_eq!(config.max_limit, Some(100));
        assert_eq!(config.search_fields("venues"), ["name", "address", "description"]);
        assert_eq!(config.search_fields("blogs"), ["title", "body"]);
        assert!(config.search_fields("ratings").is_empty());
        assert!(config.search_fields("unknown").is_empty());
    }

    #[test]
    fn test_feature_policy() {
        let mut config = Config::default_config();
        config
            .collections
            .get_mut("users")
            .unwrap()
            .hidden_fields = Some(vec!["password".into(), "resetToken".into()]);

        let policy = config.feature_policy("venues");
        assert_eq!(policy.default_limit, 10);
        assert_eq!(policy.max_limit, Some(100));
        assert_eq!(policy.default_sort, vec![SortKey::desc("createdAt")]);
        assert_eq!(policy.projection.hidden, vec!["__v", "password"]);

        let policy = config.feature_policy("users");
        assert_eq!(policy.projection.hidden, vec!["password", "resetToken"]);
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let mut config: Config = toml::from_str("default_limit = 25").unwrap();
        config.resolve().unwrap();

        assert_eq!(config.default_limit, Some(25));
        assert_eq!(config.max_limit, Some(100));
        assert_eq!(config.default_sort.as_deref(), Some("-createdAt"));
        assert_eq!(config.strict, Some(false));
        assert_eq!(config.search_fields("venues"), ["name", "address", "description"]);
        assert_eq!(config.search_fields("blogs"), ["title", "body"]);
        assert_eq!(config.parse_policy(), ParsePolicy::LENIENT);
    }

    #[test]
    fn test_resolve_rejects_bad_limits() {
        let mut config = Config::default_config();
        config.default_limit = Some(0);
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidDefaultLimit(0))
        ));

        let mut config = Config::default_config();
        config.max_limit = Some(5);
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidMaxLimit { max: 5, default: 10 })
        ));
    }

    #[test]
    fn test_resolve_rejects_bad_names() {
        let mut config = Config::default_config();
        config.default_sort = Some("name,-$where".into());
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidSort(_))));

        let mut config = Config::default_config();
        config.hidden_fields = Some(vec!["password".into(), "$where".into()]);
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidHiddenField(field)) if field == "$where"
        ));

        let mut config = Config::default_config();
        config
            .collections
            .insert("bad.name".into(), CollectionConfig::default());
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidCollection(_))
        ));

        let mut config = Config::default_config();
        config.collections.insert(
            "events".into(),
            CollectionConfig::searching(&["title", "$regex"]),
        );
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("missing.toml")).unwrap();

        assert_eq!(config, Config::default_config());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
strict = true
max_limit = 50

[collections.events]
search_fields = ["title", "location.city"]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.parse_policy(), ParsePolicy::STRICT);
        assert_eq!(config.feature_policy("events").max_limit, Some(50));
        assert_eq!(config.search_fields("events"), ["title", "location.city"]);
        assert_eq!(config.search_fields("venues"), ["name", "address", "description"]);
    }

    #[test]
    fn test_load_keeps_collection_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[collections.venues]
search_fields = ["name"]

[collections.ratings]
search_fields = []
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.search_fields("venues"), ["name"]);
        assert!(config.search_fields("ratings").is_empty());
        assert_eq!(config.search_fields("users"), ["name", "email"]);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_limit = \"ten\"").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        with_env(&[(CONFIG_ENV, "/custom/venues.toml")], || {
            assert_eq!(config_path(), PathBuf::from("/custom/venues.toml"));
        });
    }

    #[test]
    #[serial]
    fn test_new_reads_env_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("venues.toml");
        fs::write(&path, "default_limit = 7").unwrap();

        with_env(&[(CONFIG_ENV, path.to_str().unwrap())], || {
            let config = Config::new().unwrap();
            assert_eq!(config.default_limit, Some(7));
        });
    }

    #[test]
    fn test_annotated_document_round_trips() {
        let config = Config::default_config();
        let doc = config.to_annotated_document().unwrap();

        let parsed: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_write_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::write_default(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default_config());
    }
}
