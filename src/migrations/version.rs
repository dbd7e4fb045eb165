//! # Migration Versions
//!
//! Migration files carry their version in the name:
//! `V<number>__<description>.sql`, where `<number>` is digits optionally
//! followed by one `.` and more digits (`V1`, `V1.5`, `V20260101120000`).
//!
//! Versions order numerically, never lexically: `V2 < V10` and
//! `V1.5 > V1.10`. Apply order and rollback order both depend on this.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::errors::{MigrationError, MigrationResult};

/// Timestamp layout for generated versions
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^V(\d+(?:\.\d+)?)__(.+)\.sql$").expect("migration filename pattern is valid")
    })
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)(?:\.(\d+))?$").expect("version pattern is valid"))
}

/// A migration version
///
/// Equality and ordering are numeric, so `V1.5` and `V1.50` are the same
/// version. The display form is canonical: no leading zeros in the whole
/// part, no trailing zeros in the fraction (`V01.50` displays as `V1.5`).
/// It is what the registry stores.
#[derive(Debug, Clone)]
pub struct VersionId {
    whole: u64,
    /// Fractional digits with trailing zeros removed
    fraction: String,
    raw: String,
}

impl VersionId {
    /// The number as written, without the `V` prefix
    pub fn number(&self) -> &str {
        &self.raw
    }

    /// Numeric value (exact for integers below 2^53)
    pub fn as_f64(&self) -> f64 {
        self.raw.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for VersionId {
    type Err = MigrationError;

    /// Parses `V1.5` or `1.5`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MigrationError::InvalidFormat {
            name: s.to_string(),
        };

        let digits = s.strip_prefix('V').unwrap_or(s);
        let caps = number_pattern().captures(digits).ok_or_else(invalid)?;
        let whole = caps[1].parse::<u64>().map_err(|_| invalid())?;
        let fraction = caps
            .get(2)
            .map(|m| m.as_str().trim_end_matches('0').to_string())
            .unwrap_or_default();

        Ok(Self {
            whole,
            fraction,
            raw: digits.to_string(),
        })
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "V{}", self.whole)
        } else {
            write!(f, "V{}.{}", self.whole, self.fraction)
        }
    }
}

impl PartialEq for VersionId {
    fn eq(&self, other: &Self) -> bool {
        self.whole == other.whole && self.fraction == other.fraction
    }
}

impl Eq for VersionId {}

impl Hash for VersionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.whole.hash(state);
        self.fraction.hash(state);
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Trimmed fractional digits compare lexically in decimal order.
        self.whole
            .cmp(&other.whole)
            .then_with(|| self.fraction.cmp(&other.fraction))
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses, generates and orders migration versions
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionManager;

impl VersionManager {
    pub fn new() -> Self {
        Self
    }

    /// Split a migration filename into its version and raw description.
    ///
    /// Any leading directories are ignored.
    pub fn parse_filename(&self, filename: &str) -> MigrationResult<(VersionId, String)> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);

        let caps = filename_pattern()
            .captures(name)
            .ok_or_else(|| MigrationError::InvalidFormat {
                name: filename.to_string(),
            })?;

        let version = caps[1].parse::<VersionId>()?;
        Ok((version, caps[2].to_string()))
    }

    /// Whether `filename` has the shape of a migration name, whether or not
    /// its version fits
    pub fn is_migration_name(&self, filename: &str) -> bool {
        filename_pattern().is_match(filename)
    }

    /// Extract the version from `V<number>__<description>.sql`
    pub fn extract_version(&self, filename: &str) -> MigrationResult<VersionId> {
        self.parse_filename(filename).map(|(version, _)| version)
    }

    /// Resolve a rollback target given as a filename, `V<number>` or `<number>`
    pub fn parse_target(&self, identifier: &str) -> MigrationResult<VersionId> {
        let identifier = identifier.trim();
        self.extract_version(identifier)
            .or_else(|_| identifier.parse::<VersionId>())
    }

    /// Build a versioned filename `V<timestamp>__<name>` for a new migration
    pub fn generate_file_version(&self, file: &Path) -> MigrationResult<String> {
        self.generate_file_version_at(file, Utc::now())
    }

    /// Same as [`generate_file_version`](Self::generate_file_version) at a fixed instant
    pub fn generate_file_version_at(
        &self,
        file: &Path,
        now: DateTime<Utc>,
    ) -> MigrationResult<String> {
        let is_sql = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("sql"))
            .unwrap_or(false);

        // The extension is normalized so the result always matches the filename pattern
        let stem = file.file_stem().and_then(|n| n.to_str());
        match stem {
            Some(stem) if is_sql => Ok(format!("V{}__{}.sql", now.format(TIMESTAMP_FORMAT), stem)),
            _ => Err(MigrationError::UnsupportedFileType {
                path: file.to_path_buf(),
            }),
        }
    }

    /// Sort migration files by version, ascending.
    ///
    /// The sort is stable. Files whose names do not carry a version are
    /// dropped.
    pub fn order_migrations<I>(&self, files: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut versioned: Vec<(VersionId, PathBuf)> = files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                let version = self.extract_version(&name).ok()?;
                Some((version, path))
            })
            .collect();

        versioned.sort_by(|a, b| a.0.cmp(&b.0));
        versioned.into_iter().map(|(_, path)| path).collect()
    }
}
