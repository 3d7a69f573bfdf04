//! Bulk listing import from CSV.
//!
//! Rows are reconciled one at a time: free-text category and parish names are
//! resolved against the known lookups, then each row is inserted on its own.
//! A failing row never blocks or rolls back the rows around it.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{Category, Listing, ListingStatus, NewListing, Parish};

/// Header row expected by the importer, in template order.
pub const CSV_HEADERS: [&str; 16] = [
    "business_name",
    "category",
    "parish",
    "short_description",
    "description",
    "phone",
    "email",
    "website",
    "address",
    "latitude",
    "longitude",
    "facebook_url",
    "instagram_url",
    "google_business_url",
    "tripadvisor_url",
    "twitter_url",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImportError {
    #[error("Missing required fields (business_name, category, parish)")]
    MissingFields,
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Parish not found: {0}")]
    ParishNotFound(String),
    #[error("Invalid {field}: {value}")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("{0}")]
    Persistence(String),
}

/// Request-level failures: nothing was imported.
#[derive(Debug, Error)]
pub enum ImportFileError {
    #[error("Invalid CSV file: {0}")]
    Parse(#[from] csv::Error),
    #[error("Failed to load categories and parishes: {0}")]
    Lookup(#[from] sqlx::Error),
}

/// One data row of the import file. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportRow {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub business_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub parish: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub facebook_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub instagram_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub google_business_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub tripadvisor_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub twitter_url: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Outcome of an import run. `total == succeeded + failed` always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    fn record_failure(&mut self, row: usize, err: &ImportError) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(RowError {
            row,
            message: err.to_string(),
        });
    }
}

/// Destination for imported listings.
#[async_trait]
pub trait ListingSink: Send + Sync {
    /// Persist one listing. The error string is shown to the admin verbatim.
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, String>;
}

/// Lowercases and hyphenates a name into a URL slug.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

pub fn parse_csv(data: &[u8]) -> Result<Vec<ImportRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(data);

    reader.deserialize().collect()
}

/// Exact, case-insensitive match on the category name.
pub fn resolve_category<'a>(name: &str, categories: &'a [Category]) -> Option<&'a Category> {
    let needle = name.trim().to_lowercase();
    categories.iter().find(|c| c.name.to_lowercase() == needle)
}

/// First parish whose name contains the input, or is contained by it,
/// ignoring case. Ambiguous inputs silently take the first match.
pub fn resolve_parish<'a>(name: &str, parishes: &'a [Parish]) -> Option<&'a Parish> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    parishes.iter().find(|p| {
        let known = p.name.to_lowercase();
        known.contains(&needle) || needle.contains(&known)
    })
}

fn parse_coordinate(
    field: &'static str,
    value: Option<&str>,
    bound: f64,
) -> Result<Option<f64>, ImportError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.abs() <= bound => Ok(Some(parsed)),
        _ => Err(ImportError::InvalidCoordinate {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Validates one row and resolves its lookups into an insertable listing.
pub fn build_listing(
    row: ImportRow,
    categories: &[Category],
    parishes: &[Parish],
) -> Result<NewListing, ImportError> {
    let (Some(business_name), Some(category_name), Some(parish_name)) =
        (row.business_name, row.category, row.parish)
    else {
        return Err(ImportError::MissingFields);
    };

    let category = resolve_category(&category_name, categories)
        .ok_or_else(|| ImportError::CategoryNotFound(category_name.clone()))?;
    let parish = resolve_parish(&parish_name, parishes)
        .ok_or_else(|| ImportError::ParishNotFound(parish_name.clone()))?;

    let latitude = parse_coordinate("latitude", row.latitude.as_deref(), 90.0)?;
    let longitude = parse_coordinate("longitude", row.longitude.as_deref(), 180.0)?;

    let now = Utc::now();
    Ok(NewListing {
        id: Uuid::new_v4(),
        slug: slugify(&business_name),
        business_name,
        category_id: category.id,
        parish_id: parish.id,
        short_description: row.short_description,
        description: row.description,
        phone: row.phone,
        email: row.email,
        website: row.website,
        address: row.address,
        latitude,
        longitude,
        facebook_url: row.facebook_url,
        instagram_url: row.instagram_url,
        google_business_url: row.google_business_url,
        tripadvisor_url: row.tripadvisor_url,
        twitter_url: row.twitter_url,
        status: ListingStatus::Active,
        is_featured: false,
        created_at: now,
        updated_at: now,
    })
}

/// Imports rows strictly in order, one insert per row.
pub async fn import_rows<S>(
    sink: &S,
    rows: Vec<ImportRow>,
    categories: &[Category],
    parishes: &[Parish],
) -> ImportSummary
where
    S: ListingSink + ?Sized,
{
    let mut summary = ImportSummary::default();

    for (index, row) in rows.into_iter().enumerate() {
        let row_number = index + 1;

        let outcome = match build_listing(row, categories, parishes) {
            Ok(listing) => sink
                .insert_listing(listing)
                .await
                .map_err(ImportError::Persistence),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(listing) => {
                log::debug!("Imported row {row_number} as listing {}", listing.slug);
                summary.record_success();
            }
            Err(err) => {
                log::warn!("Import row {row_number} failed: {err}");
                summary.record_failure(row_number, &err);
            }
        }
    }

    log::info!(
        "Import finished: {} total, {} succeeded, {} failed",
        summary.total,
        summary.succeeded,
        summary.failed
    );

    summary
}

/// Parses the upload, loads the lookups once and imports every row.
pub async fn import_csv(db: &Database, data: &[u8]) -> Result<ImportSummary, ImportFileError> {
    let rows = parse_csv(data)?;

    let (categories, parishes) = futures_util::join!(db.list_categories(), db.list_parishes());
    let (categories, parishes) = (categories?, parishes?);

    Ok(import_rows(db, rows, &categories, &parishes).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory sink that enforces slug uniqueness like the listings table.
    #[derive(Default)]
    struct MemorySink {
        slugs: Mutex<HashSet<String>>,
        inserted: Mutex<Vec<NewListing>>,
    }

    #[async_trait]
    impl ListingSink for MemorySink {
        async fn insert_listing(&self, listing: NewListing) -> Result<Listing, String> {
            let mut slugs = self.slugs.lock().map_err(|e| e.to_string())?;
            if !slugs.insert(listing.slug.clone()) {
                return Err(format!(
                    "duplicate key value violates unique constraint \"listings_slug_key\" ({})",
                    listing.slug
                ));
            }
            self.inserted
                .lock()
                .map_err(|e| e.to_string())?
                .push(listing.clone());
            Ok(listing.into_listing())
        }
    }

    fn category(name: &str) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slugify(name),
            description: None,
            icon: None,
            created_at: Utc::now(),
        }
    }

    fn parish(name: &str) -> Parish {
        Parish {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slugify(name),
            created_at: Utc::now(),
        }
    }

    fn lookups() -> (Vec<Category>, Vec<Parish>) {
        (
            vec![category("Restaurants"), category("Tours & Excursions")],
            vec![parish("St. John's"), parish("St. Mary"), parish("Barbuda")],
        )
    }

    fn row(name: &str, category: &str, parish: &str) -> ImportRow {
        let some = |v: &str| (!v.is_empty()).then(|| v.to_string());
        ImportRow {
            business_name: some(name),
            category: some(category),
            parish: some(parish),
            ..ImportRow::default()
        }
    }

    #[test]
    fn slugify_hyphenates_runs_and_trims() {
        assert_eq!(slugify("Sheer Rocks"), "sheer-rocks");
        assert_eq!(slugify("  Papa Zouk's -- Fish & Rum!  "), "papa-zouk-s-fish-rum");
        assert_eq!(slugify("CAFE 7"), "cafe-7");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn category_match_is_exact_ignoring_case() {
        let (categories, _) = lookups();
        assert!(resolve_category("restaurants", &categories).is_some());
        assert!(resolve_category(" TOURS & EXCURSIONS ", &categories).is_some());
        assert!(resolve_category("Restaurant", &categories).is_none());
    }

    #[test]
    fn parish_match_accepts_substrings_both_ways() {
        let (_, parishes) = lookups();
        let found = resolve_parish("john", &parishes).map(|p| p.name.as_str());
        assert_eq!(found, Some("St. John's"));
        let found = resolve_parish("Parish of St. Mary", &parishes).map(|p| p.name.as_str());
        assert_eq!(found, Some("St. Mary"));
        assert!(resolve_parish("Saint Johns", &parishes).is_none());
    }

    #[test]
    fn parish_match_takes_first_on_ambiguity() {
        let (_, parishes) = lookups();
        let found = resolve_parish("st.", &parishes).map(|p| p.name.as_str());
        assert_eq!(found, Some("St. John's"));
    }

    #[test]
    fn build_listing_checks_required_fields_first() {
        let (categories, parishes) = lookups();
        let err = build_listing(row("", "Nope", "Nowhere"), &categories, &parishes);
        assert_eq!(err, Err(ImportError::MissingFields));
    }

    #[test]
    fn build_listing_rejects_bad_coordinates() {
        let (categories, parishes) = lookups();
        let mut bad = row("Hermitage Bay", "Restaurants", "St. Mary");
        bad.latitude = Some("north".into());
        let err = build_listing(bad, &categories, &parishes);
        assert!(matches!(
            err,
            Err(ImportError::InvalidCoordinate { field: "latitude", .. })
        ));
    }

    #[test]
    fn build_listing_resolves_ids_and_activates() {
        let (categories, parishes) = lookups();
        let mut good = row("Hermitage Bay", "restaurants", "mary");
        good.latitude = Some("17.03".into());
        good.longitude = Some("-61.89".into());
        let listing = build_listing(good, &categories, &parishes).expect("row should build");
        assert_eq!(listing.category_id, categories[0].id);
        assert_eq!(listing.parish_id, parishes[1].id);
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.slug, "hermitage-bay");
        assert_eq!(listing.latitude, Some(17.03));
    }

    #[test]
    fn parse_csv_reads_by_header_and_blanks_to_none() {
        let data = b"parish,business_name,category,phone,unknown_column\n\
St. John's,Sheer Rocks,Restaurants,  ,x\n";
        let rows = parse_csv(data).expect("csv should parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].business_name.as_deref(), Some("Sheer Rocks"));
        assert_eq!(rows[0].parish.as_deref(), Some("St. John's"));
        assert_eq!(rows[0].phone, None);
        assert_eq!(rows[0].website, None);
    }

    #[test]
    fn parse_csv_header_only_is_empty() {
        let data = CSV_HEADERS.join(",");
        let rows = parse_csv(data.as_bytes()).expect("csv should parse");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn mixed_file_reports_each_failure_by_row() {
        let (categories, parishes) = lookups();
        let data = format!(
            "{}\n{}\n{}\n{}\n",
            CSV_HEADERS.join(","),
            "Sheer Rocks,Restaurants,St. John's,Cliffside dining,,,,,,,,,,,,",
            ",Restaurants,St. John's,,,,,,,,,,,,,",
            "Wadadli Tours,Tours & Excursions,Saint Johns,,,,,,,,,,,,,",
        );
        let rows = parse_csv(data.as_bytes()).expect("csv should parse");
        let sink = MemorySink::default();

        let summary = import_rows(&sink, rows, &categories, &parishes).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0].row, 2);
        assert!(summary.errors[0].message.contains("Missing required fields"));
        assert_eq!(summary.errors[1].row, 3);
        assert_eq!(summary.errors[1].message, "Parish not found: Saint Johns");
    }

    #[tokio::test]
    async fn unknown_category_is_reported_and_not_written() {
        let (categories, parishes) = lookups();
        let sink = MemorySink::default();
        let rows = vec![row("Big Banana", "Pizza", "St. John's")];

        let summary = import_rows(&sink, rows, &categories, &parishes).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].message, "Category not found: Pizza");
        assert!(sink.inserted.lock().map(|v| v.is_empty()).unwrap_or(false));
    }

    #[tokio::test]
    async fn reimporting_same_row_fails_on_duplicate_slug() {
        let (categories, parishes) = lookups();
        let sink = MemorySink::default();
        let rows = vec![
            row("Sheer Rocks", "Restaurants", "St. Mary"),
            row("Sheer Rocks", "Restaurants", "St. Mary"),
            row("Catherine's Cafe", "Restaurants", "St. Mary"),
        ];

        let summary = import_rows(&sink, rows, &categories, &parishes).await;

        assert_eq!(summary.total, summary.succeeded + summary.failed);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 2);
        assert!(summary.errors[0].message.contains("listings_slug_key"));
    }

    #[tokio::test]
    async fn empty_input_yields_zero_summary() {
        let (categories, parishes) = lookups();
        let sink = MemorySink::default();
        let summary = import_rows(&sink, Vec::new(), &categories, &parishes).await;
        assert_eq!(summary, ImportSummary::default());
    }
}
