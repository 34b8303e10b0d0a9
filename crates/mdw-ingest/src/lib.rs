//! Catalog payload normalization, URL-list parsing, and batch assembly.
//!
//! Everything here is pure apart from [`fetch_movie_library`], which walks
//! the catalog API one id at a time (the pipeline is deliberately
//! sequential).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mdw_core::{Batch, MovieDraft, MovieRecord};
use mdw_store::CatalogApi;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("required field missing from catalog payload: {field}")]
    MissingField { field: &'static str },
}

fn missing(field: &'static str) -> NormalizeError {
    NormalizeError::MissingField { field }
}

/// Quote policy: single and double quotes become backticks. Downstream
/// consumers may parse this convention, so it is a normalization rule, not
/// an escaping mechanism; do not swap it for SQL escaping.
fn clean_text(text: &str) -> String {
    text.replace(['\'', '"'], "`")
}

fn required<'a>(raw: &'a JsonValue, field: &'static str) -> Result<&'a JsonValue, NormalizeError> {
    raw.get(field).ok_or_else(|| missing(field))
}

fn required_str(raw: &JsonValue, field: &'static str) -> Result<String, NormalizeError> {
    required(raw, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| missing(field))
}

/// Text fields the catalog is known to null out; null normalizes to empty
/// text, a missing key is still an error.
fn nullable_str(raw: &JsonValue, field: &'static str) -> Result<String, NormalizeError> {
    let value = required(raw, field)?;
    if value.is_null() {
        return Ok(String::new());
    }
    value.as_str().map(str::to_string).ok_or_else(|| missing(field))
}

fn required_i64(raw: &JsonValue, field: &'static str) -> Result<i64, NormalizeError> {
    let value = required(raw, field)?;
    if value.is_null() {
        return Ok(0);
    }
    value.as_i64().ok_or_else(|| missing(field))
}

fn required_f64(raw: &JsonValue, field: &'static str) -> Result<f64, NormalizeError> {
    let value = required(raw, field)?;
    if value.is_null() {
        return Ok(0.0);
    }
    value.as_f64().ok_or_else(|| missing(field))
}

fn genre_ids_json(raw: &JsonValue) -> Result<String, NormalizeError> {
    let entries = required(raw, "genres")?.as_array().ok_or_else(|| missing("genres"))?;
    let ids = entries
        .iter()
        .map(|g| g.get("id").and_then(JsonValue::as_i64).ok_or_else(|| missing("genres")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string(&ids).expect("serializing id list"))
}

fn spoken_languages_json(raw: &JsonValue) -> Result<String, NormalizeError> {
    let entries = required(raw, "spoken_languages")?
        .as_array()
        .ok_or_else(|| missing("spoken_languages"))?;
    let names = entries
        .iter()
        .map(|l| {
            l.get("english_name")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| missing("spoken_languages"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string(&names).expect("serializing name list"))
}

fn origin_country_json(raw: &JsonValue) -> Result<String, NormalizeError> {
    let entries = required(raw, "origin_country")?
        .as_array()
        .ok_or_else(|| missing("origin_country"))?;
    let codes = entries
        .iter()
        .map(|c| c.as_str().map(str::to_string).ok_or_else(|| missing("origin_country")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string(&codes).expect("serializing country list"))
}

fn collection_text(raw: &JsonValue) -> Result<String, NormalizeError> {
    let Some(collection) = raw.get("belongs_to_collection") else {
        return Ok(String::new());
    };
    if collection.is_null() {
        return Ok(String::new());
    }
    let name = collection
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| missing("belongs_to_collection"))?;
    let id = collection
        .get("id")
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| missing("belongs_to_collection"))?;
    Ok(format!("{} ({id})", clean_text(name)))
}

/// Turn one raw catalog payload into a normalized movie detail. Fails with
/// [`NormalizeError::MissingField`] rather than producing a partial record.
pub fn normalize_movie(raw: &JsonValue) -> Result<MovieDraft, NormalizeError> {
    Ok(MovieDraft {
        id: required_i64(raw, "id")?,
        imdb_id: nullable_str(raw, "imdb_id")?,
        title: clean_text(&required_str(raw, "title")?),
        original_title: clean_text(&required_str(raw, "original_title")?),
        tagline: clean_text(&required_str(raw, "tagline")?),
        overview: clean_text(&required_str(raw, "overview")?),
        runtime: required_i64(raw, "runtime")?,
        status: required_str(raw, "status")?,
        release_date: required_str(raw, "release_date")?,
        genres: genre_ids_json(raw)?,
        original_language: required_str(raw, "original_language")?,
        spoken_languages: spoken_languages_json(raw)?,
        origin_country: origin_country_json(raw)?,
        popularity: required_f64(raw, "popularity")?,
        vote_average: required_f64(raw, "vote_average")?,
        vote_count: required_i64(raw, "vote_count")?,
        backdrop_path: nullable_str(raw, "backdrop_path")?,
        poster_path: nullable_str(raw, "poster_path")?,
        belongs_to_collection: collection_text(raw)?,
    })
}

/// One entry parsed from the links file, tagged with its source file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieLink {
    pub id: u64,
    pub src_tag: String,
}

fn parse_link_line(line: &str) -> Option<(&str, u64)> {
    let mut segments = line.trim().split('/').rev();
    let last = segments.next()?;
    let kind = segments.next()?;
    let id = last.split('-').next()?.trim().parse().ok()?;
    Some((kind.trim(), id))
}

/// Parse a newline-delimited URL list, keeping only `movie`-typed entries.
/// Malformed lines are skipped and logged, never fatal.
pub fn movie_links(contents: &str, src_tag: &str) -> Vec<MovieLink> {
    let mut links = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_link_line(line) {
            Some(("movie", id)) => links.push(MovieLink {
                id,
                src_tag: src_tag.to_string(),
            }),
            Some((kind, _)) => {
                info!(kind, line, "skipping non-movie link");
            }
            None => {
                warn!(line, "skipping malformed link line");
            }
        }
    }
    links
}

/// Source tag of a links file: its final path component.
pub fn src_tag_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Publication id shared by every record of one run: the ingestion
/// timestamp as a 14-digit integer, unique at one-second resolution.
pub fn publication_id(now: DateTime<Utc>) -> i64 {
    now.format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .expect("timestamp formats as a 14-digit integer")
}

/// Stamp every draft with the batch's source tag and one publication id,
/// preserving order. An empty input is a legitimate empty batch.
pub fn assemble(drafts: Vec<MovieDraft>, src_tag: &str, now: DateTime<Utc>) -> Batch {
    let publication_id = publication_id(now);
    let records = drafts
        .into_iter()
        .map(|draft| MovieRecord::from_draft(draft, src_tag, publication_id))
        .collect();
    Batch {
        publication_id,
        src_tag: src_tag.to_string(),
        records,
    }
}

/// Fetch and normalize every linked movie, one call per id in order, and
/// assemble the result into a single stamped batch.
pub async fn fetch_movie_library(
    catalog: &dyn CatalogApi,
    links: &[MovieLink],
    src_tag: &str,
    now: DateTime<Utc>,
) -> Result<Batch> {
    let mut drafts = Vec::with_capacity(links.len());
    for link in links {
        let raw = catalog
            .movie_details(link.id)
            .await
            .with_context(|| format!("fetching movie {}", link.id))?;
        let draft =
            normalize_movie(&raw).with_context(|| format!("normalizing movie {}", link.id))?;
        info!(movie_id = link.id, title = %draft.title, "normalized movie detail");
        drafts.push(draft);
    }
    Ok(assemble(drafts, src_tag, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use mdw_core::Genre;
    use mdw_store::CatalogError;
    use serde_json::json;

    fn raw_movie() -> JsonValue {
        json!({
            "id": 550,
            "imdb_id": "tt0137523",
            "title": "Fight Club",
            "original_title": "Fight Club",
            "tagline": "Mischief. Mayhem. \"Soap\".",
            "overview": "A ticking-time-bomb insomniac's story.",
            "runtime": 139,
            "status": "Released",
            "release_date": "1999-10-15",
            "genres": [{"id": 18, "name": "Drama"}, {"id": 53, "name": "Thriller"}],
            "original_language": "en",
            "spoken_languages": [{"english_name": "English", "iso_639_1": "en"}],
            "origin_country": ["US"],
            "popularity": 61.416,
            "vote_average": 8.433,
            "vote_count": 26280,
            "backdrop_path": "/hZkgoQYus5vegHoetLkCJzb17zJ.jpg",
            "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
            "belongs_to_collection": null
        })
    }

    #[test]
    fn normalizes_a_full_payload() {
        let draft = normalize_movie(&raw_movie()).expect("normalize");
        assert_eq!(draft.id, 550);
        assert_eq!(draft.genres, "[18,53]");
        assert_eq!(draft.spoken_languages, "[\"English\"]");
        assert_eq!(draft.origin_country, "[\"US\"]");
        assert_eq!(draft.belongs_to_collection, "");
    }

    #[test]
    fn missing_required_field_fails_without_partial_record() {
        let mut raw = raw_movie();
        raw.as_object_mut().unwrap().remove("title");
        let err = normalize_movie(&raw).unwrap_err();
        assert_eq!(err, NormalizeError::MissingField { field: "title" });
    }

    #[test]
    fn quotes_are_rewritten_to_backticks() {
        let mut raw = raw_movie();
        raw["title"] = json!("The 'Quoted' \"Movie\"");
        raw["overview"] = json!("It's a movie about \"quotes\".");
        let draft = normalize_movie(&raw).expect("normalize");
        assert!(!draft.title.contains('\'') && !draft.title.contains('"'));
        assert!(!draft.overview.contains('\'') && !draft.overview.contains('"'));
        assert_eq!(draft.title, "The `Quoted` `Movie`");
    }

    #[test]
    fn collection_formats_as_name_and_id_with_clean_quotes() {
        let mut raw = raw_movie();
        raw["belongs_to_collection"] = json!({"id": 9_485, "name": "The \"Fast\" Collection"});
        let draft = normalize_movie(&raw).expect("normalize");
        assert_eq!(draft.belongs_to_collection, "The `Fast` Collection (9485)");
    }

    #[test]
    fn nullable_text_fields_normalize_null_to_empty() {
        let mut raw = raw_movie();
        raw["imdb_id"] = JsonValue::Null;
        raw["poster_path"] = JsonValue::Null;
        let draft = normalize_movie(&raw).expect("normalize");
        assert_eq!(draft.imdb_id, "");
        assert_eq!(draft.poster_path, "");
    }

    #[test]
    fn movie_links_keep_only_movie_entries_with_src_tag() {
        let contents = "\
https://example.org/movie/5-foo
https://example.org/tv/9-bar
https://example.org/movie/12-baz
";
        let links = movie_links(contents, "links.txt");
        assert_eq!(
            links,
            vec![
                MovieLink { id: 5, src_tag: "links.txt".into() },
                MovieLink { id: 12, src_tag: "links.txt".into() },
            ]
        );
    }

    #[test]
    fn malformed_link_lines_are_skipped() {
        let links = movie_links("not a url\nhttps://example.org/movie/7-ok\n", "l.txt");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, 7);
    }

    #[test]
    fn publication_id_is_a_14_digit_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 12, 34, 56).single().unwrap();
        assert_eq!(publication_id(now), 20260826123456);
    }

    #[test]
    fn every_record_in_a_batch_shares_id_and_tag() {
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).single().unwrap();
        let drafts = vec![
            normalize_movie(&raw_movie()).unwrap(),
            normalize_movie(&raw_movie()).unwrap(),
        ];
        let batch = assemble(drafts, "links.txt", now);
        assert_eq!(batch.len(), 2);
        for record in &batch.records {
            assert_eq!(record.publication_id, batch.publication_id);
            assert_eq!(record.src_tag, "links.txt");
        }
    }

    #[test]
    fn empty_input_assembles_an_empty_batch() {
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).single().unwrap();
        let batch = assemble(Vec::new(), "links.txt", now);
        assert!(batch.is_empty());
    }

    struct FixedCatalog;

    #[async_trait]
    impl mdw_store::CatalogApi for FixedCatalog {
        async fn movie_genres(&self) -> Result<Vec<Genre>, CatalogError> {
            Ok(vec![Genre { id: 18, name: "Drama".into() }])
        }

        async fn movie_details(&self, movie_id: u64) -> Result<JsonValue, CatalogError> {
            let mut raw = raw_movie();
            raw["id"] = json!(movie_id);
            Ok(raw)
        }
    }

    #[tokio::test]
    async fn library_fetch_stamps_each_linked_movie() {
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).single().unwrap();
        let links = vec![
            MovieLink { id: 5, src_tag: "links.txt".into() },
            MovieLink { id: 12, src_tag: "links.txt".into() },
        ];
        let batch = fetch_movie_library(&FixedCatalog, &links, "links.txt", now)
            .await
            .expect("library");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records[0].detail.id, 5);
        assert_eq!(batch.records[1].detail.id, 12);
        assert_eq!(batch.publication_id, 20260826120000);
    }
}
