//! Core domain model for the movie details warehouse.

use serde::{Deserialize, Serialize};

pub const MOVIE_DETAILS_TABLE: &str = "movie_details";
pub const GENRES_TABLE: &str = "genres";

/// Declared column list for the `movie_details` table, in insert order.
pub const MOVIE_DETAILS_COLUMNS: [&str; 21] = [
    "id",
    "imdb_id",
    "title",
    "original_title",
    "tagline",
    "overview",
    "runtime",
    "status",
    "release_date",
    "genres",
    "original_language",
    "spoken_languages",
    "origin_country",
    "popularity",
    "vote_average",
    "vote_count",
    "backdrop_path",
    "poster_path",
    "belongs_to_collection",
    "src_tag",
    "publication_id",
];

pub const GENRES_COLUMNS: [&str; 2] = ["id", "name"];

pub const CREATE_MOVIE_DETAILS_SQL: &str = "CREATE TABLE movie_details (\
 id BIGINT,\
 imdb_id VARCHAR(16),\
 title TEXT,\
 original_title TEXT,\
 tagline TEXT,\
 overview TEXT,\
 runtime BIGINT,\
 status VARCHAR(32),\
 release_date VARCHAR(16),\
 genres TEXT,\
 original_language VARCHAR(8),\
 spoken_languages TEXT,\
 origin_country TEXT,\
 popularity DOUBLE,\
 vote_average DOUBLE,\
 vote_count BIGINT,\
 backdrop_path TEXT,\
 poster_path TEXT,\
 belongs_to_collection TEXT,\
 src_tag TEXT,\
 publication_id BIGINT\
)";

pub const CREATE_GENRES_SQL: &str =
    "CREATE TABLE genres (id INTEGER PRIMARY KEY, name VARCHAR(32))";

/// Scalar value as it travels between the pipeline and the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl SqlValue {
    /// Rendering used for spreadsheet grids; NULL becomes empty text.
    pub fn to_grid_string(&self) -> String {
        match self {
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Null => String::new(),
        }
    }
}

/// One genre pair as returned by the catalog API's genre list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl Genre {
    pub fn to_params(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.id), SqlValue::Text(self.name.clone())]
    }
}

/// Normalized movie detail before batch stamping (no source tag yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDraft {
    pub id: i64,
    pub imdb_id: String,
    pub title: String,
    pub original_title: String,
    pub tagline: String,
    pub overview: String,
    pub runtime: i64,
    pub status: String,
    pub release_date: String,
    /// Compact JSON array of genre ids.
    pub genres: String,
    pub original_language: String,
    /// Compact JSON array of spoken-language display names.
    pub spoken_languages: String,
    /// Compact JSON array of origin-country codes.
    pub origin_country: String,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub backdrop_path: String,
    pub poster_path: String,
    /// `"<name> (<id>)"` or empty text when the movie has no collection.
    pub belongs_to_collection: String,
}

/// Fully stamped record carrying the complete declared column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(flatten)]
    pub detail: MovieDraft,
    pub src_tag: String,
    pub publication_id: i64,
}

impl MovieRecord {
    pub fn from_draft(detail: MovieDraft, src_tag: &str, publication_id: i64) -> Self {
        Self {
            detail,
            src_tag: src_tag.to_string(),
            publication_id,
        }
    }

    /// Bind parameters in `MOVIE_DETAILS_COLUMNS` order.
    pub fn to_params(&self) -> Vec<SqlValue> {
        let d = &self.detail;
        vec![
            SqlValue::Int(d.id),
            SqlValue::Text(d.imdb_id.clone()),
            SqlValue::Text(d.title.clone()),
            SqlValue::Text(d.original_title.clone()),
            SqlValue::Text(d.tagline.clone()),
            SqlValue::Text(d.overview.clone()),
            SqlValue::Int(d.runtime),
            SqlValue::Text(d.status.clone()),
            SqlValue::Text(d.release_date.clone()),
            SqlValue::Text(d.genres.clone()),
            SqlValue::Text(d.original_language.clone()),
            SqlValue::Text(d.spoken_languages.clone()),
            SqlValue::Text(d.origin_country.clone()),
            SqlValue::Float(d.popularity),
            SqlValue::Float(d.vote_average),
            SqlValue::Int(d.vote_count),
            SqlValue::Text(d.backdrop_path.clone()),
            SqlValue::Text(d.poster_path.clone()),
            SqlValue::Text(d.belongs_to_collection.clone()),
            SqlValue::Text(self.src_tag.clone()),
            SqlValue::Int(self.publication_id),
        ]
    }
}

/// One run's worth of stamped records sharing a publication id and source tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub publication_id: i64,
    pub src_tag: String,
    pub records: Vec<MovieRecord>,
}

impl Batch {
    pub fn empty(publication_id: i64, src_tag: &str) -> Self {
        Self {
            publication_id,
            src_tag: src_tag.to_string(),
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Insert rows in `MOVIE_DETAILS_COLUMNS` order.
    pub fn rows(&self) -> Vec<Vec<SqlValue>> {
        self.records.iter().map(MovieRecord::to_params).collect()
    }
}

/// Ordered result set of a read query: column names plus row values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row plus stringified data rows, the shape spreadsheet ranges take.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.columns.clone());
        for row in &self.rows {
            grid.push(row.iter().map(SqlValue::to_grid_string).collect());
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_record_params_cover_the_declared_column_set() {
        let record = MovieRecord::from_draft(sample_draft(), "links.txt", 20260826120000);
        assert_eq!(record.to_params().len(), MOVIE_DETAILS_COLUMNS.len());
    }

    #[test]
    fn grid_has_header_row_and_empty_text_for_null() {
        let rows = RowSet {
            columns: vec!["id".into(), "title".into()],
            rows: vec![vec![SqlValue::Int(5), SqlValue::Null]],
        };
        let grid = rows.to_grid();
        assert_eq!(grid[0], vec!["id".to_string(), "title".to_string()]);
        assert_eq!(grid[1], vec!["5".to_string(), String::new()]);
    }

    fn sample_draft() -> MovieDraft {
        MovieDraft {
            id: 5,
            imdb_id: "tt0000005".into(),
            title: "Foo".into(),
            original_title: "Foo".into(),
            tagline: String::new(),
            overview: "About foo.".into(),
            runtime: 101,
            status: "Released".into(),
            release_date: "2001-01-01".into(),
            genres: "[18]".into(),
            original_language: "en".into(),
            spoken_languages: "[\"English\"]".into(),
            origin_country: "[\"US\"]".into(),
            popularity: 1.5,
            vote_average: 7.2,
            vote_count: 10,
            backdrop_path: String::new(),
            poster_path: String::new(),
            belongs_to_collection: String::new(),
        }
    }
}
