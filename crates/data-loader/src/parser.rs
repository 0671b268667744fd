//! Parser for MovieLens "latest" CSV files.
//!
//! - links.csv: movieId,imdbId,tmdbId
//! - ratings.csv: userId,movieId,rating,timestamp
//!
//! Both files start with a header row. The `imdbId` column holds only the
//! numeric part of the identifier ("0114709"); the `tt` prefix is added here
//! and normalization happens later in the identifier mapper.

use crate::error::{DataLoadError, Result};
use crate::identifier::IMDB_PREFIX;
use crate::types::*;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Read a file into memory, mapping a missing file to `FileNotFound`
fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

/// Iterate the data lines of a CSV file as `(line_no, line)`, skipping the
/// header and blank lines
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .skip(1)
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Take the next comma-separated field or fail with a `ParseError`
fn next_field<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    file: &str,
    line: usize,
    name: &str,
) -> Result<&'a str> {
    parts.next().ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Missing {}", name),
    })
}

fn parse_field<T: FromStr>(value: &str, file: &str, line: usize, name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Invalid {}: {}", name, e),
    })
}

/// Parse the links.csv file
///
/// Format: movieId,imdbId,tmdbId (tmdbId may be empty)
pub fn parse_links(path: &Path) -> Result<Vec<Link>> {
    parse_links_str(&read_to_string(path)?)
}

pub fn parse_links_str(content: &str) -> Result<Vec<Link>> {
    const FILE: &str = "links.csv";
    let mut links = Vec::new();

    for (line_no, line) in data_lines(content) {
        let mut parts = line.split(',');
        let movie_id = next_field(&mut parts, FILE, line_no, "movieId")?;
        let imdb_id = next_field(&mut parts, FILE, line_no, "imdbId")?;

        links.push(Link {
            movie_id: parse_field(movie_id, FILE, line_no, "movieId")?,
            imdb_id: format!("{}{}", IMDB_PREFIX, imdb_id.trim()),
        });
    }
    Ok(links)
}

/// Parse the ratings.csv file
///
/// Format: userId,movieId,rating,timestamp
///
/// Only the syntax is checked here. Range and timestamp validation belong to
/// the rating matrix builder, which counts rejects instead of failing.
pub fn parse_ratings(path: &Path) -> Result<Vec<RawRating>> {
    parse_ratings_str(&read_to_string(path)?)
}

pub fn parse_ratings_str(content: &str) -> Result<Vec<RawRating>> {
    const FILE: &str = "ratings.csv";
    let mut ratings = Vec::new();

    for (line_no, line) in data_lines(content) {
        let mut parts = line.split(',');
        let user_id = next_field(&mut parts, FILE, line_no, "userId")?;
        let movie_id = next_field(&mut parts, FILE, line_no, "movieId")?;
        let rating = next_field(&mut parts, FILE, line_no, "rating")?;
        let timestamp = next_field(&mut parts, FILE, line_no, "timestamp")?;

        ratings.push(RawRating {
            user_id: parse_field(user_id, FILE, line_no, "userId")?,
            movie_id: parse_field(movie_id, FILE, line_no, "movieId")?,
            rating: parse_field(rating, FILE, line_no, "rating")?,
            timestamp: parse_field(timestamp, FILE, line_no, "timestamp")?,
        });
    }
    Ok(ratings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links() {
        let content = "movieId,imdbId,tmdbId\n1,0114709,862\n2,0113497,\n\n";
        let links = parse_links_str(content).unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].movie_id, 1);
        assert_eq!(links[0].imdb_id, "tt0114709");
        assert_eq!(links[1].imdb_id, "tt0113497");
    }

    #[test]
    fn test_parse_ratings() {
        let content = "userId,movieId,rating,timestamp\n1,1,4.0,964982703\n1,3,3.5,964981247\n";
        let ratings = parse_ratings_str(content).unwrap();

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[1].movie_id, 3);
        assert_eq!(ratings[1].rating, 3.5);
        assert_eq!(ratings[0].timestamp, 964982703);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let content = "userId,movieId,rating,timestamp\n1,1,4.0,964982703\n1,abc,4.0,1\n";
        let err = parse_ratings_str(content).unwrap_err();

        match err {
            DataLoadError::ParseError { file, line, reason } => {
                assert_eq!(file, "ratings.csv");
                assert_eq!(line, 3);
                assert!(reason.contains("movieId"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_field() {
        let err = parse_ratings_str("header\n1,2,3.0\n").unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { ref reason, .. } if reason == "Missing timestamp"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_links(Path::new("/definitely/not/here/links.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
