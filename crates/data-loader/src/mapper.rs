//! Identifier Mapper: bidirectional translation between the dense internal
//! movie index and the public [`ImdbId`].
//!
//! Internal ids are assigned in sorted order of the normalized identifiers,
//! so the same catalog always produces the same indices. Malformed and
//! duplicate identifiers are rejected when the table is built; lookups never
//! have to deal with them.

use crate::error::{DataLoadError, Result};
use crate::identifier::ImdbId;
use crate::types::MovieId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Why an identifier was left out of the mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Could not be normalized
    Malformed(&'static str),
    /// Normalizes to an identifier already claimed by an earlier movie
    Duplicate,
}

/// An identifier rejected at ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedIdentifier {
    /// Position of the identifier in the input sequence
    pub position: usize,
    pub raw: String,
    pub reason: RejectReason,
}

/// Bijection between internal movie ids and public identifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ImdbId>", into = "Vec<ImdbId>")]
pub struct IdentifierMapper {
    /// Public identifiers, indexed by internal id
    identifiers: Vec<ImdbId>,
    index: HashMap<ImdbId, MovieId>,
}

impl IdentifierMapper {
    /// Build a table from already-normalized identifiers.
    ///
    /// Fails with `DuplicateIdentifier` if the same identifier appears twice,
    /// since each entry stands for a distinct movie.
    pub fn from_identifiers(ids: impl IntoIterator<Item = ImdbId>) -> Result<Self> {
        let mut identifiers: Vec<ImdbId> = ids.into_iter().collect();
        identifiers.sort_unstable();

        if let Some(pair) = identifiers.windows(2).find(|w| w[0] == w[1]) {
            return Err(DataLoadError::DuplicateIdentifier(pair[0].to_string()));
        }
        Ok(Self::from_sorted(identifiers))
    }

    /// Build a table from raw catalog identifiers, one per movie.
    ///
    /// Identifiers that fail normalization, or normalize to a value an
    /// earlier entry already produced, are returned as rejections instead of
    /// failing the whole build.
    pub fn from_raw<'a>(raw: impl IntoIterator<Item = &'a str>) -> (Self, Vec<RejectedIdentifier>) {
        let mut seen: HashSet<ImdbId> = HashSet::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (position, raw) in raw.into_iter().enumerate() {
            match ImdbId::parse(raw) {
                Ok(id) if seen.contains(&id) => rejected.push(RejectedIdentifier {
                    position,
                    raw: raw.to_string(),
                    reason: RejectReason::Duplicate,
                }),
                Ok(id) => {
                    seen.insert(id.clone());
                    accepted.push(id);
                }
                Err(DataLoadError::MalformedIdentifier { reason, .. }) => {
                    rejected.push(RejectedIdentifier {
                        position,
                        raw: raw.to_string(),
                        reason: RejectReason::Malformed(reason),
                    })
                }
                Err(_) => rejected.push(RejectedIdentifier {
                    position,
                    raw: raw.to_string(),
                    reason: RejectReason::Malformed("unparseable"),
                }),
            }
        }

        accepted.sort_unstable();
        (Self::from_sorted(accepted), rejected)
    }

    fn from_sorted(identifiers: Vec<ImdbId>) -> Self {
        let index = identifiers
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as MovieId))
            .collect();
        Self { identifiers, index }
    }

    /// Resolve a caller-supplied identifier to the internal movie id.
    ///
    /// The input is normalized first; anything that cannot be normalized or
    /// is not in the table yields `UnknownIdentifier`.
    pub fn to_internal(&self, raw: &str) -> Result<MovieId> {
        ImdbId::parse(raw)
            .ok()
            .and_then(|id| self.lookup(&id))
            .ok_or_else(|| DataLoadError::UnknownIdentifier(raw.to_string()))
    }

    /// Resolve an already-normalized identifier
    pub fn lookup(&self, id: &ImdbId) -> Option<MovieId> {
        self.index.get(id).copied()
    }

    /// Public identifier for an internal movie id
    pub fn to_public(&self, movie_id: MovieId) -> Result<&ImdbId> {
        self.identifiers
            .get(movie_id as usize)
            .ok_or(DataLoadError::UnknownInternalId(movie_id))
    }

    /// Number of movies in the table
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Iterate `(internal id, public identifier)` in internal id order
    pub fn iter(&self) -> impl Iterator<Item = (MovieId, &ImdbId)> {
        self.identifiers
            .iter()
            .enumerate()
            .map(|(i, id)| (i as MovieId, id))
    }
}

impl TryFrom<Vec<ImdbId>> for IdentifierMapper {
    type Error = DataLoadError;

    fn try_from(identifiers: Vec<ImdbId>) -> Result<Self> {
        // A persisted table must already be in internal id order
        if identifiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DataLoadError::ValidationError(
                "identifier table is not strictly sorted".to_string(),
            ));
        }
        Ok(Self::from_sorted(identifiers))
    }
}

impl From<IdentifierMapper> for Vec<ImdbId> {
    fn from(mapper: IdentifierMapper) -> Self {
        mapper.identifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ImdbId> {
        raw.iter().map(|r| ImdbId::parse(r).unwrap()).collect()
    }

    #[test]
    fn test_ids_are_assigned_in_sorted_order() {
        let mapper =
            IdentifierMapper::from_identifiers(ids(&["tt0133093", "tt0114709", "tt0110912"]))
                .unwrap();

        assert_eq!(mapper.to_public(0).unwrap().as_str(), "tt0110912");
        assert_eq!(mapper.to_public(1).unwrap().as_str(), "tt0114709");
        assert_eq!(mapper.to_public(2).unwrap().as_str(), "tt0133093");
    }

    #[test]
    fn test_round_trip_through_both_directions() {
        let mapper =
            IdentifierMapper::from_identifiers(ids(&["tt0133093", "tt0114709"])).unwrap();

        for (movie_id, public) in mapper.iter() {
            assert_eq!(mapper.to_internal(public.as_str()).unwrap(), movie_id);
        }
    }

    #[test]
    fn test_lookup_normalizes_input() {
        let mapper = IdentifierMapper::from_identifiers(ids(&["tt0114709"])).unwrap();
        assert_eq!(mapper.to_internal("TT114709").unwrap(), 0);
    }

    #[test]
    fn test_malformed_lookup_is_unknown_identifier() {
        let mapper = IdentifierMapper::from_identifiers(ids(&["tt0114709"])).unwrap();

        let err = mapper.to_internal("tt1").unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownIdentifier(ref raw) if raw == "tt1"));
        assert!(mapper.to_internal("xx0114709").is_err());
        assert!(mapper.to_internal("tt0000001").is_err());
    }

    #[test]
    fn test_unknown_internal_id() {
        let mapper = IdentifierMapper::from_identifiers(ids(&["tt0114709"])).unwrap();
        assert!(matches!(
            mapper.to_public(7),
            Err(DataLoadError::UnknownInternalId(7))
        ));
    }

    #[test]
    fn test_from_identifiers_rejects_duplicates() {
        let result = IdentifierMapper::from_identifiers(ids(&["tt0114709", "TT114709"]));
        assert!(matches!(result, Err(DataLoadError::DuplicateIdentifier(_))));
    }

    #[test]
    fn test_from_raw_collects_rejections() {
        let (mapper, rejected) =
            IdentifierMapper::from_raw(["tt0114709", "tt1", "TT114709", "tt0133093"]);

        assert_eq!(mapper.len(), 2);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].position, 1);
        assert!(matches!(rejected[0].reason, RejectReason::Malformed(_)));
        assert_eq!(rejected[1].position, 2);
        assert_eq!(rejected[1].reason, RejectReason::Duplicate);
    }

    #[test]
    fn test_serde_round_trip_rebuilds_index() {
        let mapper =
            IdentifierMapper::from_identifiers(ids(&["tt0133093", "tt0114709"])).unwrap();
        let json = serde_json::to_string(&mapper).unwrap();
        let restored: IdentifierMapper = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.to_internal("tt0133093").unwrap(), 1);
    }

    #[test]
    fn test_unsorted_table_is_rejected_on_read() {
        let json = r#"["tt0133093","tt0114709"]"#;
        assert!(serde_json::from_str::<IdentifierMapper>(json).is_err());
    }
}
