use log::debug;
use rand::{seq::SliceRandom, Rng};

use crate::{Note, NoteStore, Result};

/// Outcome of a serendipity pick.
#[derive(Debug, Clone, PartialEq)]
pub enum Serendipity {
    /// Two distinct notes to look at side by side.
    Pair(Note, Note),
    /// Fewer than two notes exist.
    Unavailable,
}

impl Serendipity {
    pub fn is_available(&self) -> bool {
        matches!(self, Serendipity::Pair(..))
    }
}

/// Draws two different notes uniformly at random from the whole store.
pub async fn mash<R: Rng + ?Sized>(store: &dyn NoteStore, rng: &mut R) -> Result<Serendipity> {
    let notes = store.scan(&|_: &Note| true).await?;
    let mut picked = notes.choose_multiple(rng, 2).cloned();

    match (picked.next(), picked.next()) {
        (Some(first), Some(second)) => Ok(Serendipity::Pair(first, second)),
        _ => {
            debug!("Serendipity unavailable with {} notes", notes.len());
            Ok(Serendipity::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::MemoryNoteStore;

    fn note(title: &str) -> Note {
        Note::new(
            title.to_string(),
            String::new(),
            vec![],
            Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap(),
        )
    }

    #[tokio::test]
    async fn single_note_is_unavailable() {
        let store = MemoryNoteStore::with_notes([note("alone")]);
        let mut rng = StdRng::seed_from_u64(5);
        let result = mash(&store, &mut rng).await.unwrap();
        assert_eq!(result, Serendipity::Unavailable);
        assert!(!result.is_available());

        let empty = MemoryNoteStore::new();
        assert_eq!(
            mash(&empty, &mut rng).await.unwrap(),
            Serendipity::Unavailable
        );
    }

    #[tokio::test]
    async fn pairs_are_always_distinct() {
        let store = MemoryNoteStore::with_notes((0..5).map(|i| note(&format!("n{}", i))));
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            match mash(&store, &mut rng).await.unwrap() {
                Serendipity::Pair(a, b) => assert_ne!(a.id, b.id),
                Serendipity::Unavailable => panic!("five notes should always pair"),
            }
        }
    }

    #[tokio::test]
    async fn two_notes_pair_with_each_other() {
        let a = note("a");
        let b = note("b");
        let store = MemoryNoteStore::with_notes([a.clone(), b.clone()]);
        let mut rng = StdRng::seed_from_u64(2);

        match mash(&store, &mut rng).await.unwrap() {
            Serendipity::Pair(x, y) => {
                let mut ids = vec![x.id, y.id];
                ids.sort();
                let mut expected = vec![a.id, b.id];
                expected.sort();
                assert_eq!(ids, expected);
            }
            Serendipity::Unavailable => panic!("two notes should pair"),
        }
    }
}
