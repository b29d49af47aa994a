//! Property tests for the recursive character splitter.

use proptest::prelude::*;
use rqa_rag::splitter::{RecursiveCharacterSplitter, START_INDEX_KEY};

/// Text drawn from a small alphabet rich in separators, plus some multibyte
/// characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-z]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("é✓".to_string()),
        ],
        0..60,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Chunks are non-empty and never exceed `chunk_size` characters.
    #[test]
    fn chunks_are_bounded_and_non_empty(text in arb_text(), (size, overlap) in arb_sizes()) {
        let splitter = RecursiveCharacterSplitter::new(size, overlap).unwrap();
        for chunk in splitter.chunks(&text) {
            let len = chunk.content.chars().count();
            prop_assert!(len > 0);
            prop_assert!(len <= size, "chunk of {} chars exceeds {}", len, size);
        }
    }

    /// Dropping the overlap prefix of every later chunk reconstructs the input.
    #[test]
    fn chunks_reconstruct_the_input(text in arb_text(), (size, overlap) in arb_sizes()) {
        let splitter = RecursiveCharacterSplitter::new(size, overlap).unwrap();
        let chunks: Vec<String> = splitter.chunks(&text).map(|d| d.content).collect();

        let rebuilt: String = chunks
            .iter()
            .enumerate()
            .flat_map(|(i, c)| c.chars().skip(if i == 0 { 0 } else { overlap }))
            .collect();
        prop_assert_eq!(rebuilt, text);
    }

    /// Consecutive chunks share exactly `chunk_overlap` characters, and
    /// `start_index` points at each chunk's position in the input.
    #[test]
    fn overlap_and_offsets_are_exact(text in arb_text(), (size, overlap) in arb_sizes()) {
        let splitter = RecursiveCharacterSplitter::new(size, overlap).unwrap();
        let chars: Vec<char> = text.chars().collect();
        let docs: Vec<_> = splitter.chunks(&text).collect();

        for doc in &docs {
            let start: usize = doc.metadata[START_INDEX_KEY].parse().unwrap();
            let expected: String =
                chars[start..start + doc.content.chars().count()].iter().collect();
            prop_assert_eq!(&doc.content, &expected);
        }
        for pair in docs.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = pair[1].content.chars().take(overlap).collect();
            prop_assert_eq!(tail, head);
        }
    }

    /// Text no longer than `chunk_size` is returned as a single chunk.
    #[test]
    fn short_text_is_one_chunk(text in "[a-z .\n]{1,20}") {
        let splitter = RecursiveCharacterSplitter::new(20, 5).unwrap();
        let chunks: Vec<String> = splitter.chunks(&text).map(|d| d.content).collect();
        prop_assert_eq!(chunks, vec![text]);
    }
}
