//! Partitioning of the token roster into dispatch-sized chunks.

use crate::token::Token;

/// A bounded, ordered group of tokens dispatched in a single remote call.
///
/// Chunks are built once per run and never mutated afterwards. `index` is the
/// zero-based dispatch position, carried for log and audit correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub tokens: Vec<Token>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Split an ordered token sequence into chunks of at most `chunk_size`.
///
/// Produces `ceil(N / chunk_size)` chunks; concatenating them in order
/// reproduces the input exactly, and only the final chunk may be shorter
/// than `chunk_size`. An empty input yields no chunks.
///
/// `chunk_size` must be positive; [`crate::config::RunConfig::validate`]
/// rejects zero before any roster reaches this point.
pub fn chunk_tokens(tokens: &[Token], chunk_size: usize) -> Vec<Chunk> {
    debug_assert!(chunk_size > 0, "chunk_size is validated upstream");
    tokens
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, tokens)| Chunk {
            index,
            tokens: tokens.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::from(format!("tok_{i:03}"))).collect()
    }

    #[test]
    fn partitions_into_ceil_count_with_short_tail() {
        let input = tokens(25);
        let chunks = chunk_tokens(&input, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(Chunk::len).collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
    }

    #[test]
    fn concatenation_reproduces_the_input() {
        let input = tokens(25);
        let chunks = chunk_tokens(&input, 10);

        let rebuilt: Vec<Token> = chunks.into_iter().flat_map(|c| c.tokens).collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let input = tokens(30);
        let chunks = chunk_tokens(&input, 10);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn chunk_size_of_one_yields_one_chunk_per_token() {
        let input = tokens(4);
        let chunks = chunk_tokens(&input, 1);

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn oversized_chunk_size_yields_a_single_chunk() {
        let input = tokens(3);
        let chunks = chunk_tokens(&input, 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_tokens(&[], 10);
        assert!(chunks.is_empty());
    }

    #[test]
    fn indices_follow_dispatch_order() {
        let input = tokens(25);
        let chunks = chunk_tokens(&input, 10);

        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }
}
