//! Reading and slicing treebanks and plain-text sentence files.

use log::{debug, info};
use std::io::BufRead;

use crate::error::Result;
use crate::util::tree::ParseNode;

/// Reads one bracketed tree per non-empty line, at most `limit` trees.
pub fn read_corpus<R: BufRead>(reader: R, limit: Option<usize>) -> Result<Vec<ParseNode>> {
    let mut trees: Vec<ParseNode> = Vec::new();
    for line in reader.lines() {
        if limit.map_or(false, |limit| trees.len() >= limit) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        trees.push(line.parse()?);
    }
    info!("Read {} trees.", trees.len());
    Ok(trees)
}

/// Reads one whitespace-separated sentence per line. Empty lines are empty
/// sentences, so the result lines up with the input.
pub fn read_sentences<R: BufRead>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut sentences = Vec::new();
    for line in reader.lines() {
        sentences.push(line?.split_whitespace().map(str::to_string).collect());
    }
    Ok(sentences)
}

/// The tokens of a tree.
pub fn sentence_yield(tree: &ParseNode) -> Vec<String> {
    tree.leaves().into_iter().map(str::to_string).collect()
}

/// Keeps the trees whose yield has at least `min` and at most `max` tokens.
pub fn filter_by_length<I>(trees: I, min: usize, max: Option<usize>) -> Vec<ParseNode>
where
    I: IntoIterator<Item = ParseNode>,
{
    let mut dropped = 0;
    let kept: Vec<ParseNode> = trees
        .into_iter()
        .filter(|tree| {
            let length = tree.leaves().len();
            let keep = length >= min && max.map_or(true, |max| length <= max);
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();
    debug!("Kept {} trees, dropped {}.", kept.len(), dropped);
    kept
}
