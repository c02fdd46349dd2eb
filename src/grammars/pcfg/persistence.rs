use flate2::{read, write, Compression};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

use super::Grammar;
use crate::error::Result;

/// Writes `value` as gzip-compressed bincode.
pub fn write_compressed<T: Serialize, W: Write>(value: &T, writer: W) -> Result<()> {
    let mut encoder = write::GzEncoder::new(writer, Compression::best());
    bincode::serialize_into(&mut encoder, value)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Reads a value written by `write_compressed`.
pub fn read_compressed<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    Ok(bincode::deserialize_from(read::GzDecoder::new(reader))?)
}

impl Grammar {
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        write_compressed(self, writer)
    }

    pub fn load<R: Read>(reader: R) -> Result<Grammar> {
        read_compressed(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcfgError;
    use crate::grammars::pcfg::tests::rule;

    #[test]
    fn save_and_load() {
        let mut grammar = Grammar::new("S");
        for r in &["S → NP VP", "NP → N", "N → \"dog\"", "VP → \"barks\"", "NP → \"cats\""] {
            grammar.add_rule(rule(r));
        }
        grammar.estimate_probabilities().unwrap();
        grammar.precolate().unwrap();

        let mut buffer = Vec::new();
        grammar.save(&mut buffer).unwrap();
        let loaded = Grammar::load(buffer.as_slice()).unwrap();

        assert_eq!(loaded.start(), grammar.start());
        assert_eq!(loaded.len(), grammar.len());
        assert!(loaded.is_estimated() && loaded.is_precolated());
        for (rule, stats) in grammar.rules() {
            assert_eq!(loaded.lookup(rule).unwrap(), stats);
        }
    }

    #[test]
    fn garbage() {
        match Grammar::load(&b"definitely not gzip"[..]) {
            Err(PcfgError::Persistence(_)) => (),
            other => panic!("unexpected {:?}", other.map(|g| g.len())),
        }
    }
}
