use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::domain::{Feed, IncomingCandidate, SubjectId};
use crate::error::{LineError, XrefError};

/// Minimum number of tab-separated columns in any RNAcentral mapping line:
/// rnacentral id, db tag, accession, taxon, rna type, gene.
pub const MIN_COLUMNS: usize = 6;

/// Opens a feed for reading. Every call starts from the first line, so each
/// species run can read the same feed independently.
pub trait FeedSource: Send + Sync {
    fn open(&self, feed: Feed, location: &str) -> Result<Box<dyn BufRead + '_>, XrefError>;
}

/// Reads feeds from the local filesystem, gunzipping `.gz` files on the fly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFeedSource;

impl FeedSource for FileFeedSource {
    fn open(&self, feed: Feed, location: &str) -> Result<Box<dyn BufRead + '_>, XrefError> {
        let path = Utf8Path::new(location);
        let file = File::open(path.as_std_path()).map_err(|err| XrefError::FeedRead {
            feed: feed.to_string(),
            message: format!("{path}: {err}"),
        })?;
        if path.extension() == Some("gz") {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Parses one line of `feed`.
///
/// Returns `Ok(None)` for lines that belong to another taxon; those are left
/// for that species' own run and must not be counted here.
pub fn parse_line(
    line: &str,
    feed: Feed,
    taxon_id: u32,
) -> Result<Option<IncomingCandidate>, LineError> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < MIN_COLUMNS {
        return Err(LineError::ColumnCount {
            expected: MIN_COLUMNS,
            found: cols.len(),
        });
    }

    let taxon = cols[3]
        .parse::<u32>()
        .map_err(|_| LineError::BadTaxon(cols[3].to_string()))?;
    if taxon != taxon_id {
        return Ok(None);
    }

    if cols[1] != feed.tag() {
        return Err(LineError::UnexpectedTag {
            expected: feed.tag(),
            found: cols[1].to_string(),
        });
    }

    let auxiliary_accession = match feed {
        Feed::Ensembl => Some(cols[5].to_string()),
        Feed::Rgd => {
            cols[2].parse::<SubjectId>()?;
            None
        }
        Feed::RefSeq => None,
    };

    Ok(Some(IncomingCandidate {
        rna_central_id: cols[0].to_string(),
        raw_accession: cols[2].to_string(),
        taxon,
        rna_type: cols[4].to_string(),
        gene_symbol: cols[5].to_string(),
        auxiliary_accession,
    }))
}
