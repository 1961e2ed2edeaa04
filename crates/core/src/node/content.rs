use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{DavError, Result};
use crate::node_type::NodeType;
use crate::response::{FileContent, Status};

use super::ResourceNode;

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Parse a `Range` header against content of `total` bytes.
    ///
    /// Only a single `bytes=` range is supported. Headers that do not parse
    /// are ignored and yield `Ok(None)`, so the full content is served.
    pub fn parse(header: &str, total: u64) -> Result<Option<Self>> {
        let Some(set) = header.trim().strip_prefix("bytes=") else {
            return Ok(None);
        };
        if set.contains(',') {
            return Err(DavError::NotImplemented("multiple byte ranges"));
        }
        let Some((first, last)) = set.split_once('-') else {
            return Ok(None);
        };
        let (first, last) = (first.trim(), last.trim());

        let range = match (first.is_empty(), last.is_empty()) {
            (true, true) => return Ok(None),
            // suffix: the last n bytes
            (true, false) => {
                let Ok(n) = last.parse::<u64>() else {
                    return Ok(None);
                };
                if n == 0 || total == 0 {
                    return Err(DavError::RangeNotSatisfiable);
                }
                Self {
                    start: total.saturating_sub(n),
                    end: total - 1,
                }
            }
            (false, true) => {
                let Ok(start) = first.parse::<u64>() else {
                    return Ok(None);
                };
                if start >= total {
                    return Err(DavError::RangeNotSatisfiable);
                }
                Self {
                    start,
                    end: total - 1,
                }
            }
            (false, false) => {
                let (Ok(start), Ok(end)) = (first.parse::<u64>(), last.parse::<u64>()) else {
                    return Ok(None);
                };
                if start > end {
                    return Ok(None);
                }
                if start >= total {
                    return Err(DavError::RangeNotSatisfiable);
                }
                Self {
                    start,
                    end: end.min(total - 1),
                }
            }
        };
        Ok(Some(range))
    }

    /// Number of bytes covered, never zero
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

impl ResourceNode {
    /// Read this file's content, optionally restricted to a byte range
    pub fn get(&self, range: Option<&str>) -> Result<FileContent> {
        let metadata = self.require_metadata()?;
        if metadata.node_type != NodeType::DavFile {
            return Err(DavError::MethodNotAllowed(self.path.to_string()));
        }

        let mut file = File::open(self.content_path())?;
        let total = file.metadata()?.len();
        let range = match range {
            Some(header) => ByteRange::parse(header, total)?,
            None => None,
        };

        let mut body = Vec::new();
        let (status, content_range) = match range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start))?;
                file.take(range.length()).read_to_end(&mut body)?;
                (Status::PartialContent, Some(range.content_range(total)))
            }
            None => {
                file.read_to_end(&mut body)?;
                (Status::Ok, None)
            }
        };

        Ok(FileContent {
            status,
            body,
            content_type: metadata.content_type.clone(),
            etag: metadata.etag(),
            content_length: total,
            content_range,
        })
    }
}
