//! Recorded frames in JSON Lines form.
//!
//! Each non-blank line is one object:
//!
//! ```json
//! {"timestamp_ms": 1200, "landmarks": [{"x": 0.5, "y": 0.4, "z": -0.1}, ...], "scores": [0.1, 0.8, 0.1], "class": "legs_up"}
//! ```
//!
//! Only `landmarks` is required. An empty `landmarks` array is a frame in which
//! the detector found no pose.

use crate::error::{PosewatchError, Result};
use crate::pose::landmark::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One recorded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Capture time relative to the start of the recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    pub landmarks: LandmarkSet,
    /// Classifier output captured alongside the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f32>>,
    /// Ground-truth class name, for dataset export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Iterator over the frame records of a JSON Lines stream.
pub struct FrameReader<R: BufRead> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// 1-based number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(PosewatchError::Io(e))),
            }
            self.line += 1;

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str(trimmed).map_err(|e| {
                PosewatchError::FrameParse {
                    line: self.line,
                    message: e.to_string(),
                }
            }));
        }
    }
}

/// Reads every record, stopping at the first malformed line.
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<FrameRecord>> {
    FrameReader::new(reader).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn landmarks_json(n: usize) -> String {
        let items: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"x": {}, "y": 0.5, "z": 0.0}}"#, i as f32 / 100.0))
            .collect();
        format!("[{}]", items.join(", "))
    }

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let input = format!(
            "{{\"timestamp_ms\": 0, \"landmarks\": {}, \"scores\": [0.1, 0.8, 0.1]}}\n\n   \n{{\"landmarks\": []}}\n",
            landmarks_json(33)
        );

        let frames = read_frames(Cursor::new(input)).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp_ms, Some(0));
        assert_eq!(frames[0].landmarks.len(), 33);
        assert_eq!(frames[0].scores, Some(vec![0.1, 0.8, 0.1]));
        assert!(frames[1].landmarks.is_empty());
        assert_eq!(frames[1].scores, None);
        assert_eq!(frames[1].class, None);
    }

    #[test]
    fn test_parse_error_reports_line_number() {
        let input = format!(
            "{{\"landmarks\": {}}}\n\n{{\"timestamp_ms\": 5}}\n",
            landmarks_json(2)
        );

        match read_frames(Cursor::new(input)) {
            Err(PosewatchError::FrameParse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("landmarks"));
            }
            other => panic!("Expected FrameParse, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_is_lazy() {
        let input = "{\"landmarks\": []}\nnot json\n";
        let mut reader = FrameReader::new(Cursor::new(input));

        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert_eq!(reader.line(), 2);
    }

    #[test]
    fn test_record_serializes_without_empty_options() {
        let record = FrameRecord {
            timestamp_ms: None,
            landmarks: LandmarkSet::empty(),
            scores: None,
            class: Some("normal".to_string()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"landmarks":[],"class":"normal"}"#);
    }
}
