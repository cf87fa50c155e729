use std::{
    fmt::Debug,
    fs::File,
    io::{self, BufRead, BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Reads the raw records of an opened split one at a time.
pub trait RecordReader: Send {
    /// Reads the next record.
    ///
    /// # Returns
    /// `None` once the split has no more records.
    fn read_next(&mut self) -> io::Result<Option<String>>;
}

/// A partition of the input that can be read from its start any amount of times.
pub trait SplitSource: Send + Debug {
    /// Opens a new reader positioned at the first record of the split.
    fn open(&self) -> io::Result<Box<dyn RecordReader>>;

    /// The amount of records in the split, if known without reading it.
    fn len_hint(&self) -> Option<usize> {
        None
    }

    /// A human readable description used in logs.
    fn describe(&self) -> String;
}

/// Serves records held in memory.
#[derive(Debug, Clone)]
pub struct MemorySplit {
    records: Arc<[String]>,
}

impl MemorySplit {
    pub fn new(records: impl Into<Arc<[String]>>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl SplitSource for MemorySplit {
    fn open(&self) -> io::Result<Box<dyn RecordReader>> {
        Ok(Box::new(MemoryReader {
            records: Arc::clone(&self.records),
            next: 0,
        }))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.records.len())
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }
}

struct MemoryReader {
    records: Arc<[String]>,
    next: usize,
}

impl RecordReader for MemoryReader {
    fn read_next(&mut self) -> io::Result<Option<String>> {
        let record = self.records.get(self.next).cloned();
        self.next += 1;
        Ok(record)
    }
}

/// Splits spanning at most this many bytes are counted when asked for their length.
const COUNTED_SPLIT_BYTES: u64 = 1 << 20;

/// The lines of a file that start inside a byte range.
///
/// A line belongs to the split in which its first byte lies, so consecutive splits of a file
/// yield every line exactly once no matter where the boundaries fall. Line terminators
/// (`\n` or `\r\n`) are stripped and blank lines are skipped.
#[derive(Debug, Clone)]
pub struct FileSplit {
    path: PathBuf,
    start: u64,
    end: u64,
}

impl FileSplit {
    /// Creates a new `FileSplit` over the lines starting in `start..end`.
    pub fn new(path: impl AsRef<Path>, start: u64, end: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            start,
            end,
        }
    }
}

impl SplitSource for FileSplit {
    fn open(&self) -> io::Result<Box<dyn RecordReader>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut pos = 0;

        if self.start > 0 {
            // The line containing `start - 1` belongs to the previous split.
            pos = reader.seek(SeekFrom::Start(self.start - 1))?;
            let mut partial = Vec::new();
            pos += reader.read_until(b'\n', &mut partial)? as u64;
        }

        Ok(Box::new(FileReader {
            reader,
            pos,
            end: self.end,
            line: Vec::new(),
        }))
    }

    /// Counts the records of small splits, larger ones are never read up front.
    fn len_hint(&self) -> Option<usize> {
        if self.end.saturating_sub(self.start) > COUNTED_SPLIT_BYTES {
            return None;
        }

        let mut reader = self.open().ok()?;
        let mut len = 0;
        while reader.read_next().ok()?.is_some() {
            len += 1;
        }

        Some(len)
    }

    fn describe(&self) -> String {
        format!("{} [{}..{})", self.path.display(), self.start, self.end)
    }
}

struct FileReader {
    reader: BufReader<File>,
    pos: u64,
    end: u64,
    line: Vec<u8>,
}

impl RecordReader for FileReader {
    fn read_next(&mut self) -> io::Result<Option<String>> {
        loop {
            if self.pos >= self.end {
                return Ok(None);
            }

            self.line.clear();
            let n = self.reader.read_until(b'\n', &mut self.line)?;
            if n == 0 {
                return Ok(None);
            }
            self.pos += n as u64;

            let mut line = &self.line[..];
            if let Some(rest) = line.strip_suffix(b"\n") {
                line = rest.strip_suffix(b"\r").unwrap_or(rest);
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(String::from_utf8_lossy(line).into_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, num::NonZeroUsize};

    use comms::specs::SplitSpec;

    use super::*;
    use crate::data::{compute_splits, from_spec};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ml-split-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    fn read_all(source: &dyn SplitSource) -> Vec<String> {
        let mut reader = source.open().unwrap();
        let mut records = Vec::new();
        while let Some(record) = reader.read_next().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn memory_split_reopens_from_the_start() {
        let split = MemorySplit::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(split.len_hint(), Some(2));
        assert_eq!(read_all(&split), ["a", "b"]);
        assert_eq!(read_all(&split), ["a", "b"]);
    }

    #[test]
    fn small_file_splits_know_their_length() {
        let path = temp_file("len", "a\nb\n\nc\nd\n");
        let len = fs::metadata(&path).unwrap().len();

        assert_eq!(FileSplit::new(&path, 0, len).len_hint(), Some(4));
        assert_eq!(FileSplit::new(&path, 3, len).len_hint(), Some(2));
        assert_eq!(FileSplit::new(&path, 0, 1 << 30).len_hint(), None);
        assert_eq!(FileSplit::new("/definitely/not/here.txt", 0, 10).len_hint(), None);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn whole_file_strips_terminators_and_blank_lines() {
        let path = temp_file("whole", "one\r\ntwo\n\n  \nthree");
        let len = fs::metadata(&path).unwrap().len();

        let split = FileSplit::new(&path, 0, len);
        assert_eq!(read_all(&split), ["one", "two", "three"]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn line_belongs_to_the_split_it_starts_in() {
        // "alpha\n" is 0..6, "beta\n" is 6..11, "gamma\n" is 11..17
        let path = temp_file("boundaries", "alpha\nbeta\ngamma\n");

        let first = FileSplit::new(&path, 0, 6);
        let second = FileSplit::new(&path, 6, 12);
        let third = FileSplit::new(&path, 12, 17);

        assert_eq!(read_all(&first), ["alpha"]);
        assert_eq!(read_all(&second), ["beta", "gamma"]);
        assert!(read_all(&third).is_empty());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn computed_splits_cover_every_line_once() {
        let lines: Vec<String> = (0..37).map(|i| format!("record number {i}")).collect();
        let path = temp_file("cover", &(lines.join("\n") + "\n"));

        for parts in 1..=8 {
            let splits = compute_splits(&path, NonZeroUsize::new(parts).unwrap()).unwrap();
            assert_eq!(splits.len(), parts);

            let read: Vec<String> = splits
                .iter()
                .flat_map(|spec| read_all(&*from_spec(spec)))
                .collect();
            assert_eq!(read, lines, "{parts} parts");
        }

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn inline_spec_builds_a_memory_split() {
        let spec = SplitSpec::Inline {
            records: vec!["x".into()],
        };
        let source = from_spec(&spec);
        assert_eq!(source.len_hint(), Some(1));
        assert_eq!(read_all(&*source), ["x"]);
    }

    #[test]
    fn missing_file_fails_on_open() {
        let split = FileSplit::new("/definitely/not/here.txt", 0, 10);
        assert!(split.open().is_err());
    }
}
